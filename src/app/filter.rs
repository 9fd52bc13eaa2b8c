//! Inline fuzzy filter over the current directory.

use std::cmp::Ordering;

use crate::fuzzy::{prepare_tokens, tokenize, triggers_case_sensitivity};

use super::AppState;

/// Filter sub-state.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub active: bool,
    pub query: String,
    /// Smart case: set by the first uppercase character, cleared only when
    /// the query becomes empty.
    pub case_sensitive: bool,
    /// Matching base indices, best score first.
    pub filtered_indices: Vec<usize>,
    /// Scores parallel to `filtered_indices`.
    pub matches: Vec<f64>,
    /// Selection before the filter was opened.
    pub saved_index: Option<usize>,
    /// Lower-cased entry names, parallel to `AppState::files`.
    folded_names: Vec<String>,
}

impl FilterState {
    pub fn token_count(&self) -> usize {
        tokenize(&self.query).len()
    }

    fn set_identity(&mut self, len: usize) {
        self.filtered_indices = (0..len).collect();
        self.matches = vec![0.0; len];
    }
}

impl AppState {
    pub(crate) fn refresh_folded_names(&mut self) {
        self.filter.folded_names = self.files.iter().map(|e| e.name.to_lowercase()).collect();
    }

    /// Re-rank `files` against the current query. Ties keep directory order.
    pub fn recompute_filter(&mut self) {
        let tokens = prepare_tokens(&self.filter.query, self.filter.case_sensitive);
        if tokens.is_empty() {
            self.filter.set_identity(self.files.len());
            return;
        }
        if self.filter.folded_names.len() != self.files.len() {
            self.refresh_folded_names();
        }

        let case_sensitive = self.filter.case_sensitive;
        let mut scored: Vec<(usize, f64)> = self
            .files
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let target = if case_sensitive {
                    entry.name.as_str()
                } else {
                    self.filter.folded_names[i].as_str()
                };
                self.matcher
                    .score_tokens(&tokens, target)
                    .map(|score| (i, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        self.filter.filtered_indices = scored.iter().map(|(i, _)| *i).collect();
        self.filter.matches = scored.iter().map(|(_, s)| *s).collect();
    }

    /// Open the filter, or restart it when already open.
    pub fn filter_start(&mut self) {
        if self.filter.active {
            self.filter.query.clear();
            self.filter.case_sensitive = false;
            self.filter.set_identity(self.files.len());
            self.selected_index = None;
            self.invalidate_overlay();
            self.scroll_offset = 0;
            return;
        }
        self.filter.active = true;
        self.filter.saved_index = self.selected_index;
        self.filter.query.clear();
        self.filter.case_sensitive = false;
        self.filter.set_identity(self.files.len());
        self.invalidate_overlay();
        self.update_scroll_visibility();
    }

    pub fn filter_char(&mut self, c: char) {
        if !self.filter.active {
            return;
        }
        let before = self.filter.token_count();
        if triggers_case_sensitivity(c) {
            self.filter.case_sensitive = true;
        }
        self.filter.query.push(c);
        self.apply_query_edit(before);
    }

    pub fn filter_backspace(&mut self) {
        if !self.filter.active || self.filter.query.is_empty() {
            return;
        }
        let before = self.filter.token_count();
        self.filter.query.pop();
        if self.filter.query.is_empty() {
            self.filter.case_sensitive = false;
        }
        self.apply_query_edit(before);
    }

    /// Empty the query, keeping the filter open.
    pub fn filter_reset(&mut self) {
        if !self.filter.active {
            return;
        }
        let before = self.filter.token_count();
        self.filter.query.clear();
        self.filter.case_sensitive = false;
        self.apply_query_edit(before);
    }

    /// Close the filter, keeping the entry under the cursor.
    pub fn filter_clear(&mut self) {
        if !self.filter.active {
            return;
        }
        let keep = self.selected_index.or(self.filter.saved_index);
        self.filter.active = false;
        self.filter.query.clear();
        self.filter.case_sensitive = false;
        self.filter.filtered_indices.clear();
        self.filter.matches.clear();
        self.filter.saved_index = None;
        self.invalidate_overlay();

        self.selected_index = match keep {
            Some(base) if base < self.files.len() => self.nearest_visible(base),
            _ => self.first_visible(),
        };
        self.center_scroll_on_selection();
    }

    /// Drop the filter without touching the selection, used when the
    /// directory changes underneath it.
    pub(crate) fn filter_discard(&mut self) {
        self.filter.active = false;
        self.filter.query.clear();
        self.filter.case_sensitive = false;
        self.filter.filtered_indices.clear();
        self.filter.matches.clear();
        self.filter.saved_index = None;
    }

    fn apply_query_edit(&mut self, tokens_before: usize) {
        let picks_first = tokens_before == 0 && self.filter.token_count() > 0;
        let previous = if picks_first {
            None
        } else {
            self.selected_index
        };
        let previous_display = self.display_selected_index();

        self.recompute_filter();
        self.invalidate_overlay();

        let len = self.display_len();
        self.selected_index = match previous {
            Some(base) if self.to_display(base).is_some() => Some(base),
            _ if len == 0 => None,
            Some(_) => self.from_display(previous_display.unwrap_or(0).min(len - 1)),
            None => self.first_visible(),
        };
        self.update_scroll_visibility();
    }
}

#[cfg(test)]
mod tests {
    use crate::app::test_support::*;

    fn type_query(state: &mut crate::app::AppState, query: &str) {
        for c in query.chars() {
            state.filter_char(c);
        }
    }

    #[test]
    fn start_saves_selection_and_shows_everything() {
        let dir = setup_dir(&["a", "b", "c"]);
        let mut state = loaded_state(dir.path());
        state.selected_index = Some(1);
        state.filter_start();
        assert!(state.filter.active);
        assert_eq!(state.filter.saved_index, Some(1));
        assert_eq!(state.selected_index, Some(1));
        assert_eq!(state.display_len(), 3);
    }

    #[test]
    fn restart_resets_order_and_selection() {
        let dir = setup_dir(&["alpha", "beta", "gamma"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "ga");
        assert_eq!(names(&state), vec!["gamma"]);
        state.filter_start();
        assert_eq!(state.filter.query, "");
        assert_eq!(state.filter.filtered_indices, vec![0, 1, 2]);
        assert_eq!(state.selected_index, None);
    }

    #[test]
    fn multi_token_query_uses_and_semantics() {
        let dir = setup_dir(&["alpha beta.txt", "beta alpha.md", "alpha.txt", "beta.txt"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "alpha beta");
        let mut shown = names(&state);
        shown.sort();
        assert_eq!(shown, vec!["alpha beta.txt", "beta alpha.md"]);
    }

    #[test]
    fn trailing_whitespace_changes_nothing() {
        let dir = setup_dir(&["alpha", "beta", "alps"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "al");
        let before = state.filter.filtered_indices.clone();
        type_query(&mut state, "  ");
        assert_eq!(state.filter.filtered_indices, before);
    }

    #[test]
    fn smart_case_switches_on_uppercase() {
        let dir = setup_dir(&["Main.go", "MAIN.md", "IMPLEMENTATION.md", "main.rs"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "main");
        assert!(!state.filter.case_sensitive);
        let shown = names(&state);
        assert!(shown.contains(&"Main.go".to_string()));
        assert!(shown.contains(&"IMPLEMENTATION.md".to_string()));

        state.filter_reset();
        type_query(&mut state, "MAIN");
        assert!(state.filter.case_sensitive);
        let shown = names(&state);
        assert!(shown.contains(&"MAIN.md".to_string()));
        assert!(!shown.contains(&"Main.go".to_string()));
        assert!(!shown.contains(&"main.rs".to_string()));
    }

    #[test]
    fn case_sensitivity_resets_only_when_empty() {
        let dir = setup_dir(&["Abc"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "Ab");
        state.filter_backspace();
        assert!(state.filter.case_sensitive);
        state.filter_backspace();
        assert!(!state.filter.case_sensitive);
    }

    #[test]
    fn first_token_picks_first_match() {
        let dir = setup_dir(&["apple", "banana", "cherry"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        state.selected_index = Some(0);
        type_query(&mut state, "an");
        assert_eq!(state.selected_entry().unwrap().name, "banana");
    }

    #[test]
    fn edit_keeps_same_entry_when_it_still_matches() {
        let dir = setup_dir(&["abc", "abd", "xbz"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "b");
        let abd = state.index_of(&dir.path().join("abd")).unwrap();
        state.selected_index = Some(abd);
        type_query(&mut state, "d");
        assert_eq!(state.selected_index, Some(abd));
    }

    #[test]
    fn edit_clamps_when_entry_drops_out() {
        let dir = setup_dir(&["ab1", "ab2", "ac3"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "a");
        state.set_display_selected_index(2);
        type_query(&mut state, "b");
        assert_eq!(state.display_len(), 2);
        assert_eq!(state.display_selected_index(), Some(1));
    }

    #[test]
    fn recompute_is_idempotent() {
        let dir = setup_dir(&["one", "two", "three", "tone"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "on");
        state.recompute_filter();
        let first = (state.filter.filtered_indices.clone(), state.filter.matches.clone());
        state.recompute_filter();
        assert_eq!(first.0, state.filter.filtered_indices);
        assert_eq!(first.1, state.filter.matches);
    }

    #[test]
    fn ranking_is_descending_by_score() {
        let dir = setup_dir(&["xxmxxaxxixxn", "main", "mxaxixn"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "main");
        let m = &state.filter.matches;
        assert!(m.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(names(&state)[0], "main");
    }

    #[test]
    fn clear_keeps_cursor_entry() {
        let dir = setup_dir(&["alpha", "beta", "gamma"]);
        let mut state = loaded_state(dir.path());
        state.filter_start();
        type_query(&mut state, "gam");
        state.filter_clear();
        assert!(!state.filter.active);
        assert_eq!(state.selected_entry().unwrap().name, "gamma");
        assert_eq!(state.display_len(), 3);
    }

    #[test]
    fn clear_falls_back_to_saved_then_first() {
        let dir = setup_dir(&["alpha", "beta", "gamma"]);
        let mut state = loaded_state(dir.path());
        state.selected_index = Some(2);
        state.filter_start();
        state.filter_start();
        assert_eq!(state.selected_index, None);
        state.filter_clear();
        assert_eq!(state.selected_index, Some(2));

        state.selected_index = None;
        state.filter_start();
        state.filter_clear();
        assert_eq!(state.selected_index, Some(0));
    }
}

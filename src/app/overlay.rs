//! Base-space / display-space translation.
//!
//! Base space indexes `AppState::files`. Display space indexes what is on
//! screen after two projections, applied in order: filter membership (in
//! filter rank order), then hidden-entry visibility. All cursor arithmetic
//! happens in display space.

use crate::fs::reader::FileEntry;

use super::{AppState, FIXED_CHROME_ROWS};

impl AppState {
    /// Rebuild the display list. Must follow any change to `files`, the
    /// filter result, filter activation or `hide_hidden`.
    pub fn invalidate_overlay(&mut self) {
        let hide = self.hide_hidden;
        let files = &self.files;
        let visible = |i: &usize| !(hide && files[*i].is_hidden);
        self.display = if self.filter.active {
            self.filter
                .filtered_indices
                .iter()
                .copied()
                .filter(|&i| i < files.len())
                .filter(visible)
                .collect()
        } else {
            (0..files.len()).filter(visible).collect()
        };
    }

    pub fn display_len(&self) -> usize {
        self.display.len()
    }

    pub fn display_entries(&self) -> impl Iterator<Item = &FileEntry> + '_ {
        self.display.iter().map(move |&i| &self.files[i])
    }

    /// Display position of a base index, `None` when it is not shown.
    pub fn to_display(&self, base: usize) -> Option<usize> {
        self.display.iter().position(|&i| i == base)
    }

    /// Base index shown at a display position.
    pub fn from_display(&self, display: usize) -> Option<usize> {
        self.display.get(display).copied()
    }

    pub fn display_selected_index(&self) -> Option<usize> {
        self.selected_index.and_then(|i| self.to_display(i))
    }

    pub fn set_display_selected_index(&mut self, display: usize) {
        self.selected_index = self.from_display(display);
    }

    /// Rows available to the file list.
    pub fn visible_lines(&self) -> usize {
        (self.screen_height as usize)
            .saturating_sub(FIXED_CHROME_ROWS)
            .max(1)
    }

    pub fn max_scroll_offset(&self) -> usize {
        self.display.len().saturating_sub(self.visible_lines())
    }

    /// Scroll the minimum needed to keep the selection on screen.
    pub fn update_scroll_visibility(&mut self) {
        let visible = self.visible_lines();
        if let Some(d) = self.display_selected_index() {
            if d < self.scroll_offset {
                self.scroll_offset = d;
            } else if d >= self.scroll_offset + visible {
                self.scroll_offset = d + 1 - visible;
            }
        }
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }

    /// Put the selection in the middle of the viewport where possible.
    pub fn center_scroll_on_selection(&mut self) {
        if let Some(d) = self.display_selected_index() {
            self.scroll_offset = d.saturating_sub(self.visible_lines() / 2);
        }
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }

    /// Base index of the first displayed entry.
    pub fn first_visible(&self) -> Option<usize> {
        self.display.first().copied()
    }

    /// Nearest displayed entry to `base` within the active filter order,
    /// searching backward first, then forward. Falls back to the first
    /// displayed entry.
    pub fn nearest_visible(&self, base: usize) -> Option<usize> {
        if self.to_display(base).is_some() {
            return Some(base);
        }
        let order: Vec<usize> = if self.filter.active {
            self.filter.filtered_indices.clone()
        } else {
            (0..self.files.len()).collect()
        };
        let shown = |i: &usize| !(self.hide_hidden && self.files[*i].is_hidden);
        if let Some(pos) = order.iter().position(|&i| i == base) {
            if let Some(&found) = order[..pos].iter().rev().find(|&&i| shown(&i)) {
                return Some(found);
            }
            if let Some(&found) = order[pos + 1..].iter().find(|&&i| shown(&i)) {
                return Some(found);
            }
        }
        self.first_visible()
    }

    /// Point the selection at a displayed entry if it currently is not.
    /// An open filter keeps an empty selection until the query ranks entries.
    pub fn ensure_selection_visible(&mut self) {
        self.selected_index = match self.selected_index {
            Some(base) => self.nearest_visible(base),
            None if self.filter.active => None,
            None => self.first_visible(),
        };
    }
}

#[cfg(test)]
mod tests {
    use crate::app::test_support::*;

    #[test]
    fn identity_without_overlays() {
        let dir = setup_dir(&["a", "b", "c"]);
        let state = loaded_state(dir.path());
        let base: Vec<_> = (0..3).map(|i| state.from_display(i)).collect();
        assert_eq!(base, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(state.to_display(2), Some(2));
        assert_eq!(state.from_display(3), None);
    }

    #[test]
    fn hidden_projection_drops_dot_files() {
        let dir = setup_dir(&[".a", "b", ".c", "d"]);
        let mut state = loaded_state(dir.path());
        state.hide_hidden = true;
        state.invalidate_overlay();
        assert_eq!(names(&state), vec!["b", "d"]);
        let hidden = state.index_of(&dir.path().join(".c")).unwrap();
        assert_eq!(state.to_display(hidden), None);
        let d = state.index_of(&dir.path().join("d")).unwrap();
        assert_eq!(state.to_display(d), Some(1));
        assert_eq!(state.from_display(1), Some(d));
    }

    #[test]
    fn filter_projection_applies_before_hidden() {
        let dir = setup_dir(&["alpha", ".alpine", "beta", "alps"]);
        let mut state = loaded_state(dir.path());
        state.filter.active = true;
        state.filter.filtered_indices = vec![
            state.index_of(&dir.path().join("alps")).unwrap(),
            state.index_of(&dir.path().join(".alpine")).unwrap(),
            state.index_of(&dir.path().join("alpha")).unwrap(),
        ];
        state.hide_hidden = true;
        state.invalidate_overlay();
        assert_eq!(names(&state), vec!["alps", "alpha"]);
    }

    #[test]
    fn scroll_moves_minimally_and_stays_bounded() {
        let names: Vec<String> = (0..50).map(|i| format!("f{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = setup_dir(&refs);
        let mut state = loaded_state(dir.path());
        state.screen_height = 14;
        assert_eq!(state.visible_lines(), 10);

        state.set_display_selected_index(15);
        state.update_scroll_visibility();
        assert_eq!(state.scroll_offset, 6);

        state.set_display_selected_index(3);
        state.update_scroll_visibility();
        assert_eq!(state.scroll_offset, 3);

        state.set_display_selected_index(49);
        state.center_scroll_on_selection();
        assert_eq!(state.scroll_offset, state.max_scroll_offset());
        assert_eq!(state.max_scroll_offset(), 40);

        state.set_display_selected_index(20);
        state.center_scroll_on_selection();
        assert_eq!(state.scroll_offset, 15);
    }

    #[test]
    fn empty_display_keeps_scroll_at_zero() {
        let dir = setup_dir(&[]);
        let mut state = loaded_state(dir.path());
        state.scroll_offset = 7;
        state.update_scroll_visibility();
        assert_eq!(state.scroll_offset, 0);
        assert_eq!(state.display_selected_index(), None);
    }

    #[test]
    fn nearest_visible_prefers_backward() {
        let dir = setup_dir(&["-a", ".m", "z"]);
        let mut state = loaded_state(dir.path());
        let hidden = state.index_of(&dir.path().join(".m")).unwrap();
        assert_eq!(hidden, 1);
        state.hide_hidden = true;
        state.invalidate_overlay();
        let found = state.nearest_visible(hidden).unwrap();
        assert_eq!(state.files[found].name, "-a");
    }

    #[test]
    fn nearest_visible_goes_forward_at_the_start() {
        let dir = setup_dir(&[".a", "b", "c"]);
        let mut state = loaded_state(dir.path());
        state.hide_hidden = true;
        state.invalidate_overlay();
        let found = state.nearest_visible(0).unwrap();
        assert_eq!(state.files[found].name, "b");
    }
}

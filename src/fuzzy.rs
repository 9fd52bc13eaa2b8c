//! Fuzzy scoring shared by the inline filter, the background searcher and
//! the global-search local narrowing.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Case-respecting fuzzy scorer. Callers fold both sides beforehand when
/// they want insensitive matching.
pub struct Matcher {
    inner: SkimMatcherV2,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            inner: SkimMatcherV2::default().respect_case(),
        }
    }

    /// Score `pattern` against `target`. `None` means no match.
    pub fn score(&self, pattern: &str, target: &str) -> Option<f64> {
        self.inner
            .fuzzy_match(target, pattern)
            .map(|score| score as f64)
    }

    /// Char indices of `target` matched by `pattern`, for highlighting.
    pub fn indices(&self, pattern: &str, target: &str) -> Vec<usize> {
        self.inner
            .fuzzy_indices(target, pattern)
            .map(|(_, indices)| indices)
            .unwrap_or_default()
    }

    /// AND-combine `tokens` against `target`: every token must match and the
    /// result is the mean of the per-token scores.
    pub fn score_tokens<S: AsRef<str>>(&self, tokens: &[S], target: &str) -> Option<f64> {
        if tokens.is_empty() {
            return Some(0.0);
        }
        let mut total = 0.0;
        for token in tokens {
            total += self.score(token.as_ref(), target)?;
        }
        Some(total / tokens.len() as f64)
    }
}

/// Split a query into non-empty whitespace-delimited tokens.
pub fn tokenize(query: &str) -> Vec<&str> {
    query.split_whitespace().collect()
}

/// Tokens prepared for matching: lower-cased unless matching is case sensitive.
pub fn prepare_tokens(query: &str, case_sensitive: bool) -> Vec<String> {
    tokenize(query)
        .into_iter()
        .map(|t| {
            if case_sensitive {
                t.to_string()
            } else {
                t.to_lowercase()
            }
        })
        .collect()
}

/// Whether typing `c` should switch a smart-case query to case sensitive.
pub fn triggers_case_sensitivity(c: char) -> bool {
    c.is_uppercase()
}

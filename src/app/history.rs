use std::path::{Path, PathBuf};

/// Visited-directory stack with a cursor.
///
/// The entry under the cursor is the directory currently shown. Adding the
/// path directly behind or ahead of the cursor only moves the cursor, so
/// "enter then go up" behaves as an undo instead of growing a new branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<PathBuf>,
    index: usize,
}

impl History {
    pub fn new(start: &Path) -> Self {
        Self {
            entries: vec![start.to_path_buf()],
            index: 0,
        }
    }

    /// Record a navigation to `path`.
    pub fn add(&mut self, path: &Path) {
        if self.entries.is_empty() {
            self.entries.push(path.to_path_buf());
            self.index = 0;
            return;
        }
        if self.index > 0 && self.entries[self.index - 1] == path {
            self.index -= 1;
            return;
        }
        if self.index + 1 < self.entries.len() && self.entries[self.index + 1] == path {
            self.index += 1;
            return;
        }
        self.entries.truncate(self.index + 1);
        if self.entries.last().map(PathBuf::as_path) != Some(path) {
            self.entries.push(path.to_path_buf());
        }
        self.index = self.entries.len() - 1;
    }

    /// Step the cursor back, returning the path now under it.
    pub fn back(&mut self) -> Option<&Path> {
        if self.index == 0 || self.entries.is_empty() {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index])
    }

    /// Step the cursor forward, returning the path now under it.
    pub fn forward(&mut self) -> Option<&Path> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index])
    }

    pub fn current(&self) -> Option<&Path> {
        self.entries.get(self.index).map(PathBuf::as_path)
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

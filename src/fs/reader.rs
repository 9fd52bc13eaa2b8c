use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::Result;

/// Type of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A single directory entry as seen by the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// True for directories and for symlinks whose target is a directory.
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// Unix permission bits (0 where unavailable).
    pub mode: u32,
    pub is_hidden: bool,
}

impl FileEntry {
    /// Create an entry from a filesystem path without following the final
    /// symlink, then resolve a symlink one level to learn whether it targets
    /// a directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let (kind, is_dir, size, modified) = if metadata.is_symlink() {
            // Broken links stay listed as plain symlinks.
            match fs::metadata(path) {
                Ok(target) => (
                    EntryKind::Symlink,
                    target.is_dir(),
                    target.len(),
                    target.modified().ok(),
                ),
                Err(_) => (EntryKind::Symlink, false, 0, metadata.modified().ok()),
            }
        } else if metadata.is_dir() {
            (EntryKind::Directory, true, metadata.len(), metadata.modified().ok())
        } else {
            (EntryKind::File, false, metadata.len(), metadata.modified().ok())
        };

        Ok(Self {
            is_hidden: is_hidden(path),
            name,
            path: path.to_path_buf(),
            kind,
            is_dir,
            size,
            modified,
            mode: permission_bits(&metadata),
        })
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Hidden-entry classification for a full path: dot-files are hidden.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Directories first, then case-insensitive name, ties broken by raw name.
pub fn compare_entries(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Read and sort a directory's entries.
///
/// Entries whose metadata cannot be read are skipped; an unreadable
/// directory is an error.
pub fn read_directory(path: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        match FileEntry::from_path(&entry.path()) {
            Ok(file) => entries.push(file),
            Err(e) => debug!(path = %entry.path().display(), error = %e, "skipping entry"),
        }
    }
    entries.sort_by(compare_entries);
    Ok(entries)
}

/// Snapshot of a directory and its parent, produced by one load.
#[derive(Debug, Clone, Default)]
pub struct DirListing {
    pub entries: Vec<FileEntry>,
    pub parent_entries: Vec<FileEntry>,
}

/// Read `path` and its parent. A failure to read the parent only empties
/// the sidecar.
pub fn read_listing(path: &Path) -> Result<DirListing> {
    let entries = read_directory(path)?;
    let parent_entries = path
        .parent()
        .and_then(|parent| read_directory(parent).ok())
        .unwrap_or_default();
    Ok(DirListing {
        entries,
        parent_entries,
    })
}

//! Working copy status scan.
//!
//! Produces immutable [`FileStatus`] snapshots split into the staged (index)
//! side and the unstaged (working tree) side.

use std::collections::HashSet;
use std::fmt;

use git2::{Status, StatusOptions};
use serde::Serialize;

use crate::Repository;
use crate::error::Result;

/// Kind of change a path carries relative to the index or HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// New file added to the index.
    Add,
    /// Content changed.
    Modify,
    /// File removed from the index.
    Delete,
    /// File renamed.
    Rename,
    /// Unresolved merge conflict.
    Conflict,
    /// Submodule pointer changed. Has no file content of its own.
    Submodule,
    /// New file not yet known to the index.
    Untracked,
    /// Tracked file missing from the working tree.
    Missing,
}

impl ChangeType {
    /// Whether staging this change means removing the index entry.
    #[must_use]
    pub const fn is_removal(self) -> bool {
        matches!(self, Self::Delete | Self::Missing)
    }

    /// Single-letter marker, as `git status --short` prints it.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Add => 'A',
            Self::Modify => 'M',
            Self::Delete | Self::Missing => 'D',
            Self::Rename => 'R',
            Self::Conflict => 'U',
            Self::Submodule => 'S',
            Self::Untracked => '?',
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "added",
            Self::Modify => "modified",
            Self::Delete => "deleted",
            Self::Rename => "renamed",
            Self::Conflict => "conflict",
            Self::Submodule => "submodule",
            Self::Untracked => "untracked",
            Self::Missing => "missing",
        };
        f.write_str(name)
    }
}

/// State of one path, relative to the working copy root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileStatus {
    pub path: String,
    pub change_type: ChangeType,
}

impl FileStatus {
    /// Create a new file status.
    #[must_use]
    pub fn new(path: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            path: path.into(),
            change_type,
        }
    }

    /// Whether this entry is a submodule.
    #[must_use]
    pub fn is_submodule(&self) -> bool {
        self.change_type == ChangeType::Submodule
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.change_type)
    }
}

/// Result of a status scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkingCopyStatus {
    /// Changes recorded in the index.
    pub staged: Vec<FileStatus>,
    /// Changes only present in the working tree, plus conflicts and submodules.
    pub unstaged: Vec<FileStatus>,
}

impl WorkingCopyStatus {
    /// Check if there is nothing to report.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }

    /// Find a path on either side, preferring the unstaged entry.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&FileStatus> {
        self.unstaged
            .iter()
            .chain(&self.staged)
            .find(|status| status.path == path)
    }

    /// Paths currently in conflict.
    pub fn conflicts(&self) -> impl Iterator<Item = &FileStatus> {
        self.unstaged
            .iter()
            .filter(|status| status.change_type == ChangeType::Conflict)
    }
}

impl Repository {
    /// Scan the working copy.
    ///
    /// # Errors
    /// Returns error if the status or submodule listing fails.
    pub fn status(&self) -> Result<WorkingCopyStatus> {
        let submodules: HashSet<String> = self
            .inner()
            .submodules()?
            .iter()
            .filter_map(|sm| sm.path().to_str().map(String::from))
            .collect();

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .renames_head_to_index(true);

        let statuses = self.inner().statuses(Some(&mut opts))?;
        let mut report = WorkingCopyStatus::default();

        for entry in statuses.iter() {
            let Some(path) = entry
                .head_to_index()
                .and_then(|d| d.new_file().path())
                .or_else(|| entry.path().map(std::path::Path::new))
                .and_then(|p| p.to_str())
                .map(String::from)
            else {
                log::warn!("skipping status entry with a non UTF-8 path");
                continue;
            };
            let status = entry.status();

            if submodules.contains(path.trim_end_matches('/')) {
                report.unstaged.push(FileStatus::new(
                    path.trim_end_matches('/'),
                    ChangeType::Submodule,
                ));
                continue;
            }

            if status.is_conflicted() {
                report
                    .unstaged
                    .push(FileStatus::new(path, ChangeType::Conflict));
                continue;
            }

            if let Some(change) = index_change(status) {
                report.staged.push(FileStatus::new(path.clone(), change));
            }
            if let Some(change) = worktree_change(status) {
                report.unstaged.push(FileStatus::new(path, change));
            }
        }

        Ok(report)
    }
}

fn index_change(status: Status) -> Option<ChangeType> {
    if status.is_index_new() {
        Some(ChangeType::Add)
    } else if status.is_index_deleted() {
        Some(ChangeType::Delete)
    } else if status.is_index_renamed() {
        Some(ChangeType::Rename)
    } else if status.is_index_modified() || status.is_index_typechange() {
        Some(ChangeType::Modify)
    } else {
        None
    }
}

fn worktree_change(status: Status) -> Option<ChangeType> {
    if status.is_wt_new() {
        Some(ChangeType::Untracked)
    } else if status.is_wt_deleted() {
        Some(ChangeType::Missing)
    } else if status.is_wt_renamed() {
        Some(ChangeType::Rename)
    } else if status.is_wt_modified() || status.is_wt_typechange() {
        Some(ChangeType::Modify)
    } else {
        None
    }
}

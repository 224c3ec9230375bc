//! Trait abstractions for git operations.
//!
//! This module defines the `GitOps` trait which abstracts the repository
//! gateway, enabling dependency injection and testability.

use std::path::Path;

use git2::RepositoryState;

use crate::{
    BatchOutcome, CommitCharacteristics, CommitsAheadAndBehind, FileStatus, Repository, Result,
    WorkingCopyStatus,
};

/// Trait for repository gateway operations.
///
/// This trait abstracts git operations, allowing for:
/// - Dependency injection in the dispatcher and resolver
/// - Mock implementations for testing
///
/// Note: operations are synchronous; callers serialize them on a single
/// worker thread.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the working directory path.
    fn workdir(&self) -> Option<&Path>;

    /// Get the current repository state.
    fn state(&self) -> RepositoryState;

    /// Get the current branch name.
    fn current_branch(&self) -> Result<String>;

    /// Full ref name of the current branch, `None` when detached.
    fn full_branch(&self) -> Result<Option<String>>;

    /// Hex id of the commit HEAD points at.
    fn head_commit_id(&self) -> Result<Option<String>>;

    /// Scan the working copy.
    fn status(&self) -> Result<WorkingCopyStatus>;

    // === Index and Working Tree ===

    /// Stage each file.
    fn add_all(&self, files: &[FileStatus]) -> Result<BatchOutcome>;

    /// Unstage each file.
    fn reset_all(&self, files: &[FileStatus]) -> Result<BatchOutcome>;

    /// Overwrite each path with its HEAD version.
    fn restore_last_commit_file(&self, paths: &[String]) -> Result<BatchOutcome>;

    /// Overwrite a path with the remote side's version.
    fn replace_with_remote_content(&self, path: &str) -> Result<()>;

    // === Remote Operations ===

    /// Fetch the current branch's remote.
    fn fetch(&self) -> Result<()>;

    // === History ===

    /// Commits touching `path` (or all commits), newest first.
    fn commit_characteristics(&self, path: Option<&str>) -> Result<Vec<CommitCharacteristics>>;

    /// Commits ahead of and behind the upstream of `branch_ref`.
    fn commits_ahead_and_behind(&self, branch_ref: &str) -> Result<Option<CommitsAheadAndBehind>>;

    /// Files changed by one commit.
    fn changed_files(&self, commit_id: &str) -> Result<Vec<FileStatus>>;
}

impl GitOps for Repository {
    fn workdir(&self) -> Option<&Path> {
        Self::workdir(self)
    }

    fn state(&self) -> RepositoryState {
        Self::state(self)
    }

    fn current_branch(&self) -> Result<String> {
        Self::current_branch(self)
    }

    fn full_branch(&self) -> Result<Option<String>> {
        Self::full_branch(self)
    }

    fn head_commit_id(&self) -> Result<Option<String>> {
        Self::head_commit_id(self)
    }

    fn status(&self) -> Result<WorkingCopyStatus> {
        Self::status(self)
    }

    fn add_all(&self, files: &[FileStatus]) -> Result<BatchOutcome> {
        Self::add_all(self, files)
    }

    fn reset_all(&self, files: &[FileStatus]) -> Result<BatchOutcome> {
        Self::reset_all(self, files)
    }

    fn restore_last_commit_file(&self, paths: &[String]) -> Result<BatchOutcome> {
        Self::restore_last_commit_file(self, paths)
    }

    fn replace_with_remote_content(&self, path: &str) -> Result<()> {
        Self::replace_with_remote_content(self, path)
    }

    fn fetch(&self) -> Result<()> {
        Self::fetch(self)
    }

    fn commit_characteristics(&self, path: Option<&str>) -> Result<Vec<CommitCharacteristics>> {
        Self::commit_characteristics(self, path)
    }

    fn commits_ahead_and_behind(&self, branch_ref: &str) -> Result<Option<CommitsAheadAndBehind>> {
        Self::commits_ahead_and_behind(self, branch_ref)
    }

    fn changed_files(&self, commit_id: &str) -> Result<Vec<FileStatus>> {
        Self::changed_files(self, commit_id)
    }
}

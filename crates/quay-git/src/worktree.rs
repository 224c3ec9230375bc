//! Index and working tree mutations.
//!
//! Batch operations work path by path: one failing path is recorded in the
//! returned [`BatchOutcome`] and the remaining paths are still processed.

use std::fs;
use std::path::Path;

use git2::Oid;
use git2::build::CheckoutBuilder;
use serde::Serialize;

use crate::Repository;
use crate::error::{Error, Result};
use crate::status::FileStatus;

/// A path that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathFailure {
    pub path: String,
    pub message: String,
}

/// Per-path result of a batch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[must_use]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<PathFailure>,
}

impl BatchOutcome {
    /// Record the result of processing one path.
    pub fn record(&mut self, path: &str, result: Result<()>) {
        match result {
            Ok(()) => self.succeeded.push(path.to_string()),
            Err(e) => {
                log::warn!("failed to process '{path}': {e}");
                self.failed.push(PathFailure {
                    path: path.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    /// Check if every path succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Repository {
    fn workdir_or_err(&self) -> Result<&Path> {
        self.workdir().ok_or(Error::NotARepository)
    }

    fn head_tree(&self) -> Result<Option<git2::Tree<'_>>> {
        match self.head_commit()? {
            Some(oid) => Ok(Some(self.find_commit(oid)?.tree()?)),
            None => Ok(None),
        }
    }

    /// Stage each file.
    ///
    /// Paths gone from the working tree drop their index entry; everything
    /// else is added. The working tree decides, not the recorded change type:
    /// a discard may have brought a `Missing` file back.
    ///
    /// # Errors
    /// Returns error only if the index cannot be opened or written.
    pub fn add_all(&self, files: &[FileStatus]) -> Result<BatchOutcome> {
        let workdir = self.workdir_or_err()?.to_path_buf();
        let mut index = self.inner().index()?;
        let mut outcome = BatchOutcome::default();

        for file in files {
            let path = Path::new(&file.path);
            let on_disk = workdir.join(path).symlink_metadata().is_ok();
            if file.change_type.is_removal() && on_disk {
                log::debug!("'{}' is back in the working tree, adding it", file.path);
            }
            let result = if on_disk {
                index.add_path(path)
            } else {
                index.remove_path(path)
            };
            outcome.record(&file.path, result.map_err(Error::from));
        }

        index.write()?;
        Ok(outcome)
    }

    /// Unstage each file, putting its index entry back to the HEAD version.
    ///
    /// Paths unknown to HEAD (or every path, on an unborn branch) are
    /// removed from the index instead.
    ///
    /// # Errors
    /// Returns error only if HEAD or the index cannot be read.
    pub fn reset_all(&self, files: &[FileStatus]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let head_tree = self.head_tree()?;

        let Some(tree) = head_tree else {
            let mut index = self.inner().index()?;
            for file in files {
                let result = index.remove_path(Path::new(&file.path));
                outcome.record(&file.path, result.map_err(Error::from));
            }
            index.write()?;
            return Ok(outcome);
        };

        let head = self.inner().head()?.peel(git2::ObjectType::Commit)?;
        for file in files {
            let path = Path::new(&file.path);
            let result = if tree.get_path(path).is_ok() {
                self.inner().reset_default(Some(&head), [path])
            } else {
                self.inner().index().and_then(|mut index| {
                    index.remove_path(path)?;
                    index.write()
                })
            };
            outcome.record(&file.path, result.map_err(Error::from));
        }

        Ok(outcome)
    }

    /// Overwrite each path in the working tree with its HEAD version.
    ///
    /// A path HEAD doesn't know is deleted from the working tree. Callers
    /// must not pass submodule paths.
    ///
    /// # Errors
    /// Returns error only if HEAD cannot be resolved.
    pub fn restore_last_commit_file(&self, paths: &[String]) -> Result<BatchOutcome> {
        let workdir = self.workdir_or_err()?.to_path_buf();
        let head_tree = self.head_tree()?;
        let mut outcome = BatchOutcome::default();

        for path in paths {
            let in_head = head_tree
                .as_ref()
                .is_some_and(|tree| tree.get_path(Path::new(path)).is_ok());

            let result = if in_head {
                let mut checkout = CheckoutBuilder::new();
                checkout.force().path(path.as_str());
                self.inner()
                    .checkout_head(Some(&mut checkout))
                    .map_err(Error::from)
            } else {
                remove_from_worktree(&workdir.join(path))
            };
            outcome.record(path, result);
        }

        Ok(outcome)
    }

    /// Overwrite a path in the working tree with the remote side's version.
    ///
    /// During a conflict the "theirs" stage of the index is used; otherwise
    /// the version from the current branch's upstream tracking ref. A path
    /// the remote side doesn't have is deleted.
    ///
    /// # Errors
    /// Returns `NoUpstream`/`DetachedHead` if there is no remote side to read
    /// from, or any IO/git error while writing.
    pub fn replace_with_remote_content(&self, path: &str) -> Result<()> {
        let target = self.workdir_or_err()?.join(path);

        if let Some(blob) = self.conflict_theirs(path)? {
            return write_blob(self, blob, &target);
        }

        let (upstream, tip) = self.current_upstream()?;
        let tree = self.find_commit(tip)?.tree()?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => {
                log::debug!("replacing '{path}' with content from {upstream}");
                write_blob(self, entry.id(), &target)
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => remove_from_worktree(&target),
            Err(e) => Err(e.into()),
        }
    }

    /// Blob id of the "theirs" stage for a conflicted path.
    fn conflict_theirs(&self, path: &str) -> Result<Option<Oid>> {
        let index = self.inner().index()?;
        if !index.has_conflicts() {
            return Ok(None);
        }

        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let Some(theirs) = conflict.their else {
                continue;
            };
            if theirs.path == path.as_bytes() {
                return Ok(Some(theirs.id));
            }
        }
        Ok(None)
    }
}

fn write_blob(repo: &Repository, blob: Oid, target: &Path) -> Result<()> {
    let blob = repo.inner().find_blob(blob)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, blob.content())?;
    Ok(())
}

fn remove_from_worktree(target: &Path) -> Result<()> {
    match fs::remove_file(target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

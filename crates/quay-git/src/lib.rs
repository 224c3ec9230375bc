//! # quay-git
//!
//! Repository gateway for Quay, built on git2-rs.
//! Provides staging, unstaging, restore and remote-content operations,
//! fetch, working copy status, and commit graph analysis (ahead/behind
//! counts and rename-following file history).

mod error;
mod history;
mod remote;
mod repository;
mod status;
mod traits;
mod worktree;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use git2::{Oid, RepositoryState};
pub use history::{CommitCharacteristics, CommitsAheadAndBehind};
pub use repository::{DEFAULT_REMOTE, Repository};
pub use status::{ChangeType, FileStatus, WorkingCopyStatus};
pub use traits::GitOps;
pub use worktree::{BatchOutcome, PathFailure};

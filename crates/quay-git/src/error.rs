//! Error types for quay-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Reference not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// The branch has no upstream tracking ref configured.
    #[error("branch '{0}' has no upstream configured")]
    NoUpstream(String),

    /// Path does not exist in the requested tree.
    #[error("path not found in {revision}: {path}")]
    PathNotFound { path: String, revision: String },

    /// Commit could not be resolved.
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// The remote asked for credentials we could not provide.
    #[error("authentication required for remote '{0}'")]
    AuthRequired(String),

    /// The remote refused access to a private repository.
    #[error("no access to private repository on remote '{0}'")]
    NoPrivateAccess(String),

    /// The remote could not be reached.
    #[error("remote '{remote}' unavailable: {message}")]
    RemoteUnavailable { remote: String, message: String },

    /// IO error while touching the working tree.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

impl Error {
    /// Whether this is one of the fetch failures callers treat as best-effort.
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired(_) | Self::NoPrivateAccess(_) | Self::RemoteUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failures_are_flagged() {
        assert!(Error::AuthRequired("origin".into()).is_fetch_failure());
        assert!(Error::NoPrivateAccess("origin".into()).is_fetch_failure());
        assert!(
            Error::RemoteUnavailable {
                remote: "origin".into(),
                message: "timed out".into(),
            }
            .is_fetch_failure()
        );
        assert!(!Error::DetachedHead.is_fetch_failure());
    }
}

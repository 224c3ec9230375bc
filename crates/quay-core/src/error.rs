//! Error types for quay-core.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quay-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No working copy is bound to the repository handle.
    #[error("no repository selected - open a working copy first")]
    NoRepositorySelected,

    /// The working copy was switched while the operation ran; its result was dropped.
    #[error("repository changed while '{0}' was running - result discarded")]
    Stale(String),

    /// The task was dropped from the queue before it ran.
    #[error("operation cancelled before it started")]
    Cancelled,

    /// The operation queue has shut down.
    #[error("operation queue is closed")]
    QueueClosed,

    /// Waiting for a result timed out.
    #[error("timed out waiting for '{0}'")]
    Timeout(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] quay_git::Error),
}

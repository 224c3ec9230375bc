//! Mutating operations the dispatcher accepts.

use std::fmt;
use std::str::FromStr;

use quay_git::{BatchOutcome, FileStatus, GitOps};

use crate::host::Tag;
use crate::resolver;

/// A mutating operation on a batch of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Stage,
    Unstage,
    Discard,
    ResolveUsingMine,
    ResolveUsingTheirs,
}

impl Action {
    pub const ALL: [Self; 5] = [
        Self::Stage,
        Self::Unstage,
        Self::Discard,
        Self::ResolveUsingMine,
        Self::ResolveUsingTheirs,
    ];

    /// Translatable name of the action.
    #[must_use]
    pub const fn tag(self) -> Tag {
        match self {
            Self::Stage => Tag::Stage,
            Self::Unstage => Tag::Unstage,
            Self::Discard => Tag::Discard,
            Self::ResolveUsingMine => Tag::ResolveUsingMine,
            Self::ResolveUsingTheirs => Tag::ResolveUsingTheirs,
        }
    }

    /// Short machine-friendly name, used as the queue label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stage => "stage",
            Self::Unstage => "unstage",
            Self::Discard => "discard",
            Self::ResolveUsingMine => "resolve-using-mine",
            Self::ResolveUsingTheirs => "resolve-using-theirs",
        }
    }

    /// Whether this resolves a conflict by picking one side.
    #[must_use]
    pub const fn is_resolution(self) -> bool {
        matches!(self, Self::ResolveUsingMine | Self::ResolveUsingTheirs)
    }

    /// Run the action against a repository.
    ///
    /// # Errors
    /// Returns error if the batch as a whole cannot run; per-path failures
    /// are reported in the outcome.
    pub fn apply<G: GitOps + ?Sized>(
        self,
        repo: &G,
        files: &[FileStatus],
    ) -> quay_git::Result<BatchOutcome> {
        match self {
            Self::Stage => repo.add_all(files),
            Self::Unstage => repo.reset_all(files),
            Self::Discard => resolver::discard(repo, files),
            Self::ResolveUsingMine => resolver::resolve_using_mine(repo, files),
            Self::ResolveUsingTheirs => resolver::resolve_using_theirs(repo, files),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.label() == s)
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

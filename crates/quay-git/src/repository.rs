//! Repository wrapper providing high-level git operations.

use std::path::Path;

use git2::{BranchType, ErrorCode, Oid, RepositoryState};

use crate::error::{Error, Result};

/// Remote used for fetching when the current branch has none configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
    default_remote: String,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::NotARepository
            } else {
                Error::Git2(e)
            }
        })?;
        Ok(Self::from_git2(inner))
    }

    /// Wrap an already opened git2 repository.
    #[must_use]
    pub fn from_git2(inner: git2::Repository) -> Self {
        Self {
            inner,
            default_remote: DEFAULT_REMOTE.into(),
        }
    }

    /// Use `remote` when the current branch has no remote of its own.
    #[must_use]
    pub fn with_default_remote(mut self, remote: impl Into<String>) -> Self {
        self.default_remote = remote.into();
        self
    }

    /// The fallback remote name.
    #[must_use]
    pub fn default_remote(&self) -> &str {
        &self.default_remote
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    /// Get the current repository state.
    #[must_use]
    pub fn state(&self) -> RepositoryState {
        self.inner.state()
    }

    // === Branch operations ===

    /// Get the short name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        match self.inner.head() {
            Ok(head) => {
                if !head.is_branch() {
                    return Err(Error::DetachedHead);
                }
                head.shorthand().map(String::from).ok_or(Error::DetachedHead)
            }
            // Unborn branch: HEAD points at a ref that has no commit yet.
            Err(e) if e.code() == ErrorCode::UnbornBranch => self
                .unborn_branch_name()
                .and_then(|name| name.strip_prefix("refs/heads/").map(String::from))
                .ok_or(Error::DetachedHead),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the full ref name of the current branch (`refs/heads/...`).
    ///
    /// Returns `None` when HEAD is detached.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be read.
    pub fn full_branch(&self) -> Result<Option<String>> {
        match self.inner.head() {
            Ok(head) if head.is_branch() => Ok(head.name().map(String::from)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(self.unborn_branch_name()),
            Err(e) => Err(e.into()),
        }
    }

    fn unborn_branch_name(&self) -> Option<String> {
        self.inner
            .find_reference("HEAD")
            .ok()
            .and_then(|head| head.symbolic_target().map(String::from))
    }

    /// The commit HEAD points at, or `None` for an unborn branch.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be resolved.
    pub fn head_commit(&self) -> Result<Option<Oid>> {
        match self.inner.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the commit SHA for a branch.
    ///
    /// # Errors
    /// Returns error if branch doesn't exist.
    pub fn branch_commit(&self, branch_name: &str) -> Result<Oid> {
        let branch = self
            .inner
            .find_branch(branch_name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(branch_name.into()))?;

        branch
            .get()
            .target()
            .ok_or_else(|| Error::BranchNotFound(branch_name.into()))
    }

    /// Resolve the upstream tracking ref of a local branch.
    ///
    /// Accepts either a short name (`main`) or a full ref (`refs/heads/main`).
    /// Returns the upstream ref name and its tip, or `None` when no upstream
    /// is configured or the tracking ref does not exist locally.
    ///
    /// # Errors
    /// Returns error if the local branch doesn't exist.
    pub fn upstream_of(&self, branch: &str) -> Result<Option<(String, Oid)>> {
        let short = branch.strip_prefix("refs/heads/").unwrap_or(branch);
        let local = self
            .inner
            .find_branch(short, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(short.into()))?;

        let Ok(upstream) = local.upstream() else {
            return Ok(None);
        };

        let reference = upstream.get();
        match (reference.name(), reference.target()) {
            (Some(name), Some(oid)) => Ok(Some((name.to_string(), oid))),
            _ => Ok(None),
        }
    }

    /// Upstream tip of the current branch.
    ///
    /// # Errors
    /// Returns `DetachedHead` or `NoUpstream` when there is nothing to track.
    pub fn current_upstream(&self) -> Result<(String, Oid)> {
        let branch = self.current_branch()?;
        self.upstream_of(&branch)?
            .ok_or(Error::NoUpstream(branch))
    }

    // === Commit operations ===

    /// Get a commit by its SHA.
    ///
    /// # Errors
    /// Returns error if commit not found.
    pub fn find_commit(&self, oid: Oid) -> Result<git2::Commit<'_>> {
        Ok(self.inner.find_commit(oid)?)
    }

    /// Resolve a (possibly abbreviated) commit id or revision.
    ///
    /// # Errors
    /// Returns `CommitNotFound` if the revision doesn't name a commit.
    pub fn resolve_commit(&self, spec: &str) -> Result<git2::Commit<'_>> {
        self.inner
            .revparse_single(spec)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| Error::CommitNotFound(spec.into()))
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .field("default_remote", &self.default_remote)
            .finish()
    }
}

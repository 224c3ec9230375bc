//! Injected handle to the working copy currently in use.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};

struct Slot<G> {
    generation: u64,
    repo: Option<Arc<Mutex<G>>>,
}

/// Handle bound to at most one working copy at a time.
///
/// Every `bind`/`unbind` bumps the generation. Work captures the generation
/// it was scheduled under and is reported [`Error::Stale`] if the handle
/// moved on before it finished. Each binding owns its own lock, so
/// rebinding never waits for an operation still running on the old one.
pub struct RepositoryHandle<G> {
    slot: Arc<Mutex<Slot<G>>>,
}

impl<G> RepositoryHandle<G> {
    /// Create an unbound handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                repo: None,
            })),
        }
    }

    /// Bind a working copy, replacing any previous one.
    ///
    /// Returns the new generation.
    pub fn bind(&self, repo: G) -> u64 {
        self.replace(Some(Arc::new(Mutex::new(repo))))
    }

    /// Drop the current binding. Returns the new generation.
    pub fn unbind(&self) -> u64 {
        self.replace(None)
    }

    fn replace(&self, repo: Option<Arc<Mutex<G>>>) -> u64 {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.repo = repo;
        log::debug!(
            "repository handle {} (generation {})",
            if slot.repo.is_some() { "bound" } else { "unbound" },
            slot.generation
        );
        slot.generation
    }

    /// Whether a working copy is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .repo
            .is_some()
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Generation of the current binding.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound.
    pub fn bound_generation(&self) -> Result<u64> {
        self.current().map(|(generation, _)| generation)
    }

    fn current(&self) -> Result<(u64, Arc<Mutex<G>>)> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.repo
            .as_ref()
            .map(|repo| (slot.generation, Arc::clone(repo)))
            .ok_or(Error::NoRepositorySelected)
    }

    /// Run `f` against whatever is bound right now.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or the error of `f`.
    pub fn with<T, E>(&self, f: impl FnOnce(&G) -> std::result::Result<T, E>) -> Result<T>
    where
        E: Into<Error>,
    {
        let (_, repo) = self.current()?;
        let repo = repo.lock().unwrap_or_else(PoisonError::into_inner);
        f(&*repo).map_err(Into::into)
    }

    /// Run `f` on behalf of work scheduled under `generation`.
    ///
    /// # Errors
    /// Returns `Stale` if the handle was rebound before or while `f` ran,
    /// `NoRepositorySelected` if nothing is bound, or the error of `f`.
    pub fn run<T, E>(
        &self,
        label: &str,
        generation: u64,
        f: impl FnOnce(&G) -> std::result::Result<T, E>,
    ) -> Result<T>
    where
        E: Into<Error>,
    {
        let (current, repo) = self.current()?;
        if current != generation {
            return Err(Error::Stale(label.to_string()));
        }

        let result = {
            let repo = repo.lock().unwrap_or_else(PoisonError::into_inner);
            f(&*repo)
        };

        if self.generation() != generation {
            log::debug!("discarding result of '{label}': repository was rebound");
            return Err(Error::Stale(label.to_string()));
        }
        result.map_err(Into::into)
    }
}

impl<G> Default for RepositoryHandle<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> Clone for RepositoryHandle<G> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<G> std::fmt::Debug for RepositoryHandle<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RepositoryHandle")
            .field("generation", &slot.generation)
            .field("bound", &slot.repo.is_some())
            .finish()
    }
}

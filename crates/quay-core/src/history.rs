//! History view: what the commit list for a path or the whole repository
//! currently shows, and keeping it current while it is open.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use quay_git::{CommitCharacteristics, CommitsAheadAndBehind, GitOps};
use serde::Serialize;

use crate::config::HistoryConfig;
use crate::error::{Error, Result};
use crate::events::{EventBus, RepositoryEvent, RepositoryListener};
use crate::handle::RepositoryHandle;
use crate::host::{Notifier, Tag, Translator, format_message};
use crate::queue::{Pending, Scheduler};

/// Everything the history view presents for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySnapshot {
    /// Path the history was loaded for; `None` for the whole repository.
    pub path: Option<String>,
    /// Commits, newest first.
    pub commits: Vec<CommitCharacteristics>,
    /// Unpushed/unpulled marks, when the branch has an upstream.
    pub ahead_behind: Option<CommitsAheadAndBehind>,
    /// Local branch head, to be selected in the list.
    pub head_commit: Option<String>,
}

impl HistorySnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// The commit the view should select, if it is in the list.
    #[must_use]
    pub fn selected(&self) -> Option<&CommitCharacteristics> {
        let head = self.head_commit.as_deref()?;
        self.commits.iter().find(|c| c.commit_id == head)
    }
}

/// Result of asking the view to show a path.
#[derive(Debug)]
pub enum HistoryOutcome {
    /// The view already shows this path; nothing was reloaded.
    Unchanged,
    /// A reload was queued.
    Loading(Pending<HistorySnapshot>),
}

#[derive(Debug, Default)]
struct ViewState {
    open: bool,
    /// Path currently shown; outer `None` until something was loaded.
    active: Option<Option<String>>,
    rows: usize,
}

struct Inner<G> {
    handle: RepositoryHandle<G>,
    scheduler: Scheduler,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
    config: HistoryConfig,
    state: Mutex<ViewState>,
}

/// History view bound to a dispatcher's handle and queue.
///
/// Loads run on the operation queue. While the view is open it follows
/// repository and branch changes on its own and publishes
/// [`RepositoryEvent::HistoryRefreshed`].
pub struct HistoryView<G> {
    inner: Arc<Inner<G>>,
}

impl<G> Clone for HistoryView<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G> std::fmt::Debug for HistoryView<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryView")
            .field("state", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl<G> Inner<G> {
    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: GitOps + Send + 'static> HistoryView<G> {
    pub(crate) fn new(
        handle: RepositoryHandle<G>,
        scheduler: Scheduler,
        events: EventBus,
        notifier: Arc<dyn Notifier>,
        translator: Arc<dyn Translator>,
        config: HistoryConfig,
    ) -> Self {
        let inner = Arc::new(Inner {
            handle,
            scheduler,
            events: events.clone(),
            notifier,
            translator,
            config,
            state: Mutex::new(ViewState::default()),
        });
        events.add_listener(Arc::new(Follower {
            view: Arc::downgrade(&inner),
        }));
        Self { inner }
    }

    /// Show the history of `path` (`None` for the whole repository).
    ///
    /// Opens the view. Unless `force` is set, asking for the path already
    /// shown reloads nothing.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn show_history(&self, path: Option<&str>, force: bool) -> Result<HistoryOutcome> {
        let generation = self.inner.handle.bound_generation()?;
        let path = path.map(String::from);

        {
            let mut state = self.inner.lock();
            state.open = true;
            if !force && state.active.as_ref() == Some(&path) {
                if state.rows == 0 {
                    self.notify_nothing_to_show();
                }
                return Ok(HistoryOutcome::Unchanged);
            }
            state.active = Some(path.clone());
        }

        let (completer, pending) = Pending::channel("history");
        let inner = Arc::clone(&self.inner);
        self.inner.scheduler.schedule("history", move || {
            completer.complete(load(&inner, generation, path));
            Ok(())
        })?;
        Ok(HistoryOutcome::Loading(pending))
    }

    /// Show the history of the whole repository, always reloading.
    ///
    /// # Errors
    /// Same as [`Self::show_history`].
    pub fn show_repository_history(&self) -> Result<HistoryOutcome> {
        self.show_history(None, true)
    }

    /// Close the view; it stops following changes.
    pub fn close_history(&self) {
        let mut state = self.inner.lock();
        state.open = false;
        log::debug!("history view closed");
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    /// Path the view shows: `Some(None)` is the whole repository, `None`
    /// means nothing was loaded yet.
    #[must_use]
    pub fn active_path(&self) -> Option<Option<String>> {
        self.inner.lock().active.clone()
    }

    /// Forget what is shown, e.g. after switching working copies.
    pub(crate) fn reset(&self) {
        let mut state = self.inner.lock();
        state.active = None;
        state.rows = 0;
    }

    fn notify_nothing_to_show(&self) {
        self.inner
            .notifier
            .notify_info(&self.inner.translator.translate(Tag::NothingToShowForNewFiles));
    }
}

/// Load a snapshot on the worker and tell the user about the outcome.
fn load<G: GitOps>(
    inner: &Inner<G>,
    generation: u64,
    path: Option<String>,
) -> Result<HistorySnapshot> {
    let fetch_first = inner.config.fetch_before_load;
    let limit = inner.config.limit;

    let result = inner.handle.run("history", generation, |repo| {
        if fetch_first {
            try_fetch(repo);
        }

        let mut commits = repo.commit_characteristics(path.as_deref())?;
        if let Some(limit) = limit {
            commits.truncate(limit);
        }
        let ahead_behind = match repo.full_branch()? {
            Some(branch) => repo.commits_ahead_and_behind(&branch)?,
            None => None,
        };
        let head_commit = if commits.is_empty() {
            None
        } else {
            repo.head_commit_id()?
        };

        Ok::<_, quay_git::Error>(HistorySnapshot {
            path,
            commits,
            ahead_behind,
            head_commit,
        })
    });

    match &result {
        Ok(snapshot) => {
            inner.lock().rows = snapshot.commits.len();
            log::debug!(
                "loaded {} commit(s) for {}",
                snapshot.commits.len(),
                snapshot.path.as_deref().unwrap_or("the repository")
            );
            if snapshot.is_empty() {
                inner
                    .notifier
                    .notify_info(&inner.translator.translate(Tag::NothingToShowForNewFiles));
            }
        }
        Err(Error::Stale(_) | Error::Cancelled) => {}
        Err(e) => {
            let template = inner.translator.translate(Tag::UnableToPresentHistory);
            let reason = e.to_string();
            inner
                .notifier
                .notify_error(&format_message(&template, &[reason.as_str()]));
        }
    }
    result
}

/// Fetch so upstream commits show up, ignoring any failure.
pub(crate) fn try_fetch<G: GitOps + ?Sized>(repo: &G) -> bool {
    match repo.fetch() {
        Ok(()) => true,
        Err(e) => {
            log::debug!("fetch skipped: {e}");
            false
        }
    }
}

/// Keeps an open view in step with repository events.
struct Follower<G> {
    view: Weak<Inner<G>>,
}

impl<G: GitOps + Send + 'static> Follower<G> {
    fn refresh(&self, path: Option<Option<String>>) {
        let Some(inner) = self.view.upgrade() else {
            return;
        };
        let path = {
            let mut state = inner.lock();
            if !state.open {
                return;
            }
            // `None` keeps whatever is shown.
            let path = path.unwrap_or_else(|| state.active.clone().flatten());
            state.active = Some(path.clone());
            path
        };
        let Ok(generation) = inner.handle.bound_generation() else {
            return;
        };

        let task_inner = Arc::clone(&inner);
        let scheduled = inner.scheduler.schedule("history refresh", move || {
            if let Ok(snapshot) = load(&task_inner, generation, path) {
                task_inner
                    .events
                    .publish(&RepositoryEvent::HistoryRefreshed(snapshot));
            }
            Ok(())
        });
        if let Err(e) = scheduled {
            log::warn!("could not schedule history refresh: {e}");
        }
    }
}

impl<G: GitOps + Send + 'static> RepositoryListener for Follower<G> {
    fn repository_changed(&self) {
        self.refresh(Some(None));
    }

    fn branch_changed(&self, _old: Option<&str>, _new: Option<&str>) {
        self.refresh(None);
    }
}

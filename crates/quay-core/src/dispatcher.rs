//! Entry point for Git commands coming from the front-end.
//!
//! The dispatcher checks preconditions on the caller's thread (binding,
//! rebase confirmation), then hands the work to the operation queue. Once a
//! mutation finished it reports per-path failures and publishes change
//! events from the worker.

use std::sync::{Arc, Mutex, PoisonError};

use quay_git::{
    BatchOutcome, CommitCharacteristics, CommitsAheadAndBehind, FileStatus, GitOps,
    WorkingCopyStatus,
};

use crate::action::Action;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{EventBus, RepositoryEvent};
use crate::handle::RepositoryHandle;
use crate::history::{self, HistoryView};
use crate::host::{Host, Notifier, Tag, Translator, format_message};
use crate::queue::{OperationQueue, Pending};
use crate::resolver::ConflictResolver;

/// What happened to a dispatched command.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The command was queued; the outcome arrives later.
    Scheduled(Pending<BatchOutcome>),
    /// The user declined the rebase confirmation. Nothing was changed.
    Declined,
}

/// State the worker needs after a mutation.
struct Reporter<G> {
    handle: RepositoryHandle<G>,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
    last_branch: Arc<Mutex<Option<String>>>,
}

impl<G: GitOps> Reporter<G> {
    fn report(&self, action: Action, generation: u64, result: &Result<BatchOutcome>) {
        match result {
            Ok(outcome) => self.report_failures(action, outcome),
            Err(Error::Stale(_) | Error::Cancelled) => return,
            Err(e) => self.notifier.notify_error(&e.to_string()),
        }

        self.events.publish(&RepositoryEvent::RepositoryChanged);

        let branch = self.handle.run("branch check", generation, |repo| {
            Ok::<_, Error>(repo.current_branch().ok())
        });
        if let Ok(branch) = branch {
            self.branch_observed(branch);
        }
    }

    fn report_failures(&self, action: Action, outcome: &BatchOutcome) {
        if outcome.is_complete() {
            return;
        }
        let template = self.translator.translate(Tag::ActionFailedForPath);
        let name = self.translator.translate(action.tag());
        for failure in &outcome.failed {
            self.notifier.notify_error(&format_message(
                &template,
                &[name.as_str(), failure.path.as_str(), failure.message.as_str()],
            ));
        }
    }

    fn branch_observed(&self, branch: Option<String>) {
        let old = {
            let mut last = self
                .last_branch
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *last == branch {
                return;
            }
            std::mem::replace(&mut *last, branch.clone())
        };
        log::debug!(
            "branch changed: {} -> {}",
            old.as_deref().unwrap_or("(none)"),
            branch.as_deref().unwrap_or("(none)")
        );
        self.events
            .publish(&RepositoryEvent::BranchChanged { old, new: branch });
    }
}

impl<G> Clone for Reporter<G> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            events: self.events.clone(),
            notifier: Arc::clone(&self.notifier),
            translator: Arc::clone(&self.translator),
            last_branch: Arc::clone(&self.last_branch),
        }
    }
}

/// Public entry point for Git commands.
///
/// Owns the operation queue; dropping the dispatcher finishes queued work
/// and stops the worker.
pub struct CommandDispatcher<G: GitOps + Send + 'static> {
    handle: RepositoryHandle<G>,
    resolver: ConflictResolver,
    reporter: Reporter<G>,
    history: HistoryView<G>,
    queue: OperationQueue,
}

impl<G: GitOps + Send + 'static> CommandDispatcher<G> {
    /// Create an unbound dispatcher and start its worker thread.
    ///
    /// # Errors
    /// Returns error if the worker thread cannot be spawned.
    pub fn new(host: Host, config: &Config) -> Result<Self> {
        let queue = OperationQueue::spawn(&config.queue.thread_name)?;
        let handle = RepositoryHandle::new();
        let events = EventBus::new();

        let history = HistoryView::new(
            handle.clone(),
            queue.scheduler(),
            events.clone(),
            Arc::clone(&host.notifier),
            Arc::clone(&host.translator),
            config.history.clone(),
        );

        Ok(Self {
            resolver: ConflictResolver::new(host.confirmer, Arc::clone(&host.translator)),
            reporter: Reporter {
                handle: handle.clone(),
                events,
                notifier: host.notifier,
                translator: host.translator,
                last_branch: Arc::new(Mutex::new(None)),
            },
            handle,
            history,
            queue,
        })
    }

    /// Switch to another working copy.
    ///
    /// Queued work that has not started is dropped; work already running
    /// finishes against the old working copy and reports `Stale`.
    pub fn bind(&self, repo: G) {
        let branch = repo.current_branch().ok();
        self.queue.invalidate_pending();
        self.handle.bind(repo);
        self.rebound(branch);
    }

    /// Drop the current working copy.
    pub fn unbind(&self) {
        self.queue.invalidate_pending();
        self.handle.unbind();
        self.rebound(None);
    }

    fn rebound(&self, branch: Option<String>) {
        self.history.reset();
        *self
            .reporter
            .last_branch
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = branch;
        self.reporter
            .events
            .publish(&RepositoryEvent::RepositoryChanged);
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.handle.is_bound()
    }

    /// Subscribe to repository events here.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.reporter.events
    }

    #[must_use]
    pub fn history(&self) -> &HistoryView<G> {
        &self.history
    }

    /// Run `action` on `files`.
    ///
    /// A conflict resolution during a rebase asks the confirmer first, on
    /// this thread; refusing returns [`DispatchOutcome::Declined`].
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn dispatch(&self, files: Vec<FileStatus>, action: Action) -> Result<DispatchOutcome> {
        let generation = self.handle.bound_generation()?;

        // The state read waits for any running operation; only resolutions need it.
        if action.is_resolution() {
            let state = self.handle.with(|repo| Ok::<_, Error>(repo.state()))?;
            if !self.resolver.should_continue(state, action) {
                log::debug!("{action} declined for {} file(s)", files.len());
                return Ok(DispatchOutcome::Declined);
            }
        }

        log::debug!("dispatching {action} for {} file(s)", files.len());
        let (completer, pending) = Pending::channel(action.label());
        let handle = self.handle.clone();
        let reporter = self.reporter.clone();

        self.queue.schedule(action.label(), move || {
            let result = handle.run(action.label(), generation, |repo| action.apply(repo, &files));
            reporter.report(action, generation, &result);
            completer.complete(result);
            Ok(())
        })?;

        Ok(DispatchOutcome::Scheduled(pending))
    }

    fn query<T, F>(&self, label: &'static str, f: F) -> Result<Pending<T>>
    where
        T: Send + 'static,
        F: FnOnce(&G) -> quay_git::Result<T> + Send + 'static,
    {
        let generation = self.handle.bound_generation()?;
        let (completer, pending) = Pending::channel(label);
        let handle = self.handle.clone();

        self.queue.schedule(label, move || {
            completer.complete(handle.run(label, generation, f));
            Ok(())
        })?;
        Ok(pending)
    }

    /// Commits touching `path` (or every commit), newest first.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn commit_characteristics(
        &self,
        path: Option<&str>,
    ) -> Result<Pending<Vec<CommitCharacteristics>>> {
        let path = path.map(String::from);
        self.query("commit characteristics", move |repo| {
            repo.commit_characteristics(path.as_deref())
        })
    }

    /// Commits ahead of and behind the upstream of `branch_ref`.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn commits_ahead_and_behind(
        &self,
        branch_ref: &str,
    ) -> Result<Pending<Option<CommitsAheadAndBehind>>> {
        let branch_ref = branch_ref.to_string();
        self.query("ahead/behind", move |repo| {
            repo.commits_ahead_and_behind(&branch_ref)
        })
    }

    /// Ahead/behind for whatever branch is checked out.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn current_ahead_and_behind(&self) -> Result<Pending<Option<CommitsAheadAndBehind>>> {
        self.query("ahead/behind", |repo| match repo.full_branch()? {
            Some(branch) => repo.commits_ahead_and_behind(&branch),
            None => Ok(None),
        })
    }

    /// Scan the working copy.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn file_status(&self) -> Result<Pending<WorkingCopyStatus>> {
        self.query("status", |repo| repo.status())
    }

    /// Files changed by one commit.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn changed_files(&self, commit_id: &str) -> Result<Pending<Vec<FileStatus>>> {
        let commit_id = commit_id.to_string();
        self.query("changed files", move |repo| repo.changed_files(&commit_id))
    }

    /// Best-effort fetch. Resolves to whether the fetch went through;
    /// failures are only logged.
    ///
    /// # Errors
    /// Returns `NoRepositorySelected` if nothing is bound, or `QueueClosed`.
    pub fn fetch(&self) -> Result<Pending<bool>> {
        self.query("fetch", |repo| Ok(history::try_fetch(repo)))
    }

    /// Block until everything queued so far has run.
    ///
    /// # Errors
    /// Returns `QueueClosed` if the worker has shut down.
    pub fn flush(&self) -> Result<()> {
        self.queue.flush()
    }
}

impl<G: GitOps + Send + 'static> std::fmt::Debug for CommandDispatcher<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("handle", &self.handle)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::{DefaultTranslator, FixedAnswer};
    use crate::test_mocks::{MockGitOps, fixtures};
    use quay_git::{ChangeType, Repository, RepositoryState};
    use std::sync::mpsc::Receiver;
    use std::time::Duration;

    #[derive(Default)]
    struct Messages {
        errors: Mutex<Vec<String>>,
    }

    impl Notifier for Messages {
        fn notify_info(&self, _message: &str) {}

        fn notify_error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.into());
        }
    }

    fn host(answer: usize, messages: Arc<Messages>) -> Host {
        Host::new(
            Arc::new(FixedAnswer(answer)),
            messages,
            Arc::new(DefaultTranslator),
        )
    }

    fn dispatcher<G: GitOps + Send + 'static>(answer: usize) -> (CommandDispatcher<G>, Arc<Messages>) {
        let messages = Arc::new(Messages::default());
        let dispatcher = CommandDispatcher::new(host(answer, messages.clone()), &Config::default())
            .unwrap();
        (dispatcher, messages)
    }

    fn scheduled(outcome: DispatchOutcome) -> BatchOutcome {
        match outcome {
            DispatchOutcome::Scheduled(pending) => pending.wait().unwrap(),
            DispatchOutcome::Declined => panic!("expected the command to be scheduled"),
        }
    }

    fn modified(path: &str) -> FileStatus {
        FileStatus::new(path, ChangeType::Modify)
    }

    fn drain(events: &Receiver<RepositoryEvent>) -> Vec<RepositoryEvent> {
        events.try_iter().collect()
    }

    #[test]
    fn test_dispatch_without_repository_fails() {
        let (dispatcher, _) = dispatcher::<MockGitOps>(0);
        assert!(matches!(
            dispatcher.dispatch(vec![modified("a.txt")], Action::Stage),
            Err(Error::NoRepositorySelected)
        ));
        assert!(matches!(
            dispatcher.commit_characteristics(None),
            Err(Error::NoRepositorySelected)
        ));
        assert!(matches!(dispatcher.fetch(), Err(Error::NoRepositorySelected)));
    }

    #[test]
    fn test_stage_runs_on_worker_and_publishes_change() {
        let (dispatcher, messages) = dispatcher(0);
        let mock = MockGitOps::new();
        let calls = mock.call_log();
        dispatcher.bind(mock);
        let events = dispatcher.events().subscribe();

        let outcome = scheduled(
            dispatcher
                .dispatch(vec![modified("a.txt"), modified("b.txt")], Action::Stage)
                .unwrap(),
        );

        assert!(outcome.is_complete());
        assert_eq!(*calls.lock().unwrap(), vec!["add_all a.txt,b.txt"]);
        assert_eq!(drain(&events), vec![RepositoryEvent::RepositoryChanged]);
        assert!(messages.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_partial_failure_is_reported_per_path() {
        let (dispatcher, messages) = dispatcher(0);
        dispatcher.bind(MockGitOps::new().with_failing_path("b.txt"));

        let outcome = scheduled(
            dispatcher
                .dispatch(vec![modified("a.txt"), modified("b.txt")], Action::Unstage)
                .unwrap(),
        );

        assert_eq!(outcome.succeeded, vec!["a.txt"]);
        let errors = messages.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Unstage failed for b.txt"));
    }

    #[test]
    fn test_declined_rebase_resolution_changes_nothing() {
        let (dispatcher, _) = dispatcher(1);
        let mock = MockGitOps::new().with_state(RepositoryState::RebaseMerge);
        let calls = mock.call_log();
        dispatcher.bind(mock);
        let events = dispatcher.events().subscribe();

        let outcome = dispatcher
            .dispatch(vec![modified("a.txt")], Action::ResolveUsingMine)
            .unwrap();
        dispatcher.flush().unwrap();

        assert!(matches!(outcome, DispatchOutcome::Declined));
        assert!(calls.lock().unwrap().is_empty());
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn test_confirmed_rebase_resolution_runs() {
        let (dispatcher, _) = dispatcher(0);
        let mock = MockGitOps::new().with_state(RepositoryState::RebaseMerge);
        let calls = mock.call_log();
        dispatcher.bind(mock);

        scheduled(
            dispatcher
                .dispatch(vec![modified("a.txt")], Action::ResolveUsingTheirs)
                .unwrap(),
        );

        assert_eq!(*calls.lock().unwrap(), vec!["replace a.txt", "add_all a.txt"]);
    }

    #[test]
    fn test_commands_run_in_submission_order() {
        let (dispatcher, _) = dispatcher(0);
        let mock = MockGitOps::new().with_delay(Duration::from_millis(5));
        let calls = mock.call_log();
        dispatcher.bind(mock);

        let first = dispatcher.dispatch(vec![modified("1")], Action::Stage).unwrap();
        let status = dispatcher.file_status().unwrap();
        let second = dispatcher.dispatch(vec![modified("2")], Action::Unstage).unwrap();
        let third = dispatcher.dispatch(vec![modified("3")], Action::Discard).unwrap();
        scheduled(third);
        scheduled(second);
        scheduled(first);
        status.wait().unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["add_all 1", "status", "reset_all 2", "reset_all 3", "restore 3"]
        );
    }

    #[test]
    fn test_branch_change_is_published() {
        let (dispatcher, _) = dispatcher(0);
        let mock = MockGitOps::new();
        let branch = mock.branch_switch();
        dispatcher.bind(mock);
        let events = dispatcher.events().subscribe();

        *branch.lock().unwrap() = Some("topic".into());
        scheduled(dispatcher.dispatch(vec![modified("a.txt")], Action::Stage).unwrap());

        assert_eq!(
            drain(&events),
            vec![
                RepositoryEvent::RepositoryChanged,
                RepositoryEvent::BranchChanged {
                    old: Some("main".into()),
                    new: Some("topic".into())
                }
            ]
        );
    }

    #[test]
    fn test_rebind_drops_queued_work_and_discards_in_flight_result() {
        let (dispatcher, _) = dispatcher(0);
        let (slow, gate) = MockGitOps::new().with_gate();
        let slow_calls = slow.call_log();
        dispatcher.bind(slow);

        let in_flight = dispatcher.dispatch(vec![modified("a")], Action::Stage).unwrap();
        let queued = dispatcher.dispatch(vec![modified("b")], Action::Stage).unwrap();
        gate.started.recv().unwrap();

        let events = dispatcher.events().subscribe();
        dispatcher.bind(MockGitOps::new());
        gate.release.send(()).unwrap();

        let DispatchOutcome::Scheduled(in_flight) = in_flight else {
            panic!("expected scheduled");
        };
        let DispatchOutcome::Scheduled(queued) = queued else {
            panic!("expected scheduled");
        };
        assert!(matches!(in_flight.wait(), Err(Error::Stale(_))));
        assert!(matches!(queued.wait(), Err(Error::Cancelled)));
        assert_eq!(*slow_calls.lock().unwrap(), vec!["add_all a"]);
        // Only the rebind itself announced a change.
        dispatcher.flush().unwrap();
        assert_eq!(drain(&events), vec![RepositoryEvent::RepositoryChanged]);
    }

    #[test]
    fn test_fetch_failure_is_swallowed_and_history_still_loads() {
        let (dispatcher, messages) = dispatcher(0);
        dispatcher.bind(MockGitOps::new().with_fetch_failure().with_commits(&["c1"]));

        assert!(!dispatcher.fetch().unwrap().wait().unwrap());
        let commits = dispatcher.commit_characteristics(None).unwrap().wait().unwrap();

        assert_eq!(commits.len(), 1);
        assert!(messages.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_queries_return_pending_results() {
        let (dispatcher, _) = dispatcher(0);
        dispatcher.bind(MockGitOps::new().with_ahead_behind(&["c2"], &[]));

        let ahead_behind = dispatcher
            .commits_ahead_and_behind("refs/heads/main")
            .unwrap()
            .wait()
            .unwrap()
            .unwrap();
        assert_eq!(ahead_behind.ahead_count(), 1);

        let current = dispatcher.current_ahead_and_behind().unwrap().wait().unwrap();
        assert_eq!(current, Some(ahead_behind));

        assert!(dispatcher.changed_files("c2").unwrap().wait().unwrap().is_empty());
    }

    #[test]
    fn test_bind_resets_history_view() {
        let (dispatcher, _) = dispatcher(0);
        dispatcher.bind(MockGitOps::new().with_commits(&["c1"]));
        let history::HistoryOutcome::Loading(pending) =
            dispatcher.history().show_history(Some("a.txt"), false).unwrap()
        else {
            panic!("expected a reload");
        };
        pending.wait().unwrap();

        let events = dispatcher.events().subscribe();
        dispatcher.bind(MockGitOps::new().with_commits(&["d1"]));
        dispatcher.flush().unwrap();

        let refreshed: Vec<_> = drain(&events)
            .into_iter()
            .filter_map(|event| match event {
                RepositoryEvent::HistoryRefreshed(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect();
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].path, None);
        assert_eq!(refreshed[0].commits[0].commit_id, "d1");
    }

    #[test]
    fn test_stage_and_discard_on_real_repository() {
        let (dispatcher, _) = dispatcher::<Repository>(0);
        let (temp, repo) = fixtures::init_repo();
        fixtures::commit_file(&repo, &temp, "a.txt", "one\n");
        fixtures::write(&temp, "a.txt", "two\n");
        fixtures::write(&temp, "new.txt", "fresh\n");
        dispatcher.bind(repo);

        let status = dispatcher.file_status().unwrap().wait().unwrap();
        let files = status.unstaged.clone();
        assert_eq!(files.len(), 2);

        let staged = scheduled(dispatcher.dispatch(files.clone(), Action::Stage).unwrap());
        assert!(staged.is_complete());
        let status = dispatcher.file_status().unwrap().wait().unwrap();
        assert_eq!(status.staged.len(), 2);
        assert!(status.unstaged.is_empty());

        let discarded = scheduled(dispatcher.dispatch(files, Action::Discard).unwrap());
        assert!(discarded.is_complete());
        assert_eq!(fixtures::read(&temp, "a.txt"), "one\n");
        assert!(!fixtures::path(&temp, "new.txt").exists());
        assert!(dispatcher.file_status().unwrap().wait().unwrap().is_clean());
    }
}

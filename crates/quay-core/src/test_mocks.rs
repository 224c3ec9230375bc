//! Test doubles and fixtures for the core.
//!
//! `MockGitOps` implements `GitOps` without touching disk so dispatcher
//! and resolver logic can be tested in isolation. It is `Send` because it
//! runs on the queue worker, and keeps a shared call log the test holds on
//! to after handing the mock over.

#![allow(clippy::unwrap_used, dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quay_git::{
    BatchOutcome, CommitCharacteristics, CommitsAheadAndBehind, Error as GitError, FileStatus,
    GitOps, Result as GitResult, RepositoryState, WorkingCopyStatus,
};

/// Shared, ordered record of gateway calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Test side of a gated mock: `started` fires when the first gateway call
/// begins, which then blocks until `release` is sent.
pub struct GateControl {
    pub started: mpsc::Receiver<()>,
    pub release: mpsc::Sender<()>,
}

struct Gate {
    started: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

/// Mock implementation of `GitOps` for testing.
pub struct MockGitOps {
    pub calls: CallLog,
    pub branch: Arc<Mutex<Option<String>>>,
    pub state: RepositoryState,
    pub status: WorkingCopyStatus,
    pub failing_paths: Vec<String>,
    pub fetch_fails: bool,
    pub history_fails: bool,
    pub commits: Vec<CommitCharacteristics>,
    pub ahead_behind: Option<CommitsAheadAndBehind>,
    pub delay: Duration,
    gate: Mutex<Option<Gate>>,
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitOps {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            branch: Arc::new(Mutex::new(Some("main".to_string()))),
            state: RepositoryState::Clean,
            status: WorkingCopyStatus::default(),
            failing_paths: Vec::new(),
            fetch_fails: false,
            history_fails: false,
            commits: Vec::new(),
            ahead_behind: None,
            delay: Duration::ZERO,
            gate: Mutex::new(None),
        }
    }

    pub fn with_state(mut self, state: RepositoryState) -> Self {
        self.state = state;
        self
    }

    pub fn with_status(mut self, status: WorkingCopyStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_failing_path(mut self, path: &str) -> Self {
        self.failing_paths.push(path.to_string());
        self
    }

    pub fn with_fetch_failure(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    pub fn with_history_failure(mut self) -> Self {
        self.history_fails = true;
        self
    }

    pub fn with_commits(mut self, ids: &[&str]) -> Self {
        self.commits = ids.iter().map(|id| commit(id)).collect();
        self
    }

    pub fn with_ahead_behind(mut self, ahead: &[&str], behind: &[&str]) -> Self {
        self.ahead_behind = Some(CommitsAheadAndBehind {
            ahead: ahead.iter().map(ToString::to_string).collect(),
            behind: behind.iter().map(ToString::to_string).collect(),
        });
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Hold the first gateway call until the test releases it.
    pub fn with_gate(self) -> (Self, GateControl) {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(Gate {
            started: started_tx,
            release: release_rx,
        });
        (
            self,
            GateControl {
                started: started_rx,
                release: release_tx,
            },
        )
    }

    /// Handle on the call log that outlives handing the mock to a handle.
    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    /// Handle for switching branches while the mock is bound.
    pub fn branch_switch(&self) -> Arc<Mutex<Option<String>>> {
        Arc::clone(&self.branch)
    }

    fn record(&self, call: String) {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.started.send(());
            let _ = gate.release.recv();
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.calls.lock().unwrap().push(call);
    }

    fn batch(&self, name: &str, paths: impl IntoIterator<Item = String>) -> BatchOutcome {
        let paths: Vec<String> = paths.into_iter().collect();
        self.record(format!("{name} {}", paths.join(",")));

        let mut outcome = BatchOutcome::default();
        for path in &paths {
            let result = if self.failing_paths.contains(path) {
                Err(GitError::PathNotFound {
                    path: path.clone(),
                    revision: "HEAD".into(),
                })
            } else {
                Ok(())
            };
            outcome.record(path, result);
        }
        outcome
    }
}

impl GitOps for MockGitOps {
    fn workdir(&self) -> Option<&Path> {
        None
    }

    fn state(&self) -> RepositoryState {
        self.state
    }

    fn current_branch(&self) -> GitResult<String> {
        self.branch
            .lock()
            .unwrap()
            .clone()
            .ok_or(GitError::DetachedHead)
    }

    fn full_branch(&self) -> GitResult<Option<String>> {
        Ok(self
            .branch
            .lock()
            .unwrap()
            .as_ref()
            .map(|name| format!("refs/heads/{name}")))
    }

    fn head_commit_id(&self) -> GitResult<Option<String>> {
        Ok(self.commits.first().map(|c| c.commit_id.clone()))
    }

    fn status(&self) -> GitResult<WorkingCopyStatus> {
        self.record("status".into());
        Ok(self.status.clone())
    }

    fn add_all(&self, files: &[FileStatus]) -> GitResult<BatchOutcome> {
        Ok(self.batch("add_all", files.iter().map(|f| f.path.clone())))
    }

    fn reset_all(&self, files: &[FileStatus]) -> GitResult<BatchOutcome> {
        Ok(self.batch("reset_all", files.iter().map(|f| f.path.clone())))
    }

    fn restore_last_commit_file(&self, paths: &[String]) -> GitResult<BatchOutcome> {
        Ok(self.batch("restore", paths.iter().cloned()))
    }

    fn replace_with_remote_content(&self, path: &str) -> GitResult<()> {
        self.record(format!("replace {path}"));
        if self.failing_paths.iter().any(|p| p == path) {
            return Err(GitError::NoUpstream("main".into()));
        }
        Ok(())
    }

    fn fetch(&self) -> GitResult<()> {
        self.record("fetch".into());
        if self.fetch_fails {
            return Err(GitError::AuthRequired("origin".into()));
        }
        Ok(())
    }

    fn commit_characteristics(&self, path: Option<&str>) -> GitResult<Vec<CommitCharacteristics>> {
        self.record(format!("history {}", path.unwrap_or("<all>")));
        if self.history_fails {
            return Err(GitError::CommitNotFound("HEAD~1".into()));
        }
        Ok(self.commits.clone())
    }

    fn commits_ahead_and_behind(&self, branch_ref: &str) -> GitResult<Option<CommitsAheadAndBehind>> {
        self.record(format!("ahead_behind {branch_ref}"));
        Ok(self.ahead_behind.clone())
    }

    fn changed_files(&self, commit_id: &str) -> GitResult<Vec<FileStatus>> {
        self.record(format!("changed_files {commit_id}"));
        Ok(Vec::new())
    }
}

/// Commit fixture with a fixed author and date.
pub fn commit(id: &str) -> CommitCharacteristics {
    CommitCharacteristics {
        commit_id: id.to_string(),
        abbreviated_id: id.chars().take(7).collect(),
        author: "Test User <test@example.com>".into(),
        author_email: "test@example.com".into(),
        committer: "Test User <test@example.com>".into(),
        date: DateTime::<Utc>::default(),
        message: format!("commit {id}\n"),
        parent_ids: Vec::new(),
    }
}

/// Real repositories for end-to-end tests through `quay_git::Repository`.
pub mod fixtures {
    use super::{Path, PathBuf};
    use std::fs;

    use git2::{Oid, RepositoryInitOptions, Signature};
    use quay_git::Repository;
    use tempfile::TempDir;

    /// Create an empty repository on `main` with a configured identity.
    pub fn init_repo() -> (TempDir, Repository) {
        let temp = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = git2::Repository::init_opts(temp.path(), &opts).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        (temp, Repository::from_git2(repo))
    }

    pub fn path(temp: &TempDir, file: &str) -> PathBuf {
        temp.path().join(file)
    }

    pub fn write(temp: &TempDir, file: &str, content: &str) {
        fs::write(path(temp, file), content).unwrap();
    }

    pub fn read(temp: &TempDir, file: &str) -> String {
        fs::read_to_string(path(temp, file)).unwrap()
    }

    /// Write, stage and commit a single file.
    pub fn commit_file(repo: &Repository, temp: &TempDir, file: &str, content: &str) -> Oid {
        write(temp, file, content);
        let inner = repo.inner();
        let mut index = inner.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree = inner.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parent = inner.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        inner
            .commit(Some("HEAD"), &sig, &sig, &format!("Update {file}"), &tree, &parents)
            .unwrap()
    }

    /// Index content of `file`, if staged.
    pub fn staged(repo: &Repository, file: &str) -> Option<String> {
        let inner = repo.inner();
        let index = inner.index().unwrap();
        let entry = index.get_path(Path::new(file), 0)?;
        let blob = inner.find_blob(entry.id).unwrap();
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }

    /// Point `origin/<branch>` at a commit on top of `parent` that sets
    /// `file` to `content`, and make it the upstream of `branch`.
    pub fn diverge_upstream(
        repo: &Repository,
        branch: &str,
        parent: Oid,
        file: &str,
        content: &str,
    ) -> Oid {
        let inner = repo.inner();
        let parent_commit = inner.find_commit(parent).unwrap();
        let blob = inner.blob(content.as_bytes()).unwrap();
        let mut builder = inner.treebuilder(Some(&parent_commit.tree().unwrap())).unwrap();
        builder.insert(file, blob, 0o100_644).unwrap();
        let tree = inner.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::now("Upstream User", "upstream@example.com").unwrap();
        let tip = inner
            .commit(None, &sig, &sig, "upstream change", &tree, &[&parent_commit])
            .unwrap();

        if inner.find_remote("origin").is_err() {
            inner
                .remote("origin", "https://example.invalid/quay.git")
                .unwrap();
        }
        inner
            .reference(&format!("refs/remotes/origin/{branch}"), tip, true, "test")
            .unwrap();
        let mut local = inner.find_branch(branch, git2::BranchType::Local).unwrap();
        local.set_upstream(Some(&format!("origin/{branch}"))).unwrap();
        tip
    }

    /// Leave `file` in a merge conflict between "mine" on `main` and
    /// "theirs" on a side commit off the shared base.
    pub fn merge_conflict(
        repo: &Repository,
        temp: &TempDir,
        file: &str,
        mine: &str,
        theirs: &str,
    ) {
        let base = commit_file(repo, temp, file, "base\n");
        commit_file(repo, temp, file, mine);

        let inner = repo.inner();
        let base_commit = inner.find_commit(base).unwrap();
        let blob = inner.blob(theirs.as_bytes()).unwrap();
        let mut builder = inner.treebuilder(Some(&base_commit.tree().unwrap())).unwrap();
        builder.insert(file, blob, 0o100_644).unwrap();
        let tree = inner.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::now("Other User", "other@example.com").unwrap();
        let side = inner
            .commit(None, &sig, &sig, "their change", &tree, &[&base_commit])
            .unwrap();

        let side = inner.find_annotated_commit(side).unwrap();
        inner.merge(&[&side], None, None).unwrap();
        assert!(inner.index().unwrap().has_conflicts());
    }

    /// Whether the index still records a conflict.
    pub fn has_conflicts(repo: &Repository) -> bool {
        repo.inner().index().unwrap().has_conflicts()
    }
}

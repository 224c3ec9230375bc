//! Commit graph analysis: ahead/behind counts and per-file history.

use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{Delta, DiffFindOptions, DiffOptions, Oid, Sort};
use serde::Serialize;

use crate::Repository;
use crate::error::{Error, Result};
use crate::status::{ChangeType, FileStatus};

/// Length of the abbreviated commit id shown in lists.
const ABBREVIATED_LEN: usize = 7;

/// Immutable description of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitCharacteristics {
    /// Full object id (hex).
    pub commit_id: String,
    /// First characters of the object id.
    pub abbreviated_id: String,
    /// Author as `Name <email>`.
    pub author: String,
    pub author_email: String,
    /// Committer as `Name <email>`.
    pub committer: String,
    pub date: DateTime<Utc>,
    pub message: String,
    /// Parent ids, in parent order.
    pub parent_ids: Vec<String>,
}

impl CommitCharacteristics {
    fn from_commit(commit: &git2::Commit<'_>) -> Self {
        let commit_id = commit.id().to_string();
        let author = commit.author();
        let committer = commit.committer();
        Self {
            abbreviated_id: commit_id.chars().take(ABBREVIATED_LEN).collect(),
            commit_id,
            author: format_signature(&author),
            author_email: author.email().unwrap_or_default().to_string(),
            committer: format_signature(&committer),
            date: DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
            message: commit.message().unwrap_or_default().to_string(),
            parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
        }
    }

    /// Author name without the ` <email>` suffix.
    #[must_use]
    pub fn author_display(&self) -> &str {
        self.author
            .find(" <")
            .map_or(self.author.as_str(), |idx| &self.author[..idx])
    }

    /// First line of the message.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

fn format_signature(sig: &git2::Signature<'_>) -> String {
    let name = sig.name().unwrap_or_default();
    match sig.email() {
        Some(email) if !email.is_empty() => format!("{name} <{email}>"),
        _ => name.to_string(),
    }
}

/// Commits that differ between a local branch and its upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitsAheadAndBehind {
    /// Commits on the local branch but not on the upstream, newest first.
    pub ahead: Vec<String>,
    /// Commits on the upstream but not on the local branch, newest first.
    pub behind: Vec<String>,
}

impl CommitsAheadAndBehind {
    #[must_use]
    pub fn ahead_count(&self) -> usize {
        self.ahead.len()
    }

    #[must_use]
    pub fn behind_count(&self) -> usize {
        self.behind.len()
    }

    /// Check if `commit_id` still has to be pushed.
    #[must_use]
    pub fn is_ahead(&self, commit_id: &str) -> bool {
        self.ahead.iter().any(|id| id == commit_id)
    }

    /// Check if `commit_id` still has to be pulled.
    #[must_use]
    pub fn is_behind(&self, commit_id: &str) -> bool {
        self.behind.iter().any(|id| id == commit_id)
    }

    /// Check if both sides point at the same history.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.ahead.is_empty() && self.behind.is_empty()
    }
}

impl Repository {
    /// Compute the commits ahead of and behind the upstream of `branch_ref`.
    ///
    /// `branch_ref` may be a short or a full (`refs/heads/...`) name. Returns
    /// `None` when HEAD is detached (`"HEAD"` or a non-branch ref), when the
    /// branch has no commits yet, or when no upstream is configured.
    ///
    /// # Errors
    /// Returns error if the branch doesn't exist or the revwalk fails.
    pub fn commits_ahead_and_behind(
        &self,
        branch_ref: &str,
    ) -> Result<Option<CommitsAheadAndBehind>> {
        let detached = branch_ref == "HEAD"
            || (branch_ref.starts_with("refs/") && !branch_ref.starts_with("refs/heads/"));
        if detached {
            return Ok(None);
        }
        if self.head_commit()?.is_none() {
            return Ok(None);
        }

        let short = branch_ref.strip_prefix("refs/heads/").unwrap_or(branch_ref);
        let local = self.branch_commit(short)?;
        let Some((_, upstream)) = self.upstream_of(short)? else {
            return Ok(None);
        };

        Ok(Some(CommitsAheadAndBehind {
            ahead: self.commits_between(upstream, local)?,
            behind: self.commits_between(local, upstream)?,
        }))
    }

    /// Commits reachable from `to` but not from `from`, newest first.
    fn commits_between(&self, from: Oid, to: Oid) -> Result<Vec<String>> {
        let mut revwalk = self.inner().revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(to)?;
        revwalk.hide(from)?;

        revwalk
            .map(|oid| oid.map(|oid| oid.to_string()).map_err(Error::from))
            .collect()
    }

    /// List the commits touching `path`, or all commits when `path` is `None`.
    ///
    /// The walk starts at HEAD and, when configured, at the upstream of the
    /// current branch, so commits not yet pulled are listed too. Children
    /// come before parents; unrelated commits are ordered newest first.
    ///
    /// With a path, renames are followed: the commit that renamed the file
    /// into `path` is included and older commits are matched against the
    /// previous name. Like `git log --follow`, one name is tracked for the
    /// whole walk: a side branch forked before the rename and merged after it
    /// may be matched against the wrong name and left out.
    ///
    /// # Errors
    /// Returns error if the revwalk or a tree lookup fails.
    pub fn commit_characteristics(&self, path: Option<&str>) -> Result<Vec<CommitCharacteristics>> {
        let Some(head) = self.head_commit()? else {
            return Ok(Vec::new());
        };

        let mut revwalk = self.inner().revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head)?;
        if let Ok((_, upstream)) = self.current_upstream() {
            revwalk.push(upstream)?;
        }

        let mut tracked = path.map(String::from);
        let mut commits = Vec::new();

        for oid in revwalk {
            let commit = self.find_commit(oid?)?;
            match tracked.as_deref() {
                None => commits.push(CommitCharacteristics::from_commit(&commit)),
                Some(current) => match self.touches_path(&commit, current)? {
                    PathChange::Untouched => {}
                    PathChange::Modified => {
                        commits.push(CommitCharacteristics::from_commit(&commit));
                    }
                    PathChange::RenamedFrom(previous) => {
                        log::debug!("following rename {previous} -> {current} at {}", commit.id());
                        commits.push(CommitCharacteristics::from_commit(&commit));
                        tracked = Some(previous);
                    }
                },
            }
        }

        Ok(commits)
    }

    /// Decide whether `commit` changed `path` relative to its parents.
    fn touches_path(&self, commit: &git2::Commit<'_>, path: &str) -> Result<PathChange> {
        let tree = commit.tree()?;
        let entry = tree.get_path(Path::new(path)).ok().map(|e| e.id());

        if commit.parent_count() == 0 {
            return Ok(if entry.is_some() {
                PathChange::Modified
            } else {
                PathChange::Untouched
            });
        }

        let mut parent_entries = Vec::with_capacity(commit.parent_count());
        for parent in commit.parents() {
            let parent_tree = parent.tree()?;
            parent_entries.push(parent_tree.get_path(Path::new(path)).ok().map(|e| e.id()));
        }

        // Same content as some parent: the change, if any, came through that parent.
        if parent_entries.iter().any(|parent| *parent == entry) {
            return Ok(PathChange::Untouched);
        }

        // Path appears in this commit: look for the name it had before.
        if entry.is_some() && parent_entries[0].is_none() {
            if let Some(previous) = self.rename_source(commit, path)? {
                return Ok(PathChange::RenamedFrom(previous));
            }
        }

        Ok(PathChange::Modified)
    }

    /// Find the old name of `path` if `commit` renamed it from its first parent.
    fn rename_source(&self, commit: &git2::Commit<'_>, path: &str) -> Result<Option<String>> {
        let parent_tree = commit.parent(0)?.tree()?;
        let tree = commit.tree()?;
        let mut diff = self
            .inner()
            .diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let previous = diff
            .deltas()
            .filter(|delta| delta.status() == Delta::Renamed)
            .find(|delta| delta.new_file().path() == Some(Path::new(path)))
            .and_then(|delta| delta.old_file().path())
            .and_then(|old| old.to_str())
            .map(String::from);
        Ok(previous)
    }

    /// List the files a commit changed relative to its first parent.
    ///
    /// Renamed files are reported once, under their new name.
    ///
    /// # Errors
    /// Returns `CommitNotFound` for an unknown id, or error if diffing fails.
    pub fn changed_files(&self, commit_id: &str) -> Result<Vec<FileStatus>> {
        let commit = self.resolve_commit(commit_id)?;
        let tree = commit.tree()?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.ignore_submodules(false);
        let mut diff =
            self.inner()
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let files = diff
            .deltas()
            .filter_map(|delta| {
                let change_type = match delta.status() {
                    Delta::Added | Delta::Copied => ChangeType::Add,
                    Delta::Deleted => ChangeType::Delete,
                    Delta::Renamed => ChangeType::Rename,
                    Delta::Modified | Delta::Typechange => {
                        if delta.new_file().mode() == git2::FileMode::Commit {
                            ChangeType::Submodule
                        } else {
                            ChangeType::Modify
                        }
                    }
                    Delta::Conflicted => ChangeType::Conflict,
                    _ => return None,
                };
                let file = if change_type == ChangeType::Delete {
                    delta.old_file()
                } else {
                    delta.new_file()
                };
                file.path()
                    .and_then(|p| p.to_str())
                    .map(|p| FileStatus::new(p, change_type))
            })
            .collect();

        Ok(files)
    }

    /// Hex id of the commit HEAD points at.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be resolved.
    pub fn head_commit_id(&self) -> Result<Option<String>> {
        Ok(self.head_commit()?.map(|oid| oid.to_string()))
    }
}

/// How a commit relates to a tracked path.
enum PathChange {
    Untouched,
    Modified,
    RenamedFrom(String),
}

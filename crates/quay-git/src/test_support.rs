//! Helpers for building throwaway repositories in tests.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use git2::{Oid, RepositoryInitOptions, Signature};
use tempfile::TempDir;

use crate::Repository;

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

fn signature() -> Signature<'static> {
    Signature::now("Test User", "test@example.com").unwrap()
}

/// Write a file in the working tree, creating parent directories.
pub fn write_file(repo: &Repository, path: &str, content: &str) {
    let full = repo.workdir().unwrap().join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

/// Read a file from the working tree.
pub fn read_file(repo: &Repository, path: &str) -> String {
    fs::read_to_string(repo.workdir().unwrap().join(path)).unwrap()
}

/// Commit whatever the index currently holds on HEAD.
pub fn commit_index(repo: &Repository, message: &str) -> Oid {
    let inner = repo.inner();
    let mut index = inner.index().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = inner.find_tree(tree_id).unwrap();
    let sig = signature();
    let parent = inner.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    inner
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Write, stage and commit a single file.
pub fn commit_file(repo: &Repository, path: &str, content: &str, message: &str) -> Oid {
    write_file(repo, path, content);
    let mut index = repo.inner().index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    commit_index(repo, message)
}

/// Rename a tracked file and commit the rename.
pub fn commit_rename(repo: &Repository, from: &str, to: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::rename(workdir.join(from), workdir.join(to)).unwrap();
    let mut index = repo.inner().index().unwrap();
    index.remove_path(Path::new(from)).unwrap();
    index.add_path(Path::new(to)).unwrap();
    index.write().unwrap();
    commit_index(repo, message)
}

/// Point `refs/remotes/origin/<branch>` at `tip` and make it the upstream of `branch`.
pub fn set_upstream(repo: &Repository, branch: &str, tip: Oid) {
    let inner = repo.inner();
    if inner.find_remote("origin").is_err() {
        inner
            .remote("origin", "https://example.invalid/quay.git")
            .unwrap();
    }
    inner
        .reference(
            &format!("refs/remotes/origin/{branch}"),
            tip,
            true,
            "test: move upstream",
        )
        .unwrap();
    let mut local = inner.find_branch(branch, git2::BranchType::Local).unwrap();
    local.set_upstream(Some(&format!("origin/{branch}"))).unwrap();
}

/// Create a commit on top of `parent` without moving any ref.
pub fn detached_commit(repo: &Repository, parent: Oid, path: &str, content: &str) -> Oid {
    let inner = repo.inner();
    let parent_commit = inner.find_commit(parent).unwrap();
    let blob = inner.blob(content.as_bytes()).unwrap();
    let mut builder = inner.treebuilder(Some(&parent_commit.tree().unwrap())).unwrap();
    builder.insert(path, blob, 0o100_644).unwrap();
    let tree = inner.find_tree(builder.write().unwrap()).unwrap();
    let sig = signature();
    inner
        .commit(None, &sig, &sig, "upstream change", &tree, &[&parent_commit])
        .unwrap()
}

/// Leave `path` in a merge conflict: "mine" is committed on `main`,
/// "theirs" on a side commit off the shared base, and the side is merged
/// without committing.
pub fn merge_conflict(repo: &Repository, path: &str, mine: &str, theirs: &str) {
    let base = commit_file(repo, path, "base\n", "Base");
    commit_file(repo, path, mine, "Mine");
    let side = detached_commit(repo, base, path, theirs);

    let inner = repo.inner();
    let side = inner.find_annotated_commit(side).unwrap();
    inner.merge(&[&side], None, None).unwrap();
    assert!(inner.index().unwrap().has_conflicts());
}

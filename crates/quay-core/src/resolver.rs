//! Conflict resolution by picking one side.
//!
//! "Mine" means the local version (HEAD) and "theirs" the incoming one.
//! While rebasing, Git replays local commits on top of the upstream, so
//! the sides swap: HEAD is the upstream branch and the commit being
//! applied comes from the working branch. The resolver asks before going
//! ahead in that state.

use std::sync::Arc;

use quay_git::{BatchOutcome, FileStatus, GitOps, RepositoryState};

use crate::action::Action;
use crate::host::{Confirmer, Tag, Translator, format_message};

/// Option index that means "go ahead" in the rebase confirmation.
const CONTINUE: usize = 0;

/// Decides whether a conflict resolution may run.
#[derive(Clone)]
pub struct ConflictResolver {
    confirmer: Arc<dyn Confirmer>,
    translator: Arc<dyn Translator>,
}

impl ConflictResolver {
    #[must_use]
    pub fn new(confirmer: Arc<dyn Confirmer>, translator: Arc<dyn Translator>) -> Self {
        Self {
            confirmer,
            translator,
        }
    }

    /// Check whether `action` may run in `state`.
    ///
    /// Only a conflict resolution during a rebase needs the user's consent;
    /// everything else continues without asking.
    #[must_use]
    pub fn should_continue(&self, state: RepositoryState, action: Action) -> bool {
        if !action.is_resolution() || state != RepositoryState::RebaseMerge {
            return true;
        }

        let (side, branch) = if action == Action::ResolveUsingMine {
            (Tag::Mine, Tag::TheUpstreamBranch)
        } else {
            (Tag::Theirs, Tag::TheWorkingBranch)
        };
        let t = |tag| self.translator.translate(tag);

        let title = t(action.tag());
        let (side, branch) = (t(side), t(branch));
        let message = format_message(
            &t(Tag::ContinueResolvingRebaseConflict),
            &[side.as_str(), branch.as_str()],
        );
        let options = [t(Tag::Yes), t(Tag::No)];

        let answer = self.confirmer.confirm(&title, &message, &options);
        log::debug!("rebase confirmation for {action}: option {answer}");
        answer == CONTINUE
    }
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver").finish_non_exhaustive()
    }
}

/// Throw away local changes: unstage, then restore the HEAD version.
///
/// Submodules are unstaged but their content is left alone.
///
/// # Errors
/// Returns error if the batch as a whole cannot run.
pub fn discard<G: GitOps + ?Sized>(repo: &G, files: &[FileStatus]) -> quay_git::Result<BatchOutcome> {
    let mut outcome = repo.reset_all(files)?;

    let restorable: Vec<String> = files
        .iter()
        .filter(|file| !file.is_submodule())
        .map(|file| file.path.clone())
        .collect();
    let restored = repo.restore_last_commit_file(&restorable)?;

    absorb_failures(&mut outcome, restored);
    Ok(outcome)
}

/// Keep the local side: discard, then stage the result.
///
/// # Errors
/// Returns error if the batch as a whole cannot run.
pub fn resolve_using_mine<G: GitOps + ?Sized>(
    repo: &G,
    files: &[FileStatus],
) -> quay_git::Result<BatchOutcome> {
    let mut outcome = discard(repo, files)?;
    let staged = repo.add_all(&succeeded(files, &outcome))?;
    absorb_failures(&mut outcome, staged);
    Ok(outcome)
}

/// Take the incoming side: replace each path with the remote content, then
/// stage it. Paths that could not be replaced are not staged.
///
/// # Errors
/// Returns error if the batch as a whole cannot run.
pub fn resolve_using_theirs<G: GitOps + ?Sized>(
    repo: &G,
    files: &[FileStatus],
) -> quay_git::Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    for file in files {
        outcome.record(&file.path, repo.replace_with_remote_content(&file.path));
    }

    let staged = repo.add_all(&succeeded(files, &outcome))?;
    absorb_failures(&mut outcome, staged);
    Ok(outcome)
}

fn succeeded(files: &[FileStatus], outcome: &BatchOutcome) -> Vec<FileStatus> {
    files
        .iter()
        .filter(|file| outcome.succeeded.contains(&file.path))
        .cloned()
        .collect()
}

/// Fold the failures of a later step into `outcome`; a path counts as done
/// only if every step succeeded for it.
fn absorb_failures(outcome: &mut BatchOutcome, later: BatchOutcome) {
    outcome.failed.extend(later.failed);
    let failed = &outcome.failed;
    outcome
        .succeeded
        .retain(|path| !failed.iter().any(|failure| &failure.path == path));
}

//! Capabilities the embedding front-end provides.
//!
//! The core never renders anything itself. Questions, notifications and
//! user-facing strings all go through these traits.

use std::fmt;
use std::sync::Arc;

/// Asks the user to pick one of several options.
pub trait Confirmer: Send + Sync {
    /// Show `message` under `title` and return the index of the chosen option.
    fn confirm(&self, title: &str, message: &str, options: &[String]) -> usize;
}

/// Shows informational and error messages to the user.
pub trait Notifier: Send + Sync {
    fn notify_info(&self, message: &str);

    fn notify_error(&self, message: &str);
}

/// Maps message tags to user-facing strings.
pub trait Translator: Send + Sync {
    fn translate(&self, tag: Tag) -> String;
}

/// User-facing strings the core needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Stage,
    Unstage,
    Discard,
    ResolveUsingMine,
    ResolveUsingTheirs,
    Mine,
    Theirs,
    TheUpstreamBranch,
    TheWorkingBranch,
    /// `{0}` is the side, `{1}` the branch it stands for.
    ContinueResolvingRebaseConflict,
    Yes,
    No,
    /// `{0}` is the action, `{1}` the path, `{2}` the reason.
    ActionFailedForPath,
    NothingToShowForNewFiles,
    /// `{0}` is the failure.
    UnableToPresentHistory,
}

impl Tag {
    /// English text for the tag.
    #[must_use]
    pub const fn english(self) -> &'static str {
        match self {
            Self::Stage => "Stage",
            Self::Unstage => "Unstage",
            Self::Discard => "Discard",
            Self::ResolveUsingMine => "Resolve using \"Mine\"",
            Self::ResolveUsingTheirs => "Resolve using \"Theirs\"",
            Self::Mine => "\"Mine\"",
            Self::Theirs => "\"Theirs\"",
            Self::TheUpstreamBranch => "the upstream branch",
            Self::TheWorkingBranch => "the working branch",
            Self::ContinueResolvingRebaseConflict => {
                "During a rebase, the sides of a conflict are reversed: {0} refers to {1}.\n\
                 Do you want to continue?"
            }
            Self::Yes => "Yes",
            Self::No => "No",
            Self::ActionFailedForPath => "{0} failed for {1}: {2}",
            Self::NothingToShowForNewFiles => "Git history: nothing to show for new files",
            Self::UnableToPresentHistory => "Unable to present history because of: {0}",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.english())
    }
}

/// Translator returning the built-in English strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTranslator;

impl Translator for DefaultTranslator {
    fn translate(&self, tag: Tag) -> String {
        tag.english().to_string()
    }
}

/// Confirmer that always picks the same option.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAnswer(pub usize);

impl Confirmer for FixedAnswer {
    fn confirm(&self, title: &str, _message: &str, options: &[String]) -> usize {
        log::debug!(
            "answering '{title}' with {:?}",
            options.get(self.0).map_or("<none>", String::as_str)
        );
        self.0
    }
}

/// The set of capabilities a front-end hands to the dispatcher.
#[derive(Clone)]
pub struct Host {
    pub confirmer: Arc<dyn Confirmer>,
    pub notifier: Arc<dyn Notifier>,
    pub translator: Arc<dyn Translator>,
}

impl Host {
    #[must_use]
    pub fn new(
        confirmer: Arc<dyn Confirmer>,
        notifier: Arc<dyn Notifier>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            confirmer,
            notifier,
            translator,
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

/// Substitute `{0}`, `{1}`, ... in `template` with `args`.
///
/// Placeholders without a matching argument are left as they are.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |message, (idx, arg)| {
            message.replace(&format!("{{{idx}}}"), arg)
        })
}

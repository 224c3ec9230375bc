//! # quay-core
//!
//! Core library for Quay: a single-worker queue that serializes every Git
//! operation on the bound working copy, conflict resolution with the rebase
//! side inversion, the command dispatcher, the history view and change
//! events.
//!
//! Front-ends provide a [`Host`] (confirmation prompts, notifications,
//! translations) and receive results through [`Pending`] handles and the
//! [`EventBus`].

pub mod action;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handle;
pub mod history;
pub mod host;
pub mod queue;
pub mod resolver;

#[cfg(test)]
mod test_mocks;

pub use action::Action;
pub use config::Config;
pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use error::{Error, Result};
pub use events::{EventBus, RepositoryEvent, RepositoryListener};
pub use handle::RepositoryHandle;
pub use history::{HistoryOutcome, HistorySnapshot, HistoryView};
pub use host::{Confirmer, DefaultTranslator, Host, Notifier, Tag, Translator};
pub use queue::{OperationQueue, Pending, Scheduler};
pub use resolver::ConflictResolver;

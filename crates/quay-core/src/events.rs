//! Repository change notifications.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::history::HistorySnapshot;

/// Something about the bound working copy changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// Index, working tree or binding changed.
    RepositoryChanged,
    /// The checked-out branch changed. `None` means detached or unbound.
    BranchChanged {
        old: Option<String>,
        new: Option<String>,
    },
    /// The open history view reloaded itself.
    HistoryRefreshed(HistorySnapshot),
}

/// Callback-style subscriber. All methods default to doing nothing.
pub trait RepositoryListener: Send + Sync {
    fn repository_changed(&self) {}

    fn branch_changed(&self, _old: Option<&str>, _new: Option<&str>) {}

    fn history_refreshed(&self, _snapshot: &HistorySnapshot) {}
}

#[derive(Default)]
struct Subscribers {
    channels: Vec<Sender<RepositoryEvent>>,
    listeners: Vec<Arc<dyn RepositoryListener>>,
}

/// Fan-out of [`RepositoryEvent`]s to channels and listeners.
///
/// Events are delivered on the publishing thread, which for mutations is
/// the queue worker.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<RepositoryEvent> {
        let (sender, receiver) = mpsc::channel();
        self.lock().channels.push(sender);
        receiver
    }

    /// Register a callback subscriber.
    pub fn add_listener(&self, listener: Arc<dyn RepositoryListener>) {
        self.lock().listeners.push(listener);
    }

    /// Deliver `event` to every subscriber.
    ///
    /// Channels whose receiver was dropped are pruned.
    pub fn publish(&self, event: &RepositoryEvent) {
        let listeners = {
            let mut subscribers = self.lock();
            subscribers
                .channels
                .retain(|channel| channel.send(event.clone()).is_ok());
            subscribers.listeners.clone()
        };

        // Listeners run outside the lock so they may subscribe or publish.
        for listener in &listeners {
            match event {
                RepositoryEvent::RepositoryChanged => listener.repository_changed(),
                RepositoryEvent::BranchChanged { old, new } => {
                    listener.branch_changed(old.as_deref(), new.as_deref());
                }
                RepositoryEvent::HistoryRefreshed(snapshot) => listener.history_refreshed(snapshot),
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.lock();
        f.debug_struct("EventBus")
            .field("channels", &subscribers.channels.len())
            .field("listeners", &subscribers.listeners.len())
            .finish()
    }
}

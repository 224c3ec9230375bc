//! Single-worker operation queue.
//!
//! Every task runs on one background thread, strictly in submission order,
//! never two at a time. A failing or panicking task is logged and the worker
//! moves on to the next one.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};

type Task = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

struct Job {
    label: String,
    /// Epoch the job was queued in; `None` for jobs that are never stale.
    epoch: Option<u64>,
    task: Task,
}

enum Message {
    Run(Job),
    Shutdown,
}

/// Cloneable handle for submitting work to an [`OperationQueue`].
#[derive(Clone)]
pub struct Scheduler {
    sender: Sender<Message>,
    epoch: Arc<AtomicU64>,
}

impl Scheduler {
    /// Enqueue a task.
    ///
    /// # Errors
    /// Returns `QueueClosed` if the worker has shut down.
    pub fn schedule<F>(&self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.send(Job {
            label: label.into(),
            epoch: Some(self.epoch.load(Ordering::SeqCst)),
            task: Box::new(task),
        })
    }

    fn send(&self, job: Job) -> Result<()> {
        self.sender
            .send(Message::Run(job))
            .map_err(|_| Error::QueueClosed)
    }

    /// Drop every task queued so far that has not started yet.
    pub fn invalidate_pending(&self) {
        let previous = self.epoch.fetch_add(1, Ordering::SeqCst);
        log::debug!("invalidated queued operations (epoch {previous} -> {})", previous + 1);
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Serial task queue backed by a single worker thread.
///
/// Dropping the queue lets the tasks already submitted finish, then joins
/// the worker.
#[derive(Debug)]
pub struct OperationQueue {
    scheduler: Scheduler,
    worker: Option<JoinHandle<()>>,
}

impl OperationQueue {
    /// Spawn the worker thread.
    ///
    /// # Errors
    /// Returns error if the thread cannot be spawned.
    pub fn spawn(thread_name: &str) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let epoch = Arc::new(AtomicU64::new(0));

        let worker_epoch = Arc::clone(&epoch);
        let worker = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run_worker(&receiver, &worker_epoch))?;

        Ok(Self {
            scheduler: Scheduler { sender, epoch },
            worker: Some(worker),
        })
    }

    /// Get a submission handle that can be moved into tasks.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    /// Enqueue a task.
    ///
    /// # Errors
    /// Returns `QueueClosed` if the worker has shut down.
    pub fn schedule<F>(&self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.scheduler.schedule(label, task)
    }

    /// Drop every task queued so far that has not started yet.
    pub fn invalidate_pending(&self) {
        self.scheduler.invalidate_pending();
    }

    /// Block until every task submitted before this call has finished.
    ///
    /// # Errors
    /// Returns `QueueClosed` if the worker has shut down.
    pub fn flush(&self) -> Result<()> {
        let (done, wait) = mpsc::channel();
        self.scheduler.send(Job {
            label: "flush".into(),
            epoch: None,
            task: Box::new(move || {
                let _ = done.send(());
                Ok(())
            }),
        })?;
        wait.recv().map_err(|_| Error::QueueClosed)
    }
}

impl Drop for OperationQueue {
    fn drop(&mut self) {
        let _ = self.scheduler.sender.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("operation queue worker exited abnormally");
            }
        }
    }
}

fn run_worker(receiver: &Receiver<Message>, epoch: &AtomicU64) {
    while let Ok(Message::Run(job)) = receiver.recv() {
        if job
            .epoch
            .is_some_and(|queued| queued != epoch.load(Ordering::SeqCst))
        {
            log::debug!("dropping '{}': queued before the repository was rebound", job.label);
            continue;
        }

        log::trace!("running '{}'", job.label);
        match panic::catch_unwind(AssertUnwindSafe(job.task)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("'{}' failed: {e}", job.label),
            Err(payload) => log::error!("'{}' panicked: {}", job.label, panic_message(&*payload)),
        }
    }
    log::debug!("operation queue worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Producer side of a [`Pending`] result.
#[derive(Debug)]
pub struct Completer<T> {
    sender: Sender<Result<T>>,
}

impl<T> Completer<T> {
    /// Deliver the result. Ignored if nobody is waiting any more.
    pub fn complete(self, result: Result<T>) {
        let _ = self.sender.send(result);
    }
}

/// Result of a queued operation that will arrive later.
///
/// If the task is dropped before it runs (queue invalidated or shut down),
/// waiting yields [`Error::Cancelled`].
#[derive(Debug)]
#[must_use]
pub struct Pending<T> {
    label: String,
    receiver: Receiver<Result<T>>,
}

impl<T> Pending<T> {
    /// Create a connected completer/pending pair.
    pub fn channel(label: impl Into<String>) -> (Completer<T>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            Completer { sender },
            Self {
                label: label.into(),
                receiver,
            },
        )
    }

    /// A pending value that is already resolved.
    pub fn ready(label: impl Into<String>, result: Result<T>) -> Self {
        let (completer, pending) = Self::channel(label);
        completer.complete(result);
        pending
    }

    /// Label of the operation this result belongs to.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Block until the result arrives.
    ///
    /// # Errors
    /// Returns the operation's error, or `Cancelled` if it never ran.
    pub fn wait(self) -> Result<T> {
        self.receiver.recv().unwrap_or(Err(Error::Cancelled))
    }

    /// Block for at most `timeout`.
    ///
    /// # Errors
    /// Returns `Timeout` if nothing arrived in time.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(self.label.clone())),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Cancelled),
        }
    }

    /// Take the result if it has arrived.
    pub fn try_take(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Cancelled)),
        }
    }
}

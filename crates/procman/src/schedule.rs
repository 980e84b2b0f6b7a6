//! Deferred lifecycle operations
//!
//! Each scheduled operation runs as its own detached task: it announces itself,
//! waits out its delay, runs through the [`LifecycleController`], and reports
//! failures to the [`OutputSink`]. The caller gets back a [`ScheduledOperation`]
//! token which can cancel the operation before its delay elapses. Dropping the
//! token leaves the operation running.

use crate::lifecycle::{Action, LifecycleController};
use crate::sink::OutputSink;
use async_io::Timer;
use futures::future;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// A spawner that can spawn futures on an async runtime
pub trait Spawner: Send + Sync {
    /// Spawn a future that runs to completion in the background
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>);
}

/// Spawner for the Smol runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct SmolSpawner;

impl Spawner for SmolSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>) {
        smol::spawn(future).detach();
    }
}

/// What a scheduled operation does when it fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Start one entry
    Start(String),
    /// Gracefully stop one entry
    Stop(String),
    /// Kill one entry
    Kill(String),
    /// Remove one entry
    Remove(String),
    /// Start every entry
    StartAll,
    /// Stop every entry
    StopAll,
    /// Kill every entry
    KillAll,
}

impl Operation {
    /// The per-entry action this operation applies
    pub fn action(&self) -> Action {
        match self {
            Operation::Start(_) | Operation::StartAll => Action::Start,
            Operation::Stop(_) | Operation::StopAll => Action::Stop,
            Operation::Kill(_) | Operation::KillAll => Action::Kill,
            Operation::Remove(_) => Action::Remove,
        }
    }

    /// The targeted entry, or `None` for sweeps
    pub fn target(&self) -> Option<&str> {
        match self {
            Operation::Start(name)
            | Operation::Stop(name)
            | Operation::Kill(name)
            | Operation::Remove(name) => Some(name),
            Operation::StartAll | Operation::StopAll | Operation::KillAll => None,
        }
    }

    /// The message announced when the operation is scheduled
    pub fn announcement(&self, delay: Duration) -> String {
        let secs = delay.as_secs();
        match self {
            Operation::Start(name) => format!("process will start in {}s: {}", secs, name),
            Operation::Stop(name) | Operation::Kill(name) => {
                format!("process will stop in {}s: {}", secs, name)
            }
            Operation::Remove(name) => format!("process removed in {}s: {}", secs, name),
            Operation::StartAll => format!("all processes will start in {}s", secs),
            Operation::StopAll | Operation::KillAll => {
                format!("all processes will stop in {}s", secs)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(name) => write!(f, "{} {}", self.action(), name),
            None => write!(f, "{} all", self.action()),
        }
    }
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Token for an operation scheduled through a [`Scheduler`]
#[derive(Debug)]
pub struct ScheduledOperation {
    id: Uuid,
    operation: Operation,
    delay: Duration,
    cancel_tx: async_channel::Sender<()>,
    // PENDING until exactly one of the task or cancel() settles it
    outcome: Arc<AtomicU8>,
}

impl ScheduledOperation {
    /// Unique id, used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The scheduled operation
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Delay before the operation fires
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the delay has elapsed and the operation has begun
    pub fn has_fired(&self) -> bool {
        self.outcome.load(Ordering::SeqCst) == FIRED
    }

    /// Cancel the operation if it has not fired yet
    ///
    /// Returns true if this call prevented the operation from running. Once
    /// it returns true the operation never runs, even if its delay has
    /// already elapsed.
    pub fn cancel(&self) -> bool {
        let won = settle(&self.outcome, CANCELLED);
        if won {
            self.cancel_tx.close();
        }
        won
    }
}

/// Runs lifecycle operations after a delay, independently of the caller
#[derive(Clone)]
pub struct Scheduler {
    controller: Arc<LifecycleController>,
    sink: Arc<dyn OutputSink>,
    spawner: Arc<dyn Spawner>,
}

impl Scheduler {
    /// Create a scheduler
    pub fn new(
        controller: Arc<LifecycleController>,
        sink: Arc<dyn OutputSink>,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self {
            controller,
            sink,
            spawner,
        }
    }

    /// Announce `operation` and run it after `delay` on a background task
    ///
    /// Returns immediately.
    pub fn schedule(&self, operation: Operation, delay: Duration) -> ScheduledOperation {
        let id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = async_channel::bounded::<()>(1);
        let outcome = Arc::new(AtomicU8::new(PENDING));

        self.sink.info(&operation.announcement(delay));
        debug!("Scheduled {} ({}) in {:?}", operation, id, delay);

        let token = ScheduledOperation {
            id,
            operation: operation.clone(),
            delay,
            cancel_tx: cancel_tx.clone(),
            outcome: outcome.clone(),
        };

        let controller = self.controller.clone();
        let sink = self.sink.clone();
        self.spawner.spawn(Box::pin(async move {
            // Only an explicit cancel() closes the channel while this sender lives
            let _keep_open = cancel_tx;

            // Either branch settles the same way: cancel() may have won after the
            // timer elapsed but before this task got to run
            let _ = future::select(Timer::after(delay), Box::pin(cancel_rx.recv())).await;

            if !settle(&outcome, FIRED) {
                debug!("Cancelled {} ({})", operation, id);
                sink.info(&format!("cancelled scheduled {}", operation));
                return;
            }

            run(&controller, sink.as_ref(), &operation).await;
        }));

        token
    }
}

/// Move a pending operation to `to`; false if it was already settled
fn settle(outcome: &AtomicU8, to: u8) -> bool {
    outcome
        .compare_exchange(PENDING, to, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

/// Execute an operation now and report failures to `sink`
pub(crate) async fn run(controller: &LifecycleController, sink: &dyn OutputSink, operation: &Operation) {
    let outcome = match operation {
        Operation::StartAll => controller.start_all().await,
        Operation::StopAll => controller.stop_all().await,
        Operation::KillAll => controller.kill_all().await,
        Operation::Start(name)
        | Operation::Stop(name)
        | Operation::Kill(name)
        | Operation::Remove(name) => {
            if let Err(e) = controller.apply(operation.action(), name).await {
                sink.error(&e.to_string());
            }
            return;
        }
    };

    for failure in outcome.failures() {
        sink.error(&failure.to_string());
    }
}

//! Registry entries and their lifecycle state

use crate::error::Error;
use crate::metadata::ProcessMetadata;
use chrono::{DateTime, Utc};
use futures::lock::Mutex;
use process_launcher::ProcessHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A live process handle shared between its entry and the task waiting on it
pub(crate) type SharedHandle = Arc<Mutex<Box<dyn ProcessHandle>>>;

/// Lifecycle state of a managed process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Not running; no handle held
    Stopped,
    /// Being spawned
    Starting,
    /// Running with a live handle
    Running,
    /// Termination requested, waiting for exit
    Stopping,
}

impl ProcessState {
    /// Whether an entry in this state must own a live handle
    ///
    /// `None` for `Starting`: the handle arrives when the spawn completes.
    pub fn holds_handle(self) -> Option<bool> {
        match self {
            ProcessState::Stopped => Some(false),
            ProcessState::Starting => None,
            ProcessState::Running | ProcessState::Stopping => Some(true),
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// One named managed process
///
/// Owned exclusively by the [`Registry`](crate::Registry); callers only ever see
/// [`EntrySnapshot`] copies.
pub struct ProcessEntry {
    name: String,
    metadata: Arc<ProcessMetadata>,
    state: ProcessState,
    handle: Option<SharedHandle>,
    pid: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl ProcessEntry {
    pub(crate) fn new(name: String, metadata: ProcessMetadata) -> Self {
        Self {
            name,
            metadata: Arc::new(metadata),
            state: ProcessState::Stopped,
            handle: None,
            pid: None,
            started_at: None,
            last_error: None,
        }
    }

    /// Entry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch descriptor
    pub fn metadata(&self) -> &Arc<ProcessMetadata> {
        &self.metadata
    }

    /// Current state
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// PID of the live process, if any
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Most recent failure recorded for this entry
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn handle(&self) -> Option<&SharedHandle> {
        self.handle.as_ref()
    }

    /// True if `handle` is the one this entry currently owns
    pub(crate) fn owns(&self, handle: &SharedHandle) -> bool {
        self.handle.as_ref().is_some_and(|h| Arc::ptr_eq(h, handle))
    }

    pub(crate) fn begin_start(&mut self) {
        debug_assert_eq!(self.state, ProcessState::Stopped);
        self.state = ProcessState::Starting;
    }

    /// Record a spawn result; only valid while `Starting`
    pub(crate) fn mark_running(&mut self, handle: Box<dyn ProcessHandle>) {
        debug_assert_eq!(self.state, ProcessState::Starting);
        self.pid = handle.pid();
        self.handle = Some(Arc::new(Mutex::new(handle)));
        self.started_at = Some(Utc::now());
        self.state = ProcessState::Running;
    }

    pub(crate) fn mark_stopping(&mut self) {
        debug_assert!(self.handle.is_some());
        self.state = ProcessState::Stopping;
    }

    /// Release the handle and return to `Stopped`
    pub(crate) fn mark_stopped(&mut self) {
        self.handle = None;
        self.pid = None;
        self.started_at = None;
        self.state = ProcessState::Stopped;
    }

    pub(crate) fn record_error(&mut self, error: &Error) {
        self.last_error = Some(error.to_string());
    }

    /// Point-in-time copy of the entry
    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            name: self.name.clone(),
            state: self.state,
            pid: self.pid,
            has_handle: self.handle.is_some(),
            started_at: self.started_at,
            last_error: self.last_error.clone(),
        }
    }
}

impl fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("pid", &self.pid)
            .field("has_handle", &self.handle.is_some())
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Read-only copy of an entry's observable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    /// Entry name
    pub name: String,
    /// Lifecycle state
    pub state: ProcessState,
    /// PID while a handle is held
    pub pid: Option<u32>,
    /// Whether the entry owned a process handle
    pub has_handle: bool,
    /// When the current process was spawned
    pub started_at: Option<DateTime<Utc>>,
    /// Most recent failure
    pub last_error: Option<String>,
}

impl EntrySnapshot {
    /// Whether handle ownership agrees with the lifecycle state
    pub fn is_consistent(&self) -> bool {
        match self.state.holds_handle() {
            Some(required) => required == self.has_handle,
            None => true,
        }
    }
}

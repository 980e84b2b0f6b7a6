//! Error types for process management

use crate::config::ConfigError;
use crate::entry::ProcessState;
use crate::lifecycle::Action;
use thiserror::Error;

/// Result type alias for process manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the process manager
#[derive(Error, Debug)]
pub enum Error {
    /// No entry with this name exists
    #[error("process not found: {name}")]
    NotFound {
        /// The requested name
        name: String,
    },

    /// An entry with this name is already registered
    #[error("process already registered: {name}")]
    AlreadyRegistered {
        /// The duplicate name
        name: String,
    },

    /// The operation is not valid for the entry's current state
    #[error("cannot {operation} process '{name}' while it is {state}")]
    InvalidState {
        /// Entry name
        name: String,
        /// State the entry was in
        state: ProcessState,
        /// The rejected operation
        operation: Action,
    },

    /// The OS could not create the process
    #[error("failed to start process '{name}': {reason}")]
    SpawnFailed {
        /// Entry name
        name: String,
        /// Why the spawn failed
        reason: String,
    },

    /// The handle pointed at a process that had already exited
    #[error("process '{name}' was no longer running")]
    StaleProcess {
        /// Entry name
        name: String,
    },

    /// The OS refused or failed to deliver a stop/kill signal
    #[error("failed to signal process '{name}': {reason}")]
    SignalFailed {
        /// Entry name
        name: String,
        /// Why delivery failed
        reason: String,
    },

    /// Launcher failure while waiting on a process
    #[error("process '{name}': {source}")]
    Launcher {
        /// Entry name
        name: String,
        /// Underlying launcher error
        #[source]
        source: process_launcher::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Create a not found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an invalid state error
    pub fn invalid_state(name: impl Into<String>, state: ProcessState, operation: Action) -> Self {
        Self::InvalidState {
            name: name.into(),
            state,
            operation,
        }
    }

    /// Create a spawn failed error
    pub fn spawn_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a stale process error
    pub fn stale(name: impl Into<String>) -> Self {
        Self::StaleProcess { name: name.into() }
    }

    /// Create a signal failed error
    pub fn signal_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a launcher error for the named entry
    pub fn launcher(name: impl Into<String>, source: process_launcher::Error) -> Self {
        Self::Launcher {
            name: name.into(),
            source,
        }
    }

    /// Returns true for [`Error::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true for [`Error::InvalidState`]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState { .. })
    }
}

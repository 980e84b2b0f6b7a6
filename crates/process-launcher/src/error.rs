//! Error types for process launching

use crate::process::Signal;
use thiserror::Error;

/// Unified error type for launching and controlling processes
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed {
        /// The program that could not be started
        program: String,
        /// The reason for the spawn failure
        reason: String,
    },

    /// The target process no longer exists
    #[error("process {pid} is no longer running")]
    ProcessGone {
        /// The pid the signal was addressed to
        pid: u32,
    },

    /// Failed to send signal to process
    #[error("failed to send {signal}: {reason}")]
    SignalFailed {
        /// The signal that failed to send
        signal: Signal,
        /// The reason for the signal failure
        reason: String,
    },

    /// Waiting for the process to exit failed
    #[error("failed to wait for process: {reason}")]
    WaitFailed {
        /// The reason the wait failed
        reason: String,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a signal failed error
    pub fn signal_failed(signal: Signal, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            signal,
            reason: reason.into(),
        }
    }

    /// Create a wait failed error
    pub fn wait_failed(reason: impl Into<String>) -> Self {
        Self::WaitFailed {
            reason: reason.into(),
        }
    }

    /// Returns true if the error means the process had already gone away
    pub fn is_process_gone(&self) -> bool {
        matches!(self, Error::ProcessGone { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

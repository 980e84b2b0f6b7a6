//! Process control traits and types

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signals the launcher knows how to deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Graceful termination request (SIGTERM)
    Terminate,
    /// Forceful termination (SIGKILL)
    Kill,
    /// Interrupt (SIGINT)
    Interrupt,
}

impl Signal {
    /// The conventional Unix signal number
    pub fn number(self) -> i32 {
        match self {
            Signal::Terminate => 15,
            Signal::Kill => 9,
            Signal::Interrupt => 2,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Terminate => f.write_str("SIGTERM"),
            Signal::Kill => f.write_str("SIGKILL"),
            Signal::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// A handle to control a running process
///
/// Dropping a handle whose process is still alive kills the process.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Get the process ID
    fn pid(&self) -> Option<u32>;

    /// Check whether the process has already exited, without blocking
    fn try_wait(&mut self) -> Result<Option<ExitStatus>>;

    /// Wait for the process to complete and return its exit status
    async fn wait(&mut self) -> Result<ExitStatus>;

    /// Deliver a signal to the process
    ///
    /// Returns [`Error::ProcessGone`](crate::Error::ProcessGone) when the process no
    /// longer exists.
    async fn signal(&mut self, signal: Signal) -> Result<()>;

    /// Send SIGTERM for graceful shutdown
    async fn terminate(&mut self) -> Result<()> {
        self.signal(Signal::Terminate).await
    }

    /// Send SIGKILL to forcefully stop the process
    async fn kill(&mut self) -> Result<()> {
        self.signal(Signal::Kill).await
    }
}

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns true if the process was terminated by a signal
    pub fn terminated_by_signal(&self) -> bool {
        self.signal.is_some()
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            #[cfg(unix)]
            signal: {
                use std::os::unix::process::ExitStatusExt;
                status.signal()
            },
            #[cfg(not(unix))]
            signal: None,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

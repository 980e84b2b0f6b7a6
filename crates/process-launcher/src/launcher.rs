//! Launcher trait for starting processes

use crate::command::Command;
use crate::error::Result;
use crate::process::ProcessHandle;
use async_trait::async_trait;

/// Something that can turn a [`Command`] into a running process
///
/// The trait is object safe so that callers can hold an `Arc<dyn Launcher>` and
/// substitute their own implementation, e.g. in tests.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Launch the command, returning a control handle for the new process
    async fn launch(&self, command: &Command) -> Result<Box<dyn ProcessHandle>>;
}

//! Destinations for asynchronously reported messages
//!
//! Scheduled operations run after their caller has returned, so their
//! announcements and failures go to an [`OutputSink`] instead of a return value.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Receives informational and error messages from the manager
pub trait OutputSink: Send + Sync {
    /// An informational message
    fn info(&self, message: &str);

    /// A failure report
    fn error(&self, message: &str);
}

/// Sink that forwards messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn info(&self, message: &str) {
        info!(target: "procman::output", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "procman::output", "{}", message);
    }
}

/// Severity of a [`SinkMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkLevel {
    /// Informational
    Info,
    /// Failure
    Error,
}

/// A message delivered through a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkMessage {
    /// Severity
    pub level: SinkLevel,
    /// Message text
    pub text: String,
}

/// Sink that forwards messages over an unbounded channel
///
/// Messages are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: async_channel::Sender<SinkMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver its messages arrive on
    pub fn new() -> (Self, async_channel::Receiver<SinkMessage>) {
        let (tx, rx) = async_channel::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, level: SinkLevel, message: &str) {
        let _ = self.tx.try_send(SinkMessage {
            level,
            text: message.to_string(),
        });
    }
}

impl OutputSink for ChannelSink {
    fn info(&self, message: &str) {
        self.send(SinkLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.send(SinkLevel::Error, message);
    }
}

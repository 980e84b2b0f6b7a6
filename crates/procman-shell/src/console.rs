//! Console output for asynchronous messages

use procman::OutputSink;
use tracing::debug;

/// Prints manager messages to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        debug!("Reporting failure: {}", message);
        println!("{}", message);
    }
}

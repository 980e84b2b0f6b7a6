//! Line-oriented shell over a [`procman::ProcessManager`]
//!
//! Every lifecycle command takes an optional delay in seconds and is always run
//! in the background; its announcement and any failure are printed by the
//! [`ConsoleSink`] once they happen.

#![warn(missing_docs)]

pub mod commands;
pub mod console;
pub mod shell;

pub use commands::{ShellCommand, parse_delay, parse_line};
pub use console::ConsoleSink;
pub use shell::{Reply, Shell};

//! Local process launching and control
//!
//! This crate provides the process-spawning and signal-delivery facilities used by
//! the process manager: a clonable [`Command`] description, the [`Launcher`] trait
//! that turns it into a running process, and the [`ProcessHandle`] trait used to
//! signal and reap that process.

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod launcher;
pub mod local;
pub mod process;

pub use command::{Command, OutputTarget};
pub use error::{Error, Result};
pub use launcher::Launcher;
pub use local::{LocalLauncher, LocalProcessHandle};
pub use process::{ExitStatus, ProcessHandle, Signal};

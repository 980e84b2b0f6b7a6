//! Shell command grammar

use clap::{Parser, Subcommand};
use procman::Operation;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "procmanager", no_binary_name = true, disable_version_flag = true)]
#[command(about = "Access the process manager: list, stop, and start registered processes")]
struct CommandLine {
    #[command(subcommand)]
    command: ShellCommand,
}

/// One line of shell input
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Lists the registered processes in tabular format
    #[command(alias = "ls")]
    List,

    /// Prints the metadata associated with the process name
    Metadata {
        /// Process name
        name: String,
    },

    /// Starts the named process if it is not running
    Start {
        /// Process name
        name: String,
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Stops the named process if it is running
    Stop {
        /// Process name
        name: String,
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Kills the named process if it is running
    Kill {
        /// Process name
        name: String,
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Removes the named process, stopping it first if it is running
    Remove {
        /// Process name
        name: String,
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Starts every stopped process
    #[command(name = "startall", alias = "start-all")]
    StartAll {
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Stops every running process
    #[command(name = "stopall", alias = "stop-all")]
    StopAll {
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Kills every running process
    #[command(name = "killall", alias = "kill-all")]
    KillAll {
        /// Delay in seconds
        delay: Option<String>,
    },

    /// Leaves the shell
    #[command(alias = "quit")]
    Exit,
}

impl ShellCommand {
    /// The lifecycle operation and delay this command schedules, if any
    pub fn operation(&self) -> Option<(Operation, Duration)> {
        let (operation, delay) = match self {
            ShellCommand::Start { name, delay } => (Operation::Start(name.clone()), delay),
            ShellCommand::Stop { name, delay } => (Operation::Stop(name.clone()), delay),
            ShellCommand::Kill { name, delay } => (Operation::Kill(name.clone()), delay),
            ShellCommand::Remove { name, delay } => (Operation::Remove(name.clone()), delay),
            ShellCommand::StartAll { delay } => (Operation::StartAll, delay),
            ShellCommand::StopAll { delay } => (Operation::StopAll, delay),
            ShellCommand::KillAll { delay } => (Operation::KillAll, delay),
            ShellCommand::List | ShellCommand::Metadata { .. } | ShellCommand::Exit => return None,
        };
        Some((operation, parse_delay(delay.as_deref())))
    }
}

/// Parse one line of input; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    CommandLine::try_parse_from(words).map(|cli| Some(cli.command))
}

/// Delay argument in whole seconds
///
/// Anything that is not a positive integer means no delay.
pub fn parse_delay(arg: Option<&str>) -> Duration {
    arg.and_then(|s| s.parse::<i64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(Duration::ZERO, |secs| Duration::from_secs(secs as u64))
}

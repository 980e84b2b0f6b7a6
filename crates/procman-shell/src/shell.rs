//! Command dispatch and the read loop

use crate::commands::{ShellCommand, parse_line};
use comfy_table::Table;
use procman::ProcessManager;
use smol::io::{AsyncBufRead, AsyncBufReadExt};
use smol::stream::StreamExt;
use std::io::{self, Write};
use tracing::{debug, info};

/// What the shell prints after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to print now
    Nothing,
    /// Text to print
    Text(String),
    /// Leave the read loop
    Exit,
}

/// Interactive front end for a [`ProcessManager`]
#[derive(Clone)]
pub struct Shell {
    manager: ProcessManager,
    prompt: String,
}

impl Shell {
    /// Shell over `manager` with the default prompt
    pub fn new(manager: ProcessManager) -> Self {
        Self {
            manager,
            prompt: "procman> ".to_string(),
        }
    }

    /// Replace the prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// The manager commands run against
    pub fn manager(&self) -> &ProcessManager {
        &self.manager
    }

    /// Parse and run one line of input
    pub async fn handle_line(&self, line: &str) -> Reply {
        match parse_line(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Reply::Nothing,
            Err(e) => Reply::Text(e.to_string().trim_end().to_string()),
        }
    }

    /// Run a parsed command
    ///
    /// Lifecycle commands are scheduled and return immediately.
    pub async fn execute(&self, command: ShellCommand) -> Reply {
        debug!("Executing shell command: {:?}", command);

        if let Some((operation, delay)) = command.operation() {
            self.manager.schedule(operation, delay);
            return Reply::Nothing;
        }

        match command {
            ShellCommand::List => {
                let table = self.manager.process_table(Table::new()).await;
                Reply::Text(table.to_string())
            }
            ShellCommand::Metadata { name } => match self.manager.metadata(&name).await {
                Ok(metadata) => Reply::Text(metadata.to_string()),
                Err(e) => Reply::Text(e.to_string()),
            },
            _ => Reply::Exit,
        }
    }

    /// Read commands from `input` until it ends or `exit` is entered
    pub async fn run<R>(&self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("Shell ready");
        let mut lines = input.lines();

        loop {
            print!("{}", self.prompt);
            io::stdout().flush()?;

            let Some(line) = lines.next().await else {
                println!();
                break;
            };

            match self.handle_line(&line?).await {
                Reply::Nothing => {}
                Reply::Text(text) => println!("{}", text),
                Reply::Exit => break,
            }
        }

        info!("Shell exiting");
        Ok(())
    }
}

//! Launch descriptors for managed processes

use process_launcher::{Command, OutputTarget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// How to launch a managed process
///
/// Supplied when a process is registered and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    /// Path to the executable
    pub executable: PathBuf,

    /// Command-line arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// File that receives stdout (discarded when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_log: Option<PathBuf>,

    /// File that receives stderr (discarded when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_log: Option<PathBuf>,
}

impl ProcessMetadata {
    /// Describe a process running `executable` with no arguments
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
            stdout_log: None,
            stderr_log: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Send stdout to a log file
    pub fn stdout_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_log = Some(path.into());
        self
    }

    /// Send stderr to a log file
    pub fn stderr_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr_log = Some(path.into());
        self
    }

    /// Build the launcher command for this descriptor
    pub fn to_command(&self) -> Command {
        let cmd = Command::new(&self.executable)
            .args(&self.args)
            .envs(&self.env)
            .stdout(log_target(&self.stdout_log))
            .stderr(log_target(&self.stderr_log));

        match &self.working_dir {
            Some(dir) => cmd.working_dir(dir),
            None => cmd,
        }
    }
}

fn log_target(path: &Option<PathBuf>) -> OutputTarget {
    match path {
        Some(path) => OutputTarget::File(path.clone()),
        None => OutputTarget::Null,
    }
}

impl fmt::Display for ProcessMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{}", self.executable.display()),
        }
    }
}

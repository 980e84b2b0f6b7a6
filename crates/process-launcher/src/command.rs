//! Description of a process to launch

use async_process::{Command as AsyncCommand, Stdio};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Where a child's stdout or stderr should go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    /// Share the parent's stream
    Inherit,
    /// Discard all output
    #[default]
    Null,
    /// Append to the given file, creating it if needed
    File(PathBuf),
}

impl OutputTarget {
    fn open(&self) -> std::io::Result<Stdio> {
        match self {
            OutputTarget::Inherit => Ok(Stdio::inherit()),
            OutputTarget::Null => Ok(Stdio::null()),
            OutputTarget::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Stdio::from(file))
            }
        }
    }
}

/// A reusable process description
///
/// Unlike `async_process::Command` this is `Clone` and holds no OS resources, so
/// the same description can be launched again after the process exits. Stdin is
/// always closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    env: BTreeMap<OsString, OsString>,
    env_clear: bool,
    working_dir: Option<PathBuf>,
    stdout: OutputTarget,
    stderr: OutputTarget,
}

impl Command {
    /// Describe a launch of `program`
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            env: BTreeMap::new(),
            env_clear: false,
            working_dir: None,
            stdout: OutputTarget::Null,
            stderr: OutputTarget::Null,
        }
    }

    /// Append an argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Set an environment variable
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, val: V) -> Self {
        self.env
            .insert(key.as_ref().to_owned(), val.as_ref().to_owned());
        self
    }

    /// Set several environment variables
    pub fn envs<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        vars.into_iter().fold(self, |cmd, (k, v)| cmd.env(k, v))
    }

    /// Start from an empty environment instead of inheriting the parent's
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Run in `dir`
    pub fn working_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Redirect stdout
    pub fn stdout(mut self, target: OutputTarget) -> Self {
        self.stdout = target;
        self
    }

    /// Redirect stderr
    pub fn stderr(mut self, target: OutputTarget) -> Self {
        self.stderr = target;
        self
    }

    /// The program to run
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, in order
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Variables set on top of (or instead of) the inherited environment
    pub fn environment(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    /// Working directory, if set
    pub fn current_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Stdout destination
    pub fn stdout_target(&self) -> &OutputTarget {
        &self.stdout
    }

    /// Stderr destination
    pub fn stderr_target(&self) -> &OutputTarget {
        &self.stderr
    }

    /// Build an `async_process::Command` ready to spawn
    ///
    /// Log files are opened here, so this fails if a destination is not writable.
    pub fn prepare(&self) -> std::io::Result<AsyncCommand> {
        let mut cmd = AsyncCommand::new(&self.program);
        cmd.args(&self.args);

        if self.env_clear {
            cmd.env_clear();
        }
        cmd.envs(&self.env);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(self.stdout.open()?)
            .stderr(self.stderr.open()?);

        Ok(cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

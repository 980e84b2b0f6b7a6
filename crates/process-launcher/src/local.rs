//! Local process launching backend

use async_process::Child;
use async_trait::async_trait;
use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::process::{ExitStatus, ProcessHandle, Signal};

/// Launcher for executing processes on the local host
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

/// A handle to control a local process
pub struct LocalProcessHandle {
    /// The underlying child process
    child: Child,
    /// Exit status once the child has been reaped
    exit: Option<ExitStatus>,
}

impl LocalProcessHandle {
    fn id(&self) -> u32 {
        self.child.id()
    }
}

#[async_trait]
impl Launcher for LocalLauncher {
    async fn launch(&self, command: &Command) -> Result<Box<dyn ProcessHandle>> {
        let program = command.program().to_string_lossy().into_owned();

        let mut async_cmd = command
            .prepare()
            .map_err(|e| Error::spawn_failed(&program, format!("failed to open output: {}", e)))?;

        let child = async_cmd
            .spawn()
            .map_err(|e| Error::spawn_failed(&program, e.to_string()))?;

        debug!("Spawned `{}` with PID {}", command, child.id());

        Ok(Box::new(LocalProcessHandle { child, exit: None }))
    }
}

#[async_trait]
impl ProcessHandle for LocalProcessHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.exit {
            return Ok(Some(status));
        }
        let status = self
            .child
            .try_status()
            .map_err(|e| Error::wait_failed(e.to_string()))?
            .map(ExitStatus::from);
        self.exit = status;
        Ok(status)
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let status = self
            .child
            .status()
            .await
            .map(ExitStatus::from)
            .map_err(|e| Error::wait_failed(e.to_string()))?;
        self.exit = Some(status);
        Ok(status)
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        let pid = self.id();
        if self.exit.is_some() {
            return Err(Error::ProcessGone { pid });
        }

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{self as nix_signal, Signal as NixSignal};
            use nix::unistd::Pid;

            let nix_sig = match signal {
                Signal::Terminate => NixSignal::SIGTERM,
                Signal::Kill => NixSignal::SIGKILL,
                Signal::Interrupt => NixSignal::SIGINT,
            };

            match nix_signal::kill(Pid::from_raw(pid as i32), nix_sig) {
                Ok(()) => {}
                Err(Errno::ESRCH) => return Err(Error::ProcessGone { pid }),
                Err(e) => return Err(Error::signal_failed(signal, e.to_string())),
            }
        }

        #[cfg(not(unix))]
        {
            // Only forceful termination exists off Unix
            self.child
                .kill()
                .map_err(|e| Error::signal_failed(signal, e.to_string()))?;
        }

        debug!("Sent {} to PID {}", signal, pid);
        Ok(())
    }
}

impl Drop for LocalProcessHandle {
    fn drop(&mut self) {
        // Never leave an unowned child behind
        if self.exit.is_none() && matches!(self.child.try_status(), Ok(None)) {
            let _ = self.child.kill();
        }
    }
}

//! Lifecycle transitions against the OS
//!
//! The controller is the only code that changes an entry's state. Every
//! transition starts with a precondition check under the registry lock; a
//! request that finds the entry mid-transition is rejected with
//! [`Error::InvalidState`] rather than queued.

use crate::config::ManagerConfig;
use crate::entry::{ProcessEntry, ProcessState, SharedHandle};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::sweep::SweepReport;
use async_io::Timer;
use futures::future::{self, Either};
use process_launcher::{ExitStatus, Launcher, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A lifecycle action on a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Spawn the process
    Start,
    /// Graceful termination
    Stop,
    /// Forceful termination
    Kill,
    /// Stop if needed, then delete the entry
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Kill => "kill",
            Action::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// Performs state transitions on registry entries
pub struct LifecycleController {
    registry: Arc<Registry>,
    launcher: Arc<dyn Launcher>,
    config: ManagerConfig,
}

impl LifecycleController {
    /// Create a controller over `registry` that spawns through `launcher`
    pub fn new(registry: Arc<Registry>, launcher: Arc<dyn Launcher>, config: ManagerConfig) -> Self {
        Self {
            registry,
            launcher,
            config,
        }
    }

    /// The registry this controller mutates
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Controller settings
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Spawn a stopped entry
    ///
    /// The entry shows `Starting` while the spawn runs without the registry
    /// lock; concurrent requests against it fail with [`Error::InvalidState`].
    pub async fn start(&self, name: &str) -> Result<()> {
        let command = {
            let mut entries = self.registry.lock().await;
            let entry = entries.get_mut(name).ok_or_else(|| Error::not_found(name))?;

            if entry.state() != ProcessState::Stopped {
                return Err(Error::invalid_state(name, entry.state(), Action::Start));
            }

            info!("Starting process: {}", name);
            entry.begin_start();
            entry.metadata().to_command()
        };

        let launched = self.launcher.launch(&command).await;

        let mut entries = self.registry.lock().await;
        // A `Starting` entry cannot be removed, so it is still here
        let Some(entry) = entries.get_mut(name) else {
            return Err(Error::not_found(name));
        };

        match launched {
            Ok(handle) => {
                entry.mark_running(handle);
                info!("Started process '{}' with PID: {:?}", name, entry.pid());
                Ok(())
            }
            Err(e) => {
                let err = Error::spawn_failed(name, e.to_string());
                entry.mark_stopped();
                entry.record_error(&err);
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// Gracefully stop a running entry and wait for it to exit
    ///
    /// With a stop timeout configured, a process that outlives it is killed.
    pub async fn stop(&self, name: &str) -> Result<()> {
        self.halt(name, Action::Stop).await
    }

    /// Forcefully kill a running entry and wait for it to exit
    pub async fn kill(&self, name: &str) -> Result<()> {
        self.halt(name, Action::Kill).await
    }

    /// Stop an entry if needed, then delete it
    ///
    /// Rejected while the entry is `Starting` or `Stopping`. A running entry is
    /// terminated and stays `Stopping` until it exits. A failed stop does not
    /// block removal; dropping the entry's handle kills whatever process it
    /// still owns.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let handle = {
            let mut entries = self.registry.lock().await;
            let entry = entries.get_mut(name).ok_or_else(|| Error::not_found(name))?;

            match entry.state() {
                ProcessState::Stopped => {
                    entries.remove(name);
                    info!("Removed process: {}", name);
                    return Ok(());
                }
                ProcessState::Running => {}
                state => return Err(Error::invalid_state(name, state, Action::Remove)),
            }

            match self.signal_entry(entry, name, Signal::Terminate).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Stop before removing '{}' failed, removing anyway: {}", name, e);
                    entries.remove(name);
                    info!("Removed process: {}", name);
                    return Ok(());
                }
            }
        };

        if let Err(e) = self.await_exit(name, &handle, Signal::Terminate).await {
            warn!("Stop before removing '{}' failed, removing anyway: {}", name, e);
        }

        let mut entries = self.registry.lock().await;
        if entries.get(name).is_some_and(|entry| entry.owns(&handle)) {
            entries.remove(name);
        }
        info!("Removed process: {}", name);
        Ok(())
    }

    /// Apply a single-entry action
    pub async fn apply(&self, action: Action, name: &str) -> Result<()> {
        match action {
            Action::Start => self.start(name).await,
            Action::Stop => self.stop(name).await,
            Action::Kill => self.kill(name).await,
            Action::Remove => self.remove(name).await,
        }
    }

    /// Start every stopped entry
    pub async fn start_all(&self) -> SweepReport {
        self.sweep(Action::Start, ProcessState::Running).await
    }

    /// Stop every running entry
    pub async fn stop_all(&self) -> SweepReport {
        self.sweep(Action::Stop, ProcessState::Stopped).await
    }

    /// Kill every running entry
    pub async fn kill_all(&self) -> SweepReport {
        self.sweep(Action::Kill, ProcessState::Stopped).await
    }

    /// Apply `action` to each entry in name order, continuing past failures
    ///
    /// Entries already in `satisfied` are skipped; entries removed while the
    /// sweep runs are ignored.
    async fn sweep(&self, action: Action, satisfied: ProcessState) -> SweepReport {
        let mut report = SweepReport::new(action);

        for name in self.registry.names().await {
            match self.registry.lookup(&name).await {
                Ok(entry) if entry.state == satisfied => {
                    report.record_skipped(name);
                    continue;
                }
                Ok(_) => {}
                Err(_) => continue,
            }

            match self.apply(action, &name).await {
                Ok(()) => report.record_success(name),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    debug!("Sweep {} failed on '{}': {}", action, name, e);
                    report.record_failure(name, e);
                }
            }
        }

        report
    }

    async fn halt(&self, name: &str, action: Action) -> Result<()> {
        let signal = match action {
            Action::Kill => Signal::Kill,
            _ => Signal::Terminate,
        };

        let handle = {
            let mut entries = self.registry.lock().await;
            let entry = entries.get_mut(name).ok_or_else(|| Error::not_found(name))?;

            if entry.state() != ProcessState::Running {
                return Err(Error::invalid_state(name, entry.state(), action));
            }

            self.signal_entry(entry, name, signal).await?
        };

        // Waiting happens without the registry lock
        let outcome = self.await_exit(name, &handle, signal).await;

        let mut entries = self.registry.lock().await;
        if let Some(entry) = entries.get_mut(name) {
            if entry.owns(&handle) {
                entry.mark_stopped();
                if let Err(e) = &outcome {
                    entry.record_error(e);
                }
            }
        }

        match outcome {
            Ok(status) => {
                info!("Process '{}' stopped ({})", name, status);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Deliver `signal` to a running entry and move it to `Stopping`
    ///
    /// Called with the registry lock held. An entry whose process already
    /// exited is marked `Stopped` and reported stale; any other signal failure
    /// leaves it `Running`.
    async fn signal_entry(
        &self,
        entry: &mut ProcessEntry,
        name: &str,
        signal: Signal,
    ) -> Result<SharedHandle> {
        let Some(handle) = entry.handle().cloned() else {
            let err = Error::stale(name);
            entry.mark_stopped();
            entry.record_error(&err);
            return Err(err);
        };

        let mut process = handle.lock().await;

        if let Ok(Some(status)) = process.try_wait() {
            drop(process);
            let err = Error::stale(name);
            warn!("Process '{}' had already exited ({})", name, status);
            entry.mark_stopped();
            entry.record_error(&err);
            return Err(err);
        }

        info!("Sending {} to process: {}", signal, name);
        let delivered = process.signal(signal).await;
        match delivered {
            Ok(()) => {}
            Err(e) if e.is_process_gone() => {
                drop(process);
                let err = Error::stale(name);
                warn!("Process '{}' was gone before {}", name, signal);
                entry.mark_stopped();
                entry.record_error(&err);
                return Err(err);
            }
            Err(e) => {
                let err = Error::signal_failed(name, e.to_string());
                warn!("{}", err);
                entry.record_error(&err);
                return Err(err);
            }
        }

        drop(process);
        entry.mark_stopping();
        Ok(handle)
    }

    async fn await_exit(&self, name: &str, handle: &SharedHandle, signal: Signal) -> Result<ExitStatus> {
        let mut process = handle.lock().await;

        let timeout = match (signal, self.config.stop_timeout()) {
            (Signal::Terminate, Some(timeout)) => timeout,
            _ => return process.wait().await.map_err(|e| Error::launcher(name, e)),
        };

        let exited = match future::select(process.wait(), Timer::after(timeout)).await {
            Either::Left((status, _)) => Some(status),
            Either::Right(_) => None,
        };
        if let Some(status) = exited {
            return status.map_err(|e| Error::launcher(name, e));
        }

        warn!(
            "Process '{}' did not exit within {}, killing",
            name,
            format_secs(timeout)
        );
        match process.kill().await {
            Ok(()) => {}
            Err(e) if e.is_process_gone() => {}
            Err(e) => return Err(Error::signal_failed(name, e.to_string())),
        }
        process.wait().await.map_err(|e| Error::launcher(name, e))
    }
}

fn format_secs(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f64())
}

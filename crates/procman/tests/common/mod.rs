//! Shared helpers for procman integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use procman::process_launcher::{
    self, Command, ExitStatus, Launcher, ProcessHandle, Signal,
};
use procman::{ProcessManager, ProcessMetadata, ProcessState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Install a test-friendly tracing subscriber once per binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("procman=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// How a fake program reacts to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    /// Exits on any signal
    #[default]
    Normal,
    /// The launch itself fails
    FailSpawn,
    /// Signal delivery fails with a permission error
    FailSignal,
    /// Exits immediately after launch
    AlreadyExited,
    /// Survives SIGTERM, exits on SIGKILL
    IgnoreTerminate,
}

struct Shared {
    exit: Mutex<Option<ExitStatus>>,
    signals: Mutex<Vec<Signal>>,
    exited_tx: async_channel::Sender<()>,
    exited_rx: async_channel::Receiver<()>,
}

/// Observer side of a process launched by [`FakeLauncher`]
#[derive(Clone)]
pub struct FakeProcess {
    pid: u32,
    behavior: Behavior,
    state: Arc<Shared>,
}

impl FakeProcess {
    fn new(pid: u32, behavior: Behavior) -> Self {
        let (exited_tx, exited_rx) = async_channel::unbounded();
        let process = Self {
            pid,
            behavior,
            state: Arc::new(Shared {
                exit: Mutex::new(None),
                signals: Mutex::new(Vec::new()),
                exited_tx,
                exited_rx,
            }),
        };
        if behavior == Behavior::AlreadyExited {
            process.exit(ExitStatus { code: Some(0), signal: None });
        }
        process
    }

    /// Pid reported by the handle
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Make the process exit with `status`
    pub fn exit(&self, status: ExitStatus) {
        let mut exit = self.state.exit.lock().unwrap();
        if exit.is_none() {
            *exit = Some(status);
            let _ = self.state.exited_tx.try_send(());
        }
    }

    /// Exit status, if the process has exited
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.state.exit.lock().unwrap()
    }

    /// Whether the process has exited
    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Signals delivered so far
    pub fn signals(&self) -> Vec<Signal> {
        self.state.signals.lock().unwrap().clone()
    }

    fn killed_by(&self, signal: Signal) {
        self.exit(ExitStatus {
            code: None,
            signal: Some(signal.number()),
        });
    }
}

struct FakeHandle {
    process: FakeProcess,
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.process.pid)
    }

    fn try_wait(&mut self) -> process_launcher::Result<Option<ExitStatus>> {
        Ok(self.process.exit_status())
    }

    async fn wait(&mut self) -> process_launcher::Result<ExitStatus> {
        loop {
            if let Some(status) = self.process.exit_status() {
                return Ok(status);
            }
            self.process
                .state
                .exited_rx
                .recv()
                .await
                .map_err(|e| process_launcher::Error::wait_failed(e.to_string()))?;
        }
    }

    async fn signal(&mut self, signal: Signal) -> process_launcher::Result<()> {
        if self.process.behavior == Behavior::FailSignal {
            return Err(process_launcher::Error::signal_failed(
                signal,
                "operation not permitted",
            ));
        }
        if self.process.has_exited() {
            return Err(process_launcher::Error::ProcessGone {
                pid: self.process.pid,
            });
        }

        self.process.state.signals.lock().unwrap().push(signal);
        match (self.process.behavior, signal) {
            (Behavior::IgnoreTerminate, Signal::Terminate) => {}
            _ => self.process.killed_by(signal),
        }
        Ok(())
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.process.killed_by(Signal::Kill);
    }
}

#[derive(Default)]
struct LauncherState {
    behaviors: HashMap<String, Behavior>,
    launched: HashMap<String, Vec<FakeProcess>>,
}

/// Launcher whose processes exist only in memory
///
/// Programs are looked up by their executable string.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<LauncherState>>,
    next_pid: Arc<AtomicU32>,
    gate: Arc<Mutex<Option<async_channel::Receiver<()>>>>,
}

impl FakeLauncher {
    /// Create a launcher where every program behaves normally
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            next_pid: Arc::new(AtomicU32::new(1000)),
            gate: Arc::default(),
        }
    }

    /// Hold every later launch until a message arrives on the returned sender
    ///
    /// Each message releases one launch; dropping the sender releases them all.
    pub fn hold_launches(&self) -> async_channel::Sender<()> {
        let (tx, rx) = async_channel::unbounded();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Set how `program` behaves on its next launches
    pub fn set_behavior(&self, program: &str, behavior: Behavior) {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .insert(program.to_string(), behavior);
    }

    /// Number of successful launches of `program`
    pub fn launch_count(&self, program: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .launched
            .get(program)
            .map_or(0, Vec::len)
    }

    /// Most recent process launched for `program`
    pub fn last(&self, program: &str) -> Option<FakeProcess> {
        self.state
            .lock()
            .unwrap()
            .launched
            .get(program)
            .and_then(|procs| procs.last().cloned())
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, command: &Command) -> process_launcher::Result<Box<dyn ProcessHandle>> {
        let program = command.program().to_string_lossy().into_owned();
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let _ = gate.recv().await;
        }

        let mut state = self.state.lock().unwrap();
        let behavior = state.behaviors.get(&program).copied().unwrap_or_default();

        if behavior == Behavior::FailSpawn {
            return Err(process_launcher::Error::spawn_failed(
                program,
                "No such file or directory (os error 2)",
            ));
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let process = FakeProcess::new(pid, behavior);
        state
            .launched
            .entry(program)
            .or_default()
            .push(process.clone());

        Ok(Box::new(FakeHandle { process }))
    }
}

/// Manager backed by `launcher` with a short stop timeout
pub fn manager_with(launcher: &FakeLauncher) -> ProcessManager {
    init_tracing();
    ProcessManager::builder()
        .launcher(launcher.clone())
        .stop_timeout(Some(Duration::from_millis(200)))
        .build()
}

/// Metadata whose executable is `program`
pub fn meta(program: &str) -> ProcessMetadata {
    ProcessMetadata::new(program)
}

/// Poll until `name` reaches `state`, giving up after `timeout`
pub async fn wait_for_state(
    manager: &ProcessManager,
    name: &str,
    state: ProcessState,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(entry) = manager.lookup(name).await {
            if entry.state == state {
                return true;
            }
        }
        async_io::Timer::after(Duration::from_millis(10)).await;
    }
    false
}

/// Poll until `name` is no longer registered
pub async fn wait_for_removal(manager: &ProcessManager, name: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if manager.lookup(name).await.is_err() {
            return true;
        }
        async_io::Timer::after(Duration::from_millis(10)).await;
    }
    false
}

//! The process manager facade
//!
//! [`ProcessManager`] ties the registry, lifecycle controller and scheduler
//! together behind the operations an embedding shell calls. It is explicitly
//! constructed and cheap to clone; there is no global instance.

use crate::config::ManagerConfig;
use crate::entry::EntrySnapshot;
use crate::error::Result;
use crate::lifecycle::LifecycleController;
use crate::metadata::ProcessMetadata;
use crate::registry::Registry;
use crate::schedule::{self, Operation, ScheduledOperation, Scheduler, SmolSpawner, Spawner};
use crate::sink::{OutputSink, TracingSink};
use crate::sweep::SweepReport;
use crate::table::{self, ProcessRow, TableRenderer};
use chrono::Utc;
use process_launcher::{Launcher, LocalLauncher};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Registry of named child processes with lifecycle control
#[derive(Clone)]
pub struct ProcessManager {
    registry: Arc<Registry>,
    controller: Arc<LifecycleController>,
    scheduler: Scheduler,
    sink: Arc<dyn OutputSink>,
}

impl ProcessManager {
    /// Manager that launches local processes and reports through `tracing`
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a manager
    pub fn builder() -> ProcessManagerBuilder {
        ProcessManagerBuilder::default()
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Add a stopped entry
    pub async fn register(&self, name: impl Into<String>, metadata: ProcessMetadata) -> Result<()> {
        self.registry.register(name, metadata).await
    }

    /// Start the named process
    pub async fn start_process(&self, name: &str) -> Result<()> {
        self.controller.start(name).await
    }

    /// Gracefully stop the named process, waiting for it to exit
    pub async fn stop_process(&self, name: &str) -> Result<()> {
        self.controller.stop(name).await
    }

    /// Kill the named process, waiting for it to exit
    pub async fn kill_process(&self, name: &str) -> Result<()> {
        self.controller.kill(name).await
    }

    /// Stop the named process if needed and remove it
    pub async fn remove_process(&self, name: &str) -> Result<()> {
        self.controller.remove(name).await
    }

    /// Start every stopped process
    pub async fn start_all_processes(&self) -> SweepReport {
        self.controller.start_all().await
    }

    /// Stop every running process
    pub async fn stop_all_processes(&self) -> SweepReport {
        self.controller.stop_all().await
    }

    /// Kill every running process
    pub async fn kill_all_processes(&self) -> SweepReport {
        self.controller.kill_all().await
    }

    /// Launch descriptor of the named process
    pub async fn metadata(&self, name: &str) -> Result<Arc<ProcessMetadata>> {
        self.registry.metadata(name).await
    }

    /// Current state of the named process
    pub async fn lookup(&self, name: &str) -> Result<EntrySnapshot> {
        self.registry.lookup(name).await
    }

    /// Point-in-time copy of every entry, in name order
    pub async fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.registry.all().await
    }

    /// Fill `renderer` with one row per entry and hand it back
    pub async fn process_table<R: TableRenderer>(&self, mut renderer: R) -> R {
        let rows: Vec<ProcessRow> = self.snapshot().await.into_iter().map(ProcessRow::from).collect();
        table::fill(&mut renderer, &rows, Utc::now());
        renderer
    }

    /// Run `operation` now, reporting failures to the output sink
    pub async fn execute(&self, operation: &Operation) {
        schedule::run(&self.controller, self.sink.as_ref(), operation).await;
    }

    /// Run `operation` after `delay` on a background task
    pub fn schedule(&self, operation: Operation, delay: Duration) -> ScheduledOperation {
        self.scheduler.schedule(operation, delay)
    }

    /// Start the named process after `delay`
    pub fn schedule_start(&self, name: impl Into<String>, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::Start(name.into()), delay)
    }

    /// Stop the named process after `delay`
    pub fn schedule_stop(&self, name: impl Into<String>, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::Stop(name.into()), delay)
    }

    /// Kill the named process after `delay`
    pub fn schedule_kill(&self, name: impl Into<String>, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::Kill(name.into()), delay)
    }

    /// Remove the named process after `delay`
    pub fn schedule_remove(&self, name: impl Into<String>, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::Remove(name.into()), delay)
    }

    /// Start every process after `delay`
    pub fn schedule_start_all(&self, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::StartAll, delay)
    }

    /// Stop every process after `delay`
    pub fn schedule_stop_all(&self, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::StopAll, delay)
    }

    /// Kill every process after `delay`
    pub fn schedule_kill_all(&self, delay: Duration) -> ScheduledOperation {
        self.schedule(Operation::KillAll, delay)
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ProcessManager`]
#[derive(Default)]
pub struct ProcessManagerBuilder {
    launcher: Option<Arc<dyn Launcher>>,
    sink: Option<Arc<dyn OutputSink>>,
    spawner: Option<Arc<dyn Spawner>>,
    config: ManagerConfig,
}

impl ProcessManagerBuilder {
    /// Launch processes through `launcher` (default: [`LocalLauncher`])
    pub fn launcher(mut self, launcher: impl Launcher) -> Self {
        self.launcher = Some(Arc::new(launcher));
        self
    }

    /// Report asynchronous messages to `sink` (default: [`TracingSink`])
    pub fn sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Run scheduled operations on `spawner` (default: [`SmolSpawner`])
    pub fn spawner(mut self, spawner: impl Spawner + 'static) -> Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    /// Controller settings
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Graceful stop timeout; `None` waits forever
    pub fn stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_stop_timeout(timeout);
        self
    }

    /// Build the manager
    pub fn build(self) -> ProcessManager {
        info!("Initializing ProcessManager with {:?}", self.config);

        let registry = Arc::new(Registry::new());
        let launcher = self.launcher.unwrap_or_else(|| Arc::new(LocalLauncher));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let spawner = self.spawner.unwrap_or_else(|| Arc::new(SmolSpawner));

        let controller = Arc::new(LifecycleController::new(registry.clone(), launcher, self.config));
        let scheduler = Scheduler::new(controller.clone(), sink.clone(), spawner);

        ProcessManager {
            registry,
            controller,
            scheduler,
            sink,
        }
    }
}

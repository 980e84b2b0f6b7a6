//! # Procman
//!
//! A supervisor for named child processes. A [`ProcessManager`] keeps a registry of
//! entries, each with a launch descriptor and a lifecycle state, and offers
//! start/stop/kill/remove on single entries, sweeps over all of them, delayed
//! background execution of any of those, and metadata and table queries.
//!
//! ## Example
//!
//! ```no_run
//! use procman::{PlainTable, ProcessManager, ProcessMetadata};
//! use std::time::Duration;
//!
//! # async fn example() -> procman::Result<()> {
//! let manager = ProcessManager::new();
//! manager
//!     .register("node-1", ProcessMetadata::new("/usr/local/bin/node").arg("--id=1"))
//!     .await?;
//!
//! manager.start_process("node-1").await?;
//! manager.schedule_stop("node-1", Duration::from_secs(30));
//!
//! let table = manager.process_table(PlainTable::default()).await;
//! assert_eq!(table.rows.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
mod entry;
mod error;
mod lifecycle;
mod manager;
mod metadata;
mod registry;
mod schedule;
pub mod sink;
mod sweep;
pub mod table;

pub use config::{ConfigError, ManagerConfig, ProcessFile};
pub use entry::{EntrySnapshot, ProcessEntry, ProcessState};
pub use error::{Error, Result};
pub use lifecycle::{Action, LifecycleController};
pub use manager::{ProcessManager, ProcessManagerBuilder};
pub use metadata::ProcessMetadata;
pub use registry::Registry;
pub use schedule::{Operation, ScheduledOperation, Scheduler, SmolSpawner, Spawner};
pub use sink::{ChannelSink, OutputSink, SinkLevel, SinkMessage, TracingSink};
pub use sweep::{SweepFailure, SweepReport};
pub use table::{PlainTable, ProcessRow, TableRenderer};

pub use process_launcher;

//! Tabular process listings
//!
//! Rendering is left to the caller: the manager only fills a [`TableRenderer`].

use crate::entry::{EntrySnapshot, ProcessState};
use chrono::{DateTime, Utc};
use comfy_table::Table;

/// Column headers of the process table
pub const HEADER: [&str; 4] = ["NAME", "STATE", "PID", "UPTIME"];

/// Something that accepts a header and rows of text cells
pub trait TableRenderer {
    /// Set the column headers
    fn set_header(&mut self, header: Vec<String>);

    /// Append a row
    fn add_row(&mut self, row: Vec<String>);
}

impl TableRenderer for Table {
    fn set_header(&mut self, header: Vec<String>) {
        Table::set_header(self, header);
    }

    fn add_row(&mut self, row: Vec<String>) {
        Table::add_row(self, row);
    }
}

/// Plain in-memory table, handy for tests and JSON output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainTable {
    /// Column headers
    pub header: Vec<String>,
    /// Rows, in insertion order
    pub rows: Vec<Vec<String>>,
}

impl TableRenderer for PlainTable {
    fn set_header(&mut self, header: Vec<String>) {
        self.header = header;
    }

    fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// One row of the process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRow {
    /// Entry name
    pub name: String,
    /// Lifecycle state
    pub state: ProcessState,
    /// PID while the entry holds a process
    pub pid: Option<u32>,
    /// When the current process was spawned
    pub started_at: Option<DateTime<Utc>>,
}

impl ProcessRow {
    /// Render the row's cells, measuring uptime against `now`
    pub fn cells(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.name.clone(),
            self.state.to_string(),
            self.pid.map_or_else(|| "-".to_string(), |pid| pid.to_string()),
            self.started_at
                .map_or_else(|| "-".to_string(), |at| format_uptime(now - at)),
        ]
    }
}

impl From<EntrySnapshot> for ProcessRow {
    fn from(entry: EntrySnapshot) -> Self {
        Self {
            name: entry.name,
            state: entry.state,
            pid: entry.pid,
            started_at: entry.started_at,
        }
    }
}

/// Fill `renderer` with the header and one row per entry
pub fn fill<R: TableRenderer>(renderer: &mut R, rows: &[ProcessRow], now: DateTime<Utc>) {
    renderer.set_header(HEADER.iter().map(|h| h.to_string()).collect());
    for row in rows {
        renderer.add_row(row.cells(now));
    }
}

/// Format a duration as e.g. `1h02m03s`
pub fn format_uptime(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

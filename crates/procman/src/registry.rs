//! The registry of named process entries
//!
//! All access goes through one registry-wide async lock, so every visible
//! mutation is atomic with respect to other tasks and a listing taken under the
//! lock is a single point-in-time view.

use crate::entry::{EntrySnapshot, ProcessEntry};
use crate::error::{Error, Result};
use crate::metadata::ProcessMetadata;
use futures::lock::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Exclusive view of every entry, keyed and ordered by name
pub(crate) type Entries = BTreeMap<String, ProcessEntry>;

/// Owner of the `name -> entry` mapping
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<Entries>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new stopped entry
    pub async fn register(&self, name: impl Into<String>, metadata: ProcessMetadata) -> Result<()> {
        let name = name.into();
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&name) {
            return Err(Error::AlreadyRegistered { name });
        }
        debug!("Registered process: {}", name);
        entries.insert(name.clone(), ProcessEntry::new(name, metadata));
        Ok(())
    }

    /// Snapshot of a single entry
    pub async fn lookup(&self, name: &str) -> Result<EntrySnapshot> {
        self.entries
            .lock()
            .await
            .get(name)
            .map(ProcessEntry::snapshot)
            .ok_or_else(|| Error::not_found(name))
    }

    /// Launch descriptor of an entry
    pub async fn metadata(&self, name: &str) -> Result<Arc<ProcessMetadata>> {
        self.entries
            .lock()
            .await
            .get(name)
            .map(|entry| entry.metadata().clone())
            .ok_or_else(|| Error::not_found(name))
    }

    /// Snapshots of all entries in name order, taken under one lock
    pub async fn all(&self) -> Vec<EntrySnapshot> {
        self.entries
            .lock()
            .await
            .values()
            .map(ProcessEntry::snapshot)
            .collect()
    }

    /// Entry names in name order
    pub async fn names(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }

    /// Number of registered entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the registry has no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Apply `f` to an entry with exclusive access
    ///
    /// No other task observes the entry until `f` returns.
    pub async fn mutate<F, R>(&self, name: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut ProcessEntry) -> R,
    {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(name).ok_or_else(|| Error::not_found(name))?;
        Ok(f(entry))
    }

    /// Delete an entry, returning it
    ///
    /// A returned entry that still owns a live process kills it when dropped.
    pub async fn remove(&self, name: &str) -> Result<ProcessEntry> {
        let removed = self
            .entries
            .lock()
            .await
            .remove(name)
            .ok_or_else(|| Error::not_found(name))?;
        debug!("Removed process: {}", name);
        Ok(removed)
    }

    /// Hold the registry lock across a multi-step transition
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().await
    }
}

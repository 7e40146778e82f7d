//! Configured entries and their lifecycle
//!
//! Each entry owns one coordinator task. The registry is held by the binary
//! and is the only place entries are looked up.

use crate::config::{Config, WindowConfig};
use crate::coordinator::{Coordinator, CoordinatorHandle};
use crate::error::{NedError, Result};
use crate::logging::get_logger;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A running entry
#[derive(Debug)]
pub struct EntryHandle {
    pub entry_id: String,
    pub coordinator: CoordinatorHandle,
    pub created_at: DateTime<Utc>,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: HashMap<String, EntryHandle>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up an entry polling the NED API as configured
    pub async fn setup_entry(&mut self, config: &Config) -> Result<String> {
        let coordinator = Coordinator::from_config(config)?;
        self.setup_with_coordinator(coordinator).await
    }

    /// Run the first refresh, then spawn the coordinator and register it
    ///
    /// Nothing is registered when the first refresh fails.
    pub async fn setup_with_coordinator(&mut self, coordinator: Coordinator) -> Result<String> {
        let entry_id = Uuid::new_v4().simple().to_string();
        let mut coordinator = coordinator.with_entry_id(&entry_id);

        coordinator.first_refresh().await.map_err(NedError::NotReady)?;

        let handle = coordinator.handle()?;
        let task = tokio::spawn(coordinator.run());
        get_logger("entry").info(&format!("Entry {} set up", entry_id));

        self.entries.insert(
            entry_id.clone(),
            EntryHandle {
                entry_id: entry_id.clone(),
                coordinator: handle,
                created_at: Utc::now(),
                task,
            },
        );
        Ok(entry_id)
    }

    pub fn get(&self, entry_id: &str) -> Option<&CoordinatorHandle> {
        self.entries.get(entry_id).map(|e| &e.coordinator)
    }

    pub fn entry_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace an entry's options; its coordinator refreshes afterwards
    pub fn update_entry(&self, entry_id: &str, options: WindowConfig) -> Result<()> {
        let entry = self
            .entries
            .get(entry_id)
            .ok_or_else(|| NedError::unknown_entry(entry_id))?;
        entry.coordinator.update_options(options)
    }

    /// Stop and forget an entry; returns whether it existed
    pub async fn unload_entry(&mut self, entry_id: &str) -> bool {
        let Some(entry) = self.entries.remove(entry_id) else {
            return false;
        };
        // A coordinator that already exited has nothing left to stop
        let _ = entry.coordinator.shutdown();
        if let Err(e) = entry.task.await {
            get_logger("entry").warn(&format!("Coordinator task for {} ended abnormally: {}", entry_id, e));
        }
        get_logger("entry").info(&format!("Entry {} unloaded", entry_id));
        true
    }

    /// Unload every entry
    pub async fn unload_all(&mut self) {
        for entry_id in self.entry_ids() {
            self.unload_entry(&entry_id).await;
        }
    }
}

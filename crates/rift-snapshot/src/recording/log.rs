//! Captured-exchange log.
//!
//! The proxying path appends while snapshots read. Readers get a
//! point-in-time copy of the entry list, so exchanges appended after the
//! read never show up mid-pipeline and already-read entries are shared
//! immutably through `Arc`.

use super::types::ServeEvent;
use parking_lot::RwLock;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Read side of the exchange log as seen by the snapshot pipeline.
pub trait ServeEventLog: Send + Sync {
    /// All captured exchanges, oldest first, as of the moment of the call.
    fn serve_events(&self) -> Vec<Arc<ServeEvent>>;
}

/// Append-only in-memory exchange log.
#[derive(Default)]
pub struct InMemoryServeEventLog {
    events: RwLock<Vec<Arc<ServeEvent>>>,
}

impl InMemoryServeEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: ServeEvent) -> Uuid {
        let id = event.id;
        self.events.write().push(Arc::new(event));
        debug!(event_id = %id, "Captured exchange");
        id
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Save the log to a JSON array file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let events: Vec<ServeEvent> = self.events.read().iter().map(|e| (**e).clone()).collect();
        let json = serde_json::to_string_pretty(&events)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, json)?;
        info!("Saved {} exchanges to {:?}", events.len(), path);
        Ok(())
    }

    /// Append every exchange from a JSON array file, keeping file order.
    pub fn load_from_file(&self, path: &Path) -> Result<usize, std::io::Error> {
        let json = fs::read_to_string(path)?;
        let events: Vec<ServeEvent> = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        let count = events.len();
        let mut store = self.events.write();
        store.extend(events.into_iter().map(Arc::new));

        info!("Loaded {} exchanges from {:?}", count, path);
        Ok(count)
    }
}

impl ServeEventLog for InMemoryServeEventLog {
    fn serve_events(&self) -> Vec<Arc<ServeEvent>> {
        self.events.read().clone()
    }
}

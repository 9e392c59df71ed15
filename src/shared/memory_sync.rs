use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::Reading;
use crate::error::SyncError;
use crate::sync::RemoteSync;

/// Remote sync adapter backed by process memory
///
/// Assigns sequential ids starting at 1. Useful for offline operation and
/// as a deterministic collaborator in tests.
#[derive(Debug)]
pub struct InMemorySync {
    next_id: AtomicI64,
    plots: Mutex<HashMap<i64, Vec<Reading>>>,
}

impl Default for InMemorySync {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySync {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            plots: Mutex::new(HashMap::new()),
        }
    }

    /// Store readings for a plot as if they had been persisted earlier
    /// Readings without an id are given one
    pub fn seed_plot(&self, plot_id: i64, readings: Vec<Reading>) {
        let seeded = readings
            .into_iter()
            .map(|reading| {
                if reading.is_persisted() {
                    reading
                } else {
                    reading.with_id(self.allocate_id())
                }
            })
            .collect();
        self.lock().insert(plot_id, seeded);
    }

    /// Total readings held across all plots
    pub fn persisted_count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Vec<Reading>>> {
        self.plots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RemoteSync for InMemorySync {
    async fn fetch_readings_for_plot(&self, plot_id: i64) -> Result<Vec<Reading>, SyncError> {
        Ok(self.lock().get(&plot_id).cloned().unwrap_or_default())
    }

    async fn persist_reading(&self, reading: &Reading) -> Result<Reading, SyncError> {
        let persisted = reading.with_id(self.allocate_id());
        self.lock()
            .entry(persisted.plot_id())
            .or_default()
            .push(persisted.clone());
        Ok(persisted)
    }
}

use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::domain::Alert;
use crate::events::{self, StoreEvent};

/// Ordered, in-memory log of alerts raised by incoming readings
///
/// Alerts keep arrival order and are never deduplicated. They live until
/// [`AlertLog::clear`] or process exit.
#[derive(Debug)]
pub struct AlertLog {
    alerts: Mutex<Vec<Alert>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_events(events::channel())
    }

    /// Create a log that publishes on an existing event channel
    pub fn with_events(events: broadcast::Sender<StoreEvent>) -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn record(&self, alert: Alert) {
        warn!(
            plot_id = alert.plot_id,
            reading_type = %alert.reading_type,
            value = alert.value,
            "{}",
            alert.message
        );
        let plot_id = alert.plot_id;
        self.lock().push(alert);
        events::notify(&self.events, StoreEvent::AlertRaised { plot_id });
    }

    /// Snapshot of all alerts in arrival order
    pub fn all(&self) -> Vec<Alert> {
        self.lock().clone()
    }

    pub fn for_plot(&self, plot_id: i64) -> Vec<Alert> {
        self.lock()
            .iter()
            .filter(|alert| alert.plot_id == plot_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every alert; calling it on an empty log is a no-op
    pub fn clear(&self) {
        let cleared = {
            let mut alerts = self.lock();
            let count = alerts.len();
            alerts.clear();
            count
        };
        info!(cleared, "Alert log cleared");
        events::notify(&self.events, StoreEvent::AlertsCleared);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // A poisoned lock only means another task panicked mid-push; the Vec is still valid
    fn lock(&self) -> MutexGuard<'_, Vec<Alert>> {
        self.alerts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

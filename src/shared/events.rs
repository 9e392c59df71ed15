use tokio::sync::broadcast;

/// Default capacity of the change-notification channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification emitted after a store or alert-log mutation completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ReadingAppended { plot_id: i64, reading_id: i64 },
    PlotReplaced { plot_id: i64, count: usize },
    AlertRaised { plot_id: i64 },
    AlertsCleared,
}

/// Send an event, ignoring the case where nobody is subscribed
pub(crate) fn notify(sender: &broadcast::Sender<StoreEvent>, event: StoreEvent) {
    if sender.send(event).is_err() {
        tracing::trace!("No subscribers for store event");
    }
}

pub(crate) fn channel() -> broadcast::Sender<StoreEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

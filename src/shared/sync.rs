//! Boundary to the remote API that owns durable reading storage
//!
//! The transport (HTTP, JSON shape, base URL, credentials) belongs to the
//! implementing adapter. Any identity an adapter needs is passed to its
//! constructor; nothing here reads ambient session state.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::Reading;
use crate::error::SyncError;

/// Remote collaborator that persists and serves readings
///
/// Implementations report recoverable failures (timeouts, dropped
/// connections) as [`SyncError::Transient`] and server-side rejections as
/// [`SyncError::Permanent`]; the reading store only retries the former.
/// Each call is subject to whatever timeout the implementation enforces.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Fetch every reading currently stored for a plot
    async fn fetch_readings_for_plot(&self, plot_id: i64) -> Result<Vec<Reading>, SyncError>;

    /// Persist one reading, returning it with its server-assigned id
    async fn persist_reading(&self, reading: &Reading) -> Result<Reading, SyncError>;
}

#[async_trait]
impl<S: RemoteSync + ?Sized> RemoteSync for Arc<S> {
    async fn fetch_readings_for_plot(&self, plot_id: i64) -> Result<Vec<Reading>, SyncError> {
        (**self).fetch_readings_for_plot(plot_id).await
    }

    async fn persist_reading(&self, reading: &Reading) -> Result<Reading, SyncError> {
        (**self).persist_reading(reading).await
    }
}

// Declare modules at the root level
pub mod alerts;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod memory_sync;
pub mod reading_store;
pub mod sync;
pub mod thresholds;
pub mod time;
pub mod validators;

// Test utilities module (available in test and integration test builds)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export everything under a shared namespace for external access
pub mod shared {
    pub use super::alerts;
    pub use super::config;
    pub use super::domain;
    pub use super::error;
    pub use super::events;
    pub use super::memory_sync;
    pub use super::reading_store;
    pub use super::sync;
    pub use super::thresholds;
    pub use super::time;
    pub use super::validators;
}

// Also re-export at root for convenience
pub use alerts::*;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use events::*;
pub use memory_sync::*;
pub use reading_store::*;
pub use sync::*;
pub use thresholds::*;
pub use time::*;
pub use validators::*;

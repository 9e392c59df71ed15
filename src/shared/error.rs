use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a reading candidate is rejected before entering the system
///
/// Each variant names exactly one violated constraint. Checks run in the
/// order type, value, plot reference, unit and stop at the first failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Unknown reading type: {0:?}")]
    InvalidType(String),

    #[error("Reading value must be a finite number, got {0}")]
    InvalidValue(f64),

    #[error("Plot id must be a positive integer, got {0}")]
    InvalidPlotReference(i64),

    #[error("Reading unit must not be empty")]
    MissingUnit,
}

/// Failure reported by a remote sync adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Recoverable condition (timeout, connection reset); a retry may succeed
    #[error("Transient sync failure: {0}")]
    Transient(String),

    /// Unrecoverable condition (server-side rejection); retrying will not help
    #[error("Permanent sync failure: {0}")]
    Permanent(String),
}

impl SyncError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transient(_))
    }
}

/// Errors surfaced by the reading store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reading rejected by remote: {0}")]
    Rejected(#[source] SyncError),

    #[error("Persisting reading failed after {attempts} attempts")]
    PersistenceFailed {
        attempts: u32,
        #[source]
        source: SyncError,
    },

    #[error("Fetching readings for plot {plot_id} failed after {attempts} attempts")]
    FetchFailed {
        plot_id: i64,
        attempts: u32,
        #[source]
        source: SyncError,
    },
}

impl StoreError {
    /// Stable machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Validation(ValidationError::InvalidType(_)) => error_codes::INVALID_TYPE,
            StoreError::Validation(ValidationError::InvalidValue(_)) => error_codes::INVALID_VALUE,
            StoreError::Validation(ValidationError::InvalidPlotReference(_)) => {
                error_codes::INVALID_PLOT_REFERENCE
            }
            StoreError::Validation(ValidationError::MissingUnit) => error_codes::MISSING_UNIT,
            StoreError::Rejected(_) => error_codes::SYNC_REJECTED,
            StoreError::PersistenceFailed { .. } => error_codes::PERSISTENCE_FAILED,
            StoreError::FetchFailed { .. } => error_codes::FETCH_FAILED,
        }
    }

    /// The underlying sync failure, if this error came from the remote side
    pub fn sync_cause(&self) -> Option<&SyncError> {
        match self {
            StoreError::Validation(_) => None,
            StoreError::Rejected(cause) => Some(cause),
            StoreError::PersistenceFailed { source, .. } => Some(source),
            StoreError::FetchFailed { source, .. } => Some(source),
        }
    }

    /// Build the payload a presentation layer shows for this error
    ///
    /// Retry failures carry their last cause in the message; other variants
    /// already include it in their display text.
    pub fn to_report(&self) -> ErrorReport {
        let message = match self {
            StoreError::PersistenceFailed { source, .. }
            | StoreError::FetchFailed { source, .. } => format!("{}: {}", self, source),
            _ => self.to_string(),
        };
        ErrorReport::new(self.error_code(), message)
    }
}

/// Standard error payload
/// Contains stable machine-readable error code and human-readable message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Stable machine-readable error code (e.g., "INVALID_VALUE", "PERSISTENCE_FAILED")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error codes shared with the presentation layer
pub mod error_codes {
    // Validation errors
    pub const INVALID_TYPE: &str = "INVALID_TYPE";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    pub const INVALID_PLOT_REFERENCE: &str = "INVALID_PLOT_REFERENCE";
    pub const MISSING_UNIT: &str = "MISSING_UNIT";

    // Sync errors
    pub const SYNC_REJECTED: &str = "SYNC_REJECTED";
    pub const PERSISTENCE_FAILED: &str = "PERSISTENCE_FAILED";
    pub const FETCH_FAILED: &str = "FETCH_FAILED";
}

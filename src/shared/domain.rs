use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of environmental measurement taken on a plot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingType {
    Temperature,
    Humidity,
    PhLevel,
}

impl ReadingType {
    pub const ALL: [ReadingType; 3] = [
        ReadingType::Temperature,
        ReadingType::Humidity,
        ReadingType::PhLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingType::Temperature => "TEMPERATURE",
            ReadingType::Humidity => "HUMIDITY",
            ReadingType::PhLevel => "PH_LEVEL",
        }
    }

    /// Position of this type in [`ReadingType::ALL`] and the threshold table
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ReadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known reading type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReadingType(pub String);

impl FromStr for ReadingType {
    type Err = UnknownReadingType;

    /// Case-insensitive; `PH` is accepted as an alias for `PH_LEVEL`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEMPERATURE" => Ok(ReadingType::Temperature),
            "HUMIDITY" => Ok(ReadingType::Humidity),
            "PH_LEVEL" | "PH" => Ok(ReadingType::PhLevel),
            _ => Err(UnknownReadingType(s.to_string())),
        }
    }
}

/// A single sensor measurement for a plot
///
/// Readings are immutable once built. `id` is `0` until the remote
/// collaborator has persisted the reading and assigned one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default)]
    id: i64,
    plot_id: i64,
    #[serde(rename = "type")]
    reading_type: ReadingType,
    value: f64,
    unit: String,
    measured_at: DateTime<Utc>,
}

impl Reading {
    /// Rehydrate a reading from already-persisted data
    ///
    /// Adapters use this when mapping remote payloads. Caller-supplied input
    /// should go through [`crate::validators::validate_reading`] instead.
    pub fn from_parts(
        id: i64,
        plot_id: i64,
        reading_type: ReadingType,
        value: f64,
        unit: impl Into<String>,
        measured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            plot_id,
            reading_type,
            value,
            unit: unit.into(),
            measured_at,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn plot_id(&self) -> i64 {
        self.plot_id
    }

    pub fn reading_type(&self) -> ReadingType {
        self.reading_type
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn measured_at(&self) -> DateTime<Utc> {
        self.measured_at
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Copy of this reading carrying the given persisted id
    pub fn with_id(&self, id: i64) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

/// Raw, unvalidated input for a reading that is about to be created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingCandidate {
    pub plot_id: i64,
    #[serde(rename = "type")]
    pub reading_type: String,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_at: Option<DateTime<Utc>>,
}

impl ReadingCandidate {
    pub fn new(
        plot_id: i64,
        reading_type: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            plot_id,
            reading_type: reading_type.into(),
            value,
            unit: unit.into(),
            measured_at: None,
        }
    }

    pub fn measured_at(mut self, measured_at: DateTime<Utc>) -> Self {
        self.measured_at = Some(measured_at);
        self
    }
}

/// Which safe-range bound a reading broke
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "bound", rename_all = "lowercase")]
pub enum Violation {
    Below { min: f64 },
    Above { max: f64 },
}

/// Notification that a reading fell outside its safe range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub plot_id: i64,
    #[serde(rename = "type")]
    pub reading_type: ReadingType,
    pub value: f64,
    pub unit: String,
    pub message: String,
    pub violation: Violation,
    pub measured_at: DateTime<Utc>,
}

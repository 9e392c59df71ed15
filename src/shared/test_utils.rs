//! Test utilities for property-based and store tests
//!
//! This module provides proptest generators for readings and candidates,
//! plus a remote sync adapter whose failures can be scripted.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::Reading;
use crate::error::SyncError;
use crate::memory_sync::InMemorySync;
use crate::sync::RemoteSync;

pub mod generators {
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    use crate::domain::{Reading, ReadingCandidate, ReadingType};
    use crate::thresholds::threshold_for;

    /// Display unit conventionally used for a reading type
    pub fn unit_for(reading_type: ReadingType) -> &'static str {
        match reading_type {
            ReadingType::Temperature => "°C",
            ReadingType::Humidity => "%",
            ReadingType::PhLevel => "pH",
        }
    }

    /// Fixed measurement time used by generated readings
    pub fn measured_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1715493600, 0).unwrap_or_default()
    }

    pub fn reading_type() -> impl Strategy<Value = ReadingType> {
        prop::sample::select(ReadingType::ALL.to_vec())
    }

    /// Generate a valid (positive) plot id
    pub fn plot_id() -> impl Strategy<Value = i64> {
        1i64..100_000
    }

    /// Generate an invalid (zero or negative) plot id
    pub fn invalid_plot_id() -> impl Strategy<Value = i64> {
        prop_oneof![Just(0i64), Just(i64::MIN), -100_000i64..0]
    }

    /// Generate a value strictly inside the safe range for a type
    pub fn in_range_value(reading_type: ReadingType) -> impl Strategy<Value = f64> {
        let range = threshold_for(reading_type);
        (range.min..range.max).prop_filter("strictly above min", move |v| *v > range.min)
    }

    /// Generate a value strictly outside the safe range for a type
    pub fn out_of_range_value(reading_type: ReadingType) -> impl Strategy<Value = f64> {
        let range = threshold_for(reading_type);
        prop_oneof![
            (range.min - 1000.0)..range.min,
            (range.max..range.max + 1000.0).prop_filter("strictly above max", move |v| *v
                > range.max),
        ]
    }

    fn build(plot_id: i64, reading_type: ReadingType, value: f64) -> Reading {
        Reading::from_parts(
            0,
            plot_id,
            reading_type,
            value,
            unit_for(reading_type),
            measured_at(),
        )
    }

    /// Generate an unpersisted reading whose value is inside its safe range
    pub fn in_range_reading() -> impl Strategy<Value = Reading> {
        reading_type().prop_flat_map(|rt| {
            (plot_id(), in_range_value(rt)).prop_map(move |(plot, value)| build(plot, rt, value))
        })
    }

    /// Generate an unpersisted reading whose value is outside its safe range
    pub fn out_of_range_reading() -> impl Strategy<Value = Reading> {
        reading_type().prop_flat_map(|rt| {
            (plot_id(), out_of_range_value(rt))
                .prop_map(move |(plot, value)| build(plot, rt, value))
        })
    }

    /// Generate a candidate that passes validation
    pub fn valid_candidate() -> impl Strategy<Value = ReadingCandidate> {
        (reading_type(), plot_id(), -1000.0f64..1000.0).prop_map(|(rt, plot, value)| {
            ReadingCandidate::new(plot, rt.as_str(), value, unit_for(rt))
        })
    }

    /// Generate a reading type name the validator does not know
    pub fn invalid_type_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("".to_string()),
            Just("SOIL_MOISTURE".to_string()),
            Just("WIND_SPEED".to_string()),
            Just("TEMP".to_string()),
            prop::string::string_regex("[a-z]{1,3}[0-9]{1,3}").expect("Valid regex for type"),
        ]
    }

    /// Generate a NaN or infinite value
    pub fn non_finite_value() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ]
    }

    /// Generate an empty or whitespace-only unit
    pub fn blank_unit() -> impl Strategy<Value = String> {
        prop::string::string_regex("[ \t]{0,4}").expect("Valid regex for unit")
    }
}

/// Remote sync adapter that fails according to a script before delegating
///
/// Scripted errors are consumed one per call, in order. Once a queue is
/// empty, calls go through to an [`InMemorySync`].
#[derive(Debug, Default)]
pub struct ScriptedSync {
    inner: InMemorySync,
    persist_failures: Mutex<VecDeque<SyncError>>,
    fetch_failures: Mutex<VecDeque<SyncError>>,
    persist_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl ScriptedSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` persist calls with a transient error
    pub fn fail_persist_transient(self, count: usize) -> Self {
        let errors = (1..=count)
            .map(|n| SyncError::Transient(format!("timeout #{}", n)))
            .collect();
        self.fail_persist_with(errors)
    }

    pub fn fail_persist_with(self, errors: Vec<SyncError>) -> Self {
        self.persist_failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(errors);
        self
    }

    pub fn fail_fetch_with(self, errors: Vec<SyncError>) -> Self {
        self.fetch_failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(errors);
        self
    }

    pub fn inner(&self) -> &InMemorySync {
        &self.inner
    }

    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn next_failure(queue: &Mutex<VecDeque<SyncError>>) -> Option<SyncError> {
        queue.lock().unwrap_or_else(|p| p.into_inner()).pop_front()
    }
}

#[async_trait]
impl RemoteSync for ScriptedSync {
    async fn fetch_readings_for_plot(&self, plot_id: i64) -> Result<Vec<Reading>, SyncError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = Self::next_failure(&self.fetch_failures) {
            return Err(error);
        }
        self.inner.fetch_readings_for_plot(plot_id).await
    }

    async fn persist_reading(&self, reading: &Reading) -> Result<Reading, SyncError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = Self::next_failure(&self.persist_failures) {
            return Err(error);
        }
        self.inner.persist_reading(reading).await
    }
}

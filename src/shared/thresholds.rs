use crate::domain::{Alert, Reading, ReadingType, Violation};

/// Safe range for one reading type, in that type's natural unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounds are inclusive: values equal to `min` or `max` are in range
    pub fn check(&self, value: f64) -> Option<Violation> {
        if value < self.min {
            Some(Violation::Below { min: self.min })
        } else if value > self.max {
            Some(Violation::Above { max: self.max })
        } else {
            None
        }
    }
}

pub const TEMPERATURE_MIN_C: f64 = 10.0;
pub const TEMPERATURE_MAX_C: f64 = 35.0;
pub const HUMIDITY_MIN_PCT: f64 = 40.0;
pub const HUMIDITY_MAX_PCT: f64 = 80.0;
pub const PH_MIN: f64 = 5.5;
pub const PH_MAX: f64 = 7.5;

/// Threshold table, ordered as [`ReadingType::ALL`]
const THRESHOLD_TABLE: [ThresholdRange; 3] = [
    ThresholdRange::new(TEMPERATURE_MIN_C, TEMPERATURE_MAX_C),
    ThresholdRange::new(HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT),
    ThresholdRange::new(PH_MIN, PH_MAX),
];

pub fn threshold_for(reading_type: ReadingType) -> ThresholdRange {
    THRESHOLD_TABLE[reading_type.index()]
}

pub fn is_out_of_range(reading_type: ReadingType, value: f64) -> bool {
    threshold_for(reading_type).check(value).is_some()
}

/// Evaluate a reading against its safe range
///
/// Returns an alert when the value lies strictly outside `[min, max]`.
/// NaN never reaches here; the validator rejects it.
pub fn evaluate(reading: &Reading) -> Option<Alert> {
    let violation = threshold_for(reading.reading_type()).check(reading.value())?;
    Some(Alert {
        plot_id: reading.plot_id(),
        reading_type: reading.reading_type(),
        value: reading.value(),
        unit: reading.unit().to_string(),
        message: alert_message(reading, violation),
        violation,
        measured_at: reading.measured_at(),
    })
}

/// Evaluate a batch of readings, keeping input order
pub fn evaluate_all(readings: &[Reading]) -> Vec<Alert> {
    readings.iter().filter_map(evaluate).collect()
}

fn alert_message(reading: &Reading, violation: Violation) -> String {
    let (side, bound) = match violation {
        Violation::Below { min } => ("below the minimum", min),
        Violation::Above { max } => ("above the maximum", max),
    };
    format!(
        "Plot {}: {} reading of {} {} is {} of {} {}",
        reading.plot_id(),
        reading.reading_type(),
        reading.value(),
        reading.unit(),
        side,
        bound,
        reading.unit()
    )
}

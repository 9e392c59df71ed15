use crate::domain::{Reading, ReadingCandidate, ReadingType};
use crate::error::ValidationError;
use crate::time::Clock;

/// Validate a reading type name
pub fn validate_reading_type(reading_type: &str) -> Result<ReadingType, ValidationError> {
    reading_type
        .parse()
        .map_err(|_| ValidationError::InvalidType(reading_type.to_string()))
}

/// Validate a measured value is finite (rejects NaN and infinities)
pub fn validate_value(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::InvalidValue(value))
    }
}

/// Validate a plot reference is a positive id
pub fn validate_plot_id(plot_id: i64) -> Result<i64, ValidationError> {
    if plot_id > 0 {
        Ok(plot_id)
    } else {
        Err(ValidationError::InvalidPlotReference(plot_id))
    }
}

/// Validate a display unit is present
/// Whitespace-only units count as missing
pub fn validate_unit(unit: &str) -> Result<&str, ValidationError> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingUnit)
    } else {
        Ok(trimmed)
    }
}

/// Check the field invariants of an already-built Reading
///
/// Readings assembled with [`Reading::from_parts`] skip candidate validation;
/// the store runs this before handing one to the remote side.
pub fn validate_built_reading(reading: &Reading) -> Result<(), ValidationError> {
    validate_value(reading.value())?;
    validate_plot_id(reading.plot_id())?;
    validate_unit(reading.unit())?;
    Ok(())
}

/// Turn a raw candidate into a well-formed, not yet persisted Reading
///
/// Checks run in a fixed order (type, value, plot reference, unit) and the
/// first violated constraint is returned; violations are not aggregated.
/// A candidate without `measured_at` is stamped with `clock.now()`.
pub fn validate_reading(
    candidate: &ReadingCandidate,
    clock: &dyn Clock,
) -> Result<Reading, ValidationError> {
    let reading_type = validate_reading_type(&candidate.reading_type)?;
    let value = validate_value(candidate.value)?;
    let plot_id = validate_plot_id(candidate.plot_id)?;
    let unit = validate_unit(&candidate.unit)?;

    let measured_at = candidate.measured_at.unwrap_or_else(|| clock.now());

    Ok(Reading::from_parts(
        0,
        plot_id,
        reading_type,
        value,
        unit,
        measured_at,
    ))
}

use std::time::Duration;

use super::types::{PositiveU64, PositiveUsize};
use crate::error::ValidationError;

/// Unit used when a duration has no suffix.
const DEFAULT_DURATION_UNIT: &str = "s";
/// Fractional digits beyond this are ignored (sub-microsecond precision).
const MAX_FRACTION_DIGITS: usize = 6;
const DECIMAL_BASE: u64 = 10;

pub(crate) fn parse_header(s: &str) -> Result<(String, String), ValidationError> {
    let (key, value) = s
        .split_once(':')
        .ok_or_else(|| ValidationError::InvalidHeaderFormat {
            value: s.to_owned(),
        })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::HeaderNameEmpty {
            value: s.to_owned(),
        });
    }
    Ok((key.to_owned(), value.trim().to_owned()))
}

pub(super) fn parse_positive_u64(s: &str) -> Result<PositiveU64, ValidationError> {
    s.parse::<PositiveU64>()
}

pub(super) fn parse_positive_usize(s: &str) -> Result<PositiveUsize, ValidationError> {
    s.parse::<PositiveUsize>()
}

/// Parses a strictly positive duration such as `30s`, `500ms`, `1.5` or `2m`.
pub(super) fn parse_duration_arg(s: &str) -> Result<Duration, ValidationError> {
    let duration = parse_duration_value(s)?;
    if duration.is_zero() {
        return Err(ValidationError::DurationZero);
    }
    Ok(duration)
}

/// Parses a cooldown; unlike timeouts, zero disables the pause.
pub(super) fn parse_cooldown(s: &str) -> Result<Duration, ValidationError> {
    parse_duration_value(s)
}

pub(crate) fn parse_duration_value(s: &str) -> Result<Duration, ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::DurationEmpty);
    }

    let number_len = value
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
        .unwrap_or(value.len());
    let (number_part, unit_part) = value.split_at(number_len);
    let (whole_part, fraction_part) = number_part.split_once('.').unwrap_or((number_part, ""));
    if (whole_part.is_empty() && fraction_part.is_empty()) || fraction_part.contains('.') {
        return Err(ValidationError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }

    let whole: u64 = if whole_part.is_empty() {
        0
    } else {
        whole_part
            .parse()
            .map_err(|err| ValidationError::InvalidDurationNumber {
                value: value.to_owned(),
                source: err,
            })?
    };

    let unit = if unit_part.is_empty() {
        DEFAULT_DURATION_UNIT
    } else {
        unit_part
    };
    let unit_micros: u64 = match unit {
        "us" => 1,
        "ms" => 1_000,
        "s" => 1_000_000,
        "m" => 60_000_000,
        "h" => 3_600_000_000,
        _ => {
            return Err(ValidationError::InvalidDurationUnit {
                unit: unit.to_owned(),
            });
        }
    };

    let whole_micros = whole
        .checked_mul(unit_micros)
        .ok_or(ValidationError::DurationOverflow)?;
    let fraction_micros = fraction_to_micros(fraction_part, unit_micros, value)?;
    let total = whole_micros
        .checked_add(fraction_micros)
        .ok_or(ValidationError::DurationOverflow)?;

    Ok(Duration::from_micros(total))
}

fn fraction_to_micros(fraction: &str, unit_micros: u64, value: &str) -> Result<u64, ValidationError> {
    if fraction.is_empty() {
        return Ok(0);
    }
    let digits = fraction
        .get(..fraction.len().min(MAX_FRACTION_DIGITS))
        .unwrap_or(fraction);
    let numerator: u64 = digits
        .parse()
        .map_err(|err| ValidationError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;
    let exponent = u32::try_from(digits.len()).map_err(|_overflow| ValidationError::DurationOverflow)?;
    let denominator = DECIMAL_BASE
        .checked_pow(exponent)
        .ok_or(ValidationError::DurationOverflow)?;
    let scaled = u128::from(numerator)
        .saturating_mul(u128::from(unit_micros))
        .checked_div(u128::from(denominator))
        .unwrap_or(0);
    u64::try_from(scaled).map_err(|_overflow| ValidationError::DurationOverflow)
}

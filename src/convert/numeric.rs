//! Numeric field coercion with optional null/zero policies.

use serde_json::Value;
use tracing::warn;

use super::{ConvertError, Direction};
use crate::mapping::ConverterOptions;

/// Converts a numeric field. Both policies and the soft null coercion only
/// apply remote-to-local; outgoing values pass through untouched.
pub(super) fn convert(
    value: Value,
    direction: Direction,
    options: &ConverterOptions,
    integer: bool,
) -> Result<Value, ConvertError> {
    if direction != Direction::RemoteToLocal {
        return Ok(value);
    }

    if options.null_to_zero && options.zero_to_null {
        return Err(ConvertError::IncorrectMapping(
            "nullToZero and zeroToNull can't be set both".to_string(),
        ));
    }
    if options.null_to_zero && value.is_null() {
        return Ok(Value::from(0));
    }
    if options.zero_to_null && is_zero(&value) {
        return Ok(Value::Null);
    }
    if value.is_null() {
        return Ok(value);
    }

    let Some(number) = parse_number(&value) else {
        warn!(
            "\"{}\" is not numeric, value will be set to null, direction of conversion \"{}\"",
            lossy(&value),
            direction
        );
        return Ok(Value::Null);
    };

    if integer {
        if number.fract() != 0.0 {
            warn!(
                "\"{}\" is not an integer, value will be set to null, direction of conversion \"{}\"",
                lossy(&value),
                direction
            );
            return Ok(Value::Null);
        }
        Ok(Value::from(number as i64))
    } else {
        Ok(Value::from(number))
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_zero(value: &Value) -> bool {
    parse_number(value) == Some(0.0)
}

fn lossy(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

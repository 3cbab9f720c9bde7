//! Bidirectional field-value conversion.
//!
//! Remote CRM fields arrive as loosely-typed JSON: booleans as `"true"` or
//! `"Yes"`, numbers as strings, dates in whatever format the remote happens
//! to emit. Each attribute mapping resolves to one [`Converter`] which
//! coerces values onto typed local attributes and back, parameterized by
//! [`Direction`].
//!
//! Conversion failures come in two kinds. Configuration errors (an unknown
//! converter name, conflicting null/zero policies) are hard
//! [`ConvertError`]s. Data problems (an unparsable date, a label missing
//! from a dropdown table) are soft: they are logged and the value is
//! coerced to null so the rest of the record keeps flowing.

mod boolean;
mod datetime;
mod dropdown;
mod numeric;
mod registry;

pub use registry::ConverterRegistry;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::mapping::ConverterOptions;

/// Direction of a conversion or mapping operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local attribute values to remote field values.
    LocalToRemote,
    /// Remote field values to local attribute values.
    RemoteToLocal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LocalToRemote => write!(f, "local-remote"),
            Direction::RemoteToLocal => write!(f, "remote-local"),
        }
    }
}

/// Hard conversion and resolution failures.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// An attribute mapping is internally inconsistent.
    #[error("incorrect attribute mapping: {0}")]
    IncorrectMapping(String),
    /// A converter override names no known implementation.
    #[error("unknown converter \"{0}\"")]
    UnknownConverter(String),
}

/// Capability interface for user-supplied converters.
///
/// Implementations registered with [`ConverterRegistry::register`] are
/// selected by name through an attribute mapping's `converter` override.
pub trait ValueConverter: Send + Sync {
    /// Converts `value` in `direction` using the mapping's options.
    fn convert(
        &self,
        value: Value,
        direction: Direction,
        options: &ConverterOptions,
    ) -> Result<Value, ConvertError>;
}

/// A resolved converter for one attribute.
#[derive(Clone)]
pub enum Converter {
    /// No coercion beyond the base null sentinel.
    Default,
    /// Remote `"true"`/`"false"` checkbox against local `1`/`0`.
    Boolean,
    /// Remote `"Yes"`/`"No"` two-option dropdown against local `1`/`0`.
    BooleanDropdown,
    /// Enumerated pick list mapped through a value table.
    DropDown,
    /// Multi-format date and time of day.
    DateTime,
    /// Multi-format calendar date.
    Date,
    /// Multi-format time of day.
    Time,
    /// Whole number, with optional null/zero policies.
    Integer,
    /// Decimal number, with optional null/zero policies.
    Float,
    /// User-registered converter.
    Custom(Arc<dyn ValueConverter>),
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Converter::Default => "Default",
            Converter::Boolean => "Boolean",
            Converter::BooleanDropdown => "BooleanDropdown",
            Converter::DropDown => "DropDown",
            Converter::DateTime => "DateTime",
            Converter::Date => "Date",
            Converter::Time => "Time",
            Converter::Integer => "Integer",
            Converter::Float => "Float",
            Converter::Custom(_) => "Custom(..)",
        };
        write!(f, "{}", name)
    }
}

impl Converter {
    /// Converts `value` in `direction`.
    ///
    /// The base null-sentinel rule applies to every variant, custom
    /// converters included, before variant-specific behavior runs.
    pub fn convert(
        &self,
        value: Value,
        direction: Direction,
        options: &ConverterOptions,
    ) -> Result<Value, ConvertError> {
        let value = null_sentinel(value, direction);
        match self {
            Converter::Default => Ok(value),
            Converter::Boolean => Ok(boolean::convert(value, direction, "true", "false")),
            Converter::BooleanDropdown => Ok(boolean::convert(value, direction, "Yes", "No")),
            Converter::DropDown => Ok(dropdown::convert(value, direction, options)),
            Converter::DateTime => Ok(datetime::convert(
                value,
                direction,
                options,
                &datetime::DATETIME_DEFAULTS,
            )),
            Converter::Date => Ok(datetime::convert(
                value,
                direction,
                options,
                &datetime::DATE_DEFAULTS,
            )),
            Converter::Time => Ok(datetime::convert(
                value,
                direction,
                options,
                &datetime::TIME_DEFAULTS,
            )),
            Converter::Integer => numeric::convert(value, direction, options, true),
            Converter::Float => numeric::convert(value, direction, options, false),
            Converter::Custom(converter) => converter.convert(value, direction, options),
        }
    }
}

/// The remote service encodes explicit nulls as the literal string
/// `"null"`; arriving remote-to-local it becomes a real null regardless of
/// the field's declared type.
fn null_sentinel(value: Value, direction: Direction) -> Value {
    if direction == Direction::RemoteToLocal && matches!(&value, Value::String(s) if s == "null") {
        return Value::Null;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_sentinel_remote_to_local() {
        let options = ConverterOptions::default();
        let converted = Converter::Default
            .convert(json!("null"), Direction::RemoteToLocal, &options)
            .unwrap();
        assert_eq!(converted, Value::Null);
    }

    #[test]
    fn test_null_sentinel_not_applied_local_to_remote() {
        let options = ConverterOptions::default();
        let converted = Converter::Default
            .convert(json!("null"), Direction::LocalToRemote, &options)
            .unwrap();
        assert_eq!(converted, json!("null"));
    }

    #[test]
    fn test_default_passes_values_through() {
        let options = ConverterOptions::default();
        let converted = Converter::Default
            .convert(json!("anything"), Direction::RemoteToLocal, &options)
            .unwrap();
        assert_eq!(converted, json!("anything"));
    }

    #[test]
    fn test_custom_converter_runs_after_null_sentinel() {
        struct Upper;

        impl ValueConverter for Upper {
            fn convert(
                &self,
                value: Value,
                _direction: Direction,
                _options: &ConverterOptions,
            ) -> Result<Value, ConvertError> {
                match value {
                    Value::String(s) => Ok(Value::from(s.to_uppercase())),
                    other => Ok(other),
                }
            }
        }

        let options = ConverterOptions::default();
        let converter = Converter::Custom(Arc::new(Upper));
        assert_eq!(
            converter
                .convert(json!("abc"), Direction::RemoteToLocal, &options)
                .unwrap(),
            json!("ABC")
        );
        assert_eq!(
            converter
                .convert(json!("null"), Direction::RemoteToLocal, &options)
                .unwrap(),
            Value::Null
        );
    }
}

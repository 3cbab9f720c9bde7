//! Enumerated (pick list) field mapping.

use serde_json::Value;
use tracing::warn;

use super::Direction;
use crate::mapping::ConverterOptions;

/// Maps between local keys and remote labels through the mapping's value
/// table. Lookups use strict equality; a missing table or a value absent
/// from it coerces to null rather than failing the record.
pub(super) fn convert(value: Value, direction: Direction, options: &ConverterOptions) -> Value {
    let Some(table) = &options.values else {
        warn!(
            "mapping not specified, value will be set to null, direction of conversion \"{}\"",
            direction
        );
        return Value::Null;
    };

    let found = match direction {
        Direction::RemoteToLocal => table
            .iter()
            .find(|entry| entry.1 == value)
            .map(|entry| entry.0.clone()),
        Direction::LocalToRemote => table
            .iter()
            .find(|entry| entry.0 == value)
            .map(|entry| entry.1.clone()),
    };

    match found {
        Some(mapped) => mapped,
        None => {
            warn!(
                "can't find value in mapping, value will be set to null, direction of conversion \"{}\", value was {}",
                direction, value
            );
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stage_options() -> ConverterOptions {
        ConverterOptions {
            values: Some(vec![
                (json!(1), json!("Qualification")),
                (json!(2), json!("Needs Analysis")),
                (json!(3), json!("Closed Won")),
            ]),
            ..ConverterOptions::default()
        }
    }

    #[test]
    fn test_remote_label_to_local_key() {
        let converted = convert(
            json!("Needs Analysis"),
            Direction::RemoteToLocal,
            &stage_options(),
        );
        assert_eq!(converted, json!(2));
    }

    #[test]
    fn test_local_key_to_remote_label() {
        let converted = convert(json!(3), Direction::LocalToRemote, &stage_options());
        assert_eq!(converted, json!("Closed Won"));
    }

    #[test]
    fn test_unmapped_value_coerces_to_null() {
        let converted = convert(
            json!("Prospecting"),
            Direction::RemoteToLocal,
            &stage_options(),
        );
        assert_eq!(converted, Value::Null);
    }

    #[test]
    fn test_missing_table_coerces_to_null() {
        let converted = convert(
            json!("Qualification"),
            Direction::RemoteToLocal,
            &ConverterOptions::default(),
        );
        assert_eq!(converted, Value::Null);
    }

    #[test]
    fn test_lookup_is_strict() {
        // "1" must not match the numeric key 1
        let converted = convert(json!("1"), Direction::LocalToRemote, &stage_options());
        assert_eq!(converted, Value::Null);
    }

    #[test]
    fn test_round_trip() {
        let options = stage_options();
        let remote = convert(json!(1), Direction::LocalToRemote, &options);
        let back = convert(remote, Direction::RemoteToLocal, &options);
        assert_eq!(back, json!(1));
    }
}

//! Boolean field coercion.

use serde_json::Value;

use super::Direction;

/// Shared routine for boolean-like fields. The remote side uses a pair of
/// literal strings (`"true"`/`"false"` for checkboxes, `"Yes"`/`"No"` for
/// two-option dropdowns); the local side uses `1`/`0`. Values outside the
/// pair pass through unchanged.
pub(super) fn convert(value: Value, direction: Direction, truthy: &str, falsy: &str) -> Value {
    match direction {
        Direction::RemoteToLocal => match value {
            Value::String(s) if s == truthy => Value::from(1),
            Value::String(s) if s == falsy => Value::from(0),
            other => other,
        },
        Direction::LocalToRemote => match value.as_i64() {
            Some(1) => Value::from(truthy),
            Some(0) => Value::from(falsy),
            _ => value,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_remote_to_local() {
        assert_eq!(
            convert(json!("true"), Direction::RemoteToLocal, "true", "false"),
            json!(1)
        );
        assert_eq!(
            convert(json!("false"), Direction::RemoteToLocal, "true", "false"),
            json!(0)
        );
    }

    #[test]
    fn test_boolean_local_to_remote() {
        assert_eq!(
            convert(json!(1), Direction::LocalToRemote, "true", "false"),
            json!("true")
        );
        assert_eq!(
            convert(json!(0), Direction::LocalToRemote, "true", "false"),
            json!("false")
        );
    }

    #[test]
    fn test_dropdown_literals() {
        assert_eq!(
            convert(json!("Yes"), Direction::RemoteToLocal, "Yes", "No"),
            json!(1)
        );
        assert_eq!(
            convert(json!(0), Direction::LocalToRemote, "Yes", "No"),
            json!("No")
        );
    }

    #[test]
    fn test_out_of_domain_values_pass_through() {
        assert_eq!(
            convert(json!("maybe"), Direction::RemoteToLocal, "true", "false"),
            json!("maybe")
        );
        assert_eq!(
            convert(json!(2), Direction::LocalToRemote, "true", "false"),
            json!(2)
        );
        assert_eq!(
            convert(Value::Null, Direction::LocalToRemote, "true", "false"),
            Value::Null
        );
    }

    #[test]
    fn test_round_trip() {
        for remote in ["true", "false"] {
            let local = convert(json!(remote), Direction::RemoteToLocal, "true", "false");
            let back = convert(local, Direction::LocalToRemote, "true", "false");
            assert_eq!(back, json!(remote));
        }
    }
}

//! Decoded response envelope and normalization.
//!
//! The remote API is structurally inconsistent: a one-row result is a bare
//! object where a many-row result is an array, bulk responses come back in
//! arbitrary order, and per-row failures hide inside otherwise successful
//! envelopes. The operations here reshape all of that into one predictable
//! form.

use serde_json::Value;

use super::error::ApiError;
use crate::mapping::Record;

/// The decoded top-level API response.
///
/// Fetch responses carry rows under `response.result.<module>.row`, bulk
/// mutation responses under `response.result.row`; both paths are handled
/// by every normalization operation that needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    value: Value,
}

impl Envelope {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }

    /// Originating request URI reported by the remote service.
    pub fn uri(&self) -> Option<&str> {
        self.value.pointer("/response/uri").and_then(Value::as_str)
    }

    /// Borrows the decoded response.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consumes the envelope, returning the decoded response.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Wraps a bare single-row object in a one-element array so row
    /// containers always hold a sequence, whether the remote returned one
    /// record or many.
    pub fn unify_row_shape(&mut self, module: &str) {
        let paths: [&[&str]; 2] = [
            &["response", "result", module, "row"],
            &["response", "result", "row"],
        ];
        for path in paths {
            if let Some(node) = value_at_path_mut(&mut self.value, path) {
                if node.is_object() {
                    let row = node.take();
                    *node = Value::Array(vec![row]);
                }
            }
        }
    }

    /// Restores request order in a bulk-mutation response by sorting rows
    /// ascending on their 1-based `no` attribute. Idempotent; rows without
    /// a parsable `no` sink to the end in their current order.
    pub fn restore_request_order(&mut self) {
        if let Some(rows) = value_at_path_mut(&mut self.value, &["response", "result", "row"])
            .and_then(Value::as_array_mut)
        {
            rows.sort_by_key(|row| row_no(row).unwrap_or(i64::MAX));
        }
    }

    /// Checks every row of a bulk-mutation response; rows carrying an error
    /// are folded into a single [`ApiError::BulkRecord`] naming each failed
    /// row's code and details, the originating URI, and the full outgoing
    /// payload.
    pub fn check_row_errors(&self, records: &[Record]) -> Result<(), ApiError> {
        let Some(rows) = self
            .value
            .pointer("/response/result/row")
            .and_then(Value::as_array)
        else {
            return Ok(());
        };

        let mut details = String::new();
        for row in rows {
            if let Some(error) = row.get("error") {
                details.push_str(&format!(
                    "\nError {}: {}",
                    text(error.get("code")),
                    text(error.get("details"))
                ));
            }
        }
        if details.is_empty() {
            return Ok(());
        }

        Err(ApiError::BulkRecord {
            details,
            uri: self.uri().unwrap_or_default().to_string(),
            records: serde_json::to_string_pretty(records).unwrap_or_default(),
        })
    }

    /// The unified row sequence for `module`, or an empty slice when the
    /// response has no row container.
    pub fn rows(&self, module: &str) -> &[Value] {
        let paths: [&[&str]; 2] = [
            &["response", "result", module, "row"],
            &["response", "result", "row"],
        ];
        for path in paths {
            if let Some(rows) = value_at_path(&self.value, path).and_then(Value::as_array) {
                return rows;
            }
        }
        &[]
    }
}

/// Looks up one field's value in a response row's `FL` list.
pub fn row_field_value<'a>(row: &'a Value, name: &str) -> Result<&'a Value, ApiError> {
    if let Some(fields) = row.get("FL").and_then(Value::as_array) {
        for field in fields {
            if field.get("val").and_then(Value::as_str) == Some(name) {
                if let Some(content) = field.get("content") {
                    return Ok(content);
                }
            }
        }
    }
    Err(ApiError::MissingField {
        name: name.to_string(),
    })
}

/// Flattens a response row's `FL` list into a record.
pub fn row_to_record(row: &Value) -> Record {
    let mut record = Record::new();
    if let Some(fields) = row.get("FL").and_then(Value::as_array) {
        for field in fields {
            let Some(name) = field.get("val").and_then(Value::as_str) else {
                continue;
            };
            record.insert(
                name.to_string(),
                field.get("content").cloned().unwrap_or(Value::Null),
            );
        }
    }
    record
}

/// A bulk-response row's 1-based request index; the remote emits it as a
/// string or a number depending on the endpoint.
fn row_no(row: &Value) -> Option<i64> {
    match row.get("no") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn value_at_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = value;
    for key in path {
        node = node.get(key)?;
    }
    Some(node)
}

fn value_at_path_mut<'a>(value: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    let mut node = value;
    for key in path {
        node = node.get_mut(key)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), Value::from(*value)))
            .collect()
    }

    #[test]
    fn test_unify_wraps_single_object_row() {
        let mut single = Envelope::new(json!({
            "response": {
                "uri": "/Leads/getRecords",
                "result": {"Leads": {"row": {"no": "1", "FL": []}}}
            }
        }));
        let mut sequenced = Envelope::new(json!({
            "response": {
                "uri": "/Leads/getRecords",
                "result": {"Leads": {"row": [{"no": "1", "FL": []}]}}
            }
        }));

        single.unify_row_shape("Leads");
        sequenced.unify_row_shape("Leads");

        assert_eq!(single, sequenced);
        assert_eq!(single.rows("Leads").len(), 1);
    }

    #[test]
    fn test_unify_handles_bulk_row_path() {
        let mut envelope = Envelope::new(json!({
            "response": {
                "uri": "/Leads/insertRecords",
                "result": {"row": {"no": "1", "success": {"details": []}}}
            }
        }));
        envelope.unify_row_shape("Leads");
        assert_eq!(envelope.rows("Leads").len(), 1);
    }

    #[test]
    fn test_unify_leaves_rowless_responses_alone() {
        let original = json!({"response": {"uri": "/Leads/deleteRecords", "result": {"message": "deleted"}}});
        let mut envelope = Envelope::new(original.clone());
        envelope.unify_row_shape("Leads");
        assert_eq!(envelope.into_value(), original);
    }

    #[test]
    fn test_restore_request_order() {
        let mut envelope = Envelope::new(json!({
            "response": {
                "uri": "/Leads/insertRecords",
                "result": {"row": [{"no": "3"}, {"no": "1"}, {"no": 2}]}
            }
        }));
        envelope.restore_request_order();
        let order: Vec<i64> = envelope
            .rows("Leads")
            .iter()
            .map(|row| row_no(row).unwrap())
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_restore_request_order_is_idempotent() {
        let mut once = Envelope::new(json!({
            "response": {"uri": "/x", "result": {"row": [{"no": "2"}, {"no": "1"}]}}
        }));
        once.restore_request_order();
        let mut twice = once.clone();
        twice.restore_request_order();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_check_row_errors_aggregates() {
        let envelope = Envelope::new(json!({
            "response": {
                "uri": "/Leads/insertRecords",
                "result": {"row": [
                    {"no": "1", "success": {"details": []}},
                    {"no": "2", "error": {"code": "401.2", "details": "Invalid value for Email"}},
                    {"no": "3", "success": {"details": []}}
                ]}
            }
        }));
        let records = vec![
            record(&[("Company", "One")]),
            record(&[("Company", "Two")]),
            record(&[("Company", "Three")]),
        ];

        let err = envelope.check_row_errors(&records).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Error 401.2: Invalid value for Email"));
        assert!(message.contains("/Leads/insertRecords"));
        // the dump covers all outgoing records, not just the failed one
        assert!(message.contains("One"));
        assert!(message.contains("Two"));
        assert!(message.contains("Three"));
        // exactly one aggregated error line
        assert_eq!(message.matches("Error 401.2").count(), 1);
    }

    #[test]
    fn test_check_row_errors_passes_clean_response() {
        let envelope = Envelope::new(json!({
            "response": {
                "uri": "/Leads/insertRecords",
                "result": {"row": [{"no": "1", "success": {"details": []}}]}
            }
        }));
        assert!(envelope.check_row_errors(&[]).is_ok());
    }

    #[test]
    fn test_row_field_value() {
        let row = json!({"no": "1", "FL": [
            {"val": "LEADID", "content": "1001"},
            {"val": "Company", "content": "Acme"}
        ]});
        assert_eq!(row_field_value(&row, "LEADID").unwrap(), &json!("1001"));
        let err = row_field_value(&row, "Phone").unwrap_err();
        assert!(matches!(err, ApiError::MissingField { name } if name == "Phone"));
    }

    #[test]
    fn test_row_to_record() {
        let row = json!({"no": "1", "FL": [
            {"val": "Company", "content": "Acme"},
            {"val": "Website", "content": "acme.test"}
        ]});
        let record = row_to_record(&row);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Company"), Some(&json!("Acme")));
        assert_eq!(record.get("Website"), Some(&json!("acme.test")));
    }
}

//! XML payload for bulk mutations.
//!
//! Mutation calls ship their records as an XML document in the `xmlData`
//! parameter: one root element named after the entity group, one `<row>`
//! per record with a 1-based `no` attribute, one `<FL>` element per field
//! with a CDATA-escaped value.

use reqwest::Method;
use serde_json::Value;

use super::error::ApiError;
use super::MAX_MUTATION_RECORDS;
use crate::mapping::Record;

pub(super) fn records_to_xml(
    module: &str,
    records: &[Record],
    method: &Method,
) -> Result<String, ApiError> {
    if records.len() > MAX_MUTATION_RECORDS {
        return Err(ApiError::RecordLimit {
            count: records.len(),
            limit: MAX_MUTATION_RECORDS,
        });
    }

    let mut xml = format!("<{}>", module);
    for (index, record) in records.iter().enumerate() {
        xml.push_str(&format!("<row no=\"{}\">", index + 1));
        for (name, value) in record {
            xml.push_str(&format!(
                "<FL val=\"{}\">{}</FL>",
                name,
                escaped_value(value, method)?
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str(&format!("</{}>", module));
    Ok(xml)
}

/// CDATA-wraps a field value. Values travelling in a GET query parameter
/// are HTML-entity-escaped first; POST bodies carry them unescaped.
fn escaped_value(value: &Value, method: &Method) -> Result<String, ApiError> {
    let text = plain_text(value);
    if *method == Method::GET {
        Ok(format!("<![CDATA[{}]]>", escape_entities(&text)))
    } else if *method == Method::POST {
        Ok(format!("<![CDATA[{}]]>", text))
    } else {
        Err(ApiError::UnknownTransport {
            method: method.to_string(),
        })
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn escape_entities(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: &[(&str, Value)]) -> Record {
        fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_rows_are_numbered_sequentially() {
        let records = vec![
            record(&[("Company", json!("One"))]),
            record(&[("Company", json!("Two"))]),
        ];
        let xml = records_to_xml("Leads", &records, &Method::POST).unwrap();
        assert_eq!(
            xml,
            "<Leads>\
             <row no=\"1\"><FL val=\"Company\"><![CDATA[One]]></FL></row>\
             <row no=\"2\"><FL val=\"Company\"><![CDATA[Two]]></FL></row>\
             </Leads>"
        );
    }

    #[test]
    fn test_get_transport_escapes_entities() {
        let records = vec![record(&[("Company", json!("Bell & Sons <Ltd>"))])];
        let xml = records_to_xml("Accounts", &records, &Method::GET).unwrap();
        assert!(xml.contains("<![CDATA[Bell &amp; Sons &lt;Ltd&gt;]]>"));
    }

    #[test]
    fn test_post_transport_leaves_values_unescaped() {
        let records = vec![record(&[("Company", json!("Bell & Sons"))])];
        let xml = records_to_xml("Accounts", &records, &Method::POST).unwrap();
        assert!(xml.contains("<![CDATA[Bell & Sons]]>"));
    }

    #[test]
    fn test_unknown_transport_fails() {
        let records = vec![record(&[("Company", json!("One"))])];
        let err = records_to_xml("Leads", &records, &Method::PUT).unwrap_err();
        assert!(matches!(err, ApiError::UnknownTransport { method } if method == "PUT"));
    }

    #[test]
    fn test_record_limit_enforced() {
        let records: Vec<Record> = (0..MAX_MUTATION_RECORDS + 1)
            .map(|i| record(&[("Company", json!(format!("c{}", i)))]))
            .collect();
        let err = records_to_xml("Leads", &records, &Method::POST).unwrap_err();
        assert!(matches!(
            err,
            ApiError::RecordLimit { count: 101, limit: 100 }
        ));
    }

    #[test]
    fn test_scalar_values_serialize_bare() {
        let records = vec![record(&[
            ("Employees", json!(250)),
            ("Active", json!(true)),
            ("Fax", Value::Null),
        ])];
        let xml = records_to_xml("Accounts", &records, &Method::POST).unwrap();
        assert!(xml.contains("<FL val=\"Employees\"><![CDATA[250]]></FL>"));
        assert!(xml.contains("<FL val=\"Active\"><![CDATA[true]]></FL>"));
        assert!(xml.contains("<FL val=\"Fax\"><![CDATA[]]></FL>"));
    }
}

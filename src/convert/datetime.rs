//! Date and time field conversion.
//!
//! The remote service is liberal about the formats it emits, so each side
//! of a mapping declares an ordered list of candidate strftime formats and
//! the first one that parses wins; order matters for ambiguous inputs. On
//! success the value is re-emitted in the first format declared for the
//! opposite side.

use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::warn;

use super::Direction;
use crate::mapping::ConverterOptions;

pub(super) struct FormatDefaults {
    remote: &'static [&'static str],
    local: &'static [&'static str],
}

pub(super) const DATETIME_DEFAULTS: FormatDefaults = FormatDefaults {
    remote: &["%Y-%m-%d %H:%M:%S"],
    local: &["%Y-%m-%d %H:%M:%S"],
};

pub(super) const DATE_DEFAULTS: FormatDefaults = FormatDefaults {
    remote: &["%Y-%m-%d"],
    local: &["%Y-%m-%d"],
};

pub(super) const TIME_DEFAULTS: FormatDefaults = FormatDefaults {
    remote: &["%I:%M:%S %p", "%H:%M:%S"],
    local: &["%H:%M:%S"],
};

/// Parses `value` with the source side's candidate formats and re-formats
/// it with the target side's first format. Total parse failure is soft:
/// logged, coerced to null.
pub(super) fn convert(
    value: Value,
    direction: Direction,
    options: &ConverterOptions,
    defaults: &FormatDefaults,
) -> Value {
    if value.is_null() {
        return value;
    }

    let raw = match &value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            warn!(
                "can't parse datetime {}, value will be set to null, direction of conversion \"{}\"",
                other, direction
            );
            return Value::Null;
        }
    };

    let remote_formats = formats(options.remote_formats.as_deref(), defaults.remote);
    let local_formats = formats(options.local_formats.as_deref(), defaults.local);
    let (parse_formats, target_formats) = match direction {
        Direction::RemoteToLocal => (remote_formats, local_formats),
        Direction::LocalToRemote => (local_formats, remote_formats),
    };

    let Some(parsed) = parse_candidates(&raw, &parse_formats, options.default_meridiem.as_deref())
    else {
        warn!(
            "can't parse datetime \"{}\", value will be set to null, direction of conversion \"{}\"",
            raw, direction
        );
        return Value::Null;
    };

    match target_formats.first().and_then(|f| render(parsed, f)) {
        Some(formatted) => Value::from(formatted),
        None => {
            warn!(
                "can't format datetime \"{}\", value will be set to null, direction of conversion \"{}\"",
                raw, direction
            );
            Value::Null
        }
    }
}

fn formats(configured: Option<&[String]>, defaults: &[&str]) -> Vec<String> {
    match configured {
        Some(list) => list.to_vec(),
        None => defaults.iter().map(|f| f.to_string()).collect(),
    }
}

/// Tries every candidate in order; a candidate with a meridiem token gets a
/// second chance with the configured default meridiem appended before the
/// next candidate is considered.
fn parse_candidates(raw: &str, formats: &[String], meridiem: Option<&str>) -> Option<NaiveDateTime> {
    for format in formats {
        if let Some(parsed) = parse_with_format(raw, format) {
            return Some(parsed);
        }
        if let Some(meridiem) = meridiem {
            if has_meridiem_token(format) {
                if let Some(parsed) = parse_with_format(&format!("{} {}", raw, meridiem), format) {
                    return Some(parsed);
                }
            }
        }
    }
    None
}

/// Missing components default to zero: a bare date parses to midnight, a
/// bare time attaches to the epoch date.
fn parse_with_format(raw: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(datetime);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(time) = NaiveTime::parse_from_str(raw, format) {
        return NaiveDate::from_ymd_opt(1970, 1, 1).map(|date| date.and_time(time));
    }
    None
}

fn has_meridiem_token(format: &str) -> bool {
    format.contains("%p") || format.contains("%P")
}

/// Formats without panicking on a malformed user-supplied format string.
fn render(datetime: NaiveDateTime, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", datetime.format(format)).ok()?;
    Some(out)
}

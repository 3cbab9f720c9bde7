//! Attribute mapping tables and record mapping.
//!
//! A [`MappingTable`] declares, per entity group, how remote field names
//! relate to local attribute names and how each field's values convert.
//! Tables are plain data (serde-loadable from configuration); the
//! [`FieldMapper`] compiles one against a [`ConverterRegistry`] so that
//! configuration mistakes surface before any record is touched.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::convert::{ConvertError, Converter, ConverterRegistry, Direction};

/// One record instance: an ordered map from field name to raw value.
pub type Record = serde_json::Map<String, Value>;

/// Declared type of a synchronized field; selects the builtin converter
/// when no override is named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    #[default]
    Default,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "boolDropDown")]
    BooleanDropdown,
    DropDown,
    #[serde(rename = "datetime")]
    DateTime,
    Date,
    Time,
    #[serde(alias = "int")]
    Integer,
    Float,
    /// Converted exclusively through the mapping's `converter` override.
    Custom,
}

/// Per-converter options for one attribute mapping.
///
/// Only the fields relevant to the resolved converter are consulted;
/// invalid combinations are rejected when a [`FieldMapper`] is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterOptions {
    /// Coerce remote nulls to `0` (numeric fields, remote-to-local only).
    pub null_to_zero: bool,
    /// Coerce remote zeros to null (numeric fields, remote-to-local only).
    pub zero_to_null: bool,
    /// Dropdown value table as `(local key, remote label)` pairs.
    pub values: Option<Vec<(Value, Value)>>,
    /// Candidate parse formats for remote-side date/time values, tried in
    /// order.
    pub remote_formats: Option<Vec<String>>,
    /// Candidate parse formats for local-side date/time values, tried in
    /// order.
    pub local_formats: Option<Vec<String>>,
    /// Meridiem appended when a 12-hour format fails to parse without one.
    pub default_meridiem: Option<String>,
}

/// Mapping between one remote field and one local attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMapping {
    /// Remote field name; unique within a table.
    pub remote_name: String,
    /// Local attribute name.
    pub local_name: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    /// Name of a registered custom converter or a builtin alias; wins over
    /// `field_type`.
    #[serde(default)]
    pub converter: Option<String>,
    #[serde(flatten)]
    pub options: ConverterOptions,
}

impl AttributeMapping {
    pub fn new(remote_name: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            remote_name: remote_name.into(),
            local_name: local_name.into(),
            field_type: FieldType::Default,
            converter: None,
            options: ConverterOptions::default(),
        }
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn with_converter(mut self, name: impl Into<String>) -> Self {
        self.converter = Some(name.into());
        self
    }

    pub fn with_options(mut self, options: ConverterOptions) -> Self {
        self.options = options;
        self
    }
}

/// The full set of attribute mappings for one entity group.
#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: Vec<AttributeMapping>,
}

impl MappingTable {
    /// Builds a table, rejecting duplicate remote field names.
    pub fn new(entries: Vec<AttributeMapping>) -> Result<Self, ConvertError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.remote_name.as_str()) {
                return Err(ConvertError::IncorrectMapping(format!(
                    "duplicate remote field \"{}\"",
                    entry.remote_name
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[AttributeMapping] {
        &self.entries
    }

    fn into_entries(self) -> Vec<AttributeMapping> {
        self.entries
    }
}

/// Applies a mapping table to records in either direction.
///
/// Every entry's converter is resolved at construction, so unknown
/// converter names and conflicting options fail at configuration load
/// rather than in the middle of an import.
#[derive(Debug)]
pub struct FieldMapper {
    entries: Vec<(AttributeMapping, Converter)>,
    by_remote: HashMap<String, usize>,
    by_local: HashMap<String, usize>,
}

impl FieldMapper {
    pub fn new(table: MappingTable, registry: &ConverterRegistry) -> Result<Self, ConvertError> {
        let mut entries = Vec::new();
        let mut by_remote = HashMap::new();
        let mut by_local = HashMap::new();

        for (index, mapping) in table.into_entries().into_iter().enumerate() {
            if mapping.options.null_to_zero && mapping.options.zero_to_null {
                return Err(ConvertError::IncorrectMapping(format!(
                    "nullToZero and zeroToNull can't be set both for \"{}\"",
                    mapping.remote_name
                )));
            }
            let converter = registry.resolve(&mapping)?;
            by_remote.insert(mapping.remote_name.clone(), index);
            by_local.insert(mapping.local_name.clone(), index);
            entries.push((mapping, converter));
        }

        Ok(Self {
            entries,
            by_remote,
            by_local,
        })
    }

    /// Remote field names covered by this mapper, in declaration order.
    pub fn remote_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(mapping, _)| mapping.remote_name.clone())
            .collect()
    }

    /// Maps `record` to the opposite side of `direction`: mapped fields are
    /// renamed and converted, unmapped fields are dropped.
    ///
    /// Soft per-field fallbacks (values coerced to null) never abort the
    /// record; only configuration errors propagate.
    pub fn map_record(&self, record: &Record, direction: Direction) -> Result<Record, ConvertError> {
        let index = match direction {
            Direction::RemoteToLocal => &self.by_remote,
            Direction::LocalToRemote => &self.by_local,
        };

        let mut mapped = Record::new();
        for (name, value) in record {
            let Some(&i) = index.get(name) else {
                continue;
            };
            let (mapping, converter) = &self.entries[i];
            let target = match direction {
                Direction::RemoteToLocal => mapping.local_name.clone(),
                Direction::LocalToRemote => mapping.remote_name.clone(),
            };
            let converted = converter.convert(value.clone(), direction, &mapping.options)?;
            mapped.insert(target, converted);
        }
        Ok(mapped)
    }
}

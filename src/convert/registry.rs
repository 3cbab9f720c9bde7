//! Converter resolution.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ConvertError, Converter, ValueConverter};
use crate::mapping::{AttributeMapping, FieldType};

/// Resolves the converter for an attribute mapping.
///
/// A `converter` override names either a registered custom converter or a
/// builtin alias and wins over the mapping's field type; without an
/// override the field type selects the builtin directly.
#[derive(Default)]
pub struct ConverterRegistry {
    custom: HashMap<String, Arc<dyn ValueConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom converter under `name`. A custom converter shadows
    /// a builtin alias of the same name.
    pub fn register(&mut self, name: impl Into<String>, converter: Arc<dyn ValueConverter>) {
        self.custom.insert(name.into(), converter);
    }

    /// Resolves the converter for `mapping`.
    pub fn resolve(&self, mapping: &AttributeMapping) -> Result<Converter, ConvertError> {
        if let Some(name) = &mapping.converter {
            if let Some(custom) = self.custom.get(name) {
                return Ok(Converter::Custom(custom.clone()));
            }
            return builtin_by_name(name)
                .ok_or_else(|| ConvertError::UnknownConverter(name.clone()));
        }

        match mapping.field_type {
            FieldType::Default => Ok(Converter::Default),
            FieldType::Boolean => Ok(Converter::Boolean),
            FieldType::BooleanDropdown => Ok(Converter::BooleanDropdown),
            FieldType::DropDown => Ok(Converter::DropDown),
            FieldType::DateTime => Ok(Converter::DateTime),
            FieldType::Date => Ok(Converter::Date),
            FieldType::Time => Ok(Converter::Time),
            FieldType::Integer => Ok(Converter::Integer),
            FieldType::Float => Ok(Converter::Float),
            // the tag promises an override that is absent
            FieldType::Custom => Err(ConvertError::UnknownConverter("custom".to_string())),
        }
    }
}

fn builtin_by_name(name: &str) -> Option<Converter> {
    let converter = match name {
        "default" => Converter::Default,
        "bool" | "boolean" => Converter::Boolean,
        "boolDropDown" | "booleanDropDown" => Converter::BooleanDropdown,
        "dropDown" | "dropdown" => Converter::DropDown,
        "datetime" => Converter::DateTime,
        "date" => Converter::Date,
        "time" => Converter::Time,
        "int" | "integer" => Converter::Integer,
        "float" => Converter::Float,
        _ => return None,
    };
    Some(converter)
}

//! crmsync
//!
//! Record synchronization between local domain models and a remote CRM
//! service reachable only through a paginated, loosely-typed HTTP/JSON API.
//!
//! Three layers:
//! 1. [`client`]: a request pipeline with bounded timeout retry, envelope
//!    validation, and normalization of the remote's inconsistent response
//!    shapes
//! 2. [`convert`] and [`mapping`]: bidirectional, per-field conversion
//!    between remote wire values and typed local attributes
//! 3. [`sync`]: a paged importer that feeds mapped records to a
//!    caller-supplied persistence collaborator

pub mod client;
pub mod convert;
pub mod mapping;
pub mod sync;

pub use client::{
    row_field_value, row_to_record, ApiError, CrmClient, Envelope, RetryPolicy, SortOrder,
    MAX_MUTATION_RECORDS, MAX_PAGE_SIZE,
};
pub use convert::{ConvertError, Converter, ConverterRegistry, Direction, ValueConverter};
pub use mapping::{
    AttributeMapping, ConverterOptions, FieldMapper, FieldType, MappingTable, Record,
};
pub use sync::{ImportOptions, ImportReport, Importer, RecordStore, SyncError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}

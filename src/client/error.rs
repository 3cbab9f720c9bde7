//! API error taxonomy for the request pipeline.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by [`CrmClient`](super::CrmClient) calls and response
/// normalization.
///
/// Only [`Timeout`](ApiError::Timeout) is retryable, and only while the
/// retry budget lasts; everything else is fatal for the call that raised
/// it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level timeout.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Transport failure other than a timeout; never retried.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Retry budget exhausted on repeated timeouts.
    #[error("can't perform request after {attempts} attempts with {interval:?} intervals")]
    RetryExhausted { attempts: u32, interval: Duration },

    /// Response body was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Decoded response was not a JSON object.
    #[error("object expected as decoded response, but got {got}")]
    InvalidResponse { got: String },

    /// The remote service reported a logical error for the whole call.
    #[error("error {code}: {message} (uri was \"{uri}\")")]
    Response {
        code: String,
        message: String,
        uri: String,
    },

    /// One or more rows of a bulk mutation failed; every failed row is
    /// folded into this single error.
    #[error("{details}\nUri was \"{uri}\".\nRecords data:\n{records}")]
    BulkRecord {
        details: String,
        uri: String,
        records: String,
    },

    /// Record payloads can only be built for GET or POST transports.
    #[error("unknown transport method {method} for record payload")]
    UnknownTransport { method: String },

    /// Bulk mutations accept a bounded number of records per call.
    #[error("{count} records exceed the limit of {limit} records per call")]
    RecordLimit { count: usize, limit: usize },

    /// A response row carried no field with the requested name.
    #[error("field with name \"{name}\" not found in response row")]
    MissingField { name: String },
}

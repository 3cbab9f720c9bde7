//! HTTP request pipeline for the remote CRM API.
//!
//! One logical call, including its bounded timeout retries, resolves fully
//! before control returns to the caller. The remote reports failures
//! inside the JSON envelope rather than through HTTP status codes, so every
//! response body is decoded and validated before an [`Envelope`] is handed
//! back.

mod error;
mod response;
mod wire;

pub use error::ApiError;
pub use response::{row_field_value, row_to_record, Envelope};

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::mapping::Record;

/// Maximum number of records one fetch call may return.
pub const MAX_PAGE_SIZE: usize = 200;
/// Maximum number of records accepted by one insert or update call.
pub const MAX_MUTATION_RECORDS: usize = 100;

/// API scope identifier sent with every request.
const SCOPE: &str = "crmapi";
/// Remote API version sent with record calls.
const VERSION: &str = "2";
/// Column selector meaning "all columns".
const ALL_COLUMNS: &str = "All";

/// Sort order for fetch calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Bounded retry applied to transport timeouts.
///
/// `max_attempts` counts every attempt including the first, so `1`
/// disables retrying entirely. The sleep between attempts is a fixed
/// interval; call volume is already capped by the remote's daily request
/// quota, so backoff stays deliberately simple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            interval: Duration::from_secs(1),
        }
    }
}

/// Client for one entity group of the remote CRM service.
///
/// The auth token and entity group are fixed for the client's lifetime.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    base_url: String,
    module: String,
    auth_token: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl CrmClient {
    /// Creates a client with a 30 second timeout and retries disabled.
    pub fn new(
        base_url: impl Into<String>,
        module: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            module: module.into(),
            auth_token: auth_token.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Entity group this client addresses.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Executes one API call: merges the default query parameters, sends
    /// the request under the configured timeout and retry policy, then
    /// decodes the envelope and unifies its row shape.
    pub async fn call(
        &self,
        function: &str,
        method: Method,
        query: Vec<(String, String)>,
        post_params: Vec<(String, String)>,
        post_body: Option<String>,
    ) -> Result<Envelope, ApiError> {
        let url = format!("{}/{}/{}", self.base_url, self.module, function);
        let query = self.prepare_query(query);
        if !post_params.is_empty() && post_body.is_some() {
            warn!(
                "attempt to send POST parameters and POST body; \
                 the raw body overrides any POST parameters"
            );
        }
        let body = self
            .send_with_retry(&url, &method, &query, &post_params, &post_body)
            .await?;
        decode(&body, &self.module)
    }

    /// Fetches one page of records.
    ///
    /// `from_index`/`to_index` are 1-based and inclusive; the remote
    /// returns at most [`MAX_PAGE_SIZE`] records per call.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_records(
        &self,
        columns: &[String],
        from_index: usize,
        to_index: usize,
        sort_column: Option<&str>,
        sort_order: SortOrder,
        last_modified_time: Option<&str>,
        exclude_null: bool,
    ) -> Result<Envelope, ApiError> {
        let mut query = vec![
            ("selectColumns".to_string(), self.select_columns(columns)),
            ("fromIndex".to_string(), from_index.to_string()),
            ("toIndex".to_string(), to_index.to_string()),
            ("sortOrderString".to_string(), sort_order.as_str().to_string()),
            ("excludeNull".to_string(), exclude_null.to_string()),
            ("version".to_string(), VERSION.to_string()),
        ];
        if let Some(column) = sort_column {
            query.push(("sortColumnString".to_string(), column.to_string()));
        }
        if let Some(time) = last_modified_time {
            query.push(("lastModifiedTime".to_string(), time.to_string()));
        }
        self.call("getRecords", Method::GET, query, Vec::new(), None)
            .await
    }

    /// Fetches a single record by its remote id.
    pub async fn get_record_by_id(
        &self,
        id: &str,
        exclude_null: bool,
    ) -> Result<Envelope, ApiError> {
        let query = vec![
            ("id".to_string(), id.to_string()),
            ("excludeNull".to_string(), exclude_null.to_string()),
            ("version".to_string(), VERSION.to_string()),
        ];
        self.call("getRecordById", Method::GET, query, Vec::new(), None)
            .await
    }

    /// Inserts up to [`MAX_MUTATION_RECORDS`] records.
    ///
    /// The response is normalized before it is returned: rows are restored
    /// to request order and per-row errors are aggregated into one
    /// [`ApiError::BulkRecord`].
    pub async fn insert_records(
        &self,
        records: &[Record],
        workflow_trigger: bool,
        exclude_null: bool,
    ) -> Result<Envelope, ApiError> {
        let xml = wire::records_to_xml(&self.module, records, &Method::POST)?;
        let query = vec![
            ("wfTrigger".to_string(), workflow_trigger.to_string()),
            ("duplicateCheck".to_string(), "1".to_string()),
            ("excludeNull".to_string(), exclude_null.to_string()),
            ("version".to_string(), VERSION.to_string()),
        ];
        let post_params = vec![("xmlData".to_string(), xml)];
        let mut envelope = self
            .call("insertRecords", Method::POST, query, post_params, None)
            .await?;
        envelope.restore_request_order();
        envelope.check_row_errors(records)?;
        Ok(envelope)
    }

    /// Updates the record identified by `id`, normalizing the response the
    /// same way as [`insert_records`](Self::insert_records).
    pub async fn update_records(
        &self,
        id: &str,
        records: &[Record],
        workflow_trigger: bool,
        exclude_null: bool,
    ) -> Result<Envelope, ApiError> {
        let xml = wire::records_to_xml(&self.module, records, &Method::POST)?;
        let query = vec![
            ("id".to_string(), id.to_string()),
            ("wfTrigger".to_string(), workflow_trigger.to_string()),
            ("excludeNull".to_string(), exclude_null.to_string()),
            ("version".to_string(), VERSION.to_string()),
        ];
        let post_params = vec![("xmlData".to_string(), xml)];
        let mut envelope = self
            .call("updateRecords", Method::POST, query, post_params, None)
            .await?;
        envelope.restore_request_order();
        envelope.check_row_errors(records)?;
        Ok(envelope)
    }

    /// Moves a record to the remote recycle bin.
    pub async fn delete_records(&self, id: &str) -> Result<Envelope, ApiError> {
        let query = vec![("id".to_string(), id.to_string())];
        self.call("deleteRecords", Method::GET, query, Vec::new(), None)
            .await
    }

    /// Default parameters plus caller parameters; a literal `excludeNull`
    /// entry is rewritten to the remote's `newFormat` flag (`1` excludes
    /// null values, `2` includes them) and never transmitted itself.
    fn prepare_query(&self, query: Vec<(String, String)>) -> Vec<(String, String)> {
        let mut prepared = vec![("scope".to_string(), SCOPE.to_string())];
        if !self.auth_token.is_empty() {
            prepared.push(("authtoken".to_string(), self.auth_token.clone()));
        }
        for (name, value) in query {
            if name == "excludeNull" {
                let new_format = if value == "true" { "1" } else { "2" };
                prepared.push(("newFormat".to_string(), new_format.to_string()));
            } else {
                prepared.push((name, value));
            }
        }
        prepared
    }

    /// Sends the request, retrying timeouts up to the policy's attempt
    /// budget with a fixed sleep in between. Non-timeout failures, and any
    /// failure when retrying is disabled, propagate immediately.
    async fn send_with_retry(
        &self,
        url: &str,
        method: &Method,
        query: &[(String, String)],
        post_params: &[(String, String)],
        post_body: &Option<String>,
    ) -> Result<String, ApiError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.send(url, method, query, post_params, post_body).await {
                Ok(body) => return Ok(body),
                Err(err) if self.retry.max_attempts <= 1 || !err.is_timeout() => {
                    return Err(if err.is_timeout() {
                        ApiError::Timeout(err)
                    } else {
                        ApiError::Transport(err)
                    });
                }
                Err(err) => {
                    warn!("request to {} timed out on attempt {}: {}", url, attempts, err);
                    if attempts >= self.retry.max_attempts {
                        return Err(ApiError::RetryExhausted {
                            attempts,
                            interval: self.retry.interval,
                        });
                    }
                    tokio::time::sleep(self.retry.interval).await;
                }
            }
        }
    }

    async fn send(
        &self,
        url: &str,
        method: &Method,
        query: &[(String, String)],
        post_params: &[(String, String)],
        post_body: &Option<String>,
    ) -> Result<String, reqwest::Error> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .query(query)
            .timeout(self.timeout);
        if let Some(body) = post_body {
            request = request.body(body.clone());
        } else if !post_params.is_empty() {
            request = request.form(&post_params.to_vec());
        }
        debug!("sending {} request to {}", method, url);
        let response = request.send().await?;
        response.text().await
    }

    /// `selectColumns` parameter: all columns, or `Module(a,b,c)`.
    fn select_columns(&self, columns: &[String]) -> String {
        if columns.is_empty() {
            ALL_COLUMNS.to_string()
        } else {
            format!("{}({})", self.module, columns.join(","))
        }
    }
}

/// Decodes and validates one response body.
fn decode(body: &str, module: &str) -> Result<Envelope, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(ApiError::InvalidJson)?;
    if !value.is_object() {
        return Err(ApiError::InvalidResponse {
            got: kind_of(&value).to_string(),
        });
    }
    if let Some(error) = value.pointer("/response/error") {
        return Err(ApiError::Response {
            code: response::text(error.get("code")),
            message: response::text(error.get("message")),
            uri: value
                .pointer("/response/uri")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    let mut envelope = Envelope::new(value);
    envelope.unify_row_shape(module);
    Ok(envelope)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

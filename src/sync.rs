//! Paged full-module import.
//!
//! The [`Importer`] drives [`CrmClient::get_records`] page by page, keeping
//! the fetch ordered by creation time so that paging stays well-defined
//! even while records are being created remotely. Each page's rows are
//! flattened into records, mapped onto local attribute names, and handed
//! to the caller: accumulated in memory, streamed per page, or saved
//! through a [`RecordStore`] collaborator.

use tracing::{debug, error};

use crate::client::{row_to_record, ApiError, CrmClient, SortOrder, MAX_PAGE_SIZE};
use crate::convert::{ConvertError, Direction};
use crate::mapping::{FieldMapper, Record};

/// Sort column that keeps paging stable under concurrent remote inserts.
const CREATED_TIME_COLUMN: &str = "Created Time";

/// Errors that abort an import run.
///
/// Per-record persistence failures are not among them; those are logged
/// and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

/// Persistence collaborator: saves one mapped record at a time.
///
/// What validation and force-saving mean is up to the implementation; a
/// returned error is logged together with the full record and never aborts
/// the import.
pub trait RecordStore {
    type Error: std::fmt::Display;

    fn save(
        &mut self,
        record: &Record,
        run_validation: bool,
        save_invalid: bool,
    ) -> Result<(), Self::Error>;
}

/// Options for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Ask the store to validate each record before saving it.
    pub run_validation: bool,
    /// Ask the store to save records even when validation fails.
    pub save_invalid: bool,
    /// Restrict the fetch to records modified after this remote timestamp.
    pub last_modified_time: Option<String>,
    /// Drop null-valued fields from fetched records.
    pub exclude_null: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            run_validation: true,
            save_invalid: false,
            last_modified_time: None,
            exclude_null: false,
        }
    }
}

/// Result of one import run, returned to the caller rather than kept in
/// any shared state; aggregate across runs on the calling side if needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Pages fetched.
    pub pages: usize,
    /// Rows fetched across all pages.
    pub fetched: usize,
    /// Records the store accepted.
    pub saved: usize,
    /// Records the store rejected.
    pub failed: usize,
}

/// Drives paginated imports for one entity group.
pub struct Importer<'a> {
    client: &'a CrmClient,
    mapper: &'a FieldMapper,
}

impl<'a> Importer<'a> {
    pub fn new(client: &'a CrmClient, mapper: &'a FieldMapper) -> Self {
        Self { client, mapper }
    }

    /// Fetches every record of the module into memory.
    ///
    /// Convenient for small modules; use
    /// [`for_each_page`](Self::for_each_page) or [`import`](Self::import)
    /// when the record count is unbounded.
    pub async fn fetch_all(&self, options: &ImportOptions) -> Result<Vec<Record>, SyncError> {
        let mut records = Vec::new();
        self.for_each_page(options, |mut page, _| records.append(&mut page))
            .await?;
        Ok(records)
    }

    /// Streams mapped records to `callback` one page at a time, retaining
    /// nothing. The callback also receives the 1-based page number.
    ///
    /// The fetch loop requests contiguous index ranges of [`MAX_PAGE_SIZE`]
    /// records and stops as soon as a page comes back short.
    pub async fn for_each_page<F>(
        &self,
        options: &ImportOptions,
        mut callback: F,
    ) -> Result<ImportReport, SyncError>
    where
        F: FnMut(Vec<Record>, usize),
    {
        let columns = self.mapper.remote_names();
        let mut report = ImportReport::default();
        let mut page = 1;

        loop {
            let from_index = (page - 1) * MAX_PAGE_SIZE + 1;
            let to_index = page * MAX_PAGE_SIZE;
            let envelope = self
                .client
                .get_records(
                    &columns,
                    from_index,
                    to_index,
                    Some(CREATED_TIME_COLUMN),
                    SortOrder::Ascending,
                    options.last_modified_time.as_deref(),
                    options.exclude_null,
                )
                .await?;

            let rows = envelope.rows(self.client.module());
            let count = rows.len();
            debug!("page {}: fetched {} rows", page, count);

            let mut mapped = Vec::with_capacity(count);
            for row in rows {
                let record = row_to_record(row);
                mapped.push(self.mapper.map_record(&record, Direction::RemoteToLocal)?);
            }

            report.pages += 1;
            report.fetched += count;
            callback(mapped, page);

            if count < MAX_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(report)
    }

    /// Imports the whole module into `store`, one record at a time.
    ///
    /// Store failures are logged with the record that caused them and
    /// skipped; pipeline and configuration failures abort the run.
    pub async fn import<S: RecordStore>(
        &self,
        store: &mut S,
        options: &ImportOptions,
    ) -> Result<ImportReport, SyncError> {
        let mut saved = 0;
        let mut failed = 0;

        let mut report = self
            .for_each_page(options, |records, _| {
                for record in &records {
                    match store.save(record, options.run_validation, options.save_invalid) {
                        Ok(()) => saved += 1,
                        Err(err) => {
                            failed += 1;
                            error!(
                                "can't save record: {}. Attributes:\n{}",
                                err,
                                serde_json::to_string_pretty(record).unwrap_or_default()
                            );
                        }
                    }
                }
            })
            .await?;

        report.saved = saved;
        report.failed = failed;
        Ok(report)
    }
}

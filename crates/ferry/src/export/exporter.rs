//! Pull-based streaming export.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::DEFAULT_EXPORT_BATCH_SIZE;
use crate::error::Result;
use crate::query::{QuerySpec, compose, count_query, paginate, wrap_raw_query};
use crate::store::{ColumnInfo, Store};

use super::events::{ExportEvent, percent_complete};

/// Runs queries as paginated event streams.
#[derive(Clone)]
pub struct Exporter {
    store: Arc<dyn Store>,
    batch_size: u64,
}

impl Exporter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
        }
    }

    /// Set the number of rows fetched per page (at least 1).
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Export the rows selected by `spec`.
    ///
    /// The request is validated up front; nothing is sent to the store for a
    /// rejected spec.
    pub fn export(&self, spec: &QuerySpec) -> Result<ExportStream> {
        let query = compose(spec, None, None)?;
        Ok(ExportStream::new(Arc::clone(&self.store), query, self.batch_size))
    }

    /// Export the rows of an arbitrary read query.
    pub fn export_query(&self, sql: &str) -> Result<ExportStream> {
        let query = wrap_raw_query(sql)?;
        Ok(ExportStream::new(Arc::clone(&self.store), query, self.batch_size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Start,
    Paging,
    Done,
}

/// Lazy sequence of [`ExportEvent`]s.
///
/// Nothing touches the store until the first call to `next`. Each page is
/// fetched only after every event of the previous page has been pulled, so a
/// caller that stops iterating (or drops the stream) stops the export. After
/// an error is yielded the stream is exhausted.
pub struct ExportStream {
    store: Arc<dyn Store>,
    query: String,
    batch_size: u64,
    state: StreamState,
    total: Option<u64>,
    offset: u64,
    columns: Vec<ColumnInfo>,
    pending: VecDeque<ExportEvent>,
}

impl ExportStream {
    fn new(store: Arc<dyn Store>, query: String, batch_size: u64) -> Self {
        Self {
            store,
            query,
            batch_size,
            state: StreamState::Start,
            total: None,
            offset: 0,
            columns: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// The unpaginated query being exported.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Total row count, once the count query has run.
    pub fn total_rows(&self) -> Option<u64> {
        self.total
    }

    /// Result columns, once the first page has been fetched.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn start(&mut self) -> Result<ExportEvent> {
        let total = self.store.query(&count_query(&self.query))?.scalar_u64()?;
        debug!(total, query = %self.query, "export started");

        self.total = Some(total);
        self.state = if total == 0 {
            info!("export finished: no rows");
            StreamState::Done
        } else {
            StreamState::Paging
        };
        Ok(ExportEvent::progress(0, total))
    }

    fn fetch_page(&mut self) -> Result<()> {
        let page = paginate(&self.query, Some(self.batch_size), Some(self.offset));
        let result = self.store.query(&page)?;
        let total = self.total.unwrap_or(0);

        if result.is_empty() {
            info!(rows = self.offset.min(total), total, "export finished");
            self.state = StreamState::Done;
            return Ok(());
        }

        debug!(offset = self.offset, rows = result.row_count(), "fetched export page");
        if self.columns.is_empty() {
            self.columns = result.columns;
        }
        self.offset += self.batch_size;
        self.pending
            .extend(result.rows.into_iter().map(ExportEvent::row));
        self.pending
            .push_back(ExportEvent::progress(percent_complete(self.offset, total), total));
        Ok(())
    }
}

impl Iterator for ExportStream {
    type Item = Result<ExportEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            let step = match self.state {
                StreamState::Done => return None,
                StreamState::Start => self.start().map(Some),
                StreamState::Paging => self.fetch_page().map(|_| None),
            };

            match step {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, offset = self.offset, "export aborted");
                    self.state = StreamState::Done;
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

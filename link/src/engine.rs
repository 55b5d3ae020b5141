//! The engine abstraction the console layer runs against.

use crate::error::Result;
use crate::models::{CancelAck, JobHandle, JobMetadata, Page};
use async_trait::async_trait;

/// A remote query engine.
///
/// Job creation and row retrieval are separate round trips so that a job can
/// be cancelled after submission but before its first page returns. Forward
/// pagination uses the continuation token from the previous [`Page`];
/// offset-based fetches (token absent) are the fallback for backward
/// navigation.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Create a job for `query`. With `dry_run`, the engine validates and
    /// estimates only; no rows ever exist for the returned handle.
    async fn submit(&self, query: &str, dry_run: bool) -> Result<JobHandle>;

    /// Fetch one page of rows. `page_token` takes precedence over
    /// `start_index` when both are given.
    async fn fetch_page(
        &self,
        job: &JobHandle,
        start_index: u64,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<Page>;

    /// Retrieve the job's metadata record.
    async fn fetch_metadata(&self, job: &JobHandle) -> Result<JobMetadata>;

    /// Request cancellation of the job. Best-effort: the ack only means the
    /// engine accepted the request.
    async fn cancel(&self, job: &JobHandle) -> Result<CancelAck>;
}

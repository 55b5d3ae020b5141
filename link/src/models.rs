//! Data models for the engine client.
//!
//! Defines the job handle, page, and metadata structures exchanged with a
//! remote query engine, plus the wire request/response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Execution state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Done,
    Error,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Running => write!(f, "RUNNING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Error => write!(f, "ERROR"),
        }
    }
}

/// Opaque reference to one remote query execution.
///
/// Cheap to clone; a new submission produces a fresh handle rather than
/// mutating the old one. Pages, metadata, and cancellation are all addressed
/// through the handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    /// Engine-assigned job identifier
    pub id: String,

    /// Region/location the job runs in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Job state as of the last round trip
    pub state: JobState,
}

/// Execution statistics reported by the engine.
///
/// Timestamps are epoch milliseconds rendered as strings, matching how the
/// engine reports them on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Bytes scanned by the job; for dry runs this is the estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes_processed: Option<String>,
}

/// Full job metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// Engine-assigned job identifier
    pub id: String,

    /// Project/billing scope the job ran under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Link to the job in the engine's own console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    pub state: JobState,

    #[serde(default)]
    pub statistics: JobStatistics,
}

impl JobMetadata {
    /// Derive a handle from this metadata record
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            id: self.id.clone(),
            location: self.location.clone(),
            state: self.state,
        }
    }
}

/// One page of rows from a forward or offset-based fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Row records for this page, in result order
    #[serde(default)]
    pub rows: Vec<JsonValue>,

    /// Continuation token for the next forward page; absent on the last page.
    /// Opaque, and only meaningful against the job that produced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,

    /// Total rows in the result set, when the engine reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
}

/// Acknowledgement of a cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAck {
    pub job_id: String,

    /// Whether the engine accepted the request. Cancellation is best-effort;
    /// an accepted request may still let the job run to completion.
    pub cancelled: bool,
}

/// Job submission request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// SQL text to execute
    pub query: String,

    /// When set, the engine validates and estimates without running
    #[serde(default)]
    pub dry_run: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_bytes_billed: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_legacy_sql: Option<bool>,
}

/// Error body returned by the engine on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_serde() {
        assert_eq!(serde_json::to_string(&JobState::Done).unwrap(), "\"done\"");
        let state: JobState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(state, JobState::Running);
    }

    #[test]
    fn test_metadata_handle() {
        let meta: JobMetadata = serde_json::from_value(serde_json::json!({
            "id": "job_42",
            "projectId": "acme-data",
            "location": "EU",
            "state": "done",
            "statistics": {
                "creationTime": "1712000000000",
                "totalBytesProcessed": "1048576"
            }
        }))
        .unwrap();

        let handle = meta.handle();
        assert_eq!(handle.id, "job_42");
        assert_eq!(handle.location.as_deref(), Some("EU"));
        assert_eq!(handle.state, JobState::Done);
    }

    #[test]
    fn test_page_defaults() {
        let page: Page = serde_json::from_str("{}").unwrap();
        assert!(page.rows.is_empty());
        assert!(page.page_token.is_none());
        assert!(page.total_rows.is_none());
    }

    #[test]
    fn test_submit_request_wire_shape() {
        let req = SubmitRequest {
            query: "SELECT 1".into(),
            dry_run: true,
            location: None,
            maximum_bytes_billed: Some(1_000_000),
            use_legacy_sql: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["dryRun"], true);
        assert_eq!(json["maximumBytesBilled"], 1_000_000);
        assert!(json.get("location").is_none());
    }
}

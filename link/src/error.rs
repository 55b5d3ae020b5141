// Error types for the engine client.
use std::time::Duration;
use thiserror::Error;

/// Result type for engine client operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors produced by the engine client.
///
/// Submission and fetch failures are separate variants: a failed submission
/// means no job handle exists (cancellation is meaningless), while a failed
/// fetch leaves the handle addressable for cancel/metadata.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to submit query: {0}")]
    Submit(String),

    #[error("Failed to fetch results: {0}")]
    Fetch(String),

    #[error("Failed to cancel job: {0}")]
    Cancel(String),

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error ({status_code}): {message}")]
    Server { status_code: u16, message: String },
}

impl LinkError {
    /// True when the error came from the submission round trip, i.e. no
    /// job handle was ever created.
    pub fn is_submit(&self) -> bool {
        matches!(self, LinkError::Submit(_))
    }
}

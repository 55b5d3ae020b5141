//! Error types for the console layer.
//!
//! Every controller entry point catches these and converts them into the
//! `queryError` reply; nothing escapes to the front-end boundary as a panic.

use querydeck_link::LinkError;
use std::fmt;

/// Result type for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Errors that can occur in the console session layer
#[derive(Debug)]
pub enum ConsoleError {
    /// Error from the engine client library
    Engine(LinkError),

    /// No active editor, empty text, or unusable editor state
    EditorState(String),

    /// A job-scoped operation arrived before any job was submitted
    NoActiveJob,

    /// A result set with zero rows cannot produce a table
    EmptyResult,

    /// Backward navigation attempted at the start of the result set
    NoMorePreviousPages,

    /// The compiled artifact for a source document never appeared
    NoCompiledArtifact(String),

    /// Variables payload was not a JSON object
    VariableParse(String),

    /// Configuration file error
    Configuration(String),

    /// File I/O error
    File(String),

    /// Export writer error
    Export(String),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Engine(e) => write!(f, "{}", e),
            ConsoleError::EditorState(msg) => write!(f, "{}", msg),
            ConsoleError::NoActiveJob => write!(f, "No job was found."),
            ConsoleError::EmptyResult => write!(f, "The query returned no rows"),
            ConsoleError::NoMorePreviousPages => write!(f, "no more previous pages"),
            ConsoleError::NoCompiledArtifact(msg) => {
                write!(f, "No compiled artifact was found: {}", msg)
            }
            ConsoleError::VariableParse(msg) => write!(f, "Invalid variables: {}", msg),
            ConsoleError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ConsoleError::File(msg) => write!(f, "File error: {}", msg),
            ConsoleError::Export(msg) => write!(f, "Export error: {}", msg),
        }
    }
}

impl std::error::Error for ConsoleError {}

impl From<LinkError> for ConsoleError {
    fn from(err: LinkError) -> Self {
        ConsoleError::Engine(err)
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        ConsoleError::File(err.to_string())
    }
}

impl From<toml::de::Error> for ConsoleError {
    fn from(err: toml::de::Error) -> Self {
        ConsoleError::Configuration(format!("TOML parse error: {}", err))
    }
}

//! # querydeck-console: editor-embedded SQL console sessions
//!
//! The paginated query-execution and result-rendering layer behind an
//! interactive SQL console: a rendering front end posts JSON commands
//! (run / page / cancel / export), a per-panel [`SessionController`]
//! resolves the query text, drives the remote engine through
//! `querydeck-link`, and answers with flattened tabular results.
//!
//! ```rust,ignore
//! use querydeck_console::{spawn_session, ConsoleCommand, SessionController};
//!
//! let controller = SessionController::new(engine, editor, host, output, store, &config);
//! let (commands, mut replies) = spawn_session(controller, true);
//! commands.send(serde_json::from_str(r#"{"command":"nextPage","variables":{}}"#)?).await?;
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod export;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod table;
pub mod vars;

// Re-export main types for convenience
pub use config::{default_config_path, ConsoleConfiguration};
pub use cursor::{PageFetch, PaginationState, DEFAULT_PAGE_SIZE};
pub use error::{ConsoleError, Result};
pub use export::{ExportFormat, OutputSink};
pub use protocol::{ConsoleCommand, ConsoleReply, JobInfo, QueryResultData};
pub use resolver::{DocumentState, EditorContext, ProjectHost, ProjectLayout, QueryTextResolver};
pub use session::{spawn_session, DryRunSummary, SessionController};
pub use table::{build_table, flatten_record, ResultTable};
pub use vars::{apply_variables, parse_variables, Variables, VariablesStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

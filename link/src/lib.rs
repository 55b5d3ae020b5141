//! # querydeck-link: remote query engine client
//!
//! Client library for the remote query engine behind an interactive SQL
//! console. Job creation and row retrieval are separate round trips, so an
//! in-flight job can be cancelled before its first page lands.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use querydeck_link::{EngineClient, QueryEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EngineClient::builder()
//!         .base_url("http://localhost:9050")
//!         .bearer_token("token")
//!         .build()?;
//!
//!     let job = client.submit("SELECT * FROM events", false).await?;
//!     let page = client.fetch_page(&job, 0, 50, None).await?;
//!     println!("{} rows, more: {}", page.rows.len(), page.page_token.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod engine;
pub mod error;
pub mod models;
pub mod timeouts;

// Re-export main types for convenience
pub use auth::AuthProvider;
pub use client::EngineClient;
pub use engine::QueryEngine;
pub use error::{LinkError, Result};
pub use models::{CancelAck, ErrorBody, JobHandle, JobMetadata, JobState, JobStatistics, Page};
pub use timeouts::EngineTimeouts;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

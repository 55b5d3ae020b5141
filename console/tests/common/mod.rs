//! Shared fixtures for session tests: a scripted engine, a fixed editor,
//! and an in-memory output sink.

use async_trait::async_trait;
use querydeck_console::{
    ConsoleConfiguration, DocumentState, EditorContext, OutputSink, ProjectHost, ProjectLayout,
    Result, SessionController, VariablesStore,
};
use querydeck_link::{
    CancelAck, JobHandle, JobMetadata, JobState, JobStatistics, LinkError, Page, QueryEngine,
};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A page fetch the engine observed: (offset, token)
pub type FetchCall = (u64, Option<String>);

/// Scripted in-memory engine. Pages are keyed by offset; anything
/// unscripted comes back empty.
#[derive(Default)]
pub struct MockEngine {
    pages: Mutex<HashMap<u64, Page>>,
    submit_error: Mutex<Option<String>>,
    job_counter: AtomicU32,
    pub submits: Mutex<Vec<(String, bool)>>,
    pub fetches: Mutex<Vec<FetchCall>>,
    pub cancels: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, offset: u64, rows: Vec<JsonValue>, token: Option<&str>) -> Self {
        self.pages.lock().unwrap().insert(
            offset,
            Page {
                rows,
                page_token: token.map(|t| t.to_string()),
                total_rows: None,
            },
        );
        self
    }

    /// Make every subsequent submit fail with `message`
    pub fn fail_submits(&self, message: &str) {
        *self.submit_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn submit_count(&self) -> usize {
        self.submits.lock().unwrap().len()
    }

    pub fn last_submitted_sql(&self) -> Option<String> {
        self.submits.lock().unwrap().last().map(|(sql, _)| sql.clone())
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn submit(&self, query: &str, dry_run: bool) -> querydeck_link::Result<JobHandle> {
        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(LinkError::Submit(message));
        }
        self.submits
            .lock()
            .unwrap()
            .push((query.to_string(), dry_run));
        let n = self.job_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JobHandle {
            id: format!("job_{}", n),
            location: Some("US".to_string()),
            state: JobState::Running,
        })
    }

    async fn fetch_page(
        &self,
        _job: &JobHandle,
        start_index: u64,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> querydeck_link::Result<Page> {
        self.fetches
            .lock()
            .unwrap()
            .push((start_index, page_token.map(|t| t.to_string())));
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&start_index)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_metadata(&self, job: &JobHandle) -> querydeck_link::Result<JobMetadata> {
        Ok(JobMetadata {
            id: job.id.clone(),
            project_id: Some("acme-data".to_string()),
            location: job.location.clone(),
            self_link: Some(format!("https://engine.example/jobs/{}", job.id)),
            user_email: Some("analyst@example.com".to_string()),
            state: JobState::Done,
            statistics: JobStatistics {
                creation_time: Some("1712000000000".to_string()),
                start_time: Some("1712000000100".to_string()),
                end_time: Some("1712000000900".to_string()),
                total_bytes_processed: Some("1048576".to_string()),
            },
        })
    }

    async fn cancel(&self, job: &JobHandle) -> querydeck_link::Result<CancelAck> {
        self.cancels.lock().unwrap().push(job.id.clone());
        Ok(CancelAck {
            job_id: job.id.clone(),
            cancelled: true,
        })
    }
}

/// Editor bound to one fixed document.
pub struct StaticEditor {
    pub doc: DocumentState,
}

#[async_trait]
impl EditorContext for StaticEditor {
    fn active_document(&self) -> Result<DocumentState> {
        Ok(self.doc.clone())
    }

    async fn save_document(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// No managed projects; every document runs as raw text.
pub struct NoProjects;

#[async_trait]
impl ProjectHost for NoProjects {
    fn project_for(&self, _document: &Path) -> Option<ProjectLayout> {
        None
    }

    async fn compile_model(&self, _project: &ProjectLayout, _model: &str) -> Result<()> {
        Ok(())
    }
}

/// Output view surrogate collecting appended lines.
#[derive(Default)]
pub struct MemorySink {
    pub lines: Mutex<Vec<String>>,
}

impl OutputSink for MemorySink {
    fn append_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// N scripted rows starting at `start`, shaped like real result records
pub fn rows(range: std::ops::Range<u64>) -> Vec<JsonValue> {
    range
        .map(|i| json!({ "id": i, "name": format!("row{}", i) }))
        .collect()
}

/// A controller over a mock engine and a raw-text document.
pub fn controller(
    engine: Arc<MockEngine>,
    sink: Arc<MemorySink>,
    dir: &TempDir,
    sql: &str,
) -> SessionController {
    let editor = StaticEditor {
        doc: DocumentState {
            path: dir.path().join("scratch.sql"),
            text: sql.to_string(),
            is_dirty: false,
        },
    };
    let store = VariablesStore::new(dir.path().join("variables.json"));
    SessionController::new(
        engine,
        Arc::new(editor),
        Arc::new(NoProjects),
        sink,
        store,
        &ConsoleConfiguration::default(),
    )
}

//! Session controller: owns the single in-flight job, the pagination
//! cursor, and the message protocol with the rendering front end.
//!
//! Commands are processed strictly one at a time from a single-consumer
//! channel, so two commands can never race on the shared cursor or handle.
//! Every entry point converts failures into a `queryError` reply.

use crate::config::ConsoleConfiguration;
use crate::cursor::PaginationState;
use crate::error::{ConsoleError, Result};
use crate::export::{self, ExportFormat, OutputSink};
use crate::protocol::{ConsoleCommand, ConsoleReply, JobInfo, QueryResultData};
use crate::resolver::{EditorContext, ProjectHost, QueryTextResolver, ResolvedQuery};
use crate::table::build_table;
use crate::vars::{parse_variables, Variables, VariablesStore};
use log::{debug, info, warn};
use querydeck_link::{JobHandle, QueryEngine};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Summary returned by a dry run.
#[derive(Debug, Clone)]
pub struct DryRunSummary {
    pub job_id: String,
    pub total_bytes_processed: String,
}

/// One editor panel's query session.
///
/// Holds at most one live [`JobHandle`]; a new `runAsQuery` replaces it and
/// resets pagination, because the old continuation token is meaningless
/// against the new job.
pub struct SessionController {
    engine: Arc<dyn QueryEngine>,
    resolver: QueryTextResolver,
    output: Arc<dyn OutputSink>,
    store: VariablesStore,
    cursor: PaginationState,
    pretty_json: bool,
    job: Option<JobHandle>,
    sql: Option<String>,
    variables: Variables,
}

impl SessionController {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        editor: Arc<dyn EditorContext>,
        host: Arc<dyn ProjectHost>,
        output: Arc<dyn OutputSink>,
        store: VariablesStore,
        config: &ConsoleConfiguration,
    ) -> Self {
        let query_cfg = config.resolved_query();
        let compile_cfg = config.resolved_compile();
        let resolver = QueryTextResolver::new(editor, host).with_compile_wait(
            compile_cfg.attempts,
            Duration::from_millis(compile_cfg.poll_interval_ms),
        );
        let variables = store.load();

        Self {
            engine,
            resolver,
            output,
            store,
            cursor: PaginationState::new(query_cfg.page_size),
            pretty_json: config.resolved_export().pretty_json,
            job: None,
            sql: None,
            variables,
        }
    }

    /// The variables currently applied to submissions
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Process inbound commands until the channel closes.
    ///
    /// Seeds the front end's variables panel first; with `run_on_open` the
    /// session also executes the current document immediately, the way the
    /// result panel opens pre-populated.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ConsoleCommand>,
        replies: mpsc::Sender<ConsoleReply>,
        run_on_open: bool,
    ) {
        let seed = serde_json::to_value(&self.variables).unwrap_or(JsonValue::Null);
        if replies
            .send(ConsoleReply::SetVariables { variables: seed.clone() })
            .await
            .is_err()
        {
            return;
        }

        if run_on_open {
            debug!("[SESSION] Executing query on open");
            if let Some(reply) = self.handle(ConsoleCommand::RunAsQuery { variables: seed }).await {
                if replies.send(reply).await.is_err() {
                    return;
                }
            }
        }

        while let Some(command) = commands.recv().await {
            if let Some(reply) = self.handle(command).await {
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
        }
        debug!("[SESSION] Command channel closed; session ending");
    }

    /// Handle one command. `saveVariables` and successful exports produce no
    /// reply; everything else answers with a result or a `queryError`.
    pub async fn handle(&mut self, command: ConsoleCommand) -> Option<ConsoleReply> {
        match command {
            ConsoleCommand::RunAsQuery { variables } => {
                Some(self.run_as_query(&variables).await.unwrap_or_else(error_reply))
            }
            ConsoleCommand::NextPage { variables } => {
                Some(self.next_page(&variables).await.unwrap_or_else(error_reply))
            }
            ConsoleCommand::PrevPage { variables } => {
                Some(self.prev_page(&variables).await.unwrap_or_else(error_reply))
            }
            ConsoleCommand::FirstPage { variables } => {
                Some(self.first_page(&variables).await.unwrap_or_else(error_reply))
            }
            ConsoleCommand::LastPage { variables } => {
                Some(self.last_page(&variables).await.unwrap_or_else(error_reply))
            }
            ConsoleCommand::CancelQuery => {
                Some(self.cancel_query().await.unwrap_or_else(error_reply))
            }
            ConsoleCommand::SaveVariables { variables } => {
                self.save_variables(&variables);
                None
            }
            ConsoleCommand::SaveAsCsv { variables } => {
                self.save_results(ExportFormat::Csv, &variables)
                    .await
                    .err()
                    .map(error_reply)
            }
            ConsoleCommand::SaveAsTable { variables } => {
                self.save_results(ExportFormat::Table, &variables)
                    .await
                    .err()
                    .map(error_reply)
            }
            ConsoleCommand::SaveAsJson { variables } => {
                self.save_results(ExportFormat::Json, &variables)
                    .await
                    .err()
                    .map(error_reply)
            }
        }
    }

    /// Submit the resolved document as a fresh job and fetch its first page.
    async fn run_as_query(&mut self, variables: &JsonValue) -> Result<ConsoleReply> {
        self.update_variables(variables);
        let resolved = self.resolver.resolve(&self.variables).await?;
        info!("[SESSION] Submitting query ({} chars)", resolved.text.len());

        let job = self.engine.submit(&resolved.text, false).await?;
        info!("[SESSION] Job created: {}", job.id);

        // Replace the handle and discard stale pagination only once the
        // submission succeeded; a failed submit leaves the old job usable.
        self.job = Some(job);
        self.sql = Some(resolved.text);
        self.cursor.reset();

        let result = self.fetch_and_render(0, None).await?;
        Ok(ConsoleReply::RunAsQuery { result })
    }

    /// Forward fetch from the cursor, riding the continuation token.
    async fn next_page(&mut self, variables: &JsonValue) -> Result<ConsoleReply> {
        self.update_variables(variables);
        self.require_job()?;
        let fetch = self.cursor.next_fetch();
        let result = self.fetch_and_render(fetch.offset, fetch.token).await?;
        Ok(ConsoleReply::NextPage { result })
    }

    /// Backward navigation: an offset-based refetch two pages back.
    async fn prev_page(&mut self, variables: &JsonValue) -> Result<ConsoleReply> {
        self.update_variables(variables);
        self.require_job()?;
        let fetch = self.cursor.prev_fetch()?;
        let result = self.fetch_and_render(fetch.offset, None).await?;
        Ok(ConsoleReply::PrevPage { result })
    }

    /// Refetch from offset 0 on the existing handle; no resubmission.
    /// Answers under the `nextPage` tag, which is what the front end
    /// dispatches on.
    async fn first_page(&mut self, variables: &JsonValue) -> Result<ConsoleReply> {
        self.update_variables(variables);
        self.require_job()?;
        self.cursor.reset();
        let result = self.fetch_and_render(0, None).await?;
        Ok(ConsoleReply::NextPage { result })
    }

    /// Mirrors `prev_page`, guard included, and answers under the
    /// `prevPage` tag. Kept identical to the historical behavior; see
    /// DESIGN.md before "fixing" this.
    async fn last_page(&mut self, variables: &JsonValue) -> Result<ConsoleReply> {
        self.update_variables(variables);
        self.require_job()?;
        let fetch = self.cursor.prev_fetch()?;
        let result = self.fetch_and_render(fetch.offset, None).await?;
        Ok(ConsoleReply::PrevPage { result })
    }

    /// Best-effort cancellation of the held handle.
    async fn cancel_query(&mut self) -> Result<ConsoleReply> {
        let job = self.job.as_ref().ok_or(ConsoleError::NoActiveJob)?;
        info!("[SESSION] Cancelling job {}", job.id);
        let ack = self.engine.cancel(job).await?;
        Ok(ConsoleReply::CancelQuery { result: ack })
    }

    /// Persist the variables panel. Invalid payloads are ignored and the
    /// last valid value retained.
    fn save_variables(&mut self, variables: &JsonValue) {
        match parse_variables(variables) {
            Ok(vars) => {
                if let Err(e) = self.store.save(&vars) {
                    warn!("[SESSION] Could not persist variables: {}", e);
                }
                self.variables = vars;
            }
            Err(e) => warn!("[SESSION] Ignoring variables update: {}", e),
        }
    }

    /// Validate and estimate the current document without running it.
    pub async fn dry_run(&mut self) -> Result<DryRunSummary> {
        let resolved = self.resolver.resolve(&self.variables).await?;
        let job = self.engine.submit(&resolved.text, true).await?;
        let metadata = self.engine.fetch_metadata(&job).await?;
        let total_bytes = metadata
            .statistics
            .total_bytes_processed
            .clone()
            .unwrap_or_else(|| "0".to_string());

        export::write_dry_run_summary(self.output.as_ref(), &metadata.id, &total_bytes);
        Ok(DryRunSummary {
            job_id: metadata.id,
            total_bytes_processed: total_bytes,
        })
    }

    /// Re-resolve the current document, run it to completion, and write the
    /// full result set through the export writer.
    async fn save_results(&mut self, format: ExportFormat, variables: &JsonValue) -> Result<()> {
        self.update_variables(variables);
        let resolved = self.resolver.resolve(&self.variables).await?;
        let (job, rows) = self.drain_all(&resolved).await?;
        export::write_results(
            resolved.project_root.as_deref(),
            format,
            self.pretty_json,
            &job.id,
            &rows,
            self.output.as_ref(),
        )?;
        Ok(())
    }

    /// Run the current document to completion and render it in `format`,
    /// for one-shot (non-panel) execution.
    pub async fn render_full(&mut self, format: ExportFormat) -> Result<String> {
        let resolved = self.resolver.resolve(&self.variables).await?;
        let (_, rows) = self.drain_all(&resolved).await?;
        export::render_rows(format, &rows, self.pretty_json)
    }

    /// Submit a fresh job and drain every page. Does not touch the panel's
    /// held handle or cursor.
    async fn drain_all(&self, resolved: &ResolvedQuery) -> Result<(JobHandle, Vec<JsonValue>)> {
        let job = self.engine.submit(&resolved.text, false).await?;
        let page_size = self.cursor.page_size();

        let mut rows: Vec<JsonValue> = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .engine
                .fetch_page(&job, rows.len() as u64, page_size, token.as_deref())
                .await?;
            let empty = page.rows.is_empty();
            token = page.page_token;
            rows.extend(page.rows);
            if token.is_none() || empty {
                break;
            }
        }
        debug!("[SESSION] Drained {} rows from job {}", rows.len(), job.id);
        Ok((job, rows))
    }

    /// Fetch one page of the held job and package the success payload.
    async fn fetch_and_render(
        &mut self,
        page_start: u64,
        token: Option<String>,
    ) -> Result<QueryResultData> {
        let job = self.job.clone().ok_or(ConsoleError::NoActiveJob)?;
        let page = self
            .engine
            .fetch_page(&job, page_start, self.cursor.page_size(), token.as_deref())
            .await?;

        if page.rows.is_empty() {
            // no header can be derived from zero rows; the cursor is left
            // untouched so the previous page stays reachable
            return Err(ConsoleError::EmptyResult);
        }

        self.cursor
            .record_page(page_start, page.rows.len(), page.page_token.clone());

        let metadata = self.engine.fetch_metadata(&job).await?;
        let table = build_table(&page.rows)?;
        let json = serde_json::to_string_pretty(&page.rows)
            .map_err(|e| ConsoleError::File(e.to_string()))?;
        let detail = serde_json::to_string_pretty(&metadata.statistics)
            .map_err(|e| ConsoleError::File(e.to_string()))?;

        Ok(QueryResultData {
            status: "success".to_string(),
            sql: self.sql.clone().unwrap_or_default(),
            info: JobInfo::from_metadata(&metadata),
            table,
            json,
            detail,
            start_index: page_start,
            has_next: self.cursor.has_next(),
            has_prev: page_start > 0,
        })
    }

    fn require_job(&self) -> Result<&JobHandle> {
        self.job.as_ref().ok_or(ConsoleError::NoActiveJob)
    }

    fn update_variables(&mut self, raw: &JsonValue) {
        match parse_variables(raw) {
            Ok(vars) => self.variables = vars,
            Err(e) => warn!("[SESSION] Ignoring variables update: {}", e),
        }
    }
}

fn error_reply(err: ConsoleError) -> ConsoleReply {
    warn!("[SESSION] {}", err);
    ConsoleReply::QueryError {
        error_message: err.to_string(),
    }
}

/// Convenience used by embedders: spawn a session onto its own task and get
/// the channel pair the front end talks through.
pub fn spawn_session(
    controller: SessionController,
    run_on_open: bool,
) -> (mpsc::Sender<ConsoleCommand>, mpsc::Receiver<ConsoleReply>) {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (reply_tx, reply_rx) = mpsc::channel(32);
    tokio::spawn(controller.run(command_rx, reply_tx, run_on_open));
    (command_tx, reply_rx)
}

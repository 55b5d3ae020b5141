//! QueryDeck console - session host for an editor-embedded SQL console
//!
//! Bridges a rendering front end to a [`SessionController`] over
//! JSON-lines: commands arrive on stdin, replies leave on stdout. The
//! editor plugin host owns the webview; this process owns the session.
//!
//! # Usage
//!
//! ```bash
//! # Serve the message protocol for one document
//! querydeck-console --file query.sql
//!
//! # One-shot execution, rendered as CSV
//! querydeck-console --file query.sql --once --format csv
//!
//! # Validate and estimate only
//! querydeck-console --file query.sql --dry-run
//! ```

use clap::Parser;
use log::warn;
use querydeck_console::{
    default_config_path, spawn_session, ConsoleCommand, ConsoleConfiguration, ConsoleError,
    DocumentState, EditorContext, ExportFormat, OutputSink, ProjectHost, ProjectLayout, Result,
    SessionController, VariablesStore,
};
use querydeck_link::{AuthProvider, EngineClient, EngineTimeouts};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "querydeck-console", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// SQL document the session is bound to
    #[arg(short, long)]
    file: PathBuf,

    /// Override the engine base URL from the config file
    #[arg(short, long)]
    url: Option<String>,

    /// Bearer token for the engine API
    #[arg(long)]
    token: Option<String>,

    /// Validate and estimate the document without running it
    #[arg(long)]
    dry_run: bool,

    /// Run once, print the rendered result set, and exit
    #[arg(long)]
    once: bool,

    /// Output format for --once: csv, table, json
    #[arg(long)]
    format: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Editor context for a document on disk: always "saved", re-read per
/// resolution so edits between commands are picked up.
struct FileEditor {
    path: PathBuf,
}

#[async_trait::async_trait]
impl EditorContext for FileEditor {
    fn active_document(&self) -> Result<DocumentState> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            ConsoleError::EditorState(format!("Cannot read {}: {}", self.path.display(), e))
        })?;
        Ok(DocumentState {
            path: self.path.clone(),
            text,
            is_dirty: false,
        })
    }

    async fn save_document(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// The standalone binary manages no projects; documents run as raw text.
/// An editor plugin host plugs in its own implementation instead.
struct NoProjects;

#[async_trait::async_trait]
impl ProjectHost for NoProjects {
    fn project_for(&self, _document: &Path) -> Option<ProjectLayout> {
        None
    }

    async fn compile_model(&self, _project: &ProjectLayout, _model: &str) -> Result<()> {
        Ok(())
    }
}

/// Output view surrogate: stderr, keeping stdout clean for the protocol.
struct StderrSink;

impl OutputSink for StderrSink {
    fn append_line(&self, line: &str) {
        eprintln!("{}", line);
    }
}

fn build_engine(cli: &Cli, config: &ConsoleConfiguration) -> Result<EngineClient> {
    let engine_cfg = config.resolved_engine();
    let url = cli
        .url
        .clone()
        .or(engine_cfg.url)
        .ok_or_else(|| ConsoleError::Configuration("engine url is required".into()))?;

    let auth = if let Some(token) = cli.token.clone() {
        AuthProvider::bearer_token(token)
    } else if let Some(auth_cfg) = &config.auth {
        match (&auth_cfg.token, &auth_cfg.username, &auth_cfg.password) {
            (Some(token), _, _) => AuthProvider::bearer_token(token.clone()),
            (None, Some(user), Some(pass)) => {
                AuthProvider::basic_auth(user.clone(), pass.clone())
            }
            _ => AuthProvider::none(),
        }
    } else {
        AuthProvider::none()
    };

    let timeout = Duration::from_secs(engine_cfg.timeout);
    let timeouts = EngineTimeouts::builder()
        .submit_timeout(timeout)
        .fetch_timeout(timeout)
        .build();

    let mut builder = EngineClient::builder()
        .base_url(url)
        .auth(auth)
        .timeouts(timeouts)
        .max_retries(engine_cfg.max_retries);
    if let Some(location) = engine_cfg.location {
        builder = builder.location(location);
    }
    let query_cfg = config.resolved_query();
    if let Some(max) = query_cfg.maximum_bytes_billed {
        builder = builder.maximum_bytes_billed(max);
    }
    if query_cfg.use_legacy_sql {
        builder = builder.use_legacy_sql(true);
    }

    builder.build().map_err(ConsoleError::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    }
    log_builder.init();

    let config = ConsoleConfiguration::load(&cli.config)?;
    let engine = Arc::new(build_engine(&cli, &config)?);
    let editor = Arc::new(FileEditor {
        path: cli.file.clone(),
    });
    let output = Arc::new(StderrSink);
    let store = VariablesStore::new(
        querydeck_console::config::expand_config_path(Path::new("~/.querydeck/variables.json")),
    );

    let mut controller =
        SessionController::new(engine, editor, Arc::new(NoProjects), output, store, &config);

    if cli.dry_run {
        let summary = controller.dry_run().await?;
        println!(
            "Job {}: {} bytes processed (dry run)",
            summary.job_id, summary.total_bytes_processed
        );
        return Ok(());
    }

    if cli.once {
        let format = ExportFormat::from_name(
            cli.format
                .as_deref()
                .unwrap_or(&config.resolved_export().format),
        );
        let rendered = controller.render_full(format).await?;
        print!("{}", rendered);
        return Ok(());
    }

    serve(controller).await
}

/// Serve the JSON-lines message protocol until stdin closes.
async fn serve(controller: SessionController) -> Result<()> {
    let (commands, mut replies) = spawn_session(controller, true);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ConsoleCommand>(line) {
                Ok(command) => {
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("[MAIN] Ignoring unparsable command: {}", e),
            }
        }
        // dropping the sender ends the session loop
    });

    while let Some(reply) = replies.recv().await {
        let line =
            serde_json::to_string(&reply).map_err(|e| ConsoleError::File(e.to_string()))?;
        println!("{}", line);
    }

    Ok(())
}

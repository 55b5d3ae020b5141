//! Decides what SQL text a command actually runs.
//!
//! Raw editor text is used for documents outside any managed project (and
//! for documents already inside a project's compiled-output tree). Source
//! documents inside a project resolve through their externally-compiled
//! artifact, recompiling and waiting when the artifact is stale.

use crate::error::{ConsoleError, Result};
use crate::vars::{apply_variables, Variables};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Snapshot of the editor document a command applies to.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub path: PathBuf,
    pub text: String,
    /// Unsaved changes exist; the document must be persisted before a
    /// compiled-text lookup can see them
    pub is_dirty: bool,
}

/// The host editor. Its whole contract here: given editor state, produce
/// query text, and persist a document on request.
#[async_trait]
pub trait EditorContext: Send + Sync {
    /// The document the session is bound to. Implementations fail with
    /// [`ConsoleError::EditorState`] when no editor is active.
    fn active_document(&self) -> Result<DocumentState>;

    async fn save_document(&self, path: &Path) -> Result<()>;
}

/// Where a managed project keeps its sources and compiled output.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    /// Build output directory; compiled artifacts live under
    /// `<target_path>/compiled/**`
    pub target_path: PathBuf,
}

/// The project system that owns compilation.
#[async_trait]
pub trait ProjectHost: Send + Sync {
    /// The managed project containing `document`, if any
    fn project_for(&self, document: &Path) -> Option<ProjectLayout>;

    /// Kick off recompilation of one model. Returns once the compile has
    /// been started; completion is observed through the artifact appearing.
    async fn compile_model(&self, project: &ProjectLayout, model_name: &str) -> Result<()>;
}

/// A resolved query, ready to submit.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub text: String,
    /// Root of the managed project the document belongs to, for export
    /// file placement
    pub project_root: Option<PathBuf>,
}

/// Resolves editor state into submittable SQL text.
pub struct QueryTextResolver {
    editor: Arc<dyn EditorContext>,
    host: Arc<dyn ProjectHost>,
    compile_attempts: u32,
    poll_interval: Duration,
}

impl QueryTextResolver {
    pub fn new(editor: Arc<dyn EditorContext>, host: Arc<dyn ProjectHost>) -> Self {
        Self {
            editor,
            host,
            compile_attempts: 100,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override the compile-wait budget (attempts × poll interval)
    pub fn with_compile_wait(mut self, attempts: u32, poll_interval: Duration) -> Self {
        self.compile_attempts = attempts;
        self.poll_interval = poll_interval;
        self
    }

    /// Resolve the active document to query text and apply `vars`.
    pub async fn resolve(&self, vars: &Variables) -> Result<ResolvedQuery> {
        let doc = self.editor.active_document()?;
        let project = self.host.project_for(&doc.path);

        let (text, project_root) = match project {
            None => (Self::raw_text(&doc)?, None),
            Some(layout) if doc.path.starts_with(&layout.target_path) => {
                // already compiled output; run it as-is
                let root = layout.root.clone();
                (Self::raw_text(&doc)?, Some(root))
            }
            Some(layout) => {
                let root = layout.root.clone();
                (self.compiled_text(&doc, &layout).await?, Some(root))
            }
        };

        Ok(ResolvedQuery {
            text: apply_variables(&text, vars),
            project_root,
        })
    }

    fn raw_text(doc: &DocumentState) -> Result<String> {
        let text = doc.text.trim();
        if text.is_empty() {
            return Err(ConsoleError::EditorState(
                "The editor window is empty".into(),
            ));
        }
        Ok(text.to_string())
    }

    async fn compiled_text(&self, doc: &DocumentState, layout: &ProjectLayout) -> Result<String> {
        if doc.is_dirty {
            debug!("[RESOLVE] Saving dirty document {}", doc.path.display());
            self.editor.save_document(&doc.path).await?;
        }

        let basename = doc
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ConsoleError::EditorState(format!("Unusable document path {}", doc.path.display()))
            })?;
        let source_mtime = modified_time(&doc.path)?;

        let artifact = match find_compiled_artifact(layout, basename) {
            Some(path) if modified_time(&path)? >= source_mtime => path,
            stale => {
                if let Some(path) = &stale {
                    debug!("[RESOLVE] Compiled artifact {} is stale", path.display());
                }
                self.recompile_and_wait(doc, layout, basename, source_mtime)
                    .await?
            }
        };

        debug!("[RESOLVE] Using compiled artifact {}", artifact.display());
        let text = std::fs::read_to_string(&artifact)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ConsoleError::NoCompiledArtifact(format!(
                "compiled output for {} is empty",
                basename
            )));
        }
        Ok(text.to_string())
    }

    async fn recompile_and_wait(
        &self,
        doc: &DocumentState,
        layout: &ProjectLayout,
        basename: &str,
        source_mtime: SystemTime,
    ) -> Result<PathBuf> {
        let model_name = doc
            .path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(basename);
        info!("[RESOLVE] Recompiling model {}", model_name);
        self.host.compile_model(layout, model_name).await?;

        for attempt in 0..self.compile_attempts {
            if let Some(path) = find_compiled_artifact(layout, basename) {
                if modified_time(&path)? >= source_mtime {
                    debug!(
                        "[RESOLVE] Artifact appeared after {} attempt(s)",
                        attempt + 1
                    );
                    return Ok(path);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ConsoleError::NoCompiledArtifact(format!(
            "{} did not appear after {} attempts",
            basename, self.compile_attempts
        )))
    }
}

fn modified_time(path: &Path) -> Result<SystemTime> {
    Ok(std::fs::metadata(path)?.modified()?)
}

/// Find `<target>/compiled/**/<basename>`. The first match in sorted walk
/// order wins, so repeated lookups are stable.
fn find_compiled_artifact(layout: &ProjectLayout, basename: &str) -> Option<PathBuf> {
    let compiled_root = layout.target_path.join("compiled");
    let mut matches = Vec::new();
    collect_matches(&compiled_root, basename, &mut matches);
    matches.sort();
    matches.into_iter().next()
}

fn collect_matches(dir: &Path, basename: &str, matches: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_matches(&path, basename, matches);
        } else if path.file_name().and_then(|n| n.to_str()) == Some(basename) {
            matches.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedEditor {
        doc: DocumentState,
    }

    #[async_trait]
    impl EditorContext for FixedEditor {
        fn active_document(&self) -> Result<DocumentState> {
            Ok(self.doc.clone())
        }

        async fn save_document(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    struct NoProjects;

    #[async_trait]
    impl ProjectHost for NoProjects {
        fn project_for(&self, _document: &Path) -> Option<ProjectLayout> {
            None
        }

        async fn compile_model(&self, _project: &ProjectLayout, _model: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Host that "compiles" by writing the artifact on first compile request
    struct WritingCompiler {
        layout: ProjectLayout,
        artifact: PathBuf,
        compiled_sql: String,
        compile_calls: AtomicU32,
    }

    #[async_trait]
    impl ProjectHost for WritingCompiler {
        fn project_for(&self, document: &Path) -> Option<ProjectLayout> {
            document
                .starts_with(&self.layout.root)
                .then(|| self.layout.clone())
        }

        async fn compile_model(&self, _project: &ProjectLayout, _model: &str) -> Result<()> {
            self.compile_calls.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(self.artifact.parent().unwrap()).unwrap();
            std::fs::write(&self.artifact, &self.compiled_sql).unwrap();
            Ok(())
        }
    }

    fn resolver(editor: FixedEditor, host: impl ProjectHost + 'static) -> QueryTextResolver {
        QueryTextResolver::new(Arc::new(editor), Arc::new(host))
            .with_compile_wait(3, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_unmanaged_document_uses_raw_text() {
        let editor = FixedEditor {
            doc: DocumentState {
                path: PathBuf::from("/scratch/adhoc.sql"),
                text: "  SELECT 1  \n".into(),
                is_dirty: false,
            },
        };
        let resolved = resolver(editor, NoProjects)
            .resolve(&Variables::new())
            .await
            .unwrap();
        assert_eq!(resolved.text, "SELECT 1");
        assert!(resolved.project_root.is_none());
    }

    #[tokio::test]
    async fn test_empty_raw_text_fails() {
        let editor = FixedEditor {
            doc: DocumentState {
                path: PathBuf::from("/scratch/adhoc.sql"),
                text: "   ".into(),
                is_dirty: false,
            },
        };
        let err = resolver(editor, NoProjects)
            .resolve(&Variables::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The editor window is empty");
    }

    #[tokio::test]
    async fn test_variables_substituted_into_raw_text() {
        let editor = FixedEditor {
            doc: DocumentState {
                path: PathBuf::from("/scratch/adhoc.sql"),
                text: "SELECT * FROM {{env}}.t".into(),
                is_dirty: false,
            },
        };
        let mut vars = Variables::new();
        vars.insert("{{env}}".into(), json!("prod"));

        let resolved = resolver(editor, NoProjects).resolve(&vars).await.unwrap();
        assert_eq!(resolved.text, "SELECT * FROM prod.t");
    }

    #[tokio::test]
    async fn test_document_inside_target_runs_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let target = root.join("target");
        let doc_path = target.join("compiled").join("proj").join("model.sql");

        let editor = FixedEditor {
            doc: DocumentState {
                path: doc_path,
                text: "SELECT * FROM built".into(),
                is_dirty: false,
            },
        };
        let host = WritingCompiler {
            layout: ProjectLayout {
                root: root.clone(),
                target_path: target,
            },
            artifact: root.join("unused"),
            compiled_sql: String::new(),
            compile_calls: AtomicU32::new(0),
        };

        let resolved = resolver(editor, host).resolve(&Variables::new()).await.unwrap();
        assert_eq!(resolved.text, "SELECT * FROM built");
        assert_eq!(resolved.project_root, Some(root));
    }

    #[tokio::test]
    async fn test_source_document_resolves_compiled_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let source = root.join("models").join("orders.sql");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "SELECT * FROM {{ ref('orders') }}").unwrap();

        let target = root.join("target");
        let artifact = target.join("compiled").join("proj").join("orders.sql");

        let editor = FixedEditor {
            doc: DocumentState {
                path: source,
                text: "SELECT * FROM {{ ref('orders') }}".into(),
                is_dirty: false,
            },
        };
        let host = WritingCompiler {
            layout: ProjectLayout {
                root: root.clone(),
                target_path: target,
            },
            artifact,
            compiled_sql: "SELECT * FROM analytics.orders".into(),
            compile_calls: AtomicU32::new(0),
        };

        let resolved = resolver(editor, host).resolve(&Variables::new()).await.unwrap();
        assert_eq!(resolved.text, "SELECT * FROM analytics.orders");
    }

    #[tokio::test]
    async fn test_dirty_document_saved_before_compiled_lookup() {
        struct SaveTrackingEditor {
            doc: DocumentState,
            saves: Arc<AtomicU32>,
        }

        #[async_trait]
        impl EditorContext for SaveTrackingEditor {
            fn active_document(&self) -> Result<DocumentState> {
                Ok(self.doc.clone())
            }

            async fn save_document(&self, _path: &Path) -> Result<()> {
                self.saves.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let source = root.join("models").join("orders.sql");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "SELECT 1").unwrap();

        let target = root.join("target");
        let artifact = target.join("compiled").join("proj").join("orders.sql");

        let saves = Arc::new(AtomicU32::new(0));
        let editor = SaveTrackingEditor {
            doc: DocumentState {
                path: source,
                text: "SELECT 1".into(),
                is_dirty: true,
            },
            saves: saves.clone(),
        };
        let host = WritingCompiler {
            layout: ProjectLayout {
                root: root.clone(),
                target_path: target,
            },
            artifact,
            compiled_sql: "SELECT 1".into(),
            compile_calls: AtomicU32::new(0),
        };

        let resolver = QueryTextResolver::new(Arc::new(editor), Arc::new(host))
            .with_compile_wait(3, Duration::from_millis(10));
        resolver.resolve(&Variables::new()).await.unwrap();
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_after_budget() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let source = root.join("models").join("orders.sql");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "SELECT 1").unwrap();

        struct NeverCompiles {
            layout: ProjectLayout,
        }

        #[async_trait]
        impl ProjectHost for NeverCompiles {
            fn project_for(&self, _document: &Path) -> Option<ProjectLayout> {
                Some(self.layout.clone())
            }

            async fn compile_model(&self, _project: &ProjectLayout, _model: &str) -> Result<()> {
                Ok(())
            }
        }

        let editor = FixedEditor {
            doc: DocumentState {
                path: source,
                text: "SELECT 1".into(),
                is_dirty: false,
            },
        };
        let host = NeverCompiles {
            layout: ProjectLayout {
                root: root.clone(),
                target_path: root.join("target"),
            },
        };

        let err = resolver(editor, host)
            .resolve(&Variables::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::NoCompiledArtifact(_)));
    }

    #[tokio::test]
    async fn test_stale_artifact_triggers_recompile() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let target = root.join("target");
        let artifact = target.join("compiled").join("proj").join("orders.sql");

        // stale artifact written before the source
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, "SELECT * FROM old").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let source = root.join("models").join("orders.sql");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "SELECT 2").unwrap();

        let editor = FixedEditor {
            doc: DocumentState {
                path: source,
                text: "SELECT 2".into(),
                is_dirty: false,
            },
        };
        let host = WritingCompiler {
            layout: ProjectLayout {
                root: root.clone(),
                target_path: target,
            },
            artifact,
            compiled_sql: "SELECT * FROM new".into(),
            compile_calls: AtomicU32::new(0),
        };

        let resolved = resolver(editor, host).resolve(&Variables::new()).await.unwrap();
        assert_eq!(resolved.text, "SELECT * FROM new");
    }
}

//! Configuration file management
//!
//! # Configuration Format
//!
//! ```toml
//! [engine]
//! url = "http://localhost:9050"  # Query engine base URL
//! location = "US"                # Default job location
//! timeout = 30                   # Request timeout in seconds
//! max_retries = 3
//!
//! [auth]
//! token = "bearer-token"
//!
//! [query]
//! page_size = 50
//! maximum_bytes_billed = 1000000000
//! use_legacy_sql = false
//!
//! [compile]
//! attempts = 100                 # Artifact polls before giving up
//! poll_interval_ms = 1000
//!
//! [export]
//! format = "csv"                 # csv, table, json
//! pretty_json = true             # Pretty-print JSON exports
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConsoleError, Result};

/// Console configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfiguration {
    /// Remote engine connection settings
    pub engine: Option<EngineConfig>,

    /// Authentication settings
    pub auth: Option<AuthConfig>,

    /// Query execution settings
    pub query: Option<QueryConfig>,

    /// Compiled-artifact wait settings
    pub compile: Option<CompileConfig>,

    /// Export settings
    pub export: Option<ExportConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine base URL (e.g., http://localhost:9050)
    pub url: Option<String>,

    /// Default job location/region
    pub location: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum retry attempts for transient failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token for the engine API
    pub token: Option<String>,

    /// Basic auth username/password, when the engine uses it
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Rows per result page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Cap on bytes a job may bill; unset means engine default
    pub maximum_bytes_billed: Option<i64>,

    /// Submit with the engine's legacy SQL dialect
    #[serde(default)]
    pub use_legacy_sql: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// How many times to poll for a compiled artifact
    #[serde(default = "default_compile_attempts")]
    pub attempts: u32,

    /// Delay between polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default output format: csv, table, json
    #[serde(default = "default_export_format")]
    pub format: String,

    /// Pretty-print JSON exports
    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_page_size() -> u32 {
    50
}

fn default_compile_attempts() -> u32 {
    100
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_export_format() -> String {
    "csv".to_string()
}

fn default_pretty_json() -> bool {
    true
}

impl Default for ConsoleConfiguration {
    fn default() -> Self {
        Self {
            engine: Some(EngineConfig {
                url: Some("http://localhost:9050".to_string()),
                location: None,
                timeout: default_timeout(),
                max_retries: default_retries(),
            }),
            auth: None,
            query: Some(QueryConfig {
                page_size: default_page_size(),
                maximum_bytes_billed: None,
                use_legacy_sql: false,
            }),
            compile: Some(CompileConfig {
                attempts: default_compile_attempts(),
                poll_interval_ms: default_poll_interval_ms(),
            }),
            export: Some(ExportConfig {
                format: default_export_format(),
                pretty_json: default_pretty_json(),
            }),
        }
    }
}

pub fn expand_config_path(path: &Path) -> PathBuf {
    let path_str = path.to_str().unwrap_or("~/.querydeck/config.toml");
    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    expand_config_path(Path::new("~/.querydeck/config.toml"))
}

impl ConsoleConfiguration {
    /// Load configuration from file.
    ///
    /// Returns default configuration if the file doesn't exist; an
    /// unreadable or unparsable file is a hard error, fatal to session
    /// startup.
    pub fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConsoleError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: ConsoleConfiguration = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let expanded_path = expand_config_path(path);
        let path = &expanded_path;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConsoleError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn resolved_engine(&self) -> EngineConfig {
        self.engine.clone().unwrap_or(EngineConfig {
            url: None,
            location: None,
            timeout: default_timeout(),
            max_retries: default_retries(),
        })
    }

    pub fn resolved_query(&self) -> QueryConfig {
        self.query.clone().unwrap_or(QueryConfig {
            page_size: default_page_size(),
            maximum_bytes_billed: None,
            use_legacy_sql: false,
        })
    }

    pub fn resolved_compile(&self) -> CompileConfig {
        self.compile.clone().unwrap_or(CompileConfig {
            attempts: default_compile_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        })
    }

    pub fn resolved_export(&self) -> ExportConfig {
        self.export.clone().unwrap_or(ExportConfig {
            format: default_export_format(),
            pretty_json: default_pretty_json(),
        })
    }
}

//! Query variables: parsing, substitution, and session-scoped persistence.

use crate::error::{ConsoleError, Result};
use crate::table::render_scalar;
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Variable name → value, ordered so substitution is deterministic
pub type Variables = BTreeMap<String, JsonValue>;

/// Parse the variables payload from the front end.
///
/// Must be a JSON object (or null/absent, treated as empty). Anything else
/// is a [`ConsoleError::VariableParse`], which callers recover from by
/// keeping the last valid value.
pub fn parse_variables(raw: &JsonValue) -> Result<Variables> {
    match raw {
        JsonValue::Null => Ok(Variables::new()),
        JsonValue::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        other => Err(ConsoleError::VariableParse(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Replace every occurrence of each variable name with its rendered value.
///
/// Names are matched as literal text, never as patterns, so metacharacters
/// in a name cannot change what gets replaced. Applied in key order.
pub fn apply_variables(text: &str, vars: &Variables) -> String {
    let mut result = text.to_string();
    for (name, value) in vars {
        if name.is_empty() {
            continue;
        }
        result = result.replace(name.as_str(), &render_scalar(value));
    }
    result
}

/// Session-scoped persistence for the variables panel, one JSON file per
/// session.
pub struct VariablesStore {
    path: PathBuf,
}

impl VariablesStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the stored variables. A missing or unreadable file yields the
    /// empty set; the panel starts blank rather than failing the session.
    pub fn load(&self) -> Variables {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Variables::new(),
        };
        match serde_json::from_str::<JsonValue>(&contents) {
            Ok(value) => parse_variables(&value).unwrap_or_else(|e| {
                warn!("[VARS] Ignoring stored variables: {}", e);
                Variables::new()
            }),
            Err(e) => {
                warn!("[VARS] Ignoring unparsable variables file: {}", e);
                Variables::new()
            }
        }
    }

    /// Persist the variables, creating parent directories on demand
    pub fn save(&self, vars: &Variables) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(vars)
            .map_err(|e| ConsoleError::File(e.to_string()))?;
        std::fs::write(&self.path, contents)?;
        debug!("[VARS] Saved {} variables to {}", vars.len(), self.path.display());
        Ok(())
    }
}

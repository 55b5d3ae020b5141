//! Flattens irregular row records into a uniform tabular view.
//!
//! Headers come from the first row only: its flattened key order is frozen
//! for the whole result set, and every later row is projected onto it.

use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A flattened result set: one frozen header list, row-major cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// A single record flattened to dotted paths, preserving first-seen key
/// order. Duplicate paths overwrite the value in place (last-write wins)
/// without disturbing the key's position.
#[derive(Debug, Default)]
pub struct FlatRecord {
    keys: Vec<String>,
    values: HashMap<String, JsonValue>,
}

impl FlatRecord {
    fn insert(&mut self, key: String, value: JsonValue) {
        if !self.values.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.values.insert(key, value);
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Consume into (key, value) pairs in first-seen order
    pub fn into_pairs(mut self) -> Vec<(String, JsonValue)> {
        self.keys
            .drain(..)
            .map(|key| {
                let value = self.values.remove(&key).unwrap_or(JsonValue::Null);
                (key, value)
            })
            .collect()
    }
}

/// Flatten one record into dotted paths.
///
/// Objects recurse with `parent.child` paths; arrays recurse with integer
/// index segments (`items.0.sku`). Scalars and empty containers map to
/// themselves under their path. A scalar at the root has no keys to iterate
/// and yields an empty record.
pub fn flatten_record(value: &JsonValue) -> FlatRecord {
    let mut out = FlatRecord::default();
    flatten_into(None, value, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, value: &JsonValue, out: &mut FlatRecord) {
    let join = |segment: &str| match prefix {
        Some(p) => format!("{}.{}", p, segment),
        None => segment.to_string(),
    };

    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = join(key);
                flatten_into(Some(&path), child, out);
            }
        }
        JsonValue::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                let path = join(&index.to_string());
                flatten_into(Some(&path), child, out);
            }
        }
        other => {
            if let Some(path) = prefix {
                out.insert(path.to_string(), other.clone());
            }
        }
    }
}

/// Build a [`ResultTable`] from a non-empty sequence of records.
///
/// The header set is the flattened key order of `rows[0]`; every row is
/// projected onto it, with absent keys yielding null cells and extra keys
/// dropped.
pub fn build_table(rows: &[JsonValue]) -> Result<ResultTable> {
    let first = rows.first().ok_or(ConsoleError::EmptyResult)?;
    let headers: Vec<String> = flatten_record(first).keys().to_vec();

    let mut table = Vec::with_capacity(rows.len());
    for row in rows {
        let flat = flatten_record(row);
        let cells: Vec<JsonValue> = headers
            .iter()
            .map(|name| flat.get(name).cloned().unwrap_or(JsonValue::Null))
            .collect();
        table.push(cells);
    }

    Ok(ResultTable {
        headers,
        rows: table,
    })
}

/// Render one cell value the way the result views display it
pub fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

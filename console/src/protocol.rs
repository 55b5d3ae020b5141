//! Message protocol between the rendering front end and the session
//! controller.
//!
//! Commands and replies are JSON objects discriminated by a `command` field.
//! One wire quirk is kept on purpose: `firstPage` answers under the
//! `nextPage` tag and `lastPage` under `prevPage`, which is what the
//! rendering layer has always dispatched on.

use crate::table::ResultTable;
use querydeck_link::{CancelAck, JobMetadata};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Inbound commands posted by the front end.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command")]
pub enum ConsoleCommand {
    #[serde(rename = "runAsQuery")]
    RunAsQuery {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "nextPage")]
    NextPage {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "prevPage")]
    PrevPage {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "firstPage")]
    FirstPage {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "lastPage")]
    LastPage {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "cancelQuery")]
    CancelQuery,

    #[serde(rename = "saveVariables")]
    SaveVariables { variables: JsonValue },

    #[serde(rename = "saveAsCSV")]
    SaveAsCsv {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "saveAsTable")]
    SaveAsTable {
        #[serde(default)]
        variables: JsonValue,
    },

    #[serde(rename = "saveAsJSON")]
    SaveAsJson {
        #[serde(default)]
        variables: JsonValue,
    },
}

/// Outbound replies to the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum ConsoleReply {
    #[serde(rename = "runAsQuery")]
    RunAsQuery { result: QueryResultData },

    /// Also the reply tag for `firstPage`
    #[serde(rename = "nextPage")]
    NextPage { result: QueryResultData },

    /// Also the reply tag for `lastPage`
    #[serde(rename = "prevPage")]
    PrevPage { result: QueryResultData },

    #[serde(rename = "queryError")]
    QueryError {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },

    #[serde(rename = "cancelQuery")]
    CancelQuery { result: CancelAck },

    /// Controller → front end: seeds the editable variables panel on open
    #[serde(rename = "setVariables")]
    SetVariables { variables: JsonValue },
}

/// Job metadata record surfaced to the front end's info tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    pub job_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes_processed: Option<String>,

    pub status: String,
}

impl JobInfo {
    pub fn from_metadata(meta: &JobMetadata) -> Self {
        Self {
            project_id: meta.project_id.clone(),
            job_id: meta.id.clone(),
            location: meta.location.clone(),
            job_link: meta.self_link.clone(),
            creation_time: meta.statistics.creation_time.clone(),
            start_time: meta.statistics.start_time.clone(),
            end_time: meta.statistics.end_time.clone(),
            user_email: meta.user_email.clone(),
            total_bytes_processed: meta.statistics.total_bytes_processed.clone(),
            status: meta.state.to_string(),
        }
    }
}

/// Success payload for run/page replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultData {
    /// Always "success"; the error arm is a separate reply
    pub status: String,

    /// The SQL actually submitted, after resolution and substitution
    pub sql: String,

    pub info: JobInfo,

    pub table: ResultTable,

    /// The fetched page as pretty-printed JSON
    pub json: String,

    /// Job statistics as pretty-printed JSON
    pub detail: String,

    /// Offset of the first row of this page
    pub start_index: u64,

    pub has_next: bool,

    pub has_prev: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_parses_from_wire() {
        let cmd: ConsoleCommand =
            serde_json::from_value(json!({ "command": "runAsQuery", "variables": {} })).unwrap();
        assert!(matches!(cmd, ConsoleCommand::RunAsQuery { .. }));

        let cmd: ConsoleCommand = serde_json::from_value(json!({ "command": "cancelQuery" })).unwrap();
        assert!(matches!(cmd, ConsoleCommand::CancelQuery));

        let cmd: ConsoleCommand =
            serde_json::from_value(json!({ "command": "saveAsCSV", "variables": {} })).unwrap();
        assert!(matches!(cmd, ConsoleCommand::SaveAsCsv { .. }));
    }

    #[test]
    fn test_command_variables_default_to_null() {
        let cmd: ConsoleCommand = serde_json::from_value(json!({ "command": "nextPage" })).unwrap();
        match cmd {
            ConsoleCommand::NextPage { variables } => assert!(variables.is_null()),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_error_reply_wire_shape() {
        let reply = ConsoleReply::QueryError {
            error_message: "No job was found.".into(),
        };
        let wire = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            wire,
            json!({ "command": "queryError", "errorMessage": "No job was found." })
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        let parsed: Result<ConsoleCommand, _> =
            serde_json::from_value(json!({ "command": "openPortal" }));
        assert!(parsed.is_err());
    }
}

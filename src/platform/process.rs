//! Job ("process") wire model
//!
//! One asynchronous execution of submitted script source. Processes are
//! observed, never mutated: the engine re-reads them until a terminal
//! status appears, then discards them. The outputs channel only carries
//! name/value pairs whose values are scalars or strings; anything
//! structured arrives as JSON text and is decoded downstream.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Process lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
    /// Catch-all terminal bucket for statuses such as aborted or canceled.
    OtherTerminal(String),
}

impl ProcessStatus {
    /// Parse a remote status string. Unknown statuses land in the terminal
    /// catch-all: the platform only ever adds terminal variants.
    pub fn from_remote(status: &str) -> Self {
        match status {
            "not-started" => ProcessStatus::NotStarted,
            "in-progress" | "running" => ProcessStatus::InProgress,
            "completed" => ProcessStatus::Completed,
            "failed" => ProcessStatus::Failed,
            other => ProcessStatus::OtherTerminal(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::NotStarted | ProcessStatus::InProgress)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProcessStatus::NotStarted => "not-started",
            ProcessStatus::InProgress => "in-progress",
            ProcessStatus::Completed => "completed",
            ProcessStatus::Failed => "failed",
            ProcessStatus::OtherTerminal(s) => s,
        }
    }
}

/// A job observed through the expanded status view.
#[derive(Debug, Clone)]
pub struct Process {
    pub href: String,
    pub status: ProcessStatus,
    /// Named outputs; structured values arrive JSON-encoded by the script.
    pub outputs: BTreeMap<String, String>,
    /// First structured task error, if any task reported one.
    pub error: Option<String>,
}

impl Process {
    /// Parse the expanded status payload for a job at `href`.
    pub fn from_expanded(href: &str, body: &Value) -> Result<Self> {
        let status = body
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::MalformedResponse(format!("process {} has no status field", href))
            })?;

        let mut outputs = BTreeMap::new();
        if let Some(entries) = body.get("outputs").and_then(|v| v.as_array()) {
            for entry in entries {
                let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
                    continue;
                };
                let Some(value) = entry.get("value") else {
                    continue;
                };
                // Coerce non-string values to their JSON text form so the
                // decoder sees one representation.
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                outputs.insert(name.to_string(), text);
            }
        }

        let error = body
            .get("tasks")
            .and_then(|v| v.as_array())
            .and_then(|tasks| {
                tasks.iter().find_map(|task| {
                    task.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
            });

        Ok(Self {
            href: href.to_string(),
            status: ProcessStatus::from_remote(status),
            outputs,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_terminality() {
        assert!(!ProcessStatus::from_remote("not-started").is_terminal());
        assert!(!ProcessStatus::from_remote("in-progress").is_terminal());
        assert!(ProcessStatus::from_remote("completed").is_terminal());
        assert!(ProcessStatus::from_remote("failed").is_terminal());
        assert!(ProcessStatus::from_remote("aborted").is_terminal());
        assert_eq!(
            ProcessStatus::from_remote("canceled"),
            ProcessStatus::OtherTerminal("canceled".into())
        );
    }

    #[test]
    fn parses_expanded_view() {
        let body = json!({
            "status": "completed",
            "outputs": [
                { "name": "type", "value": "machine" },
                { "name": "count", "value": 3 },
            ],
            "tasks": [ {}, { "error": { "message": "boom" } } ],
        });
        let process = Process::from_expanded("/api/processes/1", &body).expect("parses");
        assert_eq!(process.status, ProcessStatus::Completed);
        assert_eq!(process.outputs["type"], "machine");
        // Non-string output values are coerced to JSON text.
        assert_eq!(process.outputs["count"], "3");
        assert_eq!(process.error.as_deref(), Some("boom"));
    }

    #[test]
    fn missing_status_is_malformed() {
        assert!(Process::from_expanded("/p/1", &json!({ "outputs": [] })).is_err());
    }
}

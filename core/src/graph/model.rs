use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tool id meaning "no external capability needed".
pub const NONE_TOOL: &str = "none";

/// Per-task lifecycle: `pending -> running -> {done | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// `done` and `failed` never change again under the same id.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of planned work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub tool: String,
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, tool: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            description: description.into(),
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn with_depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

/// Immutable fact describing one task invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_id: String,
    pub tool: String,
    pub input_context: String,
    #[serde(default)]
    pub output: serde_json::Value,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    /// Output rendered as plain text: strings verbatim, null as empty,
    /// everything else as compact JSON.
    pub fn output_text(&self) -> String {
        match &self.output {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Append-only sequence of execution records.
///
/// Merging two logs always concatenates; there is no way to replace,
/// reorder or remove a record once appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionLog(Vec<ExecutionRecord>);

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ExecutionRecord) {
        self.0.push(record);
    }

    /// Append-merge: every record of `other` lands after the existing ones.
    pub fn append(&mut self, other: ExecutionLog) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExecutionRecord> {
        self.0.iter()
    }

    /// Ids of tasks with at least one `success = true` record.
    pub fn completed_ids(&self) -> HashSet<&str> {
        self.0
            .iter()
            .filter(|r| r.success)
            .map(|r| r.task_id.as_str())
            .collect()
    }

    /// First successful record for `task_id`, if any.
    pub fn successful(&self, task_id: &str) -> Option<&ExecutionRecord> {
        self.0.iter().find(|r| r.success && r.task_id == task_id)
    }
}

impl From<Vec<ExecutionRecord>> for ExecutionLog {
    fn from(records: Vec<ExecutionRecord>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a ExecutionLog {
    type Item = &'a ExecutionRecord;
    type IntoIter = std::slice::Iter<'a, ExecutionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(task_id: &str, success: bool) -> ExecutionRecord {
        ExecutionRecord {
            task_id: task_id.to_string(),
            tool: "Search".to_string(),
            input_context: "ctx".to_string(),
            output: serde_json::json!("out"),
            success,
            error_message: (!success).then(|| "boom".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_concatenates_in_order() {
        let mut log = ExecutionLog::from(vec![record("a", true)]);
        log.append(ExecutionLog::from(vec![record("b", false), record("c", true)]));

        let ids: Vec<&str> = log.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_completed_ids_only_counts_success() {
        let log = ExecutionLog::from(vec![record("a", true), record("b", false)]);
        let completed = log.completed_ids();
        assert!(completed.contains("a"));
        assert!(!completed.contains("b"));
    }

    #[test]
    fn test_output_text_rendering() {
        let mut r = record("a", true);
        assert_eq!(r.output_text(), "out");
        r.output = serde_json::Value::Null;
        assert_eq!(r.output_text(), "");
        r.output = serde_json::json!({"n": 1});
        assert_eq!(r.output_text(), r#"{"n":1}"#);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
        assert!(TaskStatus::Done.is_settled());
        assert!(!TaskStatus::Running.is_settled());
    }
}

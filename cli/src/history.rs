//! Conversation history loaded from a JSON file.
//!
//! Accepts `[{ "role": .., "content": .. }]` as well as chat-framework dumps
//! that use `type` for the role. Anything else on an entry (tool-call
//! artefacts included) is ignored.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use taskpilot_core::api::{CliError, ConversationMessage};

#[derive(Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content: Value,
}

impl From<HistoryEntry> for ConversationMessage {
    fn from(entry: HistoryEntry) -> Self {
        let role = entry
            .role
            .or(entry.kind)
            .unwrap_or_else(|| "unknown".to_string());
        let content = match entry.content {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        ConversationMessage { role, content }
    }
}

pub fn load_history(path: &Path) -> Result<Vec<ConversationMessage>, CliError> {
    let raw = std::fs::read_to_string(path)?;
    parse_history(&raw)
}

pub fn parse_history(raw: &str) -> Result<Vec<ConversationMessage>, CliError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Array(entries) = value else {
        return Err(CliError::Command(
            "history must be a JSON array of messages".to_string(),
        ));
    };

    let mut messages = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<HistoryEntry>(entry) {
            Ok(entry) => messages.push(entry.into()),
            Err(e) => {
                tracing::warn!(target: "taskpilot.cli", index = idx, error = %e, "skipping malformed history entry");
            }
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_parse_mixed_shapes() {
        let raw = r#"[
            {"type": "human", "content": "hi"},
            {"role": "ai", "content": "hello", "tool_calls": [{"name": "x"}], "tool_call_chunks": []},
            "garbage",
            {"role": "ai", "content": null}
        ]"#;
        let messages = parse_history(raw).unwrap();
        assert_eq!(
            messages,
            vec![
                ConversationMessage::new("human", "hi"),
                ConversationMessage::new("ai", "hello"),
                ConversationMessage::new("ai", ""),
            ]
        );
    }

    #[test]
    fn test_role_wins_over_type_and_objects_are_stringified() {
        let raw = r#"[
            {"role": "user", "type": "human", "content": {"text": "hi"}},
            {"content": "orphan", "invalid_tool_calls": [1]}
        ]"#;
        let messages = parse_history(raw).unwrap();
        assert_eq!(
            messages,
            vec![
                ConversationMessage::new("user", r#"{"text":"hi"}"#),
                ConversationMessage::new("unknown", "orphan"),
            ]
        );
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            parse_history(r#"{"role": "ai"}"#),
            Err(CliError::Command(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"role": "human", "content": "yesterday's question"}}]"#).unwrap();
        let messages = load_history(file.path()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "yesterday's question");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_history(Path::new("/no/such/history.json")),
            Err(CliError::Io(_))
        ));
    }
}

use serde::de::DeserializeOwned;
use taskpilot_core::api::CollaboratorError;

use crate::http::preview_body;

/// The JSON payload of a model answer: the body of a ```json fence, else of
/// the first bare ``` fence, else the whole text.
pub fn extract_json_block(text: &str) -> &str {
    if let Some((_, rest)) = text.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest).trim();
    }
    let mut fenced = text.split("```");
    if let (Some(_), Some(inner)) = (fenced.next(), fenced.next()) {
        return inner.trim();
    }
    text.trim()
}

pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, CollaboratorError> {
    serde_json::from_str(extract_json_block(text)).map_err(|e| {
        CollaboratorError::Malformed(format!("{e} | answer={}", preview_body(text)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpilot_core::api::PlanOutput;

    #[test]
    fn test_extracts_json_fence() {
        let text = "Here you go:\n```json\n{\"todos\": []}\n```\nanything else";
        assert_eq!(extract_json_block(text), "{\"todos\": []}");
    }

    #[test]
    fn test_extracts_bare_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn test_raw_text_passes_through() {
        assert_eq!(extract_json_block("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_failure_is_malformed() {
        let err = parse_model_json::<PlanOutput>("I think you should call Mail").unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }
}

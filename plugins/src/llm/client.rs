use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use taskpilot_core::api::LlmConfig;

use crate::http::{build_client, parse_json_response, preview_body, HttpCallError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// `POST {base_url}/chat/completions` with bearer auth.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout_ms: u64,
}

impl ChatClient {
    pub fn new(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let normalized = cfg.base_url.trim_end_matches('/');
        Ok(Self {
            http: build_client(Duration::from_millis(cfg.timeout_ms))?,
            url: format!("{normalized}/chat/completions"),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            timeout_ms: cfg.timeout_ms,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    /// Send the conversation and return the first choice's message text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, HttpCallError> {
        let url = &self.url;
        let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        tracing::debug!(
            target: "taskpilot.llm",
            stage = "llm.chat.in",
            url = %url,
            model = %self.model,
            messages = messages.len(),
            prompt_chars
        );

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        let resp = self
            .auth(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(|err| HttpCallError::from_reqwest(err, url.clone()))?;
        let status = resp.status();
        let v = parse_json_response(resp).await?;

        let content = v
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                HttpCallError::decode_error(
                    status.as_u16(),
                    url.clone(),
                    "missing choices[0].message.content".to_string(),
                    preview_body(&v.to_string()),
                )
            })?;

        tracing::debug!(
            target: "taskpilot.llm",
            stage = "llm.chat.out",
            status = %status,
            answer_chars = content.len()
        );
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            api_key: "sk-test".to_string(),
            model: "test/model".to_string(),
            temperature: 0.3,
            timeout_ms: 2_000,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "test/model"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&config(format!("{}/", server.url()))).unwrap();
        let answer = client.complete(&[ChatMessage::user("hello")]).await.unwrap();
        assert_eq!(answer, "hi there");
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_decode_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"error":"quota"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&config(server.url())).unwrap();
        let err = client.complete(&[ChatMessage::user("x")]).await.unwrap_err();
        assert_eq!(err.kind(), crate::http::HttpCallErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_complete_status_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = ChatClient::new(&config(server.url())).unwrap();
        let err = client.complete(&[ChatMessage::user("x")]).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}

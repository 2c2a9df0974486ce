use async_trait::async_trait;
use taskpilot_core::api::{
    AssistantConfig, CollaboratorError, LlmConfig, Responder, ResponseInput,
};

use super::client::{ChatClient, ChatMessage};
use super::prompt;

/// Writes the final answer from the execution log and task list only.
pub struct LlmResponder {
    client: ChatClient,
    persona: String,
    locale_hint: Option<String>,
    history_window: usize,
}

impl LlmResponder {
    pub fn new(
        llm: &LlmConfig,
        assistant: &AssistantConfig,
        history_window: usize,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: ChatClient::new(llm)?,
            persona: assistant.persona.clone(),
            locale_hint: assistant.locale_hint.clone(),
            history_window,
        })
    }
}

#[async_trait]
impl Responder for LlmResponder {
    fn name(&self) -> &str {
        "llm-responder"
    }

    async fn respond(&self, input: &ResponseInput) -> Result<String, CollaboratorError> {
        let system = prompt::responder_system_prompt(
            &self.persona,
            self.locale_hint.as_deref(),
            &input.request,
            input.tasks(),
            input.executed(),
            &input.conversation,
            self.history_window,
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(prompt::RESPONDER_USER_PROMPT),
        ];

        tracing::info!(
            target: "taskpilot.llm",
            stage = "responder",
            model = %self.client.model(),
            records = input.executed().len(),
            "synthesizing answer"
        );
        let answer = self
            .client
            .complete(&messages)
            .await
            .map_err(|e| e.into_collaborator_error("responder", self.client.timeout_ms()))?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(CollaboratorError::Malformed("empty answer".to_string()));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use taskpilot_core::api::{CallerIdentity, RunState};

    fn responder(base_url: String) -> LlmResponder {
        let llm = LlmConfig {
            base_url,
            api_key: "sk".to_string(),
            model: "test/responder".to_string(),
            temperature: 0.7,
            timeout_ms: 2_000,
        };
        LlmResponder::new(&llm, &AssistantConfig::default(), 10).unwrap()
    }

    #[tokio::test]
    async fn test_respond_trims_answer() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("No tools executed".to_string()))
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"content": "  Hey! How can I help?\n"}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let state = RunState::new("r", "hi", CallerIdentity::default(), Vec::new());
        let input = ResponseInput::from_state(&state).unwrap();
        let answer = responder(server.url()).respond(&input).await.unwrap();
        assert_eq!(answer, "Hey! How can I help?");
    }

    #[tokio::test]
    async fn test_empty_answer_is_malformed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": "   "}}]}).to_string())
            .create_async()
            .await;

        let state = RunState::new("r", "hi", CallerIdentity::default(), Vec::new());
        let input = ResponseInput::from_state(&state).unwrap();
        let err = responder(server.url()).respond(&input).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }
}

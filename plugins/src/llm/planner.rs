use std::time::Instant;

use async_trait::async_trait;
use taskpilot_core::api::{
    AssistantConfig, CollaboratorError, LlmConfig, PlanOutput, PlanRequest, Planner,
    ReplanOutput, ReplanRequest,
};

use super::client::{ChatClient, ChatMessage};
use super::extract::parse_model_json;
use super::prompt;

pub struct LlmPlanner {
    client: ChatClient,
    persona: String,
    locale_hint: Option<String>,
    history_window: usize,
}

impl LlmPlanner {
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

    async fn ask(&self, stage: &'static str, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        let started = Instant::now();
        let answer = self
            .client
            .complete(messages)
            .await
            .map_err(|e| e.into_collaborator_error(stage, self.client.timeout_ms()));
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &answer {
            Ok(text) => tracing::info!(
                target: "taskpilot.llm",
                stage,
                model = %self.client.model(),
                elapsed_ms,
                answer_chars = text.len(),
                "model answered"
            ),
            Err(e) => tracing::warn!(
                target: "taskpilot.llm",
                stage,
                model = %self.client.model(),
                elapsed_ms,
                error = %e,
                "model call failed"
            ),
        }
        answer
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    fn name(&self) -> &str {
        "llm-planner"
    }

    async fn plan(&self, request: &PlanRequest) -> Result<PlanOutput, CollaboratorError> {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let system = prompt::planner_system_prompt(
            &self.persona,
            self.locale_hint.as_deref(),
            &request.tools,
            &request.conversation,
            self.history_window,
            &now,
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(prompt::planner_user_prompt(&request.request)),
        ];

        let answer = self.ask("planner", &messages).await?;
        parse_model_json(&answer)
    }

    async fn replan(&self, request: &ReplanRequest) -> Result<ReplanOutput, CollaboratorError> {
        let messages = [
            ChatMessage::system(prompt::REPLANNER_SYSTEM_PROMPT),
            ChatMessage::user(prompt::replan_prompt(
                &request.plan.request,
                &request.tasks,
                &request.executed,
                &request.failed,
                &request.plan.tools,
            )),
        ];

        let answer = self.ask("replanner", &messages).await?;
        parse_model_json(&answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use taskpilot_core::api::{ExecutionLog, ToolDescriptor};

    fn chat_body(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    fn planner(base_url: String) -> LlmPlanner {
        let llm = LlmConfig {
            base_url,
            api_key: String::new(),
            model: "test/planner".to_string(),
            temperature: 0.3,
            timeout_ms: 2_000,
        };
        LlmPlanner::new(&llm, &AssistantConfig::default(), 10).unwrap()
    }

    fn plan_request() -> PlanRequest {
        PlanRequest {
            run_id: "run-1".to_string(),
            request: "What is on tomorrow?".to_string(),
            conversation: Vec::new(),
            tools: vec![ToolDescriptor {
                name: "Calendar".to_string(),
                description: "Reads the calendar".to_string(),
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn test_plan_parses_fenced_answer() {
        let mut server = Server::new_async().await;
        let answer = "```json\n{\"todos\":[{\"id\":\"step_1\",\"tool\":\"Calendar\",\"description\":\"tomorrow\",\"depends_on\":[]}],\"reasoning\":\"one lookup\"}\n```";
        let _m = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("## Calendar".to_string()))
            .with_status(200)
            .with_body(chat_body(answer))
            .create_async()
            .await;

        let out = planner(server.url()).plan(&plan_request()).await.unwrap();
        assert_eq!(out.tasks.len(), 1);
        assert_eq!(out.tasks[0].tool.as_deref(), Some("Calendar"));
        assert_eq!(out.reasoning.as_deref(), Some("one lookup"));
    }

    #[tokio::test]
    async fn test_plan_prose_answer_is_malformed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(chat_body("Sure! I'll check your calendar."))
            .create_async()
            .await;

        let err = planner(server.url()).plan(&plan_request()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_replan_give_up() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Failed steps".to_string()))
            .with_status(200)
            .with_body(chat_body(r#"{"give_up": true, "reason": "calendar offline"}"#))
            .create_async()
            .await;

        let request = ReplanRequest {
            plan: plan_request(),
            tasks: Vec::new(),
            executed: ExecutionLog::new(),
            failed: Vec::new(),
        };
        let out = planner(server.url()).replan(&request).await.unwrap();
        assert!(out.give_up);
        assert_eq!(out.reason.as_deref(), Some("calendar offline"));
    }

    #[tokio::test]
    async fn test_upstream_error_maps_to_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = planner(server.url()).plan(&plan_request()).await.unwrap_err();
        assert_eq!(
            err,
            CollaboratorError::Status {
                status: 503,
                body: "overloaded".to_string()
            }
        );
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::graph::{ExecutionLog, Task, TaskStatus, NONE_TOOL};
use crate::state::{ConversationMessage, RunState};

/// Catalog entry describing one tool to the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_when: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub important: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_input: Option<String>,
}

/// Input to initial planning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub run_id: String,
    pub request: String,
    pub conversation: Vec<ConversationMessage>,
    pub tools: Vec<ToolDescriptor>,
}

impl PlanRequest {
    pub fn from_state(state: &RunState, tools: &[ToolDescriptor]) -> Self {
        Self {
            run_id: state.run_id.clone(),
            request: state.request.clone(),
            conversation: state.conversation.clone(),
            tools: tools.to_vec(),
        }
    }
}

/// Input to replanning: everything planning sees plus what happened so far.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplanRequest {
    pub plan: PlanRequest,
    pub tasks: Vec<Task>,
    pub executed: ExecutionLog,
    pub failed: Vec<Task>,
}

impl ReplanRequest {
    pub fn from_state(state: &RunState, tools: &[ToolDescriptor]) -> Self {
        Self {
            plan: PlanRequest::from_state(state, tools),
            tasks: state.tasks.clone(),
            executed: state.executed.clone(),
            failed: state.failed_tasks(),
        }
    }
}

/// Task as emitted by a planner. Every field tolerates absence or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
}

impl PlannedTask {
    /// Materialize as a pending task; `position` is 1-based and names
    /// tasks that came without an id (`step_<position>`).
    pub fn into_task(self, position: usize) -> Task {
        Task {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("step_{position}")),
            tool: self
                .tool
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| NONE_TOOL.to_string()),
            description: self.description.unwrap_or_default(),
            depends_on: self.depends_on.unwrap_or_default(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }
}

pub fn materialize(planned: Vec<PlannedTask>) -> Vec<Task> {
    planned
        .into_iter()
        .enumerate()
        .map(|(idx, p)| p.into_task(idx + 1))
        .collect()
}

/// Planner answer for initial planning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutput {
    #[serde(default, alias = "todos")]
    pub tasks: Vec<PlannedTask>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_question: Option<String>,
}

/// Planner answer for replanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplanOutput {
    #[serde(default)]
    pub give_up: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, alias = "new_todos")]
    pub new_tasks: Vec<PlannedTask>,
}

#[async_trait]
pub trait Planner: Send + Sync {
    fn name(&self) -> &str;

    async fn plan(&self, request: &PlanRequest) -> Result<PlanOutput, CollaboratorError>;

    async fn replan(&self, request: &ReplanRequest) -> Result<ReplanOutput, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_output_accepts_todos_alias_and_nulls() {
        let raw = r#"{
            "todos": [
                {"id": "step_1", "tool": "Calendar", "description": "fetch", "depends_on": []},
                {"tool": null, "description": "reply", "depends_on": null}
            ],
            "reasoning": "two steps",
            "needs_clarification": false,
            "clarification_question": null
        }"#;
        let out: PlanOutput = serde_json::from_str(raw).unwrap();
        let tasks = materialize(out.tasks);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "step_1");
        assert_eq!(tasks[1].id, "step_2");
        assert_eq!(tasks[1].tool, NONE_TOOL);
        assert!(tasks[1].depends_on.is_empty());
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[test]
    fn test_replan_output_defaults() {
        let out: ReplanOutput = serde_json::from_str(r#"{"give_up": true}"#).unwrap();
        assert!(out.give_up);
        assert!(out.reason.is_none());
        assert!(out.new_tasks.is_empty());

        let out: ReplanOutput =
            serde_json::from_str(r#"{"new_todos": [{"id": "step_9", "tool": "Mail"}]}"#).unwrap();
        assert_eq!(out.new_tasks.len(), 1);
    }
}

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use taskpilot_core::api::{
    CollaboratorError, PlanOutput, PlanRequest, PlannedTask, Planner, ReplanOutput,
    ReplanRequest, Responder, ResponseInput, RunController, SchedulerConfig, Task, ToolCall,
    ToolInvoker, ToolOutcome, ToolRegistry,
};

pub fn planned(id: &str, tool: &str, deps: &[&str]) -> PlannedTask {
    PlannedTask {
        id: Some(id.to_string()),
        tool: Some(tool.to_string()),
        description: Some(format!("{id} via {tool}")),
        depends_on: Some(deps.iter().map(|d| d.to_string()).collect()),
    }
}

pub fn plan_of(tasks: Vec<PlannedTask>) -> PlanOutput {
    PlanOutput {
        tasks,
        reasoning: Some("scripted".to_string()),
        needs_clarification: false,
        clarification_question: None,
    }
}

pub fn replace_with(tasks: Vec<PlannedTask>) -> ReplanOutput {
    ReplanOutput {
        give_up: false,
        reason: Some("try another way".to_string()),
        new_tasks: tasks,
    }
}

pub fn give_up(reason: &str) -> ReplanOutput {
    ReplanOutput {
        give_up: true,
        reason: Some(reason.to_string()),
        new_tasks: Vec::new(),
    }
}

/// Planner that replays canned answers and counts replanning calls.
#[derive(Default)]
pub struct ScriptedPlanner {
    pub plans: Mutex<VecDeque<Result<PlanOutput, CollaboratorError>>>,
    pub replans: Mutex<VecDeque<Result<ReplanOutput, CollaboratorError>>>,
    pub replan_calls: Mutex<usize>,
    /// Answer used once the replan script runs dry.
    pub replan_fallback: Option<ReplanOutput>,
    pub delay: Option<Duration>,
    pub replan_delay: Option<Duration>,
}

impl ScriptedPlanner {
    pub fn plan(answer: Result<PlanOutput, CollaboratorError>) -> Self {
        let planner = Self::default();
        planner.plans.lock().unwrap().push_back(answer);
        planner
    }

    pub fn then_replan(self, answer: Result<ReplanOutput, CollaboratorError>) -> Self {
        self.replans.lock().unwrap().push_back(answer);
        self
    }

    pub fn replan_calls(&self) -> usize {
        *self.replan_calls.lock().unwrap()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn plan(&self, _request: &PlanRequest) -> Result<PlanOutput, CollaboratorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.plans.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(PlanOutput::default()))
    }

    async fn replan(&self, _request: &ReplanRequest) -> Result<ReplanOutput, CollaboratorError> {
        *self.replan_calls.lock().unwrap() += 1;
        if let Some(delay) = self.replan_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replans.lock().unwrap().pop_front();
        if let Some(answer) = next {
            return answer;
        }
        match &self.replan_fallback {
            Some(answer) => Ok(answer.clone()),
            None => Ok(give_up("script exhausted")),
        }
    }
}

/// Tool that replays outcomes per task id and records every call.
#[derive(Default)]
pub struct ScriptedTool {
    outcomes: Mutex<HashMap<String, VecDeque<ToolOutcome>>>,
    always_fail: bool,
    calls: Mutex<Vec<ToolCall>>,
}

impl ScriptedTool {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Default::default()
        }
    }

    pub fn on(self, task_id: &str, outcome: ToolOutcome) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.task_id).collect()
    }
}

#[async_trait]
impl ToolInvoker for ScriptedTool {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, call: &ToolCall) -> ToolOutcome {
        self.calls.lock().unwrap().push(call.clone());
        let scripted = self
            .outcomes
            .lock()
            .unwrap()
            .get_mut(&call.task_id)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = scripted {
            return outcome;
        }
        if self.always_fail {
            ToolOutcome::failed(format!("{} is down", call.tool))
        } else {
            ToolOutcome::ok(json!(format!("result of {}", call.task_id)))
        }
    }
}

/// Responder that keeps the task list it was shown.
#[derive(Default)]
pub struct RecordingResponder {
    seen: Mutex<Vec<Vec<Task>>>,
    pub fail: bool,
}

impl RecordingResponder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn seen(&self) -> Vec<Vec<Task>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    fn name(&self) -> &str {
        "recording"
    }

    async fn respond(&self, input: &ResponseInput) -> Result<String, CollaboratorError> {
        self.seen.lock().unwrap().push(input.tasks().to_vec());
        if self.fail {
            return Err(CollaboratorError::Unavailable("responder offline".into()));
        }
        Ok(format!("answered with {} records", input.executed().len()))
    }
}

pub fn limits() -> SchedulerConfig {
    SchedulerConfig {
        replan_ceiling: 2,
        tool_timeout_ms: 200,
        planner_timeout_ms: 200,
        responder_timeout_ms: 200,
        history_window: 10,
    }
}

pub fn controller(
    planner: Arc<ScriptedPlanner>,
    tool: Arc<ScriptedTool>,
    responder: Arc<RecordingResponder>,
    tool_names: &[&str],
) -> RunController {
    let mut registry = ToolRegistry::new();
    for name in tool_names {
        registry.register(*name, tool.clone());
    }
    RunController::new(planner, Arc::new(registry), responder).with_limits(limits())
}

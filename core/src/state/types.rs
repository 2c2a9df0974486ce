use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::graph::{ExecutionLog, Task, TaskStatus};

use super::delta::StateDelta;

/// Who asked. Forwarded to tool invokers, opaque to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl CallerIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            channel_id: None,
        }
    }
}

/// One prior conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
}

impl std::fmt::Display for TaskCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} done, {} pending, {} failed",
            self.done, self.pending, self.failed
        )?;
        if self.running > 0 {
            write!(f, ", {} running", self.running)?;
        }
        Ok(())
    }
}

/// Aggregate state of a single run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub run_id: String,
    pub request: String,
    pub caller: CallerIdentity,
    pub conversation: Vec<ConversationMessage>,
    pub tasks: Vec<Task>,
    pub executed: ExecutionLog,
    pub plan_reasoning: String,
    pub replan_count: u32,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
    pub final_answer: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
}

impl RunState {
    pub fn new(
        run_id: impl Into<String>,
        request: impl Into<String>,
        caller: CallerIdentity,
        conversation: Vec<ConversationMessage>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            request: request.into(),
            caller,
            conversation,
            tasks: Vec::new(),
            executed: ExecutionLog::new(),
            plan_reasoning: String::new(),
            replan_count: 0,
            needs_clarification: false,
            clarification_question: None,
            final_answer: None,
            error: None,
            error_code: None,
        }
    }

    /// Merge a phase delta: task list replaced, log appended, scalars
    /// overwritten when present.
    pub fn apply(&mut self, delta: StateDelta) {
        let StateDelta {
            tasks,
            executed,
            plan_reasoning,
            replan_count,
            needs_clarification,
            clarification_question,
            final_answer,
            error,
            error_code,
        } = delta;

        if let Some(tasks) = tasks {
            self.tasks = tasks;
        }
        self.executed.append(executed);
        if let Some(v) = plan_reasoning {
            self.plan_reasoning = v;
        }
        if let Some(v) = replan_count {
            self.replan_count = v;
        }
        if let Some(v) = needs_clarification {
            self.needs_clarification = v;
        }
        if let Some(v) = clarification_question {
            self.clarification_question = Some(v);
        }
        if let Some(v) = final_answer {
            self.final_answer = Some(v);
        }
        if let Some(v) = error {
            self.error = Some(v);
        }
        if let Some(v) = error_code {
            self.error_code = Some(v);
        }
    }

    pub fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Done => counts.done += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn failed_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .cloned()
            .collect()
    }
}

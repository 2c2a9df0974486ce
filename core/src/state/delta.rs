use crate::error::ErrorCode;
use crate::graph::{ExecutionLog, ExecutionRecord, Task};

/// Changes produced by one phase.
///
/// | Field | Merge rule |
/// |---|---|
/// | `tasks` | replace (when `Some`) |
/// | `executed` | append, never replace |
/// | every other field | overwrite (when `Some`) |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDelta {
    pub tasks: Option<Vec<Task>>,
    pub executed: ExecutionLog,
    pub plan_reasoning: Option<String>,
    pub replan_count: Option<u32>,
    pub needs_clarification: Option<bool>,
    pub clarification_question: Option<String>,
    pub final_answer: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
}

impl StateDelta {
    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_record(mut self, record: ExecutionRecord) -> Self {
        self.executed.push(record);
        self
    }

    pub fn with_plan_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.plan_reasoning = Some(reasoning.into());
        self
    }

    pub fn with_replan_count(mut self, count: u32) -> Self {
        self.replan_count = Some(count);
        self
    }

    pub fn with_clarification(mut self, question: impl Into<String>) -> Self {
        self.needs_clarification = Some(true);
        self.clarification_question = Some(question.into());
        self
    }

    pub fn with_final_answer(mut self, answer: impl Into<String>) -> Self {
        self.final_answer = Some(answer.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>, code: ErrorCode) -> Self {
        self.error = Some(error.into());
        self.error_code = Some(code);
        self
    }

    /// True when merging this delta would leave the state untouched.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

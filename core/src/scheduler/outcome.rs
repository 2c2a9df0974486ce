use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::graph::{ExecutionLog, Task, TaskStatus};
use crate::state::{Phase, RunState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Ended in `respond` with a synthesized answer.
    Answered,
    /// Ended in `clarify`; the answer is a question for the caller.
    Clarification,
    /// An internal fault aborted the run; the answer is an apology.
    Failed,
}

/// Everything a caller gets back from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub terminal_phase: Phase,
    pub final_answer: String,
    pub tasks: Vec<Task>,
    pub executed: ExecutionLog,
    pub plan_reasoning: String,
    pub replan_count: u32,
    pub phase_history: Vec<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub tools_planned: usize,
    pub tools_executed: usize,
    pub tools_failed: usize,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub(crate) fn from_state(
        state: RunState,
        status: RunStatus,
        terminal_phase: Phase,
        phase_history: Vec<Phase>,
        duration_ms: u64,
    ) -> Self {
        let tools_failed = state
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count();

        Self {
            run_id: state.run_id,
            status,
            terminal_phase,
            final_answer: state.final_answer.unwrap_or_default(),
            tools_planned: state.tasks.len(),
            tools_executed: state.executed.len(),
            tools_failed,
            tasks: state.tasks,
            executed: state.executed,
            plan_reasoning: state.plan_reasoning,
            replan_count: state.replan_count,
            phase_history,
            error: state.error,
            error_code: state.error_code,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Failed
    }
}

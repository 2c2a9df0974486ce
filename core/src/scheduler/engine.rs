use std::time::{Duration, Instant};

use chrono::Utc;

use crate::collab::{ToolCall, ToolInvoker, ToolOutcome};
use crate::graph::{ExecutionLog, ExecutionRecord, Task, TaskStatus};
use crate::state::{RunState, StateDelta};
use crate::trace::{emit, TraceEvent, TraceTx};

use super::readiness::next_ready;

pub const DEPENDENCY_RESULTS_HEADER: &str = "--- Results from previous steps ---";

/// Runs exactly one ready task per cycle.
pub struct ExecutionEngine<'a> {
    invoker: &'a dyn ToolInvoker,
    tool_timeout: Duration,
    trace: Option<&'a TraceTx>,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker, tool_timeout: Duration) -> Self {
        Self {
            invoker,
            tool_timeout,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: Option<&'a TraceTx>) -> Self {
        self.trace = trace;
        self
    }

    /// Execute the next ready task and return the resulting delta.
    ///
    /// The delta carries the full task list with that task settled and
    /// exactly one new execution record. With nothing ready the delta is
    /// empty.
    #[tracing::instrument(name = "execute.cycle", skip_all, fields(run_id = %state.run_id))]
    pub async fn run_cycle(&self, state: &RunState) -> StateDelta {
        let Some(task) = next_ready(&state.tasks, &state.executed) else {
            tracing::debug!(target: "taskpilot.execute", "no ready task");
            return StateDelta::default();
        };
        let task = task.clone();

        let mut tasks = state.tasks.clone();
        set_status(&mut tasks, &task.id, TaskStatus::Running, None, None);

        let context = build_invocation_context(&task, &state.executed);
        let call = ToolCall {
            run_id: state.run_id.clone(),
            task_id: task.id.clone(),
            tool: task.tool.clone(),
            context: context.clone(),
            caller: state.caller.clone(),
            timeout: self.tool_timeout,
        };

        tracing::info!(
            target: "taskpilot.execute",
            task_id = %task.id,
            tool = %task.tool,
            "executing task"
        );
        emit(
            self.trace,
            TraceEvent::TaskStarted {
                run_id: state.run_id.clone(),
                task_id: task.id.clone(),
                tool: task.tool.clone(),
            },
        )
        .await;

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.tool_timeout, self.invoker.invoke(&call)).await
        {
            Ok(outcome) => outcome,
            Err(_) => ToolOutcome::failed(format!(
                "tool '{}' timed out after {}ms",
                task.tool,
                self.tool_timeout.as_millis()
            )),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let record = ExecutionRecord {
            task_id: task.id.clone(),
            tool: task.tool.clone(),
            input_context: context,
            output: outcome.output,
            success: outcome.success,
            error_message: if outcome.success {
                None
            } else {
                Some(
                    outcome
                        .error
                        .unwrap_or_else(|| format!("tool '{}' reported failure", task.tool)),
                )
            },
            timestamp: Utc::now(),
        };

        if record.success {
            tracing::info!(
                target: "taskpilot.execute",
                task_id = %task.id,
                duration_ms,
                "task done"
            );
            set_status(
                &mut tasks,
                &task.id,
                TaskStatus::Done,
                Some(record.output_text()),
                None,
            );
        } else {
            tracing::warn!(
                target: "taskpilot.execute",
                task_id = %task.id,
                duration_ms,
                error = record.error_message.as_deref().unwrap_or_default(),
                "task failed"
            );
            set_status(
                &mut tasks,
                &task.id,
                TaskStatus::Failed,
                None,
                record.error_message.clone(),
            );
        }

        emit(
            self.trace,
            TraceEvent::TaskFinished {
                run_id: state.run_id.clone(),
                duration_ms,
                record: record.clone(),
            },
        )
        .await;

        StateDelta::default().with_tasks(tasks).with_record(record)
    }
}

/// Text handed to the tool: the task description, followed by the outputs of
/// its successful dependencies in log order when it has any.
pub fn build_invocation_context(task: &Task, executed: &ExecutionLog) -> String {
    let mut parts = vec![task.description.clone()];

    if !task.depends_on.is_empty() {
        parts.push(format!("\n\n{DEPENDENCY_RESULTS_HEADER}"));
        for record in executed.iter() {
            if record.success && task.depends_on.iter().any(|d| d == &record.task_id) {
                parts.push(format!("\n[{}]: {}", record.tool, record.output_text()));
            }
        }
    }

    parts.join("\n")
}

fn set_status(
    tasks: &mut [Task],
    id: &str,
    status: TaskStatus,
    result: Option<String>,
    error: Option<String>,
) {
    if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
        task.status = status;
        task.result = result;
        task.error = error;
    }
}

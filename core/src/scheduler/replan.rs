use std::time::Duration;

use crate::collab::{materialize, Planner, ReplanRequest, ToolDescriptor};
use crate::error::{CollaboratorError, ErrorCode};
use crate::graph::{validate_tasks, ExecutionLog, Task, TaskStatus};
use crate::state::{RunState, StateDelta};

/// What a replanning round decided, for logging and tracing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplanSummary {
    pub replan_count: u32,
    pub give_up: bool,
    pub new_tasks: usize,
    pub reason: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
}

/// Asks the planner for a revised task list and folds the answer into a
/// delta. Every invocation advances the replan counter, whatever happens.
pub struct ReplanCoordinator<'a> {
    planner: &'a dyn Planner,
    catalog: &'a [ToolDescriptor],
    timeout: Duration,
}

impl<'a> ReplanCoordinator<'a> {
    pub fn new(planner: &'a dyn Planner, catalog: &'a [ToolDescriptor], timeout: Duration) -> Self {
        Self {
            planner,
            catalog,
            timeout,
        }
    }

    #[tracing::instrument(name = "replan", skip_all, fields(run_id = %state.run_id, replan_count = state.replan_count))]
    pub async fn run(&self, state: &RunState) -> (StateDelta, ReplanSummary) {
        let replan_count = state.replan_count + 1;
        let mut summary = ReplanSummary {
            replan_count,
            ..Default::default()
        };

        let request = ReplanRequest::from_state(state, self.catalog);
        let answer = match tokio::time::timeout(self.timeout, self.planner.replan(&request)).await {
            Ok(answer) => answer,
            Err(_) => Err(CollaboratorError::Timeout {
                collaborator: "replanner",
                after_ms: self.timeout.as_millis() as u64,
            }),
        };

        let delta = match answer {
            Err(e) => {
                tracing::warn!(target: "taskpilot.replan", error = %e, "replanning failed");
                let reason = format!("replanning failed: {e}");
                summary.error = Some(e.to_string());
                summary.error_code = Some(e.error_code());
                summary.reason = Some(reason.clone());
                StateDelta::default()
                    .with_tasks(fail_open_tasks(&state.tasks, &reason, false))
                    .with_plan_reasoning(reason.clone())
                    .with_error(reason, e.error_code())
            }
            Ok(out) if out.give_up => {
                let reason = out
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "the task cannot be completed".to_string());
                tracing::info!(target: "taskpilot.replan", reason = %reason, "planner gave up");
                summary.give_up = true;
                summary.reason = Some(reason.clone());
                StateDelta::default()
                    .with_tasks(fail_open_tasks(&state.tasks, &reason, false))
                    .with_plan_reasoning(reason)
            }
            Ok(out) => {
                let tasks = materialize(out.new_tasks);
                let reason = out.reason.filter(|r| !r.trim().is_empty());
                summary.reason = reason.clone();

                if tasks.is_empty() {
                    let reason = "replanning produced no tasks".to_string();
                    tracing::warn!(target: "taskpilot.replan", "{reason}");
                    summary.give_up = true;
                    summary.reason = Some(reason.clone());
                    StateDelta::default()
                        .with_tasks(fail_open_tasks(&state.tasks, &reason, false))
                        .with_plan_reasoning(reason)
                } else if let Err(e) = validate_tasks(&tasks, &state.executed.completed_ids()) {
                    let reason = format!("replanning produced an invalid plan: {e}");
                    tracing::warn!(target: "taskpilot.replan", error = %e, "invalid replacement plan");
                    summary.error = Some(e.to_string());
                    summary.error_code = Some(e.error_code());
                    summary.reason = Some(reason.clone());
                    StateDelta::default()
                        .with_tasks(fail_open_tasks(&state.tasks, &reason, false))
                        .with_plan_reasoning(reason.clone())
                        .with_error(reason, e.error_code())
                } else {
                    let tasks = carry_over_outcomes(tasks, &state.executed);
                    summary.new_tasks = tasks.iter().filter(|t| t.is_pending()).count();
                    tracing::info!(
                        target: "taskpilot.replan",
                        tasks = tasks.len(),
                        pending = summary.new_tasks,
                        "task list replaced"
                    );
                    StateDelta::default()
                        .with_tasks(tasks)
                        .with_plan_reasoning(reason.unwrap_or_else(|| "plan adjusted".to_string()))
                }
            }
        };

        (delta.with_replan_count(replan_count), summary)
    }
}

/// Copy of `tasks` with every pending task (and running ones too when
/// `include_running`) marked failed with `reason`.
pub fn fail_open_tasks(tasks: &[Task], reason: &str, include_running: bool) -> Vec<Task> {
    tasks
        .iter()
        .cloned()
        .map(|mut task| {
            let open = task.status == TaskStatus::Pending
                || (include_running && task.status == TaskStatus::Running);
            if open {
                task.status = TaskStatus::Failed;
                task.error = Some(reason.to_string());
            }
            task
        })
        .collect()
}

/// A replacement task that reuses an id already executed keeps that outcome,
/// so the same id never runs twice.
fn carry_over_outcomes(tasks: Vec<Task>, executed: &ExecutionLog) -> Vec<Task> {
    tasks
        .into_iter()
        .map(|mut task| {
            if let Some(record) = executed.successful(&task.id) {
                task.status = TaskStatus::Done;
                task.result = Some(record.output_text());
                task.error = None;
            } else if let Some(record) = executed.iter().rev().find(|r| r.task_id == task.id) {
                task.status = TaskStatus::Failed;
                task.error = Some(
                    record
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "already attempted".to_string()),
                );
            }
            task
        })
        .collect()
}

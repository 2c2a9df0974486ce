use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use crate::collab::{
    materialize, PlanRequest, Planner, Responder, ResponseInput, ToolDescriptor, ToolInvoker,
};
use crate::config::SchedulerConfig;
use crate::error::{CollaboratorError, ErrorCode, RunError};
use crate::graph::validate_tasks;
use crate::state::{
    CallerIdentity, ConversationMessage, Phase, PhaseTransition, RunState, StateDelta,
};
use crate::trace::{emit, TraceEvent, TraceTx};

use super::checker::{Decision, TransitionChecker};
use super::engine::ExecutionEngine;
use super::outcome::{RunOutcome, RunStatus};
use super::replan::{fail_open_tasks, ReplanCoordinator};

/// Question asked when the planner's answer could not be used at all.
pub const FALLBACK_CLARIFICATION: &str =
    "I could not understand your request. Could you rephrase it?";
const EMPTY_CLARIFICATION: &str = "Could you tell me a bit more about what you need?";
const RESPONDER_APOLOGY: &str = "Sorry, I could not generate an answer right now. Please try again.";
const UNEXECUTED_REASON: &str = "not executed: the run ended before this task could run";

/// One incoming request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRequest {
    pub run_id: Option<String>,
    pub message: String,
    pub caller: CallerIdentity,
    pub conversation: Vec<ConversationMessage>,
}

impl RunRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_caller(mut self, caller: CallerIdentity) -> Self {
        self.caller = caller;
        self
    }

    pub fn with_conversation(mut self, conversation: Vec<ConversationMessage>) -> Self {
        self.conversation = conversation;
        self
    }
}

/// Drives one run from `plan` to a terminal phase.
///
/// Holds only shared, run-independent collaborators, so a single controller
/// can serve many concurrent runs; each `run` call owns its own state.
#[derive(Clone)]
pub struct RunController {
    planner: Arc<dyn Planner>,
    tools: Arc<dyn ToolInvoker>,
    responder: Arc<dyn Responder>,
    catalog: Vec<ToolDescriptor>,
    limits: SchedulerConfig,
    trace: Option<TraceTx>,
}

impl RunController {
    pub fn new(
        planner: Arc<dyn Planner>,
        tools: Arc<dyn ToolInvoker>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            planner,
            tools,
            responder,
            catalog: Vec::new(),
            limits: SchedulerConfig::default(),
            trace: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Vec<ToolDescriptor>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_limits(mut self, limits: SchedulerConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_trace(mut self, trace: Option<TraceTx>) -> Self {
        self.trace = trace;
        self
    }

    pub fn catalog(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    /// Run to completion. Never fails: every fault ends up in the outcome.
    #[tracing::instrument(name = "run", skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        let started = Instant::now();
        let run_id = request
            .run_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::Span::current().record("run_id", run_id.as_str());

        let window = self.limits.history_window;
        let mut conversation = request.conversation;
        if conversation.len() > window {
            conversation.drain(..conversation.len() - window);
        }

        let mut state = RunState::new(run_id.clone(), request.message, request.caller, conversation);
        let mut history = Vec::new();

        tracing::info!(target: "taskpilot.run", user_id = %state.caller.user_id, "run started");
        emit(
            self.trace.as_ref(),
            TraceEvent::RunStarted {
                run_id: run_id.clone(),
                user_id: state.caller.user_id.clone(),
                request: state.request.clone(),
            },
        )
        .await;

        let driven = AssertUnwindSafe(self.drive(&mut state, &mut history))
            .catch_unwind()
            .await;

        let (status, terminal) = match driven {
            Ok(Ok(Phase::Clarify)) => (RunStatus::Clarification, Phase::Clarify),
            Ok(Ok(phase)) => (RunStatus::Answered, phase),
            Ok(Err(e)) => {
                self.absorb_fault(&mut state, &e);
                (RunStatus::Failed, history.last().copied().unwrap_or(Phase::Plan))
            }
            Err(panic) => {
                let e = RunError::Panicked(panic_message(panic.as_ref()));
                self.absorb_fault(&mut state, &e);
                (RunStatus::Failed, history.last().copied().unwrap_or(Phase::Plan))
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let outcome = RunOutcome::from_state(state, status, terminal, history, duration_ms);

        tracing::info!(
            target: "taskpilot.run",
            terminal = %outcome.terminal_phase,
            tools_planned = outcome.tools_planned,
            tools_executed = outcome.tools_executed,
            tools_failed = outcome.tools_failed,
            replan_count = outcome.replan_count,
            duration_ms,
            "run finished"
        );
        emit(
            self.trace.as_ref(),
            TraceEvent::RunFinished {
                run_id,
                terminal: outcome.terminal_phase,
                tools_planned: outcome.tools_planned,
                tools_executed: outcome.tools_executed,
                tools_failed: outcome.tools_failed,
                duration_ms,
                error: outcome.error.clone(),
                error_code: outcome.error_code,
            },
        )
        .await;
        let dropped = self.trace.as_ref().map_or(0, TraceTx::dropped_count);
        if dropped > 0 {
            tracing::warn!(target: "taskpilot.trace", dropped, "trace lines dropped, channel full");
        }

        outcome
    }

    async fn drive(&self, state: &mut RunState, history: &mut Vec<Phase>) -> Result<Phase, RunError> {
        let checker = TransitionChecker::new(self.limits.replan_ceiling);
        let mut phase = Phase::Plan;

        loop {
            history.push(phase);
            tracing::debug!(
                target: "taskpilot.run",
                phase = %phase,
                "{}",
                PhaseTransition::phase_description(phase)
            );
            emit(
                self.trace.as_ref(),
                TraceEvent::PhaseEntered {
                    run_id: state.run_id.clone(),
                    phase,
                },
            )
            .await;

            let delta = match phase {
                Phase::Plan => self.plan_phase(state).await,
                Phase::Execute => {
                    ExecutionEngine::new(self.tools.as_ref(), self.limits.tool_timeout())
                        .with_trace(self.trace.as_ref())
                        .run_cycle(state)
                        .await
                }
                Phase::Replan => self.replan_phase(state).await,
                Phase::Respond => {
                    let sealed = seal_open_tasks(state);
                    state.apply(sealed);
                    self.respond_phase(state).await?
                }
                Phase::Clarify => clarify_phase(state),
            };
            state.apply(delta);

            if PhaseTransition::is_terminal(phase) {
                return Ok(phase);
            }

            let decision = checker.check(state);
            let counts = state.counts();
            tracing::info!(
                target: "taskpilot.run",
                after = %phase,
                decision = %decision,
                tasks = %counts,
                "transition decided"
            );
            emit(
                self.trace.as_ref(),
                TraceEvent::Decision {
                    run_id: state.run_id.clone(),
                    after: phase,
                    decision,
                    counts,
                },
            )
            .await;

            let next = self.route(decision, state);
            PhaseTransition::validate(phase, next)?;
            phase = next;
        }
    }

    fn route(&self, decision: Decision, state: &RunState) -> Phase {
        match decision {
            Decision::NeedsClarify => Phase::Clarify,
            Decision::DirectResponse | Decision::AllDone => Phase::Respond,
            Decision::HasPending => Phase::Execute,
            // A deadlock never trips the failure ceiling in the checker, so
            // the replan count is bounded here as well.
            Decision::NeedsReplan if state.replan_count > self.limits.replan_ceiling => {
                tracing::warn!(
                    target: "taskpilot.run",
                    replan_count = state.replan_count,
                    "replanning exhausted, responding with what we have"
                );
                Phase::Respond
            }
            Decision::NeedsReplan => Phase::Replan,
        }
    }

    async fn plan_phase(&self, state: &RunState) -> StateDelta {
        let request = PlanRequest::from_state(state, &self.catalog);
        let timeout = self.limits.planner_timeout();
        let answer = match tokio::time::timeout(timeout, self.planner.plan(&request)).await {
            Ok(answer) => answer,
            Err(_) => Err(CollaboratorError::Timeout {
                collaborator: "planner",
                after_ms: timeout.as_millis() as u64,
            }),
        };

        let delta = match answer {
            Err(e) => {
                tracing::warn!(target: "taskpilot.plan", planner = self.planner.name(), error = %e, "planning failed");
                structural_plan_failure(format!("planning failed: {e}"), e.error_code())
            }
            Ok(out) => {
                let tasks = materialize(out.tasks);
                match validate_tasks(&tasks, &HashSet::new()) {
                    Err(e) => {
                        tracing::warn!(target: "taskpilot.plan", error = %e, "planner returned an invalid task graph");
                        structural_plan_failure(format!("invalid plan: {e}"), e.error_code())
                    }
                    Ok(()) => {
                        tracing::info!(
                            target: "taskpilot.plan",
                            tasks = tasks.len(),
                            needs_clarification = out.needs_clarification,
                            "plan ready"
                        );
                        let mut delta = StateDelta::default()
                            .with_tasks(tasks)
                            .with_plan_reasoning(out.reasoning.unwrap_or_default());
                        if out.needs_clarification {
                            delta = delta.with_clarification(
                                out.clarification_question.unwrap_or_default(),
                            );
                        }
                        delta
                    }
                }
            }
        };

        emit(
            self.trace.as_ref(),
            TraceEvent::Planned {
                run_id: state.run_id.clone(),
                tasks: delta.tasks.as_ref().map_or(0, Vec::len),
                needs_clarification: delta.needs_clarification.unwrap_or(false),
                error: delta.error.clone(),
                error_code: delta.error_code,
            },
        )
        .await;

        delta
    }

    async fn replan_phase(&self, state: &RunState) -> StateDelta {
        let coordinator = ReplanCoordinator::new(
            self.planner.as_ref(),
            &self.catalog,
            self.limits.planner_timeout(),
        );
        let (delta, summary) = coordinator.run(state).await;

        emit(
            self.trace.as_ref(),
            TraceEvent::Replanned {
                run_id: state.run_id.clone(),
                replan_count: summary.replan_count,
                give_up: summary.give_up,
                new_tasks: summary.new_tasks,
                reason: summary.reason,
                error_code: summary.error_code,
            },
        )
        .await;

        delta
    }

    async fn respond_phase(&self, state: &RunState) -> Result<StateDelta, RunError> {
        let input = ResponseInput::from_state(state)?;
        let timeout = self.limits.responder_timeout();
        let answer = match tokio::time::timeout(timeout, self.responder.respond(&input)).await {
            Ok(answer) => answer,
            Err(_) => Err(CollaboratorError::Timeout {
                collaborator: "responder",
                after_ms: timeout.as_millis() as u64,
            }),
        };

        Ok(match answer {
            Ok(answer) => StateDelta::default().with_final_answer(answer),
            Err(e) => {
                tracing::warn!(target: "taskpilot.respond", responder = self.responder.name(), error = %e, "response synthesis failed");
                StateDelta::default()
                    .with_final_answer(RESPONDER_APOLOGY)
                    .with_error(format!("response failed: {e}"), e.error_code())
            }
        })
    }

    fn absorb_fault(&self, state: &mut RunState, error: &RunError) {
        tracing::error!(target: "taskpilot.run", error = %error, "run aborted by internal fault");
        state.final_answer = Some(format!("Sorry, something went wrong: {error}"));
        state.error = Some(error.to_string());
        state.error_code = Some(error.error_code());
    }
}

fn structural_plan_failure(error: String, code: ErrorCode) -> StateDelta {
    StateDelta::default()
        .with_tasks(Vec::new())
        .with_clarification(FALLBACK_CLARIFICATION)
        .with_error(error, code)
}

fn seal_open_tasks(state: &RunState) -> StateDelta {
    if state.tasks.iter().all(|t| t.status.is_settled()) {
        return StateDelta::default();
    }
    StateDelta::default().with_tasks(fail_open_tasks(&state.tasks, UNEXECUTED_REASON, true))
}

fn clarify_phase(state: &RunState) -> StateDelta {
    let question = state
        .clarification_question
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .unwrap_or(EMPTY_CLARIFICATION);
    StateDelta::default().with_final_answer(question)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{PlanOutput, ReplanOutput, ReplanRequest, ToolRegistry};

    struct Panicking;

    #[async_trait::async_trait]
    impl Planner for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn plan(&self, _request: &PlanRequest) -> Result<PlanOutput, CollaboratorError> {
            panic!("planner exploded");
        }

        async fn replan(&self, _request: &ReplanRequest) -> Result<ReplanOutput, CollaboratorError> {
            Ok(ReplanOutput::default())
        }
    }

    struct Silent;

    #[async_trait::async_trait]
    impl Responder for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn respond(&self, _input: &ResponseInput) -> Result<String, CollaboratorError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let controller = RunController::new(
            Arc::new(Panicking),
            Arc::new(ToolRegistry::new()),
            Arc::new(Silent),
        );

        let outcome = controller.run(RunRequest::new("hi").with_run_id("r-1")).await;

        assert_eq!(outcome.run_id, "r-1");
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.final_answer.starts_with("Sorry, something went wrong"));
        assert_eq!(outcome.error_code, Some(ErrorCode::InternalFault));
        assert!(outcome.error.unwrap().contains("planner exploded"));
    }

    #[test]
    fn test_clarify_falls_back_on_blank_question() {
        let mut state = RunState::new("r", "q", CallerIdentity::default(), Vec::new());
        state.clarification_question = Some("  ".into());
        assert_eq!(
            clarify_phase(&state).final_answer.as_deref(),
            Some(EMPTY_CLARIFICATION)
        );
    }

    #[test]
    fn test_clarify_keeps_question_verbatim() {
        let mut state = RunState::new("r", "q", CallerIdentity::default(), Vec::new());
        state.clarification_question = Some(" Which one?\n".into());
        assert_eq!(
            clarify_phase(&state).final_answer.as_deref(),
            Some(" Which one?\n")
        );
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}

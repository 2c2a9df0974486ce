use serde::{Deserialize, Serialize};

use crate::state::RunState;

/// Outcome of inspecting the state after plan, execute or replan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    NeedsClarify,
    DirectResponse,
    AllDone,
    NeedsReplan,
    HasPending,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NeedsClarify => "needs_clarify",
            Self::DirectResponse => "direct_response",
            Self::AllDone => "all_done",
            Self::NeedsReplan => "needs_replan",
            Self::HasPending => "has_pending",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure routing function over the run state.
#[derive(Debug, Clone, Copy)]
pub struct TransitionChecker {
    replan_ceiling: u32,
}

impl TransitionChecker {
    pub fn new(replan_ceiling: u32) -> Self {
        Self { replan_ceiling }
    }

    pub fn replan_ceiling(&self) -> u32 {
        self.replan_ceiling
    }

    pub fn check(&self, state: &RunState) -> Decision {
        check_transition(state, self.replan_ceiling)
    }
}

/// First matching rule wins:
///
/// 1. clarification requested -> `needs_clarify`
/// 2. no tasks -> `direct_response`
/// 3. every task done -> `all_done`
/// 4. any task failed -> `all_done` once the ceiling is reached, else `needs_replan`
/// 5. a task is ready -> `has_pending`
/// 6. otherwise (deadlock) -> `needs_replan`
pub fn check_transition(state: &RunState, replan_ceiling: u32) -> Decision {
    if state.needs_clarification {
        return Decision::NeedsClarify;
    }
    if state.tasks.is_empty() {
        return Decision::DirectResponse;
    }

    let counts = state.counts();
    if counts.done == state.tasks.len() {
        return Decision::AllDone;
    }
    if counts.failed > 0 {
        return if state.replan_count >= replan_ceiling {
            Decision::AllDone
        } else {
            Decision::NeedsReplan
        };
    }
    if super::readiness::has_ready(&state.tasks, &state.executed) {
        return Decision::HasPending;
    }

    Decision::NeedsReplan
}

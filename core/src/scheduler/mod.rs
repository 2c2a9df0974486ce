//! Plan-execute scheduler.
//!
//! ```text
//! plan ──► checker ──► execute ◄─┐ (one ready task per cycle)
//!   │         │           │      │
//!   │         │           └──► checker ──► replan ──► checker ...
//!   │         ▼
//!   └──► respond | clarify   (terminal)
//! ```

mod checker;
mod controller;
mod engine;
mod outcome;
mod readiness;
mod replan;

pub use checker::{check_transition, Decision, TransitionChecker};
pub use controller::{RunController, RunRequest, FALLBACK_CLARIFICATION};
pub use engine::{build_invocation_context, ExecutionEngine, DEPENDENCY_RESULTS_HEADER};
pub use outcome::{RunOutcome, RunStatus};
pub use readiness::{has_ready, next_ready};
pub use replan::{fail_open_tasks, ReplanCoordinator, ReplanSummary};

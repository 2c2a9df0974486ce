//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `taskpilot_core::api` instead of reaching into internal modules.

pub use crate::collab::{
    NoneToolInvoker, PlanOutput, PlanRequest, PlannedTask, Planner, ReplanOutput, ReplanRequest,
    Responder, ResponseInput, ToolCall, ToolDescriptor, ToolInvoker, ToolOutcome, ToolRegistry,
};
pub use crate::config::{
    load_default, load_from_path, AppConfig, AssistantConfig, LlmConfig, LogFormat,
    LoggingConfig, SchedulerConfig, ToolConfig, TraceConfig,
};
pub use crate::error::{CliError, CollaboratorError, ErrorCode, GraphError, RunError};
pub use crate::graph::{ExecutionLog, ExecutionRecord, Task, TaskStatus, NONE_TOOL};
pub use crate::scheduler::{
    Decision, RunController, RunOutcome, RunRequest, RunStatus, FALLBACK_CLARIFICATION,
};
pub use crate::state::{CallerIdentity, ConversationMessage, Phase, RunState};
pub use crate::trace::{start_trace, TraceTx};

//! Narrow contracts for the external collaborators the scheduler consumes.

pub mod planning;
pub mod response;
pub mod tools;

pub use planning::{
    materialize, PlanOutput, PlanRequest, PlannedTask, Planner, ReplanOutput, ReplanRequest,
    ToolDescriptor,
};
pub use response::{ResponseInput, Responder};
pub use tools::{NoneToolInvoker, ToolCall, ToolInvoker, ToolOutcome, ToolRegistry};

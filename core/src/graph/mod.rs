//! Task graph model: tasks, execution records, the append-only execution
//! log, and structural validation of proposed task lists.
//!
//! ```text
//! Vec<Task>
//!   ↓
//! TaskGraph::from_tasks()   → empty ids, duplicate ids
//!   ↓
//! TaskGraph::validate_against() → self-dependencies, unknown dependencies
//!   ↓
//! TaskGraph::detect_cycle() → advisory only; cycles deadlock at runtime
//! ```

mod model;
mod validate;

pub use model::{ExecutionLog, ExecutionRecord, Task, TaskStatus, NONE_TOOL};
pub use validate::{validate_tasks, TaskGraph};

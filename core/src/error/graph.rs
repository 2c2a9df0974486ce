use thiserror::Error;

use super::code::ErrorCode;

/// Structural violations of a proposed task list.
///
/// These are never retried: a plan that fails validation degrades the run
/// (clarification after planning, forced failure after replanning).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("task at position {0} has an empty id")]
    EmptyTaskId(usize),

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("task '{0}' depends on itself")]
    SelfDependency(String),

    #[error("dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },
}

impl GraphError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyTaskId(_) => ErrorCode::ValidationError,
            Self::DuplicateTaskId(_) => ErrorCode::ValidationError,
            Self::SelfDependency(_) => ErrorCode::DependencyError,
            Self::DependencyNotFound { .. } => ErrorCode::DependencyError,
        }
    }
}

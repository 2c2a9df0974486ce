use thiserror::Error;

use super::code::ErrorCode;

/// Failure outcome of an external collaborator (planner, responder).
///
/// Tool invocations do not use this type; they report a failed
/// [`ToolOutcome`](crate::collab::ToolOutcome) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{collaborator} timed out after {after_ms}ms")]
    Timeout {
        collaborator: &'static str,
        after_ms: u64,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Transport(_) => ErrorCode::NetworkError,
            Self::Status { .. } => ErrorCode::UpstreamStatus,
            Self::Malformed(_) => ErrorCode::ParseError,
            Self::Unavailable(_) => ErrorCode::GeneralError,
        }
    }
}

use thiserror::Error;

use crate::state::Phase;

use super::code::ErrorCode;

/// Internal controller faults. Caught at the run boundary and turned into a
/// failed terminal outcome; callers of `RunController::run` never see them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("invalid phase transition from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("cannot leave terminal phase {0:?}")]
    FromTerminalPhase(Phase),

    #[error("response input contains unexecuted task '{0}'")]
    UngroundedResponse(String),

    #[error("run panicked: {0}")]
    Panicked(String),
}

impl RunError {
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::InternalFault
    }
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Command(_) | Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Anyhow(_) => ErrorCode::InternalFault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_codes() {
        assert_eq!(
            CliError::Config("bad".into()).error_code(),
            ErrorCode::ConfigError
        );
        assert_eq!(
            CliError::Command("trace".into()).error_code(),
            ErrorCode::IoError
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(CliError::from(io).error_code(), ErrorCode::IoError);
        assert_eq!(
            CliError::Anyhow(anyhow::anyhow!("boom")).error_code(),
            ErrorCode::InternalFault
        );
    }

    #[test]
    fn test_run_errors_are_internal_faults() {
        assert_eq!(
            RunError::Panicked("x".into()).error_code(),
            ErrorCode::InternalFault
        );
    }
}

use serde::{Deserialize, Serialize};

/// Numeric error codes shared by run outcomes, trace events and the CLI
/// exit path.
///
/// The CLI exits with `as_u16()` of the code describing its failure, so the
/// values double as process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    GeneralError = 1,
    ParseError = 2,
    ValidationError = 3,
    DependencyError = 4,
    ConfigError = 11,
    IoError = 20,
    RunFailed = 30,
    Timeout = 31,
    NetworkError = 40,
    UpstreamStatus = 41,
    InternalFault = 50,
}

impl ErrorCode {
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    pub const fn exit_code(self) -> i32 {
        self as i32
    }
}

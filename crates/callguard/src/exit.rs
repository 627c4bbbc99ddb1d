use std::fmt;

use callguard_endpoint::{CallError, ErrorCode, RegistryError};
use callguard_schema::SchemaError;

// Exit codes follow the sysexits-style ranges used across our tools.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    let code = match err {
        SchemaError::LoadFailed(_) => FAILURE,
        SchemaError::NoSchema(_) => USAGE,
        SchemaError::CompileFailed(_)
        | SchemaError::InvalidJson(_)
        | SchemaError::IncompleteSchema { .. } => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn registry_error(context: &str, err: RegistryError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

/// Exit code for a caller-visible endpoint error.
pub fn call_error_code(err: &CallError) -> i32 {
    match err.code {
        ErrorCode::Unauthenticated | ErrorCode::PermissionDenied => PERMISSION_DENIED,
        ErrorCode::InvalidArgument | ErrorCode::OutOfRange | ErrorCode::FailedPrecondition => {
            DATA_INVALID
        }
        ErrorCode::Internal | ErrorCode::Unknown | ErrorCode::DataLoss => INTERNAL,
        _ => FAILURE,
    }
}

pub fn usage(message: impl Into<String>) -> CliError {
    CliError::new(USAGE, message)
}

use serde::{Deserialize, Serialize};

use crate::code::ErrorCode;

/// Undeclared fault raised by a handler or logging hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The only error shape that crosses the trust boundary to a caller.
///
/// Validation internals and fault causes never appear here; they reach the
/// log sink only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CallError {
    pub code: ErrorCode,
    pub message: String,
}

impl CallError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Construction-time failures while exporting a registry.
///
/// These are fatal: a registry that fails to export must not be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two exportable endpoints share a schema name.
    #[error("duplicate endpoint name: {0}")]
    DuplicateName(String),

    /// The endpoint name cannot be exported.
    #[error("invalid endpoint name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The endpoint config is malformed.
    #[error("invalid config for endpoint '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_error_serializes_code_and_message_only() {
        let err = CallError::new(ErrorCode::InvalidArgument, "invalid-argument");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"code": "invalid-argument", "message": "invalid-argument"})
        );
        assert_eq!(err.to_string(), "invalid-argument: invalid-argument");
    }

    #[test]
    fn registry_error_messages_name_the_endpoint() {
        let err = RegistryError::DuplicateName("echo".to_string());
        assert_eq!(err.to_string(), "duplicate endpoint name: echo");
    }
}

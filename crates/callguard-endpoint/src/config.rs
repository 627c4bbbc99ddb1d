use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::code::ErrorCode;
use crate::report::{LogSink, LoggingHook};

/// Longest handler timeout a transport accepts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(540);

/// Memory sizes (MiB) a transport can provision.
pub const MEMORY_OPTIONS_MIB: [u32; 7] = [128, 256, 512, 1024, 2048, 4096, 8192];

/// Authorization tier of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Requires an authenticated identity in the call context.
    Private,
    /// Open to anonymous callers; identity is still passed through.
    Public,
}

/// Severity of a failure log record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

/// Built-in failure kinds whose code and message can be overridden.
///
/// Handler-declared failures are not listed: their code and message are
/// always used as declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Unauthenticated,
    InvalidRequest,
    Unknown,
    InvalidResponse,
}

impl FailureKind {
    pub fn default_code(self) -> ErrorCode {
        match self {
            FailureKind::Unauthenticated => ErrorCode::Unauthenticated,
            FailureKind::InvalidRequest => ErrorCode::InvalidArgument,
            FailureKind::Unknown => ErrorCode::Unknown,
            FailureKind::InvalidResponse => ErrorCode::Internal,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            FailureKind::Unauthenticated => "Please Login First",
            FailureKind::InvalidRequest => "invalid-argument",
            FailureKind::Unknown => "unknown",
            FailureKind::InvalidResponse => "invalid response",
        }
    }
}

/// Replacement code and/or message for one failure kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorOverride {
    pub code: Option<ErrorCode>,
    pub message: Option<String>,
}

impl ErrorOverride {
    /// Override both halves.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
        }
    }
}

/// Per-kind overrides of the built-in error codes and messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorOverrides {
    pub unauthenticated: Option<ErrorOverride>,
    pub invalid_request: Option<ErrorOverride>,
    pub unknown: Option<ErrorOverride>,
    pub invalid_response: Option<ErrorOverride>,
}

impl ErrorOverrides {
    /// Set the override for `kind`.
    pub fn with(mut self, kind: FailureKind, value: ErrorOverride) -> Self {
        *self.slot_mut(kind) = Some(value);
        self
    }

    pub fn get(&self, kind: FailureKind) -> Option<&ErrorOverride> {
        match kind {
            FailureKind::Unauthenticated => self.unauthenticated.as_ref(),
            FailureKind::InvalidRequest => self.invalid_request.as_ref(),
            FailureKind::Unknown => self.unknown.as_ref(),
            FailureKind::InvalidResponse => self.invalid_response.as_ref(),
        }
    }

    /// Effective code and message for `kind`, each half falling back to the
    /// built-in default independently.
    pub fn resolve(&self, kind: FailureKind) -> (ErrorCode, String) {
        let entry = self.get(kind);
        let code = entry
            .and_then(|entry| entry.code)
            .unwrap_or_else(|| kind.default_code());
        let message = entry
            .and_then(|entry| entry.message.clone())
            .unwrap_or_else(|| kind.default_message().to_string());
        (code, message)
    }

    fn slot_mut(&mut self, kind: FailureKind) -> &mut Option<ErrorOverride> {
        match kind {
            FailureKind::Unauthenticated => &mut self.unauthenticated,
            FailureKind::InvalidRequest => &mut self.invalid_request,
            FailureKind::Unknown => &mut self.unknown,
            FailureKind::InvalidResponse => &mut self.invalid_response,
        }
    }
}

/// What a failure record carries besides its code and message.
#[derive(Debug, Clone, Default)]
pub enum ErrorLogging {
    /// Log the raw failure details.
    #[default]
    Details,
    /// Log code and message only.
    Omit,
    /// Log whatever the hook returns for the failure.
    Hook(LoggingHook),
}

/// Resource and placement options handed to the hosting transport.
///
/// The wrapper never acts on these; it has no timeout of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mib: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
}

impl TransportOptions {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_memory_mib(mut self, memory_mib: u32) -> Self {
        self.memory_mib = Some(memory_mib);
        self
    }

    pub fn with_instances(mut self, min: u32, max: u32) -> Self {
        self.min_instances = Some(min);
        self.max_instances = Some(max);
        self
    }

    /// Check the options against what a transport can provision.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(region) = &self.region {
            if region.trim().is_empty() {
                return Err("region must not be empty".to_string());
            }
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() || timeout > MAX_TIMEOUT {
                return Err(format!(
                    "timeout must be between 1s and {}s, got {timeout:?}",
                    MAX_TIMEOUT.as_secs()
                ));
            }
        }
        if let Some(memory) = self.memory_mib {
            if !MEMORY_OPTIONS_MIB.contains(&memory) {
                return Err(format!(
                    "memory must be one of {MEMORY_OPTIONS_MIB:?} MiB, got {memory}"
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_instances, self.max_instances) {
            if min > max {
                return Err(format!(
                    "min_instances ({min}) exceeds max_instances ({max})"
                ));
            }
        }
        Ok(())
    }
}

/// Per-endpoint behavior.
#[derive(Clone)]
pub struct EndpointConfig {
    pub route: Route,
    /// When false, the registry skips this endpoint at export.
    pub exportable: bool,
    pub error_logging: ErrorLogging,
    pub error_overrides: ErrorOverrides,
    /// Severity of failure records unless a declared failure picks its own.
    pub severity: Severity,
    /// Transport override; `None` means the host's defaults.
    pub transport: Option<TransportOptions>,
    /// Where failure records go; `None` means [`TracingSink`](crate::TracingSink).
    pub log_sink: Option<Arc<dyn LogSink>>,
}

impl EndpointConfig {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            exportable: true,
            error_logging: ErrorLogging::default(),
            error_overrides: ErrorOverrides::default(),
            severity: Severity::default(),
            transport: None,
            log_sink: None,
        }
    }

    /// Endpoint that requires an authenticated caller.
    pub fn private() -> Self {
        Self::new(Route::Private)
    }

    /// Endpoint open to anonymous callers.
    pub fn public() -> Self {
        Self::new(Route::Public)
    }

    pub fn with_exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }

    pub fn with_logging_hook(mut self, hook: LoggingHook) -> Self {
        self.error_logging = ErrorLogging::Hook(hook);
        self
    }

    pub fn with_error_logging(mut self, logging: ErrorLogging) -> Self {
        self.error_logging = logging;
        self
    }

    pub fn with_override(mut self, kind: FailureKind, value: ErrorOverride) -> Self {
        self.error_overrides = self.error_overrides.with(kind, value);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("route", &self.route)
            .field("exportable", &self.exportable)
            .field("error_logging", &self.error_logging)
            .field("error_overrides", &self.error_overrides)
            .field("severity", &self.severity)
            .field("transport", &self.transport)
            .field("custom_log_sink", &self.log_sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_kind() {
        let overrides = ErrorOverrides::default();
        assert_eq!(
            overrides.resolve(FailureKind::Unauthenticated),
            (ErrorCode::Unauthenticated, "Please Login First".to_string())
        );
        assert_eq!(
            overrides.resolve(FailureKind::InvalidRequest),
            (ErrorCode::InvalidArgument, "invalid-argument".to_string())
        );
        assert_eq!(
            overrides.resolve(FailureKind::Unknown),
            (ErrorCode::Unknown, "unknown".to_string())
        );
        assert_eq!(
            overrides.resolve(FailureKind::InvalidResponse),
            (ErrorCode::Internal, "invalid response".to_string())
        );
    }

    #[test]
    fn partial_override_keeps_other_half() {
        let overrides = ErrorOverrides::default()
            .with(
                FailureKind::Unknown,
                ErrorOverride {
                    code: Some(ErrorCode::Aborted),
                    message: None,
                },
            )
            .with(
                FailureKind::InvalidResponse,
                ErrorOverride {
                    code: None,
                    message: Some("bad output".to_string()),
                },
            );

        assert_eq!(
            overrides.resolve(FailureKind::Unknown),
            (ErrorCode::Aborted, "unknown".to_string())
        );
        assert_eq!(
            overrides.resolve(FailureKind::InvalidResponse),
            (ErrorCode::Internal, "bad output".to_string())
        );
        assert!(overrides.get(FailureKind::Unauthenticated).is_none());
    }

    #[test]
    fn config_builders() {
        let config = EndpointConfig::private()
            .with_exportable(false)
            .with_severity(Severity::Warn)
            .with_override(
                FailureKind::Unauthenticated,
                ErrorOverride::new(ErrorCode::Aborted, "aborted"),
            );

        assert_eq!(config.route, Route::Private);
        assert!(!config.exportable);
        assert_eq!(config.severity, Severity::Warn);
        assert_eq!(
            config.error_overrides.resolve(FailureKind::Unauthenticated),
            (ErrorCode::Aborted, "aborted".to_string())
        );
        assert!(matches!(config.error_logging, ErrorLogging::Details));
        assert!(EndpointConfig::public().exportable);
    }

    #[test]
    fn transport_options_validation() {
        assert!(TransportOptions::default().validate().is_ok());
        assert!(TransportOptions::default()
            .with_region("europe-west1")
            .with_timeout(Duration::from_secs(300))
            .with_memory_mib(1024)
            .with_instances(0, 10)
            .validate()
            .is_ok());

        assert!(TransportOptions::default()
            .with_region("  ")
            .validate()
            .is_err());
        assert!(TransportOptions::default()
            .with_timeout(Duration::from_secs(541))
            .validate()
            .is_err());
        assert!(TransportOptions::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(TransportOptions::default()
            .with_memory_mib(1000)
            .validate()
            .is_err());
        assert!(TransportOptions::default()
            .with_instances(5, 1)
            .validate()
            .is_err());
    }
}

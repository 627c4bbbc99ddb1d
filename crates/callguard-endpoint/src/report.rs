//! Failure reporting: log once, then hand back the caller-visible error.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use callguard_schema::ValidationError;
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::code::ErrorCode;
use crate::config::{EndpointConfig, ErrorLogging, Severity};
use crate::context::CallContext;
use crate::error::{BoxError, CallError};

/// Why a handler did not produce a response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Cause {
    /// The handler returned `Err`.
    Fault(#[serde(serialize_with = "serialize_fault")] Arc<dyn std::error::Error + Send + Sync>),
    /// The handler panicked.
    Panic(String),
    /// Payload attached to a declared failure.
    Declared(Value),
}

impl Cause {
    pub fn fault(err: BoxError) -> Self {
        Cause::Fault(Arc::from(err))
    }

    /// Build from a `catch_unwind` payload.
    pub fn panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        Cause::Panic(panic_message(payload.as_ref()))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn serialize_fault<S: Serializer>(
    err: &Arc<dyn std::error::Error + Send + Sync>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error_chain(err.as_ref()))
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(next) = source {
        rendered.push_str(": ");
        rendered.push_str(&next.to_string());
        source = next.source();
    }
    rendered
}

/// Everything known about a failed invocation.
#[derive(Debug, Clone, Serialize)]
pub struct FailureDetails {
    pub request: Value,
    pub context: CallContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_validation_error: Option<ValidationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_validation_error: Option<ValidationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Cause>,
}

impl FailureDetails {
    pub fn new(request: Value, context: CallContext) -> Self {
        Self {
            request,
            context,
            request_validation_error: None,
            response_validation_error: None,
            cause: None,
        }
    }

    pub fn with_request_error(mut self, err: ValidationError) -> Self {
        self.request_validation_error = Some(err);
        self
    }

    pub fn with_response_error(mut self, err: ValidationError) -> Self {
        self.response_validation_error = Some(err);
        self
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }
}

/// Input handed to a [`LoggingHook`]: `{code, message, ...details}`.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(flatten)]
    pub details: FailureDetails,
}

type HookFn = dyn Fn(FailureReport) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync;

/// User hook that turns a failure into the value that gets logged.
///
/// Lets an endpoint redact, enrich or persist failure details before they
/// reach the log sink.
#[derive(Clone)]
pub struct LoggingHook(Arc<HookFn>);

impl LoggingHook {
    /// Hook backed by an async function.
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(FailureReport) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |report: FailureReport| hook(report).boxed()))
    }

    /// Hook backed by a synchronous function.
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(FailureReport) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |report: FailureReport| {
            futures_util::future::ready(hook(report)).boxed()
        }))
    }

    /// Run the hook, turning a panic into an error.
    async fn run(&self, report: FailureReport) -> Result<Value, BoxError> {
        let hook = Arc::clone(&self.0);
        match AssertUnwindSafe(async move { hook(report).await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(format!(
                "logging hook panicked: {}",
                panic_message(payload.as_ref())
            )
            .into()),
        }
    }
}

impl fmt::Debug for LoggingHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoggingHook(..)")
    }
}

/// One failure log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub endpoint: String,
    pub code: ErrorCode,
    pub message: String,
    /// Raw failure details, the hook's return value, or null.
    pub details: Value,
}

/// Destination for failure records.
pub trait LogSink: Send + Sync {
    fn write(&self, severity: Severity, record: &LogRecord);
}

/// Default sink: one `tracing` event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, severity: Severity, record: &LogRecord) {
        let details = record.details.to_string();
        let endpoint = record.endpoint.as_str();
        let code = record.code.as_str();
        let reason = record.message.as_str();
        match severity {
            Severity::Debug => {
                tracing::debug!(endpoint, code, reason, details = %details, "endpoint call failed")
            }
            Severity::Info => {
                tracing::info!(endpoint, code, reason, details = %details, "endpoint call failed")
            }
            Severity::Warn => {
                tracing::warn!(endpoint, code, reason, details = %details, "endpoint call failed")
            }
            Severity::Error => {
                tracing::error!(endpoint, code, reason, details = %details, "endpoint call failed")
            }
        }
    }
}

/// Logs a failure exactly once and produces the caller-visible error.
#[derive(Clone)]
pub struct ErrorReporter {
    endpoint: String,
    logging: ErrorLogging,
    severity: Severity,
    sink: Arc<dyn LogSink>,
}

impl ErrorReporter {
    pub fn new(endpoint: impl Into<String>, config: &EndpointConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            logging: config.error_logging.clone(),
            severity: config.severity,
            sink: config
                .log_sink
                .clone()
                .unwrap_or_else(|| Arc::new(TracingSink)),
        }
    }

    /// Log the failure, then return `CallError { code, message }`.
    ///
    /// `severity` overrides the endpoint's configured severity for this
    /// record. A failing hook falls back to the raw details; the returned
    /// error is the same either way.
    pub async fn report(
        &self,
        code: ErrorCode,
        message: String,
        details: FailureDetails,
        severity: Option<Severity>,
    ) -> CallError {
        let logged = match &self.logging {
            ErrorLogging::Details => details_value(&details),
            ErrorLogging::Omit => Value::Null,
            ErrorLogging::Hook(hook) => {
                let report = FailureReport {
                    code,
                    message: message.clone(),
                    details,
                };
                let fallback = details_value(&report.details);
                match hook.run(report).await {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::warn!(
                            endpoint = %self.endpoint,
                            error = %err,
                            "logging hook failed; logging raw details"
                        );
                        fallback
                    }
                }
            }
        };

        let record = LogRecord {
            endpoint: self.endpoint.clone(),
            code,
            message,
            details: logged,
        };
        self.sink.write(severity.unwrap_or(self.severity), &record);

        CallError::new(record.code, record.message)
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("endpoint", &self.endpoint)
            .field("logging", &self.logging)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

fn details_value(details: &FailureDetails) -> Value {
    serde_json::to_value(details)
        .unwrap_or_else(|err| Value::String(format!("<unserializable details: {err}>")))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct MemorySink(Mutex<Vec<(Severity, LogRecord)>>);

    impl MemorySink {
        fn records(&self) -> Vec<(Severity, LogRecord)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl LogSink for MemorySink {
        fn write(&self, severity: Severity, record: &LogRecord) {
            self.0.lock().unwrap().push((severity, record.clone()));
        }
    }

    fn reporter(config: EndpointConfig) -> (ErrorReporter, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let config = config.with_log_sink(sink.clone());
        (ErrorReporter::new("echo", &config), sink)
    }

    fn details() -> FailureDetails {
        FailureDetails::new(json!("hi"), CallContext::authenticated("u-1"))
            .with_request_error(ValidationError::new("expected integer"))
    }

    #[tokio::test]
    async fn logs_raw_details_by_default() {
        let (reporter, sink) = reporter(EndpointConfig::public());

        let err = reporter
            .report(ErrorCode::InvalidArgument, "invalid-argument".into(), details(), None)
            .await;

        assert_eq!(err, CallError::new(ErrorCode::InvalidArgument, "invalid-argument"));
        let records = sink.records();
        assert_eq!(records.len(), 1);
        let (severity, record) = &records[0];
        assert_eq!(*severity, Severity::Error);
        assert_eq!(record.endpoint, "echo");
        assert_eq!(
            record.details,
            json!({
                "request": "hi",
                "context": {"auth": {"uid": "u-1"}},
                "request_validation_error": {"issues": ["expected integer"]}
            })
        );
    }

    #[tokio::test]
    async fn hook_return_value_is_logged() {
        let hook = LoggingHook::sync(|report: FailureReport| {
            Ok(json!({"redacted": true, "code": report.code, "uid": report.details.context.uid()}))
        });
        let (reporter, sink) = reporter(EndpointConfig::public().with_logging_hook(hook));

        let err = reporter
            .report(ErrorCode::Internal, "invalid response".into(), details(), Some(Severity::Warn))
            .await;

        assert_eq!(err.code, ErrorCode::Internal);
        let records = sink.records();
        assert_eq!(records[0].0, Severity::Warn);
        assert_eq!(
            records[0].1.details,
            json!({"redacted": true, "code": "internal", "uid": "u-1"})
        );
    }

    #[tokio::test]
    async fn async_hook_is_awaited() {
        let hook = LoggingHook::new(|report: FailureReport| async move {
            tokio::task::yield_now().await;
            Ok::<_, BoxError>(json!({"message": report.message}))
        });
        let (reporter, sink) = reporter(EndpointConfig::public().with_logging_hook(hook));

        reporter
            .report(ErrorCode::Unknown, "unknown".into(), details(), None)
            .await;

        assert_eq!(sink.records()[0].1.details, json!({"message": "unknown"}));
    }

    #[tokio::test]
    async fn failing_or_panicking_hook_still_yields_error() {
        let failing = LoggingHook::sync(|_report: FailureReport| Err("disk full".into()));
        let panicking = LoggingHook::sync(|_report: FailureReport| -> Result<Value, BoxError> {
            panic!("hook exploded")
        });

        for hook in [failing, panicking] {
            let (reporter, sink) = reporter(EndpointConfig::public().with_logging_hook(hook));
            let err = reporter
                .report(ErrorCode::Aborted, "aborted".into(), details(), None)
                .await;

            assert_eq!(err, CallError::new(ErrorCode::Aborted, "aborted"));
            let records = sink.records();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].1.details["request"], json!("hi"));
        }
    }

    #[tokio::test]
    async fn omit_logs_null_details() {
        let (reporter, sink) =
            reporter(EndpointConfig::public().with_error_logging(ErrorLogging::Omit));

        reporter
            .report(ErrorCode::Unknown, "unknown".into(), details(), None)
            .await;

        assert_eq!(sink.records()[0].1.details, Value::Null);
    }

    #[test]
    fn causes_serialize_without_error_objects() {
        #[derive(Debug, thiserror::Error)]
        #[error("query failed")]
        struct Outer(#[source] std::io::Error);

        let fault = Cause::fault(Box::new(Outer(std::io::Error::other("connection reset"))));
        assert_eq!(
            serde_json::to_value(&fault).unwrap(),
            json!({"kind": "fault", "detail": "query failed: connection reset"})
        );

        let declared = Cause::Declared(json!(12121245));
        assert_eq!(
            serde_json::to_value(&declared).unwrap(),
            json!({"kind": "declared", "detail": 12121245})
        );

        let panic = Cause::panic(Box::new("boom"));
        assert!(matches!(panic, Cause::Panic(ref message) if message == "boom"));
    }
}

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::code::ErrorCode;
use crate::config::Severity;
use crate::context::CallContext;
use crate::error::BoxError;

/// Failure chosen explicitly by a handler.
///
/// Its code and message reach the caller exactly as declared.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredFailure {
    pub code: ErrorCode,
    pub message: String,
    /// Diagnostic payload for the logging hook; never sent to the caller.
    pub cause: Option<Value>,
    /// Log severity for this failure, overriding the endpoint's.
    pub severity: Option<Severity>,
}

impl DeclaredFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            severity: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<Value>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Fail(DeclaredFailure),
}

impl<T> Outcome<T> {
    /// Shorthand for `Outcome::Fail(DeclaredFailure::new(code, message))`.
    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Outcome::Fail(DeclaredFailure::new(code, message))
    }
}

/// `Err` is an undeclared fault and is reported as `unknown`.
pub type HandlerResult<T> = Result<Outcome<T>, BoxError>;

/// Endpoint business logic: a validated request plus context in, an
/// [`Outcome`] out.
///
/// Implemented for async functions and closures
/// `Fn(Req, CallContext) -> impl Future<Output = HandlerResult<Res>>`;
/// synchronous functions go through [`sync_handler`].
pub trait Handler<Req, Res>: Send + Sync + 'static {
    fn handle(&self, request: Req, context: CallContext) -> BoxFuture<'static, HandlerResult<Res>>;
}

impl<F, Fut, Req, Res> Handler<Req, Res> for F
where
    F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<Res>> + Send + 'static,
{
    fn handle(&self, request: Req, context: CallContext) -> BoxFuture<'static, HandlerResult<Res>> {
        self(request, context).boxed()
    }
}

/// Adapter running a synchronous function as a [`Handler`].
#[derive(Debug, Clone, Copy)]
pub struct SyncHandler<F>(F);

/// Wrap a synchronous `Fn(Req, CallContext) -> HandlerResult<Res>`.
pub fn sync_handler<F, Req, Res>(f: F) -> SyncHandler<F>
where
    F: Fn(Req, CallContext) -> HandlerResult<Res> + Send + Sync + 'static,
{
    SyncHandler(f)
}

impl<F, Req, Res> Handler<Req, Res> for SyncHandler<F>
where
    F: Fn(Req, CallContext) -> HandlerResult<Res> + Send + Sync + 'static,
    Res: Send + 'static,
{
    fn handle(&self, request: Req, context: CallContext) -> BoxFuture<'static, HandlerResult<Res>> {
        futures_util::future::ready((self.0)(request, context)).boxed()
    }
}

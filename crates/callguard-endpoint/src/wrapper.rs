//! The per-invocation pipeline behind every exported endpoint.

use std::fmt;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use callguard_schema::{EndpointSchema, ValidationError};
use futures_util::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{EndpointConfig, ErrorOverrides, FailureKind, Route};
use crate::context::CallContext;
use crate::error::CallError;
use crate::handler::{Handler, Outcome};
use crate::report::{Cause, ErrorReporter, FailureDetails};

/// Type-erased pipeline entry point.
trait Invoke: Send + Sync {
    fn invoke(
        self: Arc<Self>,
        request: Value,
        context: CallContext,
    ) -> BoxFuture<'static, Result<Value, CallError>>;
}

struct Pipeline<Req, Res, H> {
    schema: EndpointSchema,
    route: Route,
    overrides: ErrorOverrides,
    reporter: ErrorReporter,
    handler: H,
    _types: PhantomData<fn(Req) -> Res>,
}

impl<Req, Res, H> Pipeline<Req, Res, H>
where
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + Send + 'static,
    H: Handler<Req, Res>,
{
    async fn run(&self, request: Value, context: CallContext) -> Result<Value, CallError> {
        if self.route == Route::Private && !context.is_authenticated() {
            let details = FailureDetails::new(request, context);
            return Err(self.fail(FailureKind::Unauthenticated, details).await);
        }

        if let Err(err) = self.schema.validate_request(&request) {
            let details = FailureDetails::new(request, context).with_request_error(err);
            return Err(self.fail(FailureKind::InvalidRequest, details).await);
        }

        // Schema-valid but not decodable into the handler's type: still the
        // caller's fault.
        let typed = match Req::deserialize(&request) {
            Ok(typed) => typed,
            Err(err) => {
                let details = FailureDetails::new(request, context)
                    .with_request_error(ValidationError::new(err.to_string()));
                return Err(self.fail(FailureKind::InvalidRequest, details).await);
            }
        };

        let handler_context = context.clone();
        let handling = async { self.handler.handle(typed, handler_context).await };
        let outcome = AssertUnwindSafe(handling)
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(Outcome::Ok(response))) => response,
            Ok(Ok(Outcome::Fail(failure))) => {
                let mut details = FailureDetails::new(request, context);
                if let Some(cause) = failure.cause {
                    details = details.with_cause(Cause::Declared(cause));
                }
                return Err(self
                    .reporter
                    .report(failure.code, failure.message, details, failure.severity)
                    .await);
            }
            Ok(Err(err)) => {
                let details = FailureDetails::new(request, context).with_cause(Cause::fault(err));
                return Err(self.fail(FailureKind::Unknown, details).await);
            }
            Err(payload) => {
                let details =
                    FailureDetails::new(request, context).with_cause(Cause::panic(payload));
                return Err(self.fail(FailureKind::Unknown, details).await);
            }
        };

        let response = match serde_json::to_value(response) {
            Ok(value) => value,
            Err(err) => {
                let details = FailureDetails::new(request, context)
                    .with_response_error(ValidationError::new(err.to_string()));
                return Err(self.fail(FailureKind::InvalidResponse, details).await);
            }
        };

        if let Err(err) = self.schema.validate_response(&response) {
            let details = FailureDetails::new(request, context).with_response_error(err);
            return Err(self.fail(FailureKind::InvalidResponse, details).await);
        }

        tracing::trace!(endpoint = %self.schema.name(), "endpoint call succeeded");
        Ok(response)
    }

    async fn fail(&self, kind: FailureKind, details: FailureDetails) -> CallError {
        let (code, message) = self.overrides.resolve(kind);
        self.reporter.report(code, message, details, None).await
    }
}

impl<Req, Res, H> Invoke for Pipeline<Req, Res, H>
where
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + Send + 'static,
    H: Handler<Req, Res>,
{
    fn invoke(
        self: Arc<Self>,
        request: Value,
        context: CallContext,
    ) -> BoxFuture<'static, Result<Value, CallError>> {
        async move { self.run(request, context).await }.boxed()
    }
}

/// A wrapped endpoint: JSON request and context in, JSON response or
/// [`CallError`] out.
///
/// Cheap to clone; clones share the same pipeline.
#[derive(Clone)]
pub struct GuardedCallable {
    name: Arc<str>,
    inner: Arc<dyn Invoke>,
}

impl GuardedCallable {
    /// Run the pipeline for one invocation.
    pub fn call(
        &self,
        request: Value,
        context: CallContext,
    ) -> BoxFuture<'static, Result<Value, CallError>> {
        Arc::clone(&self.inner).invoke(request, context)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both handles point at the same pipeline.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for GuardedCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedCallable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Output of [`wrap`]: the callable plus what the registry needs to export it.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    callable: GuardedCallable,
    schema: EndpointSchema,
    config: EndpointConfig,
}

impl EndpointDescriptor {
    /// Endpoint name, taken from the schema.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn callable(&self) -> &GuardedCallable {
        &self.callable
    }

    pub fn schema(&self) -> &EndpointSchema {
        &self.schema
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn is_exportable(&self) -> bool {
        self.config.exportable
    }

    pub fn into_callable(self) -> GuardedCallable {
        self.callable
    }
}

/// Build the guarded pipeline for one endpoint.
///
/// The request is validated against `schema` before it is decoded into
/// `Req`; the handler's `Res` is encoded and validated against the response
/// schema before it is returned. Each failure is reported once through the
/// endpoint's [`ErrorReporter`].
pub fn wrap<Req, Res, H>(
    schema: EndpointSchema,
    config: EndpointConfig,
    handler: H,
) -> EndpointDescriptor
where
    Req: DeserializeOwned + Send + 'static,
    Res: Serialize + Send + 'static,
    H: Handler<Req, Res>,
{
    let name: Arc<str> = Arc::from(schema.name());
    tracing::debug!(endpoint = %name, route = ?config.route, "wrapping endpoint");

    let pipeline = Pipeline {
        schema: schema.clone(),
        route: config.route,
        overrides: config.error_overrides.clone(),
        reporter: ErrorReporter::new(schema.name(), &config),
        handler,
        _types: PhantomData::<fn(Req) -> Res>,
    };

    EndpointDescriptor {
        callable: GuardedCallable {
            name,
            inner: Arc::new(pipeline),
        },
        schema,
        config,
    }
}

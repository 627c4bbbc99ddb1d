//! Guarded RPC endpoints.
//!
//! [`wrap`] turns a typed handler into a [`GuardedCallable`] that runs a
//! fixed pipeline per invocation:
//!
//! 1. authorization gate (private routes need an authenticated identity)
//! 2. request schema validation
//! 3. handler execution (sync or async, faults and panics captured)
//! 4. declared-failure passthrough
//! 5. response schema validation
//!
//! Any failure is logged once through the endpoint's [`ErrorReporter`] and
//! surfaces to the caller as a bare [`CallError`] `{code, message}`.
//!
//! Wrapped endpoints are collected in an [`EndpointRegistry`] during start-up
//! and exported once into the name-keyed [`ExportedEndpoints`] map the
//! hosting runtime serves.

pub mod code;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod registry;
pub mod report;
pub mod wrapper;

pub use code::ErrorCode;
pub use config::{
    EndpointConfig, ErrorLogging, ErrorOverride, ErrorOverrides, FailureKind, Route, Severity,
    TransportOptions,
};
pub use context::{AuthIdentity, CallContext};
pub use error::{BoxError, CallError, RegistryError, Result};
pub use handler::{sync_handler, DeclaredFailure, Handler, HandlerResult, Outcome, SyncHandler};
pub use registry::{EndpointRegistry, ExportedEndpoint, ExportedEndpoints};
pub use report::{
    Cause, ErrorReporter, FailureDetails, FailureReport, LogRecord, LogSink, LoggingHook,
    TracingSink,
};
pub use wrapper::{wrap, EndpointDescriptor, GuardedCallable};

pub use callguard_schema::{EndpointSchema, ValidationError};

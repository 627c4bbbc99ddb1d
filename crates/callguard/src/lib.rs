//! Guarded RPC endpoints.
//!
//! callguard wraps endpoint handlers in a fixed pipeline: authorization
//! gate, request schema validation, handler execution, declared-failure
//! passthrough and response schema validation. Every failure is logged once
//! and reaches the caller as a bare `{code, message}`.
//!
//! # Crate Structure
//!
//! - [`schema`]: validators, exact-shape JSON Schema compilation, schema catalogs
//! - [`endpoint`]: error codes, endpoint config, the wrapper and the registry
//!
//! # Example
//!
//! ```
//! use callguard::endpoint::{
//!     wrap, CallContext, EndpointConfig, EndpointRegistry, HandlerResult, Outcome,
//! };
//! use callguard::schema::EndpointSchema;
//! use serde_json::json;
//!
//! async fn echo(request: String, _ctx: CallContext) -> HandlerResult<String> {
//!     Ok(Outcome::Ok(request))
//! }
//!
//! let schema = EndpointSchema::from_json(
//!     "echo",
//!     &json!({"type": "string"}),
//!     &json!({"type": "string"}),
//! )
//! .unwrap();
//!
//! let mut registry = EndpointRegistry::new();
//! registry.register(wrap(schema, EndpointConfig::public(), echo));
//! let exported = registry.freeze().unwrap();
//! assert_eq!(exported.names().collect::<Vec<_>>(), ["echo"]);
//! ```

/// Re-export schema types.
pub mod schema {
    pub use callguard_schema::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use callguard_endpoint::*;
}

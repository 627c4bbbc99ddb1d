//! Request and response validation for guarded endpoints.
//!
//! Every endpoint carries a pair of validators: one for the payload a
//! caller sends, one for the payload the handler returns. Validators are
//! consumed through the [`Validate`] contract so any engine can sit behind
//! them; [`JsonSchemaValidator`] is the bundled JSON Schema implementation.
//!
//! Response validators default to exact-shape ("strict") mode, which
//! rejects objects carrying fields the schema does not declare.

pub mod catalog;
pub mod config;
pub mod error;
pub mod schema;
mod strict;
pub mod validator;

pub use catalog::SchemaCatalog;
pub use config::SchemaConfig;
pub use error::{Result, SchemaError};
pub use schema::EndpointSchema;
pub use validator::{AcceptAny, JsonSchemaValidator, Validate, ValidationError};

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::Result;
use crate::validator::{JsonSchemaValidator, Validate, ValidationError};

/// The request/response contract of one endpoint, keyed by its unique name.
///
/// Immutable once constructed; clones share the underlying validators.
#[derive(Clone)]
pub struct EndpointSchema {
    name: String,
    request: Arc<dyn Validate>,
    response: Arc<dyn Validate>,
}

impl EndpointSchema {
    /// Build a schema from arbitrary validators.
    pub fn new(
        name: impl Into<String>,
        request: impl Validate + 'static,
        response: impl Validate + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            request: Arc::new(request),
            response: Arc::new(response),
        }
    }

    /// Compile a JSON Schema pair with the default config
    /// (permissive requests, exact-shape responses).
    pub fn from_json(name: impl Into<String>, request: &Value, response: &Value) -> Result<Self> {
        Self::from_json_with_config(name, request, response, &SchemaConfig::default())
    }

    /// Compile a JSON Schema pair with explicit strictness settings.
    pub fn from_json_with_config(
        name: impl Into<String>,
        request: &Value,
        response: &Value,
        config: &SchemaConfig,
    ) -> Result<Self> {
        let request = JsonSchemaValidator::compile_with(request, config.strict_requests)?;
        let response = JsonSchemaValidator::compile_with(response, config.strict_responses)?;
        Ok(Self::new(name, request, response))
    }

    /// Endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate an incoming request payload.
    pub fn validate_request(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        self.request.validate(value)
    }

    /// Validate an outgoing response payload.
    pub fn validate_response(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        self.response.validate(value)
    }
}

impl fmt::Debug for EndpointSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

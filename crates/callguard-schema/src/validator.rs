use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::strict::close_object_schemas;

/// Issues beyond this count are dropped from a [`ValidationError`].
const MAX_REPORTED_ISSUES: usize = 4;

/// Structured result of a failed validation.
///
/// Carried to logging hooks only; never part of a caller-visible error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl ValidationError {
    /// Single-issue error.
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }

    /// Collect issues, keeping at most the first few.
    pub fn from_issues<I, S>(issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issues: issues
                .into_iter()
                .take(MAX_REPORTED_ISSUES)
                .map(Into::into)
                .collect(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.issues.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// A payload validator: `validate(value) -> ok | error`.
pub trait Validate: Send + Sync {
    fn validate(&self, value: &Value) -> std::result::Result<(), ValidationError>;
}

impl<F> Validate for F
where
    F: Fn(&Value) -> std::result::Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        self(value)
    }
}

/// Accepts every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAny;

impl Validate for AcceptAny {
    fn validate(&self, _value: &Value) -> std::result::Result<(), ValidationError> {
        Ok(())
    }
}

/// Compiled JSON Schema validator.
pub struct JsonSchemaValidator {
    compiled: jsonschema::Validator,
    strict: bool,
}

impl JsonSchemaValidator {
    /// Compile a schema that accepts undeclared object fields.
    pub fn compile(schema: &Value) -> Result<Self> {
        Self::compile_with(schema, false)
    }

    /// Compile a schema in exact-shape mode.
    pub fn compile_strict(schema: &Value) -> Result<Self> {
        Self::compile_with(schema, true)
    }

    /// Compile a schema, closing object schemas first when `strict` is set.
    pub fn compile_with(schema: &Value, strict: bool) -> Result<Self> {
        let compiled = if strict {
            let mut closed = schema.clone();
            close_object_schemas(&mut closed);
            jsonschema::validator_for(&closed)
        } else {
            jsonschema::validator_for(schema)
        };
        let compiled = compiled.map_err(|err| SchemaError::CompileFailed(err.to_string()))?;

        Ok(Self { compiled, strict })
    }

    /// Parse and compile a schema from a JSON string.
    pub fn from_json_str(schema_json: &str, strict: bool) -> Result<Self> {
        let schema: Value = serde_json::from_str(schema_json)?;
        Self::compile_with(&schema, strict)
    }

    /// Whether this validator rejects undeclared object fields.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Validate for JsonSchemaValidator {
    fn validate(&self, value: &Value) -> std::result::Result<(), ValidationError> {
        let mut errors = self.compiled.iter_errors(value).peekable();
        if errors.peek().is_none() {
            return Ok(());
        }
        Err(ValidationError::from_issues(errors.map(|err| err.to_string())))
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

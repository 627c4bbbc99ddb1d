/// Errors raised while loading or compiling endpoint schemas.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema file or directory could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),

    /// The schema document is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Only one half of an endpoint's request/response pair was found.
    #[error("endpoint '{name}' is missing its {missing} schema")]
    IncompleteSchema { name: String, missing: &'static str },

    /// No schema registered for the given endpoint.
    #[error("no schema registered for endpoint '{0}'")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

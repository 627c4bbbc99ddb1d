/// Controls how endpoint schemas are compiled and loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaConfig {
    /// When true, request schemas reject additional properties not in the schema.
    pub strict_requests: bool,
    /// When true, response schemas reject additional properties not in the schema.
    pub strict_responses: bool,
    /// When true, catalog lookups for unknown endpoints return `SchemaError::NoSchema`.
    pub fail_on_missing_schema: bool,
    /// Maximum number of schema files loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            strict_requests: false,
            strict_responses: true,
            fail_on_missing_schema: false,
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}

use std::collections::BTreeMap;
use std::fs::{File, Metadata};
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::{Result, SchemaError};
use crate::schema::EndpointSchema;

const REQUEST_SUFFIX: &str = ".request.schema.json";
const RESPONSE_SUFFIX: &str = ".response.schema.json";
const SCHEMA_SUFFIX: &str = ".schema.json";

/// Which half of an endpoint contract a schema file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Request,
    Response,
}

#[derive(Default)]
struct PendingPair {
    request: Option<Value>,
    response: Option<Value>,
}

/// Name-keyed collection of compiled endpoint schemas.
pub struct SchemaCatalog {
    schemas: BTreeMap<String, EndpointSchema>,
    config: SchemaConfig,
}

impl SchemaCatalog {
    /// Create an empty catalog with default config.
    pub fn new() -> Self {
        Self::with_config(SchemaConfig::default())
    }

    /// Create an empty catalog with explicit config.
    pub fn with_config(config: SchemaConfig) -> Self {
        Self {
            schemas: BTreeMap::new(),
            config,
        }
    }

    /// Register an endpoint from request and response schema JSON strings.
    pub fn register(&mut self, name: &str, request_json: &str, response_json: &str) -> Result<()> {
        let request: Value = serde_json::from_str(request_json)?;
        let response: Value = serde_json::from_str(response_json)?;
        self.register_value(name, &request, &response)
    }

    /// Register an endpoint from request and response schema values.
    pub fn register_value(&mut self, name: &str, request: &Value, response: &Value) -> Result<()> {
        let schema = EndpointSchema::from_json_with_config(name, request, response, &self.config)?;
        if self.schemas.insert(name.to_string(), schema).is_some() {
            tracing::debug!(endpoint = name, "replaced catalog schema");
        }
        Ok(())
    }

    /// Load from embedded `(name, request, response)` schema strings.
    pub fn from_embedded(schemas: &[(&str, &str, &str)]) -> Result<Self> {
        let mut catalog = Self::new();
        for (name, request, response) in schemas {
            catalog.register(name, request, response)?;
        }
        Ok(catalog)
    }

    /// Load `<name>.request.schema.json` / `<name>.response.schema.json` pairs
    /// from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, SchemaConfig::default())
    }

    /// Load schema pairs from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: SchemaConfig) -> Result<Self> {
        let mut catalog = Self::with_config(config);
        let mut pending: BTreeMap<String, PendingPair> = BTreeMap::new();
        let mut loaded_files = 0usize;

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let looks_like_schema = file_name.to_ascii_lowercase().ends_with(SCHEMA_SUFFIX);

            let entry_path = entry.path();
            let link_metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_type = link_metadata.file_type();

            if file_type.is_symlink() {
                if looks_like_schema {
                    return Err(SchemaError::LoadFailed(format!(
                        "refusing to load schema symlink: {file_name}"
                    )));
                }
                continue;
            }
            if !file_type.is_file() || !looks_like_schema {
                continue;
            }

            let Some((name, half)) = parse_schema_file_name(&file_name) else {
                return Err(SchemaError::LoadFailed(format!(
                    "unrecognized schema filename: {file_name}"
                )));
            };

            loaded_files = loaded_files.saturating_add(1);
            if loaded_files > catalog.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({}): {loaded_files}",
                    catalog.config.max_schemas_from_directory
                )));
            }

            let content = read_capped(
                &entry_path,
                &link_metadata,
                catalog.config.max_schema_file_size,
            )?;
            let value: Value = serde_json::from_str(&content)?;

            let pair = pending.entry(name.to_string()).or_default();
            match half {
                Half::Request => pair.request = Some(value),
                Half::Response => pair.response = Some(value),
            }
        }

        for (name, pair) in pending {
            match (pair.request, pair.response) {
                (Some(request), Some(response)) => {
                    catalog.register_value(&name, &request, &response)?;
                }
                (None, _) => {
                    return Err(SchemaError::IncompleteSchema {
                        name,
                        missing: "request",
                    })
                }
                (_, None) => {
                    return Err(SchemaError::IncompleteSchema {
                        name,
                        missing: "response",
                    })
                }
            }
        }

        tracing::debug!(
            directory = %path.display(),
            endpoints = catalog.schemas.len(),
            "loaded schema catalog"
        );
        Ok(catalog)
    }

    /// Look up an endpoint schema.
    ///
    /// Unknown names yield `Ok(None)`, or `SchemaError::NoSchema` when
    /// `fail_on_missing_schema` is set.
    pub fn get(&self, name: &str) -> Result<Option<&EndpointSchema>> {
        match self.schemas.get(name) {
            Some(schema) => Ok(Some(schema)),
            None if self.config.fail_on_missing_schema => {
                Err(SchemaError::NoSchema(name.to_string()))
            }
            None => Ok(None),
        }
    }

    /// Check if an endpoint has a registered schema.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Endpoint names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Number of endpoints in the catalog.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the catalog holds no endpoints.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Catalog configuration.
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_schema_file_name(file_name: &str) -> Option<(&str, Half)> {
    let lower = file_name.to_ascii_lowercase();
    let (suffix_len, half) = if lower.ends_with(REQUEST_SUFFIX) {
        (REQUEST_SUFFIX.len(), Half::Request)
    } else if lower.ends_with(RESPONSE_SUFFIX) {
        (RESPONSE_SUFFIX.len(), Half::Response)
    } else {
        return None;
    };

    let name = &file_name[..file_name.len() - suffix_len];
    if name.is_empty() {
        return None;
    }
    Some((name, half))
}

fn read_capped(path: &Path, link_metadata: &Metadata, max_bytes: usize) -> Result<String> {
    let file = File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let opened_metadata = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

    #[cfg(unix)]
    {
        if !same_file_identity(link_metadata, &opened_metadata) {
            return Err(SchemaError::LoadFailed(format!(
                "schema file changed during load: {}",
                path.display()
            )));
        }
    }
    #[cfg(not(unix))]
    let _ = link_metadata;

    if opened_metadata.len() > max_bytes as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({} bytes): {}",
            opened_metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file grew past limit while reading: {}",
            path.display()
        )));
    }
    Ok(content)
}

#[cfg(unix)]
fn same_file_identity(link_metadata: &Metadata, opened_metadata: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    link_metadata.dev() == opened_metadata.dev() && link_metadata.ino() == opened_metadata.ino()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    const STRING_SCHEMA: &str = r#"{"type":"string"}"#;
    const OBJECT_SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "name": { "type": "string" }
        },
        "required": ["id", "name"]
    }"#;

    fn make_temp_schema_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "callguard-schema-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_schema(dir: &Path, file_name: &str, contents: &str) {
        std::fs::write(dir.join(file_name), contents.as_bytes()).unwrap();
    }

    fn write_pair(dir: &Path, name: &str, request: &str, response: &str) {
        write_schema(dir, &format!("{name}.request.schema.json"), request);
        write_schema(dir, &format!("{name}.response.schema.json"), response);
    }

    #[test]
    fn register_and_lookup() {
        let mut catalog = SchemaCatalog::new();
        catalog.register("echo", STRING_SCHEMA, STRING_SCHEMA).unwrap();

        let schema = catalog.get("echo").unwrap().unwrap();
        assert!(schema.validate_request(&json!("hi")).is_ok());
        assert!(schema.validate_request(&json!(42)).is_err());
        assert!(catalog.contains("echo"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn missing_schema_permissive_and_strict() {
        let permissive = SchemaCatalog::new();
        assert!(permissive.get("nope").unwrap().is_none());

        let strict = SchemaCatalog::with_config(SchemaConfig {
            fail_on_missing_schema: true,
            ..SchemaConfig::default()
        });
        assert!(matches!(strict.get("nope"), Err(SchemaError::NoSchema(name)) if name == "nope"));
    }

    #[test]
    fn from_embedded_loads_sorted_names() {
        let catalog = SchemaCatalog::from_embedded(&[
            ("zeta", STRING_SCHEMA, STRING_SCHEMA),
            ("alpha", OBJECT_SCHEMA, OBJECT_SCHEMA),
        ])
        .unwrap();

        assert_eq!(catalog.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn embedded_invalid_schema_fails_compile() {
        let result = SchemaCatalog::from_embedded(&[("bad", r#"{"type":"nope"}"#, STRING_SCHEMA)]);
        assert!(matches!(result, Err(SchemaError::CompileFailed(_))));
    }

    #[test]
    fn from_directory_loads_pairs_with_exact_shape_responses() {
        let dir = make_temp_schema_dir("pairs");
        write_pair(&dir, "lookup", OBJECT_SCHEMA, OBJECT_SCHEMA);
        write_pair(&dir, "echo", STRING_SCHEMA, STRING_SCHEMA);
        write_schema(&dir, "README.md", "not a schema");

        let catalog = SchemaCatalog::from_directory(&dir).unwrap();
        assert_eq!(catalog.names(), vec!["echo", "lookup"]);

        let lookup = catalog.get("lookup").unwrap().unwrap();
        let extra = json!({"id": 1, "name": "n", "extra": true});
        assert!(lookup.validate_request(&extra).is_ok());
        assert!(lookup.validate_response(&extra).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn half_pair_is_rejected() {
        let dir = make_temp_schema_dir("half-pair");
        write_schema(&dir, "lonely.request.schema.json", STRING_SCHEMA);

        let result = SchemaCatalog::from_directory(&dir);
        assert!(matches!(
            result,
            Err(SchemaError::IncompleteSchema { ref name, missing: "response" }) if name == "lonely"
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_schema_file_name_errors() {
        let dir = make_temp_schema_dir("unknown-name");
        write_schema(&dir, "foo.schema.json", STRING_SCHEMA);

        let result = SchemaCatalog::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_errors() {
        let dir = make_temp_schema_dir("missing").join("does-not-exist");
        assert!(matches!(
            SchemaCatalog::from_directory(&dir),
            Err(SchemaError::LoadFailed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_schema_is_rejected() {
        let dir = make_temp_schema_dir("symlink-schema");
        let target = dir.join("target.json");
        std::fs::write(&target, STRING_SCHEMA.as_bytes()).unwrap();
        write_schema(&dir, "echo.request.schema.json", STRING_SCHEMA);
        std::os::unix::fs::symlink(&target, dir.join("echo.response.schema.json")).unwrap();

        let result = SchemaCatalog::from_directory(&dir);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_count_limit_is_enforced() {
        let dir = make_temp_schema_dir("count-limit");
        write_pair(&dir, "echo", STRING_SCHEMA, STRING_SCHEMA);

        let config = SchemaConfig {
            max_schemas_from_directory: 1,
            ..SchemaConfig::default()
        };
        let result = SchemaCatalog::from_directory_with_config(&dir, config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_file_size_limit_is_enforced() {
        let dir = make_temp_schema_dir("size-limit");
        write_pair(&dir, "lookup", OBJECT_SCHEMA, OBJECT_SCHEMA);

        let config = SchemaConfig {
            max_schema_file_size: 8,
            ..SchemaConfig::default()
        };
        let result = SchemaCatalog::from_directory_with_config(&dir, config);
        assert!(matches!(result, Err(SchemaError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn parses_schema_file_names() {
        assert_eq!(
            parse_schema_file_name("echo.request.schema.json"),
            Some(("echo", Half::Request))
        );
        assert_eq!(
            parse_schema_file_name("get-user.Response.Schema.json"),
            Some(("get-user", Half::Response))
        );
        assert_eq!(parse_schema_file_name(".request.schema.json"), None);
        assert_eq!(parse_schema_file_name("echo.schema.json"), None);
    }
}

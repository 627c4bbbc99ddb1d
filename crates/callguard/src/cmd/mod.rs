use std::path::PathBuf;

use callguard_schema::{SchemaCatalog, SchemaConfig};
use clap::{ArgGroup, Args, Subcommand};
use serde_json::Value;

use crate::exit::{schema_error, usage, CliResult};
use crate::output::OutputFormat;

pub mod check;
pub mod probe;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a schema directory and list its endpoints.
    Check(CheckArgs),
    /// Validate one payload against an endpoint schema.
    Validate(ValidateArgs),
    /// Run a payload through the full guarded pipeline.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Check(args) => check::run(args, format),
        Command::Validate(args) => validate::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Directory of `<name>.request.schema.json` / `<name>.response.schema.json` pairs.
    pub dir: PathBuf,
    /// Reject unknown properties in requests too.
    #[arg(long)]
    pub strict_requests: bool,
    /// Allow unknown properties in responses.
    #[arg(long)]
    pub lenient_responses: bool,
}

impl SchemaArgs {
    pub fn config(&self) -> SchemaConfig {
        SchemaConfig {
            strict_requests: self.strict_requests,
            strict_responses: !self.lenient_responses,
            fail_on_missing_schema: true,
            ..SchemaConfig::default()
        }
    }

    pub fn load(&self) -> CliResult<SchemaCatalog> {
        SchemaCatalog::from_directory_with_config(&self.dir, self.config()).map_err(|err| {
            schema_error(&format!("failed loading {}", self.dir.display()), err)
        })
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["request", "response"])))]
pub struct ValidateArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,
    /// Endpoint name.
    pub endpoint: String,
    /// JSON request payload.
    #[arg(long, value_name = "JSON")]
    pub request: Option<String>,
    /// JSON response payload.
    #[arg(long, value_name = "JSON")]
    pub response: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,
    /// Endpoint name.
    pub endpoint: String,
    /// JSON request payload.
    #[arg(long, value_name = "JSON", default_value = "null")]
    pub request: String,
    /// Serve the endpoint on a public route.
    #[arg(long)]
    pub public: bool,
    /// Call as this authenticated uid.
    #[arg(long, value_name = "UID")]
    pub uid: Option<String>,
    /// Fixed handler response. Default: echo the request.
    #[arg(long, value_name = "JSON")]
    pub response: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_json(flag: &str, input: &str) -> CliResult<Value> {
    serde_json::from_str(input).map_err(|err| usage(format!("{flag} is not valid JSON: {err}")))
}

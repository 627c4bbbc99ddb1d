use serde::Serialize;

use crate::cmd::CheckArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print, OutputFormat, Render};

#[derive(Debug, Serialize)]
struct CheckOutput {
    directory: String,
    strict_requests: bool,
    strict_responses: bool,
    endpoints: Vec<String>,
}

impl Render for CheckOutput {
    fn header(&self) -> Vec<&'static str> {
        vec!["ENDPOINT", "REQUEST", "RESPONSE"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.endpoints
            .iter()
            .map(|name| {
                vec![
                    name.clone(),
                    mode(self.strict_requests).to_string(),
                    mode(self.strict_responses).to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> String {
        format!(
            "{} endpoint schema(s) in {}",
            self.endpoints.len(),
            self.directory
        )
    }
}

fn mode(strict: bool) -> &'static str {
    if strict {
        "exact"
    } else {
        "permissive"
    }
}

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = args.schemas.load()?;
    tracing::debug!(count = catalog.len(), "schema catalog loaded");

    let output = CheckOutput {
        directory: args.schemas.dir.display().to_string(),
        strict_requests: catalog.config().strict_requests,
        strict_responses: catalog.config().strict_responses,
        endpoints: catalog.names().into_iter().map(str::to_string).collect(),
    };
    print(&output, format);
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_show_validation_mode() {
        let output = CheckOutput {
            directory: "/tmp/x".to_string(),
            strict_requests: false,
            strict_responses: true,
            endpoints: vec!["echo".to_string()],
        };
        assert_eq!(output.rows(), vec![vec!["echo", "permissive", "exact"]]);
        assert_eq!(output.summary(), "1 endpoint schema(s) in /tmp/x");
    }
}

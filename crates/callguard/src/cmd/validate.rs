use serde::Serialize;

use crate::cmd::{parse_json, ValidateArgs};
use crate::exit::{schema_error, usage, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print, OutputFormat, Render};

#[derive(Debug, Serialize)]
struct ValidateOutput {
    endpoint: String,
    target: &'static str,
    valid: bool,
    issues: Vec<String>,
}

impl Render for ValidateOutput {
    fn header(&self) -> Vec<&'static str> {
        vec!["ENDPOINT", "TARGET", "VALID", "ISSUE"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        if self.issues.is_empty() {
            return vec![vec![
                self.endpoint.clone(),
                self.target.to_string(),
                "yes".to_string(),
                String::new(),
            ]];
        }
        self.issues
            .iter()
            .map(|issue| {
                vec![
                    self.endpoint.clone(),
                    self.target.to_string(),
                    "no".to_string(),
                    issue.clone(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> String {
        let verdict = if self.valid { "valid" } else { "invalid" };
        format!("{} {}: {verdict}", self.endpoint, self.target)
    }
}

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let catalog = args.schemas.load()?;
    let schema = catalog
        .get(&args.endpoint)
        .map_err(|err| schema_error("lookup failed", err))?
        .ok_or_else(|| usage(format!("unknown endpoint '{}'", args.endpoint)))?;

    let (target, result) = match (&args.request, &args.response) {
        (Some(request), _) => (
            "request",
            schema.validate_request(&parse_json("--request", request)?),
        ),
        (None, Some(response)) => (
            "response",
            schema.validate_response(&parse_json("--response", response)?),
        ),
        (None, None) => return Err(usage("one of --request or --response is required")),
    };

    let output = ValidateOutput {
        endpoint: args.endpoint,
        target,
        valid: result.is_ok(),
        issues: result.err().map(|err| err.issues).unwrap_or_default(),
    };
    print(&output, format);

    if output.valid {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_issue() {
        let output = ValidateOutput {
            endpoint: "echo".to_string(),
            target: "request",
            valid: false,
            issues: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(output.rows().len(), 2);
        assert_eq!(output.summary(), "echo request: invalid");
    }
}

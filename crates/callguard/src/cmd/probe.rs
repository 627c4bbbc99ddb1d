use std::sync::{Arc, Mutex};

use callguard_endpoint::{
    wrap, CallContext, CallError, EndpointConfig, EndpointRegistry, Handler, HandlerResult,
    LogRecord, LogSink, Outcome, Route, Severity, TracingSink,
};
use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;

use crate::cmd::{parse_json, ProbeArgs};
use crate::exit::{
    call_error_code, registry_error, schema_error, usage, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::output::{json_cell, print, OutputFormat, Render};

/// Echoes the request, or answers with a fixed response.
struct ProbeHandler {
    response: Option<Value>,
}

impl Handler<Value, Value> for ProbeHandler {
    fn handle(
        &self,
        request: Value,
        _context: CallContext,
    ) -> BoxFuture<'static, HandlerResult<Value>> {
        let response = self.response.clone().unwrap_or(request);
        futures_util::future::ready(Ok(Outcome::Ok(response))).boxed()
    }
}

/// Keeps the last failure record for the report and forwards it to tracing.
#[derive(Default)]
struct ProbeSink {
    last: Mutex<Option<LogRecord>>,
}

impl ProbeSink {
    fn take(&self) -> Option<LogRecord> {
        self.last.lock().ok().and_then(|mut last| last.take())
    }
}

impl LogSink for ProbeSink {
    fn write(&self, severity: Severity, record: &LogRecord) {
        TracingSink.write(severity, record);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(record.clone());
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeOutput {
    endpoint: String,
    route: Route,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<CallError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logged: Option<LogRecord>,
}

impl Render for ProbeOutput {
    fn header(&self) -> Vec<&'static str> {
        vec!["ENDPOINT", "ROUTE", "RESULT", "DETAIL"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let route = format!("{:?}", self.route).to_lowercase();
        let (result, detail) = match (&self.response, &self.error) {
            (Some(response), _) => ("ok".to_string(), json_cell(response)),
            (None, Some(err)) => (err.code.to_string(), err.message.clone()),
            (None, None) => ("ok".to_string(), String::new()),
        };
        let mut rows = vec![vec![self.endpoint.clone(), route.clone(), result, detail]];
        if let Some(record) = &self.logged {
            rows.push(vec![
                self.endpoint.clone(),
                route,
                "logged".to_string(),
                json_cell(&record.details),
            ]);
        }
        rows
    }

    fn summary(&self) -> String {
        match &self.error {
            None => format!("{}: ok", self.endpoint),
            Some(err) => format!("{}: {err}", self.endpoint),
        }
    }
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let request = parse_json("--request", &args.request)?;
    let fixed = args
        .response
        .as_deref()
        .map(|response| parse_json("--response", response))
        .transpose()?;

    let catalog = args.schemas.load()?;
    let schema = catalog
        .get(&args.endpoint)
        .map_err(|err| schema_error("lookup failed", err))?
        .ok_or_else(|| usage(format!("unknown endpoint '{}'", args.endpoint)))?
        .clone();

    let sink = Arc::new(ProbeSink::default());
    let route = if args.public {
        Route::Public
    } else {
        Route::Private
    };
    let config = EndpointConfig::new(route).with_log_sink(sink.clone());

    let mut registry = EndpointRegistry::new();
    registry.register(wrap(schema, config, ProbeHandler { response: fixed }));
    let exported = registry
        .freeze()
        .map_err(|err| registry_error("export failed", err))?;

    let context = match &args.uid {
        Some(uid) => CallContext::authenticated(uid.as_str()),
        None => CallContext::anonymous(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))?;
    let result = runtime.block_on(exported.call(&args.endpoint, request, context));

    let exit_code = match &result {
        Ok(_) => SUCCESS,
        Err(err) => call_error_code(err),
    };
    let (response, error) = match result {
        Ok(response) => (Some(response), None),
        Err(err) => (None, Some(err)),
    };
    let output = ProbeOutput {
        endpoint: args.endpoint,
        route,
        ok: error.is_none(),
        response,
        error,
        logged: sink.take(),
    };
    print(&output, format);

    Ok(exit_code)
}

//! Two endpoints in one registry, called the way a hosting runtime would.
//!
//! Run with:
//!   cargo run --example echo-endpoint

use callguard::endpoint::{
    wrap, CallContext, EndpointConfig, EndpointRegistry, ErrorCode, ErrorOverride, FailureKind,
    HandlerResult, LoggingHook, Outcome,
};
use callguard::schema::EndpointSchema;
use serde_json::{json, Value};

async fn echo(request: String, _ctx: CallContext) -> HandlerResult<String> {
    Ok(Outcome::Ok(request))
}

async fn balance(_request: Value, ctx: CallContext) -> HandlerResult<Value> {
    match ctx.uid() {
        Some("frozen") => Ok(Outcome::fail(ErrorCode::FailedPrecondition, "account frozen")),
        Some(uid) => Ok(Outcome::Ok(json!({"uid": uid, "cents": 1250}))),
        None => Err("identity missing after auth gate".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let echo_schema = EndpointSchema::from_json(
        "echo",
        &json!({"type": "string"}),
        &json!({"type": "string"}),
    )?;
    let balance_schema = EndpointSchema::from_json(
        "balance",
        &json!({"type": "null"}),
        &json!({
            "type": "object",
            "properties": {"uid": {"type": "string"}, "cents": {"type": "integer"}},
            "required": ["uid", "cents"]
        }),
    )?;

    // Redact the request before anything is logged.
    let redact = LoggingHook::sync(|report| {
        Ok(json!({"code": report.code, "uid": report.details.context.uid()}))
    });

    let mut registry = EndpointRegistry::new();
    registry
        .register(wrap(echo_schema, EndpointConfig::public(), echo))
        .register(wrap(
            balance_schema,
            EndpointConfig::private()
                .with_logging_hook(redact)
                .with_override(
                    FailureKind::Unauthenticated,
                    ErrorOverride::new(ErrorCode::PermissionDenied, "sign in to see your balance"),
                ),
            balance,
        ));
    let exported = registry.freeze()?;

    let calls = [
        ("echo", json!("hi"), CallContext::anonymous()),
        ("echo", json!(42), CallContext::anonymous()),
        ("balance", json!(null), CallContext::anonymous()),
        ("balance", json!(null), CallContext::authenticated("ada")),
        ("balance", json!(null), CallContext::authenticated("frozen")),
        ("missing", json!(null), CallContext::anonymous()),
    ];
    for (name, request, ctx) in calls {
        match exported.call(name, request.clone(), ctx).await {
            Ok(response) => println!("{name}({request}) -> {response}"),
            Err(err) => println!("{name}({request}) -> error {err}"),
        }
    }
    Ok(())
}

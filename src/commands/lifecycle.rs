//! The six lifecycle subcommands
//!
//! Each reads one JSON request document, routes it to the resource named by
//! its `type` (or `urn`) and prints the JSON response on stdout.

use anyhow::{Context as _, Result, bail};
use serde::Serialize;
use serde_json::Value as Json;

use reconcile::{CallContext, Envelope, Failure, LifecycleResponse, Operation, Registry};

use crate::Context;
use crate::cli::RequestArgs;
use crate::config::Settings;

/// Run one lifecycle operation
pub fn run(ctx: &Context, operation: Operation, args: &RequestArgs) -> Result<()> {
    let document = super::read_input(args.input.as_deref())?;
    let envelope = parse_request(operation, &document)?;

    let settings = Settings::resolve(&ctx.service)?;
    let registry = super::connect(&settings, operation.is_remote())?;
    let call = CallContext::with_timeout(settings.timeout);

    match respond(&registry, &call, envelope) {
        Ok(response) => print_json(&response, args.pretty),
        Err(failure) => {
            print_json(&failure, args.pretty)?;
            bail!("{operation} failed: {}", failure.error)
        }
    }
}

/// Build an envelope from a request document, tagging it with `operation`
pub(crate) fn parse_request(operation: Operation, document: &str) -> Result<Envelope> {
    let mut request: Json =
        serde_json::from_str(document).context("Request is not valid JSON")?;
    let Some(fields) = request.as_object_mut() else {
        bail!("Request must be a JSON object");
    };

    let op = operation.as_str();
    match fields.get("op").and_then(Json::as_str) {
        Some(given) if given != op => {
            bail!("Request is for {given} but the {op} command was used")
        }
        Some(_) => {}
        None => {
            fields.insert("op".to_string(), Json::from(op));
        }
    }

    serde_json::from_value(request).with_context(|| format!("Invalid {op} request"))
}

/// Dispatch and turn any error into its serializable form
pub(crate) fn respond(
    registry: &Registry,
    call: &CallContext,
    envelope: Envelope,
) -> std::result::Result<LifecycleResponse, Failure> {
    registry.dispatch(call, envelope).map_err(|err| {
        let failure = Failure::from(&err);
        if let Some(partial) = &failure.partial {
            log::warn!("{err}; recording partial state for {}", partial.id);
        }
        failure
    })
}

pub(crate) fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

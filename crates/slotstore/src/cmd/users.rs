use serde_json::{json, Value};
use slotstore::gateway::{GatewayClient, GatewayResponse};

use crate::cmd::{parse_duration, UsersAction, UsersArgs};
use crate::exit::{gateway_error, status_error, CliResult, SUCCESS};
use crate::output::{print_body, OutputFormat};

pub fn run(args: UsersArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut client = GatewayClient::connect(&args.socket, Some(timeout))
        .map_err(|err| gateway_error("connect failed", err))?;

    let (action, payload) = request_for(args.action);
    let response = client
        .call(action, payload)
        .map_err(|err| gateway_error("call failed", err))?;

    report(&response, format)
}

/// Gateway action and payload for a subcommand. JSON bodies are passed on
/// as raw text.
fn request_for(action: UsersAction) -> (&'static str, Value) {
    match action {
        UsersAction::List => ("getAll", Value::Null),
        UsersAction::Get { id } => ("get", json!({ "id": id })),
        UsersAction::Create { json } => ("create", Value::String(json)),
        UsersAction::Update { id, json } => ("update", json!({ "id": id, "data": json })),
        UsersAction::Delete { id } => ("delete", json!({ "id": id })),
    }
}

fn report(response: &GatewayResponse, format: OutputFormat) -> CliResult<i32> {
    if !response.is_success() {
        return Err(status_error(response));
    }
    print_body(&response.body, format);
    Ok(SUCCESS)
}

use std::time::Duration;

use lexroute_core::{AdapterId, CitationFormat};
use serde_json::json;

use crate::cli::CiteArgs;
use crate::error::CliError;

use super::{attempts_json, CommandResult, Runtime};

pub async fn run(args: &CiteArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let adapter = AdapterId::parse(&args.adapter)?;
    let format = args.format.parse::<CitationFormat>()?;
    let id = args.id.trim();
    if id.is_empty() {
        return Err(CliError::Command(String::from("document id must not be empty")));
    }

    let timeout = args.timeout_ms.map(Duration::from_millis);
    let success = runtime
        .dispatcher
        .get_citation(&adapter, id, format, timeout)
        .await?;

    Ok(CommandResult::ok(json!({
        "adapter": success.served_by,
        "id": id,
        "format": format,
        "citation": success.data,
        "attempts": attempts_json(&success.attempts),
    })))
}

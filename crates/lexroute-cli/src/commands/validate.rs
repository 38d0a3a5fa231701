use lexroute_core::AdapterId;
use serde_json::json;

use crate::cli::ValidateArgs;
use crate::error::CliError;

use super::{CommandResult, Runtime};

pub async fn run(args: &ValidateArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let adapter = AdapterId::parse(&args.adapter)?;
    let success = runtime
        .dispatcher
        .validate_citation(&adapter, &args.citation, None)
        .await?;

    let mut result = CommandResult::ok(json!({
        "adapter": success.served_by,
        "citation": args.citation,
        "valid": success.data.valid,
        "parsed": success.data.parsed,
    }));
    if !success.data.valid {
        result
            .warnings
            .push(String::from("citation is not a recognised reporter citation"));
    }
    Ok(result)
}

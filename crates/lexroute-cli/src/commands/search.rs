use std::time::Duration;

use serde_json::json;

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::{attempts_json, build_query, CommandResult, Runtime};

pub async fn run(args: &SearchArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let (mut query, mut preferences) = build_query(&args.query)?;

    if let Some(limit) = args.limit {
        query = query.with_max_results(limit)?;
    }
    query = query.with_citation_network(args.citation_network);
    if let Some(min_quality) = args.min_quality {
        preferences = preferences.with_min_quality(min_quality)?;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        if timeout_ms == 0 {
            return Err(CliError::Command(String::from(
                "--timeout-ms must be greater than zero",
            )));
        }
        preferences = preferences.with_timeout(Duration::from_millis(timeout_ms));
    }

    let success = runtime.dispatcher.search(&query, &preferences).await?;

    let mut result = CommandResult::ok(json!({
        "query": query.text,
        "query_type": query.query_type,
        "served_by": success.served_by,
        "attempts": attempts_json(&success.attempts),
        "dispatch_latency_ms": success.latency_ms,
        "results": success.data,
    }));
    if success.attempts.len() > 1 {
        result.warnings.push(format!(
            "served by fallback adapter '{}' after {} other candidate(s)",
            success.served_by,
            success.attempts.len() - 1
        ));
    }
    Ok(result)
}

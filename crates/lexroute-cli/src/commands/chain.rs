use serde_json::json;

use crate::cli::ChainArgs;
use crate::error::CliError;

use super::{build_query, CommandResult, Runtime};

/// Ranks candidates without calling any adapter.
pub fn run(args: &ChainArgs, runtime: &Runtime) -> Result<CommandResult, CliError> {
    let (query, preferences) = build_query(&args.query)?;
    let breaker = runtime.dispatcher.breaker();

    let chain = runtime
        .registry()
        .get_adapter_chain(&query, &preferences)
        .into_iter()
        .enumerate()
        .map(|(rank, candidate)| {
            json!({
                "rank": rank + 1,
                "adapter": candidate.id,
                "score": candidate.score,
                "estimated_cost": candidate.estimated_cost,
                "priority": candidate.priority,
                "circuit": breaker.state(candidate.id.as_str()),
            })
        })
        .collect::<Vec<_>>();

    let mut result = CommandResult::ok(json!({
        "query": query.text,
        "query_type": query.query_type,
        "chain": chain,
    }));
    if chain.is_empty() {
        result
            .warnings
            .push(String::from("no enabled adapter covers this query"));
    }
    Ok(result)
}

use serde_json::json;

use crate::error::CliError;

use super::{CommandResult, Runtime};

pub fn run(runtime: &Runtime) -> Result<CommandResult, CliError> {
    let registry = runtime.registry();
    let adapters = registry
        .entries()
        .iter()
        .map(|entry| {
            let descriptor = entry.adapter().descriptor();
            json!({
                "id": descriptor.id,
                "name": descriptor.name,
                "category": descriptor.category,
                "jurisdictions": descriptor.jurisdictions,
                "features": descriptor.features,
                "enabled": entry.config().enabled,
                "priority": entry.config().priority,
                "connected_with_credentials": entry.config().usable_credentials().is_some(),
            })
        })
        .collect::<Vec<_>>();

    Ok(CommandResult::ok(json!({
        "adapters": adapters,
        "stats": registry.stats(),
    })))
}

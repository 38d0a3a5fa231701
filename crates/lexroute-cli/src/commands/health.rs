use serde_json::json;

use crate::error::CliError;

use super::{CommandResult, Runtime};

pub async fn run(runtime: &Runtime) -> Result<CommandResult, CliError> {
    let timeout = runtime.config.health_check_timeout();
    let health = runtime.registry().health_check_all(timeout).await;

    let unhealthy = health.values().filter(|healthy| !**healthy).count();
    let mut result = CommandResult::ok(json!({
        "timeout_ms": runtime.config.health_check_timeout_ms,
        "adapters": health,
    }));
    if unhealthy > 0 {
        result
            .warnings
            .push(format!("{unhealthy} adapter(s) reported unhealthy"));
    }
    Ok(result)
}

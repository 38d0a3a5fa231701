use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::CliError;

/// Command metadata printed alongside every result.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub request_id: String,
    pub command: &'static str,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub meta: Meta,
    pub data: Value,
}

impl Envelope {
    pub fn new(command: &'static str, data: Value, latency_ms: u64, warnings: Vec<String>) -> Self {
        Self {
            meta: Meta {
                request_id: Uuid::new_v4().hyphenated().to_string(),
                command,
                latency_ms,
                warnings,
            },
            data,
        }
    }
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let rendered = to_json(envelope, pretty)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

fn to_json(envelope: &Envelope, pretty: bool) -> Result<String, CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };
    Ok(rendered)
}

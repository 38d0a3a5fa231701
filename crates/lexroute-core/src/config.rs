//! Router configuration loaded from YAML with environment credential overrides.
//!
//! ```yaml
//! circuit_breaker:
//!   failure_threshold: 5
//!   reset_timeout_secs: 60
//! health_check_timeout_ms: 5000
//! adapters:
//!   - id: courtlistener
//!     priority: 1
//!   - id: govinfo
//!   - id: westlaw
//!     credentials:
//!       api_key: "..."
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::data_source::Credentials;
use crate::error::ConfigError;
use crate::AdapterId;

/// Plugin keys that cannot run without credentials.
const CREDENTIALED_PLUGINS: &[&str] = &["westlaw"];

/// Registration record for one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub id: AdapterId,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower sorts first among equally scored candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Factory key; defaults to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_enabled() -> bool {
    true
}

impl AdapterConfig {
    pub fn new(id: AdapterId) -> Self {
        Self {
            id,
            enabled: true,
            priority: None,
            plugin: None,
            credentials: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn plugin_key(&self) -> &str {
        self.plugin.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// Credentials worth handing to `connect`, if any.
    pub fn usable_credentials(&self) -> Option<&Credentials> {
        self.credentials
            .as_ref()
            .filter(|credentials| !credentials.is_empty())
    }
}

/// Breaker settings as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            reset_timeout_secs: defaults.reset_timeout.as_secs(),
        }
    }
}

impl From<CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: CircuitBreakerSettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold,
            reset_timeout: Duration::from_secs(settings.reset_timeout_secs),
        }
    }
}

/// Top-level configuration for a router process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub circuit_breaker: CircuitBreakerSettings,
    pub health_check_timeout_ms: u64,
    pub adapters: Vec<AdapterConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            circuit_breaker: CircuitBreakerSettings::default(),
            health_check_timeout_ms: 5_000,
            adapters: ["courtlistener", "govinfo", "westlaw"]
                .into_iter()
                .map(|id| AdapterConfig::new(AdapterId::from_static(id)))
                .collect(),
        }
    }
}

impl RouterConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Reads `path` when given, otherwise returns the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "circuit_breaker.failure_threshold",
                reason: String::from("must be at least 1"),
            });
        }
        if self.health_check_timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "health_check_timeout_ms",
                reason: String::from("must be greater than zero"),
            });
        }

        let mut seen = BTreeSet::new();
        for adapter in &self.adapters {
            if !seen.insert(adapter.id.clone()) {
                return Err(ConfigError::DuplicateAdapter {
                    id: adapter.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        self.circuit_breaker.into()
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    /// Applies credentials from the process environment.
    pub fn with_env_credentials(self) -> Self {
        self.with_credentials_from(|name| std::env::var(name).ok())
    }

    /// Fills missing API keys from `lookup`, trying `LEXROUTE_<ID>_API_KEY`
    /// before the provider's own variable. Adapters that need credentials and
    /// still have none are disabled.
    pub fn with_credentials_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for adapter in &mut self.adapters {
            if adapter.usable_credentials().is_none() {
                let scoped = format!(
                    "LEXROUTE_{}_API_KEY",
                    adapter.id.as_str().to_ascii_uppercase().replace('-', "_")
                );
                let key = lookup(&scoped)
                    .or_else(|| provider_variable(adapter.plugin_key()).and_then(&lookup))
                    .filter(|key| !key.trim().is_empty());

                if let Some(key) = key {
                    let mut credentials = adapter.credentials.take().unwrap_or_default();
                    credentials.api_key = Some(key);
                    adapter.credentials = Some(credentials);
                }
            }

            if adapter.enabled
                && adapter.usable_credentials().is_none()
                && CREDENTIALED_PLUGINS.contains(&adapter.plugin_key())
            {
                tracing::info!(adapter = %adapter.id, "no credentials found, adapter disabled");
                adapter.enabled = false;
            }
        }
        self
    }
}

fn provider_variable(plugin: &str) -> Option<&'static str> {
    match plugin {
        "courtlistener" => Some("COURTLISTENER_API_TOKEN"),
        "govinfo" => Some("GOVINFO_API_KEY"),
        "westlaw" => Some("WESTLAW_API_KEY"),
        _ => None,
    }
}

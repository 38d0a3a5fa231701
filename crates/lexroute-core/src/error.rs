use thiserror::Error;

use crate::AdapterId;

/// Validation and contract errors exposed by `lexroute-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("jurisdiction code cannot be empty")]
    EmptyJurisdiction,
    #[error("jurisdiction '{value}' must be lower-case segments like 'us' or 'us-ca'")]
    InvalidJurisdiction { value: String },
    #[error("wildcard is only allowed as the final character: '{value}'")]
    MisplacedWildcard { value: String },

    #[error("adapter id cannot be empty")]
    EmptyAdapterId,
    #[error("adapter id contains invalid character '{ch}' at index {index}")]
    AdapterIdInvalidChar { ch: char, index: usize },

    #[error("query text cannot be empty")]
    EmptyQuery,
    #[error("query must target at least one jurisdiction")]
    NoJurisdictions,
    #[error("max_results must be greater than zero")]
    ZeroResultCap,
    #[error("date range start {from} is after end {to}")]
    InvertedDateRange { from: String, to: String },

    #[error("min_quality must be within 0.0..=1.0, got {value}")]
    QualityOutOfRange { value: String },
    #[error("max_cost must be finite and non-negative, got {value}")]
    InvalidCostCeiling { value: String },

    #[error("timestamp must be RFC3339 or YYYY-MM-DD: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Registration-time configuration errors. These fail fast and are never
/// retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("adapter '{id}' is already registered")]
    DuplicateAdapter { id: AdapterId },

    #[error("adapter '{id}' declares an invalid jurisdiction: {source}")]
    InvalidJurisdiction {
        id: AdapterId,
        #[source]
        source: ValidationError,
    },

    #[error("no adapter factory is registered under '{plugin}'")]
    UnknownPlugin { plugin: String },

    #[error("adapter '{id}' failed to connect: {message}")]
    Connect { id: AdapterId, message: String },
}

/// Failures while reading router configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config value for '{field}': {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("adapter '{id}' is configured more than once")]
    DuplicateAdapter { id: AdapterId },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

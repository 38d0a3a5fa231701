use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Unique adapter identifier used as registry key and circuit breaker name.
///
/// Identifiers are lower-case ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdapterId(Arc<str>);

impl AdapterId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyAdapterId);
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_';
            if !valid {
                return Err(ValidationError::AdapterIdInvalidChar { ch, index });
            }
        }

        Ok(Self(Arc::from(normalized)))
    }

    /// Identifier for a compile-time constant known to be valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(Arc::from(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AdapterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for AdapterId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Borrow<str> for AdapterId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<AdapterId> for String {
    fn from(value: AdapterId) -> Self {
        value.0.to_string()
    }
}

/// Provenance class of a data source. Drives the authority bonus in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterCategory {
    Commercial,
    OpenSource,
    Government,
    Academic,
}

impl AdapterCategory {
    pub const ALL: [Self; 4] = [
        Self::Commercial,
        Self::OpenSource,
        Self::Government,
        Self::Academic,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commercial => "commercial",
            Self::OpenSource => "open_source",
            Self::Government => "government",
            Self::Academic => "academic",
        }
    }
}

impl Display for AdapterCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterCategory {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "commercial" => Ok(Self::Commercial),
            "open_source" => Ok(Self::OpenSource),
            "government" => Ok(Self::Government),
            "academic" => Ok(Self::Academic),
            other => Err(ValidationError::UnknownVariant {
                kind: "adapter category",
                value: other.to_owned(),
            }),
        }
    }
}

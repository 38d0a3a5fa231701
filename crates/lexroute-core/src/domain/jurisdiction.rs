use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const WILDCARD: char = '*';

/// Concrete jurisdiction code targeted by a query, e.g. `us` or `us-ca`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jurisdiction(String);

impl Jurisdiction {
    /// Parse and normalize a jurisdiction code to lower case.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyJurisdiction);
        }
        if normalized.contains(WILDCARD) {
            return Err(ValidationError::MisplacedWildcard { value: normalized });
        }
        validate_segments(&normalized, &normalized)?;
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Jurisdiction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Jurisdiction {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Jurisdiction> for String {
    fn from(value: Jurisdiction) -> Self {
        value.0
    }
}

/// Jurisdiction entry declared by an adapter.
///
/// An entry ending in `*` covers every code that starts with the text before
/// the marker, so `us-*` covers `us-ca` and `us-ny` but not `us` itself. An
/// exact entry only covers the identical code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JurisdictionPattern {
    Exact(String),
    Prefix(String),
}

impl JurisdictionPattern {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::EmptyJurisdiction);
        }

        match normalized.find(WILDCARD) {
            None => Jurisdiction::parse(&normalized).map(|code| Self::Exact(code.0)),
            Some(index) if index + 1 == normalized.len() => {
                let prefix = &normalized[..index];
                if !prefix.is_empty() {
                    let stem = prefix.strip_suffix('-').unwrap_or(prefix);
                    validate_segments(stem, &normalized)?;
                }
                Ok(Self::Prefix(prefix.to_owned()))
            }
            Some(_) => Err(ValidationError::MisplacedWildcard { value: normalized }),
        }
    }

    pub fn matches(&self, jurisdiction: &Jurisdiction) -> bool {
        match self {
            Self::Exact(code) => code == jurisdiction.as_str(),
            Self::Prefix(prefix) => jurisdiction.as_str().starts_with(prefix.as_str()),
        }
    }

    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Prefix(_))
    }
}

impl Display for JurisdictionPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(code) => f.write_str(code),
            Self::Prefix(prefix) => write!(f, "{prefix}{WILDCARD}"),
        }
    }
}

fn validate_segments(code: &str, original: &str) -> Result<(), ValidationError> {
    let valid = !code.is_empty()
        && code.split('-').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        });

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidJurisdiction {
            value: original.to_owned(),
        })
    }
}

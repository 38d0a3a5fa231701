use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{AdapterId, ValidationError};

/// Inclusive date window applied to searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl DateRange {
    pub fn new(from: Option<Date>, to: Option<Date>) -> Result<Self, ValidationError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ValidationError::InvertedDateRange {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
        }
        Ok(Self { from, to })
    }

    pub fn contains(self, date: Date) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// One authority returned by a research adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Normalized relevance in `0.0..=1.0` when the source reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    /// Ids of authorities cited by this one, filled when network enrichment was requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cites: Vec<String>,
    pub source: AdapterId,
}

impl SearchResult {
    pub fn new(source: AdapterId, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            citation: None,
            court: None,
            jurisdiction: None,
            date: None,
            url: None,
            snippet: None,
            relevance: None,
            cites: Vec::new(),
            source,
        }
    }

    /// Results without a relevance score are kept by quality filters.
    pub fn meets_quality(&self, min_quality: Option<f64>) -> bool {
        match (min_quality, self.relevance) {
            (Some(min), Some(relevance)) => relevance >= min,
            _ => true,
        }
    }
}

/// Kind of change reported by an adapter's update feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    NewOpinion,
    AmendedStatute,
    NewRegulation,
    Other,
}

/// Change notification returned by `get_updates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNotice {
    pub id: String,
    pub title: String,
    pub kind: UpdateKind,
    pub changed_at: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source: AdapterId,
}

/// Citation style requested from `get_citation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationFormat {
    Bluebook,
    Alwd,
    Apa,
}

impl CitationFormat {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bluebook => "bluebook",
            Self::Alwd => "alwd",
            Self::Apa => "apa",
        }
    }
}

impl Display for CitationFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CitationFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bluebook" => Ok(Self::Bluebook),
            "alwd" => Ok(Self::Alwd),
            "apa" => Ok(Self::Apa),
            other => Err(ValidationError::UnknownVariant {
                kind: "citation format",
                value: other.to_owned(),
            }),
        }
    }
}

/// Components of a reporter citation such as `410 U.S. 113, 120 (1973)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCitation {
    pub volume: u32,
    pub reporter: String,
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin_cite: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Outcome of `validate_citation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedCitation>,
}

impl CitationValidation {
    pub const fn invalid() -> Self {
        Self {
            valid: false,
            parsed: None,
        }
    }

    pub fn valid(parsed: ParsedCitation) -> Self {
        Self {
            valid: true,
            parsed: Some(parsed),
        }
    }
}

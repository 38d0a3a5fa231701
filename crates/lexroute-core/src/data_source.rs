//! Legal source adapter contract and request/response types.
//!
//! This module defines the capability contract (`LegalSource`) that every
//! research adapter implements, along with the query, preference, cost and
//! health types the registry and dispatcher reason about.
//!
//! # Operations
//!
//! | Operation | Feature | Response |
//! |-----------|---------|----------|
//! | [`search_cases`](LegalSource::search_cases) | [`Feature::CaseSearch`] | `Vec<SearchResult>` |
//! | [`search_statutes`](LegalSource::search_statutes) | [`Feature::StatuteSearch`] | `Vec<SearchResult>` |
//! | [`search_regulations`](LegalSource::search_regulations) | [`Feature::RegulationSearch`] | `Vec<SearchResult>` |
//! | [`get_citation`](LegalSource::get_citation) | [`Feature::CitationFormatting`] | `String` |
//! | [`validate_citation`](LegalSource::validate_citation) | [`Feature::CitationValidation`] | [`CitationValidation`] |
//! | [`get_updates`](LegalSource::get_updates) | [`Feature::Updates`] | `Vec<UpdateNotice>` |
//!
//! Operations an adapter does not support return an empty value rather than
//! an error, so the contract stays total.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::citation;
use crate::domain::{
    CitationFormat, CitationValidation, DateRange, Jurisdiction, SearchResult, UpdateNotice,
    UtcDateTime,
};
use crate::{AdapterCategory, AdapterId, ValidationError};

/// Boxed future returned by every adapter operation.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Named capability an adapter can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    CaseSearch,
    StatuteSearch,
    RegulationSearch,
    CitationFormatting,
    CitationValidation,
    CitationNetwork,
    Updates,
}

impl Feature {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CaseSearch => "case_search",
            Self::StatuteSearch => "statute_search",
            Self::RegulationSearch => "regulation_search",
            Self::CitationFormatting => "citation_formatting",
            Self::CitationValidation => "citation_validation",
            Self::CitationNetwork => "citation_network",
            Self::Updates => "updates",
        }
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of declared features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Self {
        Self(features.into_iter().collect())
    }

    pub fn supports(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Kind of authority a query is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    CaseLaw,
    Statute,
    Regulation,
    #[default]
    Mixed,
}

impl QueryType {
    /// Feature an adapter must declare to serve this query type.
    pub const fn required_feature(self) -> Option<Feature> {
        match self {
            Self::CaseLaw => Some(Feature::CaseSearch),
            Self::Statute => Some(Feature::StatuteSearch),
            Self::Regulation => Some(Feature::RegulationSearch),
            Self::Mixed => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CaseLaw => "case_law",
            Self::Statute => "statute",
            Self::Regulation => "regulation",
            Self::Mixed => "mixed",
        }
    }
}

impl Display for QueryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "case_law" | "case" | "cases" => Ok(Self::CaseLaw),
            "statute" | "statutes" => Ok(Self::Statute),
            "regulation" | "regulations" => Ok(Self::Regulation),
            "mixed" => Ok(Self::Mixed),
            other => Err(ValidationError::UnknownVariant {
                kind: "query type",
                value: other.to_owned(),
            }),
        }
    }
}

/// Static description of an adapter. Fixed for the lifetime of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub id: AdapterId,
    pub name: String,
    pub category: AdapterCategory,
    /// Declared jurisdiction entries; the registry validates them on registration.
    pub jurisdictions: Vec<String>,
    pub features: FeatureSet,
}

impl AdapterDescriptor {
    pub fn new(
        id: AdapterId,
        name: impl Into<String>,
        category: AdapterCategory,
        jurisdictions: impl IntoIterator<Item = impl Into<String>>,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            jurisdictions: jurisdictions.into_iter().map(Into::into).collect(),
            features: FeatureSet::new(features),
        }
    }
}

/// Secrets handed to `connect`. Never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.username.is_none() && self.password.is_none()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .finish()
    }
}

/// Research query routed to adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchQuery {
    pub text: String,
    pub jurisdictions: Vec<Jurisdiction>,
    pub query_type: QueryType,
    pub date_range: Option<DateRange>,
    pub max_results: Option<usize>,
    pub include_citation_network: bool,
}

impl ResearchQuery {
    pub fn new(
        text: impl Into<String>,
        jurisdictions: Vec<Jurisdiction>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if jurisdictions.is_empty() {
            return Err(ValidationError::NoJurisdictions);
        }

        Ok(Self {
            text,
            jurisdictions,
            query_type: QueryType::Mixed,
            date_range: None,
            max_results: None,
            include_citation_network: false,
        })
    }

    /// Parses each code and builds the query.
    pub fn parse(text: impl Into<String>, codes: &[&str]) -> Result<Self, ValidationError> {
        let jurisdictions = codes
            .iter()
            .map(|code| Jurisdiction::parse(code))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(text, jurisdictions)
    }

    pub fn with_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Result<Self, ValidationError> {
        if max_results == 0 {
            return Err(ValidationError::ZeroResultCap);
        }
        self.max_results = Some(max_results);
        Ok(self)
    }

    pub fn with_citation_network(mut self, enabled: bool) -> Self {
        self.include_citation_network = enabled;
        self
    }
}

/// Caller preferences that shape scoring and dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPreferences {
    pub max_cost: Option<f64>,
    pub prefer_free: bool,
    pub min_quality: Option<f64>,
    pub timeout: Option<Duration>,
}

impl QueryPreferences {
    pub fn prefer_free() -> Self {
        Self {
            prefer_free: true,
            ..Self::default()
        }
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Result<Self, ValidationError> {
        if !max_cost.is_finite() || max_cost < 0.0 {
            return Err(ValidationError::InvalidCostCeiling {
                value: max_cost.to_string(),
            });
        }
        self.max_cost = Some(max_cost);
        Ok(self)
    }

    pub fn with_min_quality(mut self, min_quality: f64) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&min_quality) {
            return Err(ValidationError::QualityOutOfRange {
                value: min_quality.to_string(),
            });
        }
        self.min_quality = Some(min_quality);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Billable operation used for cost estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Any search; the reference point for ranking.
    Search,
    SearchCases,
    SearchStatutes,
    SearchRegulations,
    GetCitation,
    ValidateCitation,
    GetUpdates,
}

/// Optional inputs to a cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostParams {
    pub expected_results: Option<u32>,
}

/// Estimated charge for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub base_charge: f64,
    pub per_result: f64,
    pub estimated_total: f64,
    pub currency: String,
}

impl CostEstimate {
    pub const DEFAULT_EXPECTED_RESULTS: u32 = 10;

    pub fn new(base_charge: f64, per_result: f64, params: Option<CostParams>) -> Self {
        let results = params
            .and_then(|params| params.expected_results)
            .unwrap_or(Self::DEFAULT_EXPECTED_RESULTS);
        Self {
            base_charge,
            per_result,
            estimated_total: base_charge + per_result * f64::from(results),
            currency: String::from("USD"),
        }
    }

    pub fn free() -> Self {
        Self::new(0.0, 0.0, None)
    }

    pub fn is_free(&self) -> bool {
        self.estimated_total <= 0.0
    }
}

/// Result of an adapter health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: UtcDateTime,
}

impl HealthStatus {
    pub fn healthy(latency_ms: u64) -> Self {
        Self {
            healthy: true,
            latency_ms: Some(latency_ms),
            error: None,
            checked_at: UtcDateTime::now(),
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            latency_ms: None,
            error: Some(error.into()),
            checked_at: UtcDateTime::now(),
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    Timeout,
    RateLimited,
    InvalidRequest,
    Unauthorized,
    NotFound,
    Unsupported,
    /// Local request budget spent; nothing was sent upstream.
    Throttled,
    Internal,
}

/// Structured source error recorded against an adapter's circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message, true)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            SourceErrorKind::Timeout,
            format!("operation timed out after {} ms", after.as_millis()),
            true,
        )
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message, false)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unauthorized, message, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message, false)
    }

    pub fn unsupported(operation: Operation) -> Self {
        Self::new(
            SourceErrorKind::Unsupported,
            format!("operation '{operation:?}' is not supported by this source"),
            false,
        )
    }

    pub fn throttled(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Throttled, message, true)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message, false)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// False when the adapter declined before contacting its upstream.
    /// Such errors say nothing about the dependency's health.
    pub const fn reached_upstream(&self) -> bool {
        !matches!(
            self.kind,
            SourceErrorKind::Unsupported | SourceErrorKind::Throttled
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Unauthorized => "source.unauthorized",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unsupported => "source.unsupported",
            SourceErrorKind::Throttled => "source.throttled",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Capability contract implemented by every legal research adapter.
///
/// All adapters must implement this trait to be placed in the
/// [`AdapterRegistry`](crate::AdapterRegistry). Methods return boxed futures
/// so adapters can be stored as `Arc<dyn LegalSource>`.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across
/// concurrently dispatched requests.
pub trait LegalSource: Send + Sync {
    /// Static descriptor: id, category, jurisdictions, features.
    fn descriptor(&self) -> &AdapterDescriptor;

    fn id(&self) -> &AdapterId {
        &self.descriptor().id
    }

    fn supported_features(&self) -> &FeatureSet {
        &self.descriptor().features
    }

    /// Bound applied by the dispatcher when the caller sets no timeout.
    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Establishes a session with the upstream service.
    fn connect<'a>(&'a self, credentials: Credentials) -> SourceFuture<'a, Result<(), SourceError>>;

    /// Releases upstream resources. Callers log failures and carry on.
    fn disconnect<'a>(&'a self) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async { Ok(()) })
    }

    fn health_check<'a>(&'a self) -> SourceFuture<'a, HealthStatus>;

    fn search_cases<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        let _ = query;
        Box::pin(async { Ok(Vec::new()) })
    }

    fn search_statutes<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        let _ = query;
        Box::pin(async { Ok(Vec::new()) })
    }

    fn search_regulations<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        let _ = query;
        Box::pin(async { Ok(Vec::new()) })
    }

    /// Formats the authority identified by `id`. Sources without
    /// [`Feature::CitationFormatting`] answer with an empty string.
    fn get_citation<'a>(
        &'a self,
        id: &'a str,
        format: CitationFormat,
    ) -> SourceFuture<'a, Result<String, SourceError>> {
        let _ = (id, format);
        Box::pin(async { Ok(String::new()) })
    }

    /// Checks that `text` is a well-formed reporter citation.
    fn validate_citation<'a>(&'a self, text: &'a str) -> SourceFuture<'a, CitationValidation> {
        Box::pin(async move {
            match citation::parse(text) {
                Some(parsed) => CitationValidation::valid(parsed),
                None => CitationValidation::invalid(),
            }
        })
    }

    /// Best-effort change feed; returns an empty list when the upstream fails.
    fn get_updates<'a>(&'a self, since: UtcDateTime) -> SourceFuture<'a, Vec<UpdateNotice>> {
        let _ = since;
        Box::pin(async { Vec::new() })
    }

    /// Pure cost model; never fails.
    fn cost_estimate(&self, operation: Operation, params: Option<CostParams>) -> CostEstimate;
}

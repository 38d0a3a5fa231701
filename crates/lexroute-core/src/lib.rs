//! # Lexroute Core
//!
//! Adapter routing for legal research sources.
//!
//! ## Overview
//!
//! This crate decides which research source should serve a query and keeps
//! dispatch away from sources that are known to be failing:
//!
//! - **Capability contract** every adapter implements ([`LegalSource`])
//! - **Capability filter and scoring** by jurisdiction, feature and cost
//! - **Adapter registry** with ranked chains and concurrent health checks
//! - **Circuit breaker** keyed by adapter id
//! - **Dispatch facade** that walks the ranked chain with fallback
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Built-in adapters (CourtListener, GovInfo, Westlaw) |
//! | [`circuit_breaker`] | Per-dependency circuit state machine |
//! | [`citation`] | Reporter citation parsing and formatting |
//! | [`config`] | YAML router configuration and credential lookup |
//! | [`data_source`] | `LegalSource` trait and request/response types |
//! | [`dispatch`] | Ranked dispatch with circuit admission and fallback |
//! | [`domain`] | Jurisdictions, search results, citations, timestamps |
//! | [`error`] | Validation, registry and config errors |
//! | [`factory`] | Plugin-key to constructor table |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`registry`] | Adapter registry and ranking |
//! | [`scoring`] | Capability filter and suitability score |
//! | [`source`] | Adapter identifiers and categories |
//! | [`throttling`] | Client-side request budgets |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lexroute_core::{
//!     AdapterFactory, AdapterRegistry, CircuitBreaker, QueryPreferences, ReqwestHttpClient,
//!     ResearchDispatcher, ResearchQuery, RouterConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RouterConfig::default().with_env_credentials();
//!     let factory = AdapterFactory::builtin(Arc::new(ReqwestHttpClient::new()));
//!
//!     let registry = Arc::new(AdapterRegistry::new());
//!     registry.load_from_configs(&factory, &config.adapters).await;
//!
//!     let dispatcher = ResearchDispatcher::new(
//!         registry,
//!         Arc::new(CircuitBreaker::new(config.breaker_config())),
//!     );
//!
//!     let query = ResearchQuery::parse("fair use", &["us"])?;
//!     let success = dispatcher.search(&query, &QueryPreferences::prefer_free()).await?;
//!     println!("{} results from {}", success.data.len(), success.served_by);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Dispatch Facade │────▶│ Circuit Breaker  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Adapter Registry│────▶│ Filter / Scoring │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  LegalSource    │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/none)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Adapter calls return [`SourceError`]; the dispatcher records each one on
//! the breaker and moves to the next candidate. Callers only see
//! [`DispatchError`]:
//!
//! ```rust
//! use lexroute_core::DispatchError;
//!
//! fn describe(error: &DispatchError) -> String {
//!     match error {
//!         DispatchError::NoCandidate { domain } => format!("nothing covers {domain}"),
//!         DispatchError::Exhausted(report) => {
//!             format!("{} candidates tried, {} called", report.attempts.len(), report.calls_made())
//!         }
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Credentials come from config or environment and are redacted from `Debug`
//! - Adapter ids and jurisdictions are validated at registration

pub mod adapters;
pub mod circuit_breaker;
pub mod citation;
pub mod config;
pub mod data_source;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod factory;
pub mod http_client;
pub mod registry;
pub mod scoring;
pub mod source;
pub mod throttling;

// Adapter implementations
pub use adapters::{CourtListenerAdapter, GovInfoAdapter, WestlawAdapter};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState};

// Configuration
pub use config::{AdapterConfig, CircuitBreakerSettings, RouterConfig};

// Capability contract and request types
pub use data_source::{
    AdapterDescriptor, CostEstimate, CostParams, Credentials, Feature, FeatureSet, HealthStatus,
    LegalSource, Operation, QueryPreferences, QueryType, ResearchQuery, SourceError,
    SourceErrorKind, SourceFuture,
};

// Dispatch
pub use dispatch::{
    Attempt, AttemptOutcome, DispatchError, DispatchResult, DispatchSuccess, ExhaustionReport,
    ResearchDispatcher,
};

// Domain models
pub use domain::{
    CitationFormat, CitationValidation, DateRange, Jurisdiction, JurisdictionPattern,
    ParsedCitation, SearchResult, UpdateKind, UpdateNotice, UtcDateTime,
};

// Error types
pub use error::{ConfigError, RegistryError, ValidationError};

// Factory
pub use factory::{AdapterConstructor, AdapterFactory};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse,
    NoopHttpClient,
    ReqwestHttpClient,
};

// Registry
pub use registry::{AdapterRegistry, LoadFailure, LoadReport, RegistryEntry, RegistryStats};

// Scoring
pub use scoring::{ScoredCandidate, ScoringPolicy};

// Source identifiers
pub use source::{AdapterCategory, AdapterId};

// Throttling
pub use throttling::{RatePolicy, Throttle};

//! Caller-facing dispatch: ranking, circuit admission and fallback.
//!
//! For each request the dispatcher asks the registry for a ranked chain,
//! then walks it in order. A candidate whose circuit denies admission is
//! skipped without a call; an admitted candidate is invoked under a timeout
//! and its outcome is recorded on the breaker. The first success wins.
//! Failed adapters are never retried within the same request. An adapter
//! that declines locally (unsupported operation, spent request budget) is
//! passed over without a circuit failure.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{
    Feature, LegalSource, QueryPreferences, QueryType, ResearchQuery, SourceError, SourceFuture,
};
use crate::domain::{CitationFormat, CitationValidation, SearchResult};
use crate::registry::AdapterRegistry;
use crate::AdapterId;

/// What happened to one candidate during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed { error: SourceError },
    /// Refused before any upstream call; the circuit is left alone.
    Declined { error: SourceError },
    SkippedCircuitOpen,
}

impl AttemptOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Declined { .. } => "declined",
            Self::SkippedCircuitOpen => "skipped_circuit_open",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub adapter: AdapterId,
    pub outcome: AttemptOutcome,
}

impl Display for Attempt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Failed { error } | AttemptOutcome::Declined { error } => {
                write!(f, "{}: {} ({error})", self.adapter, self.outcome.label())
            }
            outcome => write!(f, "{}: {}", self.adapter, outcome.label()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSuccess<T> {
    pub data: T,
    pub served_by: AdapterId,
    /// Every candidate considered, the serving one last.
    pub attempts: Vec<Attempt>,
    pub latency_ms: u64,
}

/// Diagnostic detail for a chain where no candidate succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhaustionReport {
    pub domain: String,
    pub attempts: Vec<Attempt>,
    pub latency_ms: u64,
}

impl ExhaustionReport {
    /// Number of candidates whose upstream was actually called.
    pub fn calls_made(&self) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| {
                matches!(
                    attempt.outcome,
                    AttemptOutcome::Succeeded | AttemptOutcome::Failed { .. }
                )
            })
            .count()
    }
}

impl Display for ExhaustionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let attempts = self
            .attempts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "all sources unavailable for '{}' [{attempts}]", self.domain)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no adapter can serve '{domain}' for this request")]
    NoCandidate { domain: String },
    #[error("{0}")]
    Exhausted(ExhaustionReport),
}

impl DispatchError {
    pub fn report(&self) -> Option<&ExhaustionReport> {
        match self {
            Self::NoCandidate { .. } => None,
            Self::Exhausted(report) => Some(report),
        }
    }
}

pub type DispatchResult<T> = Result<DispatchSuccess<T>, DispatchError>;

/// Shared entry point for routed research calls.
#[derive(Debug, Clone)]
pub struct ResearchDispatcher {
    registry: Arc<AdapterRegistry>,
    breaker: Arc<CircuitBreaker>,
}

impl ResearchDispatcher {
    pub fn new(registry: Arc<AdapterRegistry>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { registry, breaker }
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Routes `invoke` through the ranked chain for `query`.
    ///
    /// `domain` names the operation in logs and exhaustion reports.
    pub async fn dispatch<T, F>(
        &self,
        domain: &str,
        query: &ResearchQuery,
        preferences: &QueryPreferences,
        invoke: F,
    ) -> DispatchResult<T>
    where
        F: for<'a> FnMut(&'a dyn LegalSource, &'a ResearchQuery) -> SourceFuture<'a, Result<T, SourceError>>,
    {
        let chain = self
            .registry
            .get_adapter_chain(query, preferences)
            .into_iter()
            .map(|candidate| candidate.id)
            .collect::<Vec<_>>();

        self.walk(domain, chain, preferences.timeout, query, invoke)
            .await
    }

    /// Runs the search operation matching the query type, then applies the
    /// caller's quality floor and result cap.
    pub async fn search(
        &self,
        query: &ResearchQuery,
        preferences: &QueryPreferences,
    ) -> DispatchResult<Vec<SearchResult>> {
        let domain = format!("search:{}", query.query_type);
        let mut success = self
            .dispatch(&domain, query, preferences, search_by_type)
            .await?;

        success
            .data
            .retain(|result| result.meets_quality(preferences.min_quality));
        if let Some(cap) = query.max_results {
            success.data.truncate(cap);
        }
        Ok(success)
    }

    /// Formats a citation on one named adapter, still gated by its circuit.
    ///
    /// An adapter without [`Feature::CitationFormatting`] is no candidate.
    pub async fn get_citation(
        &self,
        adapter: &AdapterId,
        id: &str,
        format: CitationFormat,
        timeout: Option<Duration>,
    ) -> DispatchResult<String> {
        let chain = self.direct_chain(adapter, Some(Feature::CitationFormatting));
        self.walk("get_citation", chain, timeout, id, move |source, id| {
            source.get_citation(id, format)
        })
        .await
    }

    pub async fn validate_citation(
        &self,
        adapter: &AdapterId,
        text: &str,
        timeout: Option<Duration>,
    ) -> DispatchResult<CitationValidation> {
        let chain = self.direct_chain(adapter, None);
        self.walk("validate_citation", chain, timeout, text, |source, text| {
            Box::pin(async move { Ok::<_, SourceError>(source.validate_citation(text).await) })
        })
        .await
    }

    fn direct_chain(&self, adapter: &AdapterId, required: Option<Feature>) -> Vec<AdapterId> {
        match self.registry.entry(adapter.as_str()) {
            Some(entry)
                if entry.config().enabled
                    && required.map_or(true, |feature| {
                        entry.adapter().supported_features().supports(feature)
                    }) =>
            {
                vec![adapter.clone()]
            }
            _ => Vec::new(),
        }
    }

    async fn walk<C, T, F>(
        &self,
        domain: &str,
        chain: Vec<AdapterId>,
        timeout: Option<Duration>,
        context: &C,
        mut invoke: F,
    ) -> DispatchResult<T>
    where
        C: ?Sized,
        F: for<'a> FnMut(&'a dyn LegalSource, &'a C) -> SourceFuture<'a, Result<T, SourceError>>,
    {
        let started = Instant::now();
        if chain.is_empty() {
            tracing::debug!(domain, "no candidate adapters");
            return Err(DispatchError::NoCandidate {
                domain: domain.to_owned(),
            });
        }

        let mut attempts = Vec::with_capacity(chain.len());
        for id in chain {
            // Unregistered between ranking and dispatch.
            let Some(adapter) = self.registry.get(id.as_str()) else {
                continue;
            };

            if !self.breaker.can_attempt(id.as_str()) {
                tracing::debug!(domain, adapter = %id, "circuit open, skipping");
                attempts.push(Attempt {
                    adapter: id,
                    outcome: AttemptOutcome::SkippedCircuitOpen,
                });
                continue;
            }

            let limit = timeout.unwrap_or_else(|| adapter.default_timeout());
            let outcome = match tokio::time::timeout(limit, invoke(adapter.as_ref(), context)).await
            {
                Ok(result) => result,
                Err(_) => Err(SourceError::timeout(limit)),
            };

            match outcome {
                Ok(data) => {
                    self.breaker.record_success(id.as_str());
                    if !attempts.is_empty() {
                        tracing::info!(
                            domain,
                            adapter = %id,
                            passed_over = attempts.len(),
                            "served by fallback adapter"
                        );
                    }
                    attempts.push(Attempt {
                        adapter: id.clone(),
                        outcome: AttemptOutcome::Succeeded,
                    });
                    return Ok(DispatchSuccess {
                        data,
                        served_by: id,
                        attempts,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) if !error.reached_upstream() => {
                    tracing::debug!(domain, adapter = %id, %error, "adapter declined locally");
                    attempts.push(Attempt {
                        adapter: id,
                        outcome: AttemptOutcome::Declined { error },
                    });
                }
                Err(error) => {
                    self.breaker.record_failure(id.as_str());
                    tracing::warn!(domain, adapter = %id, %error, "adapter call failed");
                    attempts.push(Attempt {
                        adapter: id,
                        outcome: AttemptOutcome::Failed { error },
                    });
                }
            }
        }

        let report = ExhaustionReport {
            domain: domain.to_owned(),
            attempts,
            latency_ms: elapsed_ms(started),
        };
        tracing::warn!(
            domain,
            attempts = report.attempts.len(),
            calls = report.calls_made(),
            "all candidate adapters exhausted"
        );
        Err(DispatchError::Exhausted(report))
    }
}

fn search_by_type<'a>(
    source: &'a dyn LegalSource,
    query: &'a ResearchQuery,
) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
    match query.query_type {
        QueryType::CaseLaw => source.search_cases(query),
        QueryType::Statute => source.search_statutes(query),
        QueryType::Regulation => source.search_regulations(query),
        QueryType::Mixed => Box::pin(async move {
            let mut results = source.search_cases(query).await?;
            results.extend(source.search_statutes(query).await?);
            results.extend(source.search_regulations(query).await?);
            Ok::<_, SourceError>(results)
        }),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

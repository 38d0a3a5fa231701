use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lexroute_core::{
    AdapterCategory, AdapterConfig, AdapterDescriptor, AdapterId, CircuitBreaker,
    CircuitBreakerConfig, CostEstimate, CostParams, Credentials, Feature, HealthStatus,
    HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse, LegalSource, Operation, ResearchQuery,
    SearchResult, SourceError, SourceFuture,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Stall(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
    Panics,
    Hangs,
}

/// Scriptable adapter that counts every outbound call it receives.
pub struct StubSource {
    descriptor: AdapterDescriptor,
    cost: f64,
    behavior: Behavior,
    health: Health,
    calls: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl StubSource {
    pub fn new(id: &str, category: AdapterCategory, jurisdictions: &[&str]) -> Self {
        Self {
            descriptor: AdapterDescriptor::new(
                AdapterId::parse(id).expect("valid stub id"),
                format!("Stub {id}"),
                category,
                jurisdictions.iter().copied(),
                [
                    Feature::CaseSearch,
                    Feature::StatuteSearch,
                    Feature::RegulationSearch,
                ],
            ),
            cost: 0.0,
            behavior: Behavior::Succeed,
            health: Health::Healthy,
            calls: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn with_features(mut self, features: &[Feature]) -> Self {
        self.descriptor.features = features.iter().copied().collect();
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn failing(mut self) -> Self {
        self.behavior = Behavior::Fail;
        self
    }

    pub fn stalling(mut self, delay: Duration) -> Self {
        self.behavior = Behavior::Stall(delay);
        self
    }

    pub fn with_health(mut self, health: Health) -> Self {
        self.health = health;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn answer(&self, query: &ResearchQuery) -> SourceFuture<'_, Result<Vec<SearchResult>, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = self.descriptor.id.clone();
        let text = query.text.clone();
        let behavior = self.behavior;
        Box::pin(async move {
            match behavior {
                Behavior::Succeed => {
                    let mut result = SearchResult::new(id.clone(), format!("{id}-1"), text);
                    result.relevance = Some(0.9);
                    Ok(vec![result])
                }
                Behavior::Fail => Err(SourceError::unavailable(format!("{id} is down"))),
                Behavior::Stall(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Vec::new())
                }
            }
        })
    }
}

impl LegalSource for StubSource {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn connect<'a>(&'a self, credentials: Credentials) -> SourceFuture<'a, Result<(), SourceError>> {
        let _ = credentials;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn disconnect<'a>(&'a self) -> SourceFuture<'a, Result<(), SourceError>> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn health_check<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        let health = self.health;
        Box::pin(async move {
            match health {
                Health::Healthy => HealthStatus::healthy(1),
                Health::Unhealthy => HealthStatus::unhealthy("stub reports unhealthy"),
                Health::Panics => panic!("health probe crashed"),
                Health::Hangs => {
                    std::future::pending::<()>().await;
                    HealthStatus::unhealthy("unreachable")
                }
            }
        })
    }

    fn search_cases<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        self.answer(query)
    }

    fn cost_estimate(&self, operation: Operation, params: Option<CostParams>) -> CostEstimate {
        let _ = operation;
        CostEstimate::new(self.cost, 0.0, params)
    }
}

/// Replays canned responses in order and records every request.
#[derive(Debug, Default)]
pub struct RecordingHttpClient {
    responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    pub fn with_responses(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn json(body: &str) -> Self {
        Self::with_responses(vec![Ok(HttpResponse::ok_json(body))])
    }

    pub fn status(status: u16) -> Self {
        Self::with_responses(vec![Ok(HttpResponse {
            status,
            body: String::new(),
        })])
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("request log lock").clone()
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.requests.lock().expect("request log lock").push(request);
        let next = {
            let mut responses = self.responses.lock().expect("response queue lock");
            if responses.is_empty() {
                Err(HttpError::Transport(String::from("no canned response left")))
            } else {
                responses.remove(0)
            }
        };
        Box::pin(async move { next })
    }
}

pub fn id(value: &str) -> AdapterId {
    AdapterId::parse(value).expect("valid adapter id")
}

pub fn config(value: &str) -> AdapterConfig {
    AdapterConfig::new(id(value))
}

pub fn case_query(text: &str, jurisdictions: &[&str]) -> ResearchQuery {
    ResearchQuery::parse(text, jurisdictions)
        .expect("valid query")
        .with_type(lexroute_core::QueryType::CaseLaw)
}

pub fn breaker(threshold: u32, reset_timeout: Duration) -> CircuitBreaker {
    CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: threshold,
        reset_timeout,
    })
}

/// Trips `name` by recording `threshold` failures.
pub fn trip(breaker: &CircuitBreaker, name: &str) {
    for _ in 0..breaker.config().failure_threshold {
        breaker.record_failure(name);
    }
}

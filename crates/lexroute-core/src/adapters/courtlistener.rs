use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;

use super::{decode, elapsed_ms, execute, format_date, parse_date_prefix};
use crate::citation;
use crate::data_source::{
    AdapterDescriptor, CostEstimate, CostParams, Credentials, Feature, HealthStatus, LegalSource,
    Operation, ResearchQuery, SourceError, SourceFuture,
};
use crate::domain::{
    CitationFormat, ParsedCitation, SearchResult, UpdateKind, UpdateNotice, UtcDateTime,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::throttling::{RatePolicy, Throttle};
use crate::{AdapterCategory, AdapterId};

const DEFAULT_BASE_URL: &str = "https://www.courtlistener.com/api/rest/v4";
const SOURCE: &str = "courtlistener";
const UPDATE_FEED_LIMIT: usize = 50;

/// CourtListener court ids searched for each jurisdiction code.
const COURTS: &[(&str, &str)] = &[
    ("us-fed", "scotus ca1 ca2 ca3 ca4 ca5 ca6 ca7 ca8 ca9 ca10 ca11 cadc cafc"),
    ("us-ca", "cal calctapp"),
    ("us-fl", "fla fladistctapp"),
    ("us-il", "ill illappct"),
    ("us-ma", "mass massappct"),
    ("us-ny", "ny nyappdiv"),
    ("us-pa", "pa pasuperct pacommwct"),
    ("us-tx", "tex texapp texcrimapp"),
    ("us-wa", "wash washctapp"),
];

/// Free Law Project's CourtListener opinion search.
///
/// Anonymous access works with a low quota; a token supplied to `connect`
/// is sent as `Authorization: Token <key>`.
#[derive(Clone)]
pub struct CourtListenerAdapter {
    descriptor: AdapterDescriptor,
    http_client: Arc<dyn HttpClient>,
    auth: Arc<RwLock<HttpAuth>>,
    throttle: Throttle,
    base_url: String,
    timeout: Duration,
}

impl Default for CourtListenerAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl CourtListenerAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            descriptor: AdapterDescriptor::new(
                AdapterId::from_static(SOURCE),
                "CourtListener",
                AdapterCategory::OpenSource,
                ["us", "us-*"],
                [
                    Feature::CaseSearch,
                    Feature::CitationFormatting,
                    Feature::CitationValidation,
                    Feature::CitationNetwork,
                    Feature::Updates,
                ],
            ),
            http_client,
            auth: Arc::new(RwLock::new(HttpAuth::Anonymous)),
            throttle: Throttle::new(RatePolicy::courtlistener_default()),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout: Duration::from_secs(8),
        }
    }

    /// Registers this instance under a different id.
    pub fn with_id(mut self, id: AdapterId) -> Self {
        self.descriptor.id = id;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        self.throttle.try_acquire(SOURCE)?;
        let auth = self.auth.read().await.clone();
        execute(
            self.http_client.as_ref(),
            SOURCE,
            request.with_auth(&auth).with_timeout(self.timeout),
        )
        .await
    }

    fn search_request(&self, query: &ResearchQuery) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}/search/", self.base_url))
            .with_query("q", &query.text)
            .with_query("type", "o");

        if let Some(courts) = court_filter(query) {
            request = request.with_query("court", &courts);
        }
        if let Some(range) = query.date_range {
            if let Some(from) = range.from {
                request = request.with_query("filed_after", &format_date(from));
            }
            if let Some(to) = range.to {
                request = request.with_query("filed_before", &format_date(to));
            }
        }
        request
    }

    fn normalize_opinion(&self, opinion: OpinionHit, with_network: bool) -> SearchResult {
        let id = opinion
            .cluster_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| opinion.absolute_url.clone().unwrap_or_default());

        let mut result = SearchResult::new(self.descriptor.id.clone(), id, opinion.case_name);
        result.citation = opinion.citation.into_iter().next();
        result.court = opinion.court;
        result.date = opinion.date_filed.as_deref().and_then(parse_date_prefix);
        result.url = opinion
            .absolute_url
            .map(|path| format!("https://www.courtlistener.com{path}"));
        result.snippet = opinion.snippet.filter(|snippet| !snippet.trim().is_empty());
        if with_network {
            result.cites = opinion.cites.iter().map(u64::to_string).collect();
        }
        result
    }
}

/// Space-separated court ids covering every requested jurisdiction, or
/// `None` to search all courts. A national or unmapped code widens the
/// search rather than dropping opinions the caller asked for.
fn court_filter(query: &ResearchQuery) -> Option<String> {
    let mut courts = Vec::with_capacity(query.jurisdictions.len());
    for jurisdiction in &query.jurisdictions {
        let (_, ids) = COURTS
            .iter()
            .find(|(code, _)| *code == jurisdiction.as_str())?;
        courts.push(*ids);
    }
    Some(courts.join(" "))
}

impl LegalSource for CourtListenerAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    fn connect<'a>(&'a self, credentials: Credentials) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            let auth = match credentials.api_key {
                Some(token) => HttpAuth::Token(token),
                None => HttpAuth::Anonymous,
            };
            *self.auth.write().await = auth;
            Ok(())
        })
    }

    fn disconnect<'a>(&'a self) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            *self.auth.write().await = HttpAuth::Anonymous;
            Ok(())
        })
    }

    fn health_check<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async move {
            let started = Instant::now();
            let request = HttpRequest::get(format!("{}/courts/", self.base_url))
                .with_query("page_size", "1");
            match self.get(request).await {
                Ok(_) => HealthStatus::healthy(elapsed_ms(started)),
                Err(error) => HealthStatus::unhealthy(error.to_string()),
            }
        })
    }

    fn search_cases<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        Box::pin(async move {
            let response = self.get(self.search_request(query)).await?;
            let payload: SearchResponse = decode(SOURCE, &response)?;

            let limit = query.max_results.unwrap_or(usize::MAX);
            Ok(payload
                .results
                .into_iter()
                .take(limit)
                .map(|opinion| self.normalize_opinion(opinion, query.include_citation_network))
                .collect())
        })
    }

    fn get_citation<'a>(
        &'a self,
        id: &'a str,
        format: CitationFormat,
    ) -> SourceFuture<'a, Result<String, SourceError>> {
        Box::pin(async move {
            if id.is_empty() || !id.chars().all(|ch| ch.is_ascii_digit()) {
                return Err(SourceError::invalid_request(format!(
                    "courtlistener cluster id must be numeric, got '{id}'"
                )));
            }

            let request = HttpRequest::get(format!("{}/clusters/{id}/", self.base_url));
            let response = self.get(request).await?;
            let cluster: Cluster = decode(SOURCE, &response)?;

            let year = cluster
                .date_filed
                .as_deref()
                .and_then(parse_date_prefix)
                .map(|date| date.year());
            let parsed = cluster
                .citations
                .into_iter()
                .find_map(|citation| citation.into_parsed(year))
                .ok_or_else(|| {
                    SourceError::not_found(format!("cluster {id} has no reporter citation"))
                })?;

            Ok(citation::format_case(&cluster.case_name, &parsed, None, format))
        })
    }

    fn get_updates<'a>(&'a self, since: UtcDateTime) -> SourceFuture<'a, Vec<UpdateNotice>> {
        Box::pin(async move {
            let request = HttpRequest::get(format!("{}/search/", self.base_url))
                .with_query("type", "o")
                .with_query("order_by", "dateFiled desc")
                .with_query("filed_after", &format_date(since.date()));

            let payload = match self.get(request).await {
                Ok(response) => decode::<SearchResponse>(SOURCE, &response),
                Err(error) => Err(error),
            };

            match payload {
                Ok(payload) => payload
                    .results
                    .into_iter()
                    .take(UPDATE_FEED_LIMIT)
                    .filter_map(|opinion| {
                        let changed_at = opinion.date_filed.as_deref().and_then(parse_date_prefix)?;
                        Some(UpdateNotice {
                            id: opinion.cluster_id?.to_string(),
                            title: opinion.case_name,
                            kind: UpdateKind::NewOpinion,
                            changed_at,
                            url: opinion
                                .absolute_url
                                .map(|path| format!("https://www.courtlistener.com{path}")),
                            source: self.descriptor.id.clone(),
                        })
                    })
                    .collect(),
                Err(error) => {
                    tracing::warn!(adapter = %self.descriptor.id, %error, "update feed unavailable");
                    Vec::new()
                }
            }
        })
    }

    fn cost_estimate(&self, _operation: Operation, params: Option<CostParams>) -> CostEstimate {
        CostEstimate::new(0.0, 0.0, params)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<OpinionHit>,
}

#[derive(Debug, Deserialize)]
struct OpinionHit {
    #[serde(rename = "caseName", default)]
    case_name: String,
    #[serde(default)]
    court: Option<String>,
    #[serde(rename = "dateFiled", default)]
    date_filed: Option<String>,
    #[serde(default)]
    citation: Vec<String>,
    #[serde(default)]
    absolute_url: Option<String>,
    #[serde(default)]
    cluster_id: Option<u64>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    cites: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct Cluster {
    #[serde(default)]
    case_name: String,
    #[serde(default)]
    date_filed: Option<String>,
    #[serde(default)]
    citations: Vec<ClusterCitation>,
}

#[derive(Debug, Deserialize)]
struct ClusterCitation {
    volume: Option<u32>,
    reporter: Option<String>,
    page: Option<String>,
}

impl ClusterCitation {
    fn into_parsed(self, year: Option<i32>) -> Option<ParsedCitation> {
        Some(ParsedCitation {
            volume: self.volume?,
            reporter: self.reporter?,
            page: self.page?.trim().parse().ok()?,
            pin_cite: None,
            year,
        })
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use super::{decode, elapsed_ms, execute, format_date, parse_date_prefix};
use crate::data_source::{
    AdapterDescriptor, CostEstimate, CostParams, Credentials, Feature, HealthStatus, LegalSource,
    Operation, ResearchQuery, SourceError, SourceFuture,
};
use crate::domain::{
    CitationFormat, CitationValidation, SearchResult, UpdateKind, UpdateNotice, UtcDateTime,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::throttling::{RatePolicy, Throttle};
use crate::{AdapterCategory, AdapterId};

const DEFAULT_BASE_URL: &str = "https://api.westlaw.com/v1";
const SOURCE: &str = "westlaw";

/// Thomson Reuters Westlaw, a paid source covering every feature.
///
/// `connect` exchanges the API key for a bearer token; every other call
/// fails with `unauthorized` until it has.
#[derive(Clone)]
pub struct WestlawAdapter {
    descriptor: AdapterDescriptor,
    http_client: Arc<dyn HttpClient>,
    session: Arc<RwLock<Option<String>>>,
    throttle: Throttle,
    base_url: String,
    timeout: Duration,
}

impl Default for WestlawAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl WestlawAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            descriptor: AdapterDescriptor::new(
                AdapterId::from_static(SOURCE),
                "Westlaw",
                AdapterCategory::Commercial,
                ["us", "us-*"],
                [
                    Feature::CaseSearch,
                    Feature::StatuteSearch,
                    Feature::RegulationSearch,
                    Feature::CitationFormatting,
                    Feature::CitationValidation,
                    Feature::CitationNetwork,
                    Feature::Updates,
                ],
            ),
            http_client,
            session: Arc::new(RwLock::new(None)),
            throttle: Throttle::new(RatePolicy::westlaw_default()),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_id(mut self, id: AdapterId) -> Self {
        self.descriptor.id = id;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        let token = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| SourceError::unauthorized("westlaw session is not connected"))?;
        self.throttle.try_acquire(SOURCE)?;
        execute(
            self.http_client.as_ref(),
            SOURCE,
            request
                .with_auth(&HttpAuth::Bearer(token))
                .with_timeout(self.timeout),
        )
        .await
    }

    async fn search(
        &self,
        query: &ResearchQuery,
        content_type: &'static str,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let jurisdictions = query
            .jurisdictions
            .iter()
            .map(|jurisdiction| jurisdiction.as_str())
            .collect::<Vec<_>>();
        let mut body = json!({
            "query": query.text,
            "contentType": content_type,
            "jurisdictions": jurisdictions,
            "includeCitingReferences": query.include_citation_network,
        });
        if let Some(limit) = query.max_results {
            body["limit"] = json!(limit);
        }
        if let Some(range) = query.date_range {
            body["dateFrom"] = json!(range.from.map(format_date));
            body["dateTo"] = json!(range.to.map(format_date));
        }

        let request = HttpRequest::post(format!("{}/search", self.base_url))
            .with_json(&body);
        let response = self.send(request).await?;
        let payload: SearchResponse = decode(SOURCE, &response)?;

        Ok(payload
            .documents
            .into_iter()
            .map(|document| {
                let mut result =
                    SearchResult::new(self.descriptor.id.clone(), document.id, document.title);
                result.citation = document.citation;
                result.court = document.court;
                result.jurisdiction = document.jurisdiction;
                result.date = document.date.as_deref().and_then(parse_date_prefix);
                result.url = document.url;
                result.snippet = document.synopsis;
                result.relevance = document.relevance.map(|score| score.clamp(0.0, 1.0));
                if query.include_citation_network {
                    result.cites = document.citing_references;
                }
                result
            })
            .collect())
    }
}

impl LegalSource for WestlawAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    fn connect<'a>(&'a self, credentials: Credentials) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            let api_key = credentials
                .api_key
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| SourceError::unauthorized("westlaw requires an api key"))?;

            let body = json!({ "apiKey": api_key });
            let request = HttpRequest::post(format!("{}/auth/token", self.base_url))
                .with_json(&body)
                .with_timeout(self.timeout);
            let response = execute(self.http_client.as_ref(), SOURCE, request).await?;
            let token: TokenResponse = decode(SOURCE, &response)?;

            *self.session.write().await = Some(token.access_token);
            tracing::debug!(adapter = %self.descriptor.id, "westlaw session established");
            Ok(())
        })
    }

    fn disconnect<'a>(&'a self) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            self.session.write().await.take();
            Ok(())
        })
    }

    fn health_check<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async move {
            let started = Instant::now();
            match self
                .send(HttpRequest::get(format!("{}/status", self.base_url)))
                .await
            {
                Ok(_) => HealthStatus::healthy(elapsed_ms(started)),
                Err(error) => HealthStatus::unhealthy(error.to_string()),
            }
        })
    }

    fn search_cases<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        Box::pin(self.search(query, "cases"))
    }

    fn search_statutes<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        Box::pin(self.search(query, "statutes"))
    }

    fn search_regulations<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        Box::pin(self.search(query, "regulations"))
    }

    fn get_citation<'a>(
        &'a self,
        id: &'a str,
        format: CitationFormat,
    ) -> SourceFuture<'a, Result<String, SourceError>> {
        Box::pin(async move {
            let request = HttpRequest::get(format!(
                "{}/documents/{}/citation",
                self.base_url,
                urlencoding::encode(id)
            ))
            .with_query("format", format.as_str());
            let response = self.send(request).await?;
            let payload: CitationResponse = decode(SOURCE, &response)?;
            Ok(payload.citation)
        })
    }

    fn validate_citation<'a>(&'a self, text: &'a str) -> SourceFuture<'a, CitationValidation> {
        Box::pin(async move {
            let Some(parsed) = crate::citation::parse(text) else {
                return CitationValidation::invalid();
            };

            let request =
                HttpRequest::get(format!("{}/citations/validate", self.base_url)).with_query("cite", text);
            match self.send(request).await {
                Ok(response) => match decode::<ValidationResponse>(SOURCE, &response) {
                    Ok(payload) if payload.valid => CitationValidation::valid(parsed),
                    Ok(_) => CitationValidation::invalid(),
                    Err(error) => {
                        tracing::warn!(%error, "westlaw validation unreadable, using local parse");
                        CitationValidation::valid(parsed)
                    }
                },
                Err(error) => {
                    tracing::warn!(%error, "westlaw validation unavailable, using local parse");
                    CitationValidation::valid(parsed)
                }
            }
        })
    }

    fn get_updates<'a>(&'a self, since: UtcDateTime) -> SourceFuture<'a, Vec<UpdateNotice>> {
        Box::pin(async move {
            let request = HttpRequest::get(format!("{}/updates", self.base_url))
                .with_query("since", &since.format_rfc3339());

            let payload = match self.send(request).await {
                Ok(response) => decode::<UpdatesResponse>(SOURCE, &response),
                Err(error) => Err(error),
            };
            match payload {
                Ok(payload) => payload
                    .updates
                    .into_iter()
                    .filter_map(|update| {
                        Some(UpdateNotice {
                            changed_at: parse_date_prefix(&update.changed_at)?,
                            id: update.id,
                            title: update.title,
                            kind: match update.kind.as_str() {
                                "opinion" => UpdateKind::NewOpinion,
                                "statute" => UpdateKind::AmendedStatute,
                                "regulation" => UpdateKind::NewRegulation,
                                _ => UpdateKind::Other,
                            },
                            url: update.url,
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

    fn cost_estimate(&self, operation: Operation, params: Option<CostParams>) -> CostEstimate {
        match operation {
            Operation::Search
            | Operation::SearchCases
            | Operation::SearchStatutes
            | Operation::SearchRegulations => CostEstimate::new(0.50, 0.0, params),
            Operation::GetCitation => CostEstimate::new(0.10, 0.0, params),
            Operation::GetUpdates => CostEstimate::new(0.25, 0.0, params),
            Operation::ValidateCitation => CostEstimate::free(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    id: String,
    #[serde(default)]
    title: String,
    citation: Option<String>,
    court: Option<String>,
    jurisdiction: Option<String>,
    date: Option<String>,
    url: Option<String>,
    synopsis: Option<String>,
    relevance: Option<f64>,
    #[serde(default)]
    citing_references: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CitationResponse {
    citation: String,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    valid: bool,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    updates: Vec<UpdateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    kind: String,
    changed_at: String,
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::RecordingHttpClient;
    use crate::data_source::SourceErrorKind;

    const TOKEN_BODY: &str = r#"{"access_token": "wl-session", "expires_in": 3600}"#;

    fn connected_client(responses: Vec<&str>) -> Arc<RecordingHttpClient> {
        let mut queue = vec![Ok(HttpResponse::ok_json(TOKEN_BODY))];
        queue.extend(responses.into_iter().map(|body| Ok(HttpResponse::ok_json(body))));
        Arc::new(RecordingHttpClient::with_responses(queue))
    }

    #[tokio::test]
    async fn connect_without_key_is_unauthorized() {
        let adapter = WestlawAdapter::default();
        let error = adapter
            .connect(Credentials::default())
            .await
            .expect_err("key required");
        assert_eq!(error.kind(), SourceErrorKind::Unauthorized);
        assert!(!adapter.is_connected().await);
    }

    #[tokio::test]
    async fn calls_before_connect_are_unauthorized() {
        let client = Arc::new(RecordingHttpClient::with_responses(Vec::new()));
        let adapter = WestlawAdapter::with_http_client(client.clone());
        let query = ResearchQuery::parse("fair use", &["us"]).expect("valid query");

        let error = adapter.search_cases(&query).await.expect_err("not connected");
        assert_eq!(error.kind(), SourceErrorKind::Unauthorized);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn search_uses_session_token() {
        let client = connected_client(vec![
            r#"{"documents": [{
                "id": "I8c0d",
                "title": "Campbell v. Acuff-Rose Music, Inc.",
                "citation": "510 U.S. 569",
                "relevance": 0.93,
                "citingReferences": ["I1234"]
            }]}"#,
        ]);
        let adapter = WestlawAdapter::with_http_client(client.clone());
        adapter
            .connect(Credentials::api_key("wl-key"))
            .await
            .expect("connect succeeds");

        let query = ResearchQuery::parse("fair use", &["us-ny"]).expect("valid query");
        let results = adapter.search_cases(&query).await.expect("search succeeds");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relevance, Some(0.93));
        assert!(results[0].cites.is_empty());

        let requests = client.recorded_requests();
        assert!(requests[0].url.ends_with("/auth/token"));
        assert_eq!(
            requests[1].headers.get("authorization").map(String::as_str),
            Some("Bearer wl-session")
        );
        assert!(requests[1].body.as_deref().unwrap_or_default().contains("\"cases\""));
    }

    #[tokio::test]
    async fn disconnect_drops_session() {
        let client = connected_client(Vec::new());
        let adapter = WestlawAdapter::with_http_client(client);
        adapter
            .connect(Credentials::api_key("wl-key"))
            .await
            .expect("connect succeeds");
        assert!(adapter.is_connected().await);

        adapter.disconnect().await.expect("disconnect succeeds");
        assert!(!adapter.is_connected().await);
    }

    #[tokio::test]
    async fn validation_falls_back_to_local_parse() {
        let adapter = WestlawAdapter::default();

        let valid = adapter.validate_citation("410 U.S. 113 (1973)").await;
        assert!(valid.valid);
        let invalid = adapter.validate_citation("not a cite").await;
        assert!(!invalid.valid);
    }

    #[test]
    fn search_is_priced_per_query() {
        let adapter = WestlawAdapter::default();
        let search = adapter.cost_estimate(Operation::Search, None);
        assert!((search.estimated_total - 0.50).abs() < 1e-9);
        let citation = adapter.cost_estimate(Operation::GetCitation, None);
        assert!((citation.estimated_total - 0.10).abs() < 1e-9);
        assert!(!search.is_free());
    }
}

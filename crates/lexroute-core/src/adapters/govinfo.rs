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
use crate::domain::{SearchResult, UpdateKind, UpdateNotice, UtcDateTime};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, NoopHttpClient};
use crate::throttling::{RatePolicy, Throttle};
use crate::{AdapterCategory, AdapterId};

const DEFAULT_BASE_URL: &str = "https://api.govinfo.gov";
const SOURCE: &str = "govinfo";
const DEMO_KEY: &str = "DEMO_KEY";
const DEFAULT_PAGE_SIZE: usize = 20;

/// Collections searched for each query kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    UsCode,
    Cfr,
}

impl Collection {
    const fn code(self) -> &'static str {
        match self {
            Self::UsCode => "USCODE",
            Self::Cfr => "CFR",
        }
    }

    const fn update_kind(self) -> UpdateKind {
        match self {
            Self::UsCode => UpdateKind::AmendedStatute,
            Self::Cfr => UpdateKind::NewRegulation,
        }
    }
}

/// GPO GovInfo: US Code and Code of Federal Regulations.
///
/// Runs with the public `DEMO_KEY` until `connect` supplies a real key.
#[derive(Clone)]
pub struct GovInfoAdapter {
    descriptor: AdapterDescriptor,
    http_client: Arc<dyn HttpClient>,
    api_key: Arc<RwLock<String>>,
    throttle: Throttle,
    base_url: String,
    timeout: Duration,
}

impl Default for GovInfoAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl GovInfoAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            descriptor: AdapterDescriptor::new(
                AdapterId::from_static(SOURCE),
                "GovInfo",
                AdapterCategory::Government,
                ["us", "us-fed"],
                [
                    Feature::StatuteSearch,
                    Feature::RegulationSearch,
                    Feature::Updates,
                ],
            ),
            http_client,
            api_key: Arc::new(RwLock::new(String::from(DEMO_KEY))),
            throttle: Throttle::new(RatePolicy::govinfo_default()),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout: Duration::from_secs(10),
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

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        self.throttle.try_acquire(SOURCE)?;
        let api_key = self.api_key.read().await.clone();
        execute(
            self.http_client.as_ref(),
            SOURCE,
            request
                .with_query("api_key", &api_key)
                .with_timeout(self.timeout),
        )
        .await
    }

    async fn search_collection(
        &self,
        query: &ResearchQuery,
        collection: Collection,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let mut expression = format!("{} collection:({})", query.text, collection.code());
        if let Some(range) = query.date_range {
            let from = range.from.map(format_date).unwrap_or_else(|| String::from("*"));
            let to = range.to.map(format_date).unwrap_or_else(|| String::from("*"));
            expression.push_str(&format!(" publishdate:range({from},{to})"));
        }

        let page_size = query.max_results.unwrap_or(DEFAULT_PAGE_SIZE).min(100);
        let body = json!({
            "query": expression,
            "pageSize": page_size,
            "offsetMark": "*",
        });

        let request = HttpRequest::post(format!("{}/search", self.base_url))
            .with_json(&body);
        let response = self.send(request).await?;
        let payload: SearchResponse = decode(SOURCE, &response)?;

        Ok(payload
            .results
            .into_iter()
            .take(page_size)
            .map(|hit| {
                let mut result =
                    SearchResult::new(self.descriptor.id.clone(), hit.package_id, hit.title);
                result.citation = hit.granule_id;
                result.jurisdiction = Some(String::from("us-fed"));
                result.date = hit.date_issued.as_deref().and_then(parse_date_prefix);
                result.url = hit.result_link;
                result
            })
            .collect())
    }

    async fn collection_updates(
        &self,
        since: UtcDateTime,
        collection: Collection,
    ) -> Result<Vec<UpdateNotice>, SourceError> {
        let request = HttpRequest::get(format!(
            "{}/collections/{}/{}",
            self.base_url,
            collection.code(),
            since.format_rfc3339()
        ))
        .with_query("offsetMark", "*")
        .with_query("pageSize", "100");

        let response = self.send(request).await?;
        let payload: PackagesResponse = decode(SOURCE, &response)?;

        Ok(payload
            .packages
            .into_iter()
            .filter_map(|package| {
                let changed_at = package.last_modified.as_deref().and_then(parse_date_prefix)?;
                Some(UpdateNotice {
                    id: package.package_id,
                    title: package.title,
                    kind: collection.update_kind(),
                    changed_at,
                    url: package.package_link,
                    source: self.descriptor.id.clone(),
                })
            })
            .collect())
    }
}

impl LegalSource for GovInfoAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    fn connect<'a>(&'a self, credentials: Credentials) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            let key = credentials
                .api_key
                .filter(|key| !key.trim().is_empty())
                .unwrap_or_else(|| String::from(DEMO_KEY));
            *self.api_key.write().await = key;
            Ok(())
        })
    }

    fn disconnect<'a>(&'a self) -> SourceFuture<'a, Result<(), SourceError>> {
        Box::pin(async move {
            *self.api_key.write().await = String::from(DEMO_KEY);
            Ok(())
        })
    }

    fn health_check<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async move {
            let started = Instant::now();
            match self
                .send(HttpRequest::get(format!("{}/collections", self.base_url)))
                .await
            {
                Ok(_) => HealthStatus::healthy(elapsed_ms(started)),
                Err(error) => HealthStatus::unhealthy(error.to_string()),
            }
        })
    }

    fn search_statutes<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        Box::pin(self.search_collection(query, Collection::UsCode))
    }

    fn search_regulations<'a>(
        &'a self,
        query: &'a ResearchQuery,
    ) -> SourceFuture<'a, Result<Vec<SearchResult>, SourceError>> {
        Box::pin(self.search_collection(query, Collection::Cfr))
    }

    fn get_updates<'a>(&'a self, since: UtcDateTime) -> SourceFuture<'a, Vec<UpdateNotice>> {
        Box::pin(async move {
            let mut notices = Vec::new();
            for collection in [Collection::UsCode, Collection::Cfr] {
                match self.collection_updates(since, collection).await {
                    Ok(batch) => notices.extend(batch),
                    Err(error) => tracing::warn!(
                        adapter = %self.descriptor.id,
                        collection = collection.code(),
                        %error,
                        "update feed unavailable"
                    ),
                }
            }
            notices
        })
    }

    fn cost_estimate(&self, _operation: Operation, params: Option<CostParams>) -> CostEstimate {
        CostEstimate::new(0.0, 0.0, params)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    package_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    granule_id: Option<String>,
    #[serde(default)]
    date_issued: Option<String>,
    #[serde(default)]
    result_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackagesResponse {
    #[serde(default)]
    packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Package {
    package_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default)]
    package_link: Option<String>,
}

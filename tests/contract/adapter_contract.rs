use std::sync::Arc;

use lexroute_core::{
    CourtListenerAdapter, Credentials, Feature, GovInfoAdapter, HttpClient, HttpResponse,
    JurisdictionPattern, LegalSource, NoopHttpClient, Operation, QueryType, ResearchQuery,
    SourceErrorKind, UtcDateTime, WestlawAdapter,
};

use lexroute_tests::support::RecordingHttpClient;

struct AdapterCase {
    id: &'static str,
    build: fn(Arc<dyn HttpClient>) -> Arc<dyn LegalSource>,
    free: bool,
}

fn courtlistener(http: Arc<dyn HttpClient>) -> Arc<dyn LegalSource> {
    Arc::new(CourtListenerAdapter::with_http_client(http))
}

fn govinfo(http: Arc<dyn HttpClient>) -> Arc<dyn LegalSource> {
    Arc::new(GovInfoAdapter::with_http_client(http))
}

fn westlaw(http: Arc<dyn HttpClient>) -> Arc<dyn LegalSource> {
    Arc::new(WestlawAdapter::with_http_client(http))
}

fn adapter_cases() -> Vec<AdapterCase> {
    vec![
        AdapterCase {
            id: "courtlistener",
            build: courtlistener,
            free: true,
        },
        AdapterCase {
            id: "govinfo",
            build: govinfo,
            free: true,
        },
        AdapterCase {
            id: "westlaw",
            build: westlaw,
            free: false,
        },
    ]
}

fn query(query_type: QueryType) -> ResearchQuery {
    ResearchQuery::parse("fair use", &["us"])
        .expect("valid query")
        .with_type(query_type)
}

fn search_feature(query_type: QueryType) -> Feature {
    query_type
        .required_feature()
        .expect("typed queries require a feature")
}

#[test]
fn descriptors_are_well_formed() {
    for case in adapter_cases() {
        let adapter = (case.build)(Arc::new(NoopHttpClient));
        let descriptor = adapter.descriptor();

        assert_eq!(descriptor.id.as_str(), case.id);
        assert!(!descriptor.name.is_empty(), "adapter '{}': name", case.id);
        assert!(!descriptor.features.is_empty(), "adapter '{}': features", case.id);
        assert!(
            !descriptor.jurisdictions.is_empty(),
            "adapter '{}': jurisdictions",
            case.id
        );
        for entry in &descriptor.jurisdictions {
            JurisdictionPattern::parse(entry).unwrap_or_else(|error| {
                panic!("adapter '{}': jurisdiction '{entry}' invalid: {error}", case.id)
            });
        }
    }
}

#[test]
fn cost_estimates_are_total_and_non_negative() {
    let operations = [
        Operation::Search,
        Operation::SearchCases,
        Operation::SearchStatutes,
        Operation::SearchRegulations,
        Operation::GetCitation,
        Operation::ValidateCitation,
        Operation::GetUpdates,
    ];

    for case in adapter_cases() {
        let adapter = (case.build)(Arc::new(NoopHttpClient));
        for operation in operations {
            let estimate = adapter.cost_estimate(operation, None);
            assert!(
                estimate.estimated_total >= 0.0,
                "adapter '{}': {operation:?} cost",
                case.id
            );
            assert_eq!(estimate.currency, "USD");
        }
        assert_eq!(
            adapter.cost_estimate(Operation::Search, None).is_free(),
            case.free,
            "adapter '{}': search pricing",
            case.id
        );
    }
}

#[tokio::test]
async fn unsupported_searches_return_empty_without_calling_upstream() {
    for case in adapter_cases() {
        for query_type in [QueryType::CaseLaw, QueryType::Statute, QueryType::Regulation] {
            let client = Arc::new(RecordingHttpClient::default());
            let adapter = (case.build)(client.clone());
            if adapter.supported_features().supports(search_feature(query_type)) {
                continue;
            }

            let query = query(query_type);
            let results = match query_type {
                QueryType::CaseLaw => adapter.search_cases(&query).await,
                QueryType::Statute => adapter.search_statutes(&query).await,
                _ => adapter.search_regulations(&query).await,
            }
            .unwrap_or_else(|error| panic!("adapter '{}': {query_type} failed: {error}", case.id));

            assert!(results.is_empty(), "adapter '{}': {query_type}", case.id);
            assert!(client.requests().is_empty(), "adapter '{}': no upstream call", case.id);
        }
    }
}

#[tokio::test]
async fn supported_searches_tolerate_empty_payloads() {
    for case in adapter_cases().into_iter().filter(|case| case.free) {
        let adapter = (case.build)(Arc::new(NoopHttpClient));
        for query_type in [QueryType::CaseLaw, QueryType::Statute, QueryType::Regulation] {
            if !adapter.supported_features().supports(search_feature(query_type)) {
                continue;
            }
            let query = query(query_type);
            let results = match query_type {
                QueryType::CaseLaw => adapter.search_cases(&query).await,
                QueryType::Statute => adapter.search_statutes(&query).await,
                _ => adapter.search_regulations(&query).await,
            }
            .unwrap_or_else(|error| panic!("adapter '{}': {query_type} failed: {error}", case.id));
            assert!(results.is_empty());
        }
    }
}

#[tokio::test]
async fn upstream_outage_maps_to_unavailable() {
    for case in adapter_cases() {
        let mut responses = Vec::new();
        if !case.free {
            responses.push(Ok(HttpResponse::ok_json(r#"{"access_token":"session"}"#)));
        }
        responses.push(Ok(HttpResponse {
            status: 503,
            body: String::new(),
        }));
        let adapter = (case.build)(Arc::new(RecordingHttpClient::with_responses(responses)));
        if !case.free {
            adapter
                .connect(Credentials::api_key("key"))
                .await
                .expect("session established");
        }

        let query = query(QueryType::Statute);
        let outcome = if adapter.supported_features().supports(Feature::CaseSearch) {
            adapter.search_cases(&query).await
        } else {
            adapter.search_statutes(&query).await
        };

        let error = outcome.expect_err("503 must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "adapter '{}'", case.id);
        assert!(error.retryable(), "adapter '{}'", case.id);
    }
}

#[tokio::test]
async fn health_checks_report_instead_of_failing() {
    for case in adapter_cases() {
        let client = Arc::new(RecordingHttpClient::status(500));
        let adapter = (case.build)(client);

        let status = adapter.health_check().await;

        assert!(!status.healthy, "adapter '{}'", case.id);
        assert!(status.error.is_some(), "adapter '{}'", case.id);
    }
}

#[tokio::test]
async fn update_feeds_are_best_effort() {
    let since = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid timestamp");
    for case in adapter_cases() {
        let client = Arc::new(RecordingHttpClient::status(500));
        let adapter = (case.build)(client);

        let updates = adapter.get_updates(since).await;

        assert!(updates.is_empty(), "adapter '{}'", case.id);
    }
}

#[tokio::test]
async fn malformed_citations_are_invalid_everywhere() {
    for case in adapter_cases() {
        let client = Arc::new(RecordingHttpClient::default());
        let adapter = (case.build)(client.clone());

        let validation = adapter.validate_citation("see generally the law").await;

        assert!(!validation.valid, "adapter '{}'", case.id);
        assert!(validation.parsed.is_none());
        assert!(client.requests().is_empty(), "adapter '{}': parsed locally", case.id);
    }
}

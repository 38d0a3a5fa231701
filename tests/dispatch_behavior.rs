use std::sync::Arc;
use std::time::Duration;

use lexroute_core::{
    AdapterCategory, AdapterRegistry, AttemptOutcome, CircuitState, CitationFormat,
    DispatchError, Feature, QueryPreferences, ResearchDispatcher, SourceError, SourceErrorKind,
};

use lexroute_tests::support::{breaker, case_query, id, trip, StubSource};

fn dispatcher(adapters: &[Arc<StubSource>]) -> ResearchDispatcher {
    let registry = AdapterRegistry::new();
    for adapter in adapters {
        registry
            .register_adapter(adapter.clone())
            .expect("stub registers");
    }
    ResearchDispatcher::new(
        Arc::new(registry),
        Arc::new(breaker(5, Duration::from_secs(60))),
    )
}

#[tokio::test]
async fn open_circuit_is_skipped_and_next_candidate_serves() {
    let preferred = StubSource::new("courtlistener", AdapterCategory::OpenSource, &["us"]).shared();
    let fallback = StubSource::new("westlaw", AdapterCategory::Commercial, &["us"])
        .with_cost(0.50)
        .shared();
    let dispatcher = dispatcher(&[preferred.clone(), fallback.clone()]);
    trip(dispatcher.breaker(), "courtlistener");

    let success = dispatcher
        .search(&case_query("fair use", &["us"]), &QueryPreferences::default())
        .await
        .expect("fallback serves");

    assert_eq!(success.served_by, id("westlaw"));
    assert_eq!(preferred.calls(), 0, "open circuit must not be called");
    assert_eq!(fallback.calls(), 1);
    assert_eq!(success.attempts.len(), 2);
    assert_eq!(success.attempts[0].adapter, id("courtlistener"));
    assert_eq!(success.attempts[0].outcome, AttemptOutcome::SkippedCircuitOpen);
    assert_eq!(success.attempts[1].outcome, AttemptOutcome::Succeeded);
    assert!(success.data.iter().all(|result| result.source == id("westlaw")));
}

#[tokio::test]
async fn all_open_circuits_exhaust_without_external_calls() {
    let statewide = StubSource::new("states", AdapterCategory::OpenSource, &["us-*"]).shared();
    let texas = StubSource::new("texas", AdapterCategory::Government, &["us-tx"]).shared();
    let dispatcher = dispatcher(&[statewide.clone(), texas.clone()]);
    trip(dispatcher.breaker(), "states");
    trip(dispatcher.breaker(), "texas");

    let error = dispatcher
        .search(&case_query("adverse possession", &["us-tx"]), &QueryPreferences::default())
        .await
        .expect_err("every candidate is open");

    let report = error.report().expect("exhaustion carries a report");
    assert_eq!(report.calls_made(), 0);
    assert_eq!(statewide.calls() + texas.calls(), 0);
    let named = report
        .attempts
        .iter()
        .map(|attempt| attempt.adapter.as_str())
        .collect::<Vec<_>>();
    assert!(named.contains(&"states"));
    assert!(named.contains(&"texas"));

    let message = error.to_string();
    assert!(message.contains("states: skipped_circuit_open"));
    assert!(message.contains("texas: skipped_circuit_open"));
}

#[tokio::test]
async fn failure_is_recorded_and_next_candidate_serves() {
    let broken = StubSource::new("broken", AdapterCategory::OpenSource, &["us"])
        .failing()
        .shared();
    let healthy = StubSource::new("healthy", AdapterCategory::Commercial, &["us"]).shared();
    let dispatcher = dispatcher(&[broken.clone(), healthy.clone()]);

    let success = dispatcher
        .search(&case_query("fair use", &["us"]), &QueryPreferences::default())
        .await
        .expect("second candidate serves");

    assert_eq!(success.served_by, id("healthy"));
    assert_eq!(broken.calls(), 1);
    assert_eq!(dispatcher.breaker().failure_count("broken"), 1);
    assert!(matches!(
        success.attempts[0].outcome,
        AttemptOutcome::Failed { ref error } if error.kind() == SourceErrorKind::Unavailable
    ));
}

#[tokio::test]
async fn timeout_counts_as_failure() {
    let slow = StubSource::new("slow", AdapterCategory::OpenSource, &["us"])
        .stalling(Duration::from_secs(5))
        .shared();
    let quick = StubSource::new("quick", AdapterCategory::Commercial, &["us"]).shared();
    let dispatcher = dispatcher(&[slow.clone(), quick.clone()]);
    let preferences = QueryPreferences::default().with_timeout(Duration::from_millis(20));

    let success = dispatcher
        .search(&case_query("fair use", &["us"]), &preferences)
        .await
        .expect("quick candidate serves");

    assert_eq!(success.served_by, id("quick"));
    assert_eq!(dispatcher.breaker().failure_count("slow"), 1);
    assert!(matches!(
        success.attempts[0].outcome,
        AttemptOutcome::Failed { ref error } if error.kind() == SourceErrorKind::Timeout
    ));
}

#[tokio::test]
async fn failed_candidates_are_not_retried_within_a_request() {
    let first = StubSource::new("first", AdapterCategory::OpenSource, &["us"])
        .failing()
        .shared();
    let second = StubSource::new("second", AdapterCategory::Commercial, &["us"])
        .failing()
        .shared();
    let dispatcher = dispatcher(&[first.clone(), second.clone()]);

    let error = dispatcher
        .search(&case_query("fair use", &["us"]), &QueryPreferences::default())
        .await
        .expect_err("everything fails");

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    let report = error.report().expect("exhaustion report");
    assert_eq!(report.calls_made(), 2);
    assert_eq!(report.domain, "search:case_law");
}

#[tokio::test]
async fn repeated_failures_trip_the_circuit_for_later_requests() {
    let flaky = StubSource::new("flaky", AdapterCategory::OpenSource, &["us"])
        .failing()
        .shared();
    let dispatcher = dispatcher(&[flaky.clone()]);
    let query = case_query("fair use", &["us"]);

    for _ in 0..5 {
        let _ = dispatcher.search(&query, &QueryPreferences::default()).await;
    }
    assert_eq!(dispatcher.breaker().state("flaky"), CircuitState::Open);

    let error = dispatcher
        .search(&query, &QueryPreferences::default())
        .await
        .expect_err("circuit open");
    assert_eq!(flaky.calls(), 5);
    assert_eq!(error.report().map(|report| report.calls_made()), Some(0));
}

#[tokio::test]
async fn uncovered_jurisdiction_has_no_candidate() {
    let federal = StubSource::new("federal", AdapterCategory::Government, &["us"]).shared();
    let dispatcher = dispatcher(&[federal.clone()]);

    let error = dispatcher
        .search(&case_query("fair use", &["uk"]), &QueryPreferences::default())
        .await
        .expect_err("nobody covers uk");

    assert!(matches!(error, DispatchError::NoCandidate { .. }));
    assert!(error.report().is_none());
    assert_eq!(federal.calls(), 0);
}

#[tokio::test]
async fn quality_floor_filters_served_results() {
    let source = StubSource::new("source", AdapterCategory::OpenSource, &["us"]).shared();
    let dispatcher = dispatcher(&[source]);

    let strict = QueryPreferences::default()
        .with_min_quality(0.95)
        .expect("valid floor");
    let success = dispatcher
        .search(&case_query("fair use", &["us"]), &strict)
        .await
        .expect("served");

    assert!(success.data.is_empty(), "0.9 relevance is below the floor");
}

#[tokio::test]
async fn generic_dispatch_routes_custom_operations() {
    let source = StubSource::new("source", AdapterCategory::OpenSource, &["us"]).shared();
    let dispatcher = dispatcher(&[source.clone()]);

    let success = dispatcher
        .dispatch(
            "count_cases",
            &case_query("fair use", &["us"]),
            &QueryPreferences::default(),
            |adapter, query| {
                Box::pin(async move {
                    let results = adapter.search_cases(query).await?;
                    Ok::<_, SourceError>(results.len())
                })
            },
        )
        .await
        .expect("dispatched");

    assert_eq!(success.data, 1);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn direct_operations_respect_registration_and_circuit() {
    let source = StubSource::new("source", AdapterCategory::OpenSource, &["us"]).shared();
    let dispatcher = dispatcher(&[source]);

    let validation = dispatcher
        .validate_citation(&id("source"), "410 U.S. 113 (1973)", None)
        .await
        .expect("validated");
    assert!(validation.data.valid);

    let unknown = dispatcher
        .get_citation(&id("missing"), "1", CitationFormat::Bluebook, None)
        .await
        .expect_err("unregistered adapter");
    assert!(matches!(unknown, DispatchError::NoCandidate { .. }));

    trip(dispatcher.breaker(), "source");
    let blocked = dispatcher
        .validate_citation(&id("source"), "410 U.S. 113", None)
        .await
        .expect_err("circuit open");
    assert_eq!(blocked.report().map(|report| report.calls_made()), Some(0));
}

#[tokio::test]
async fn citation_requests_without_formatting_support_do_not_disable_search() {
    let source = StubSource::new("source", AdapterCategory::OpenSource, &["us"]).shared();
    let dispatcher = dispatcher(&[source.clone()]);

    for _ in 0..5 {
        let error = dispatcher
            .get_citation(&id("source"), "1", CitationFormat::Bluebook, None)
            .await
            .expect_err("stub cannot format citations");
        assert!(matches!(error, DispatchError::NoCandidate { .. }));
    }

    assert_eq!(dispatcher.breaker().state("source"), CircuitState::Closed);
    assert_eq!(dispatcher.breaker().failure_count("source"), 0);

    let success = dispatcher
        .search(&case_query("fair use", &["us"]), &QueryPreferences::default())
        .await
        .expect("search still served");
    assert_eq!(success.served_by, id("source"));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn citation_served_by_formatting_adapter() {
    let source = StubSource::new("source", AdapterCategory::OpenSource, &["us"])
        .with_features(&[Feature::CaseSearch, Feature::CitationFormatting])
        .shared();
    let dispatcher = dispatcher(&[source]);

    let success = dispatcher
        .get_citation(&id("source"), "1", CitationFormat::Bluebook, None)
        .await
        .expect("formatting adapter is a candidate");

    assert_eq!(success.served_by, id("source"));
    assert!(success.data.is_empty());
    assert_eq!(dispatcher.breaker().failure_count("source"), 0);
}

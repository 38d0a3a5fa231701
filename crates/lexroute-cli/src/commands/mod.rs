mod adapters;
mod chain;
mod cite;
mod health;
mod search;
mod validate;

use std::sync::Arc;
use std::time::Instant;

use lexroute_core::{
    AdapterFactory, AdapterRegistry, Attempt, AttemptOutcome, CircuitBreaker, DateRange,
    HttpClient, Jurisdiction, NoopHttpClient, QueryPreferences, QueryType, ReqwestHttpClient,
    ResearchDispatcher, ResearchQuery, RouterConfig,
};
use serde_json::{json, Value};

use crate::cli::{Cli, Command, QueryArgs};
use crate::error::CliError;
use crate::output::Envelope;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }
}

/// Loaded configuration plus the shared registry, breaker and dispatcher.
pub struct Runtime {
    pub config: RouterConfig,
    pub dispatcher: ResearchDispatcher,
    pub warnings: Vec<String>,
}

impl Runtime {
    pub async fn start(cli: &Cli) -> Result<Self, CliError> {
        let config = RouterConfig::load(cli.config.as_deref())?.with_env_credentials();

        let http_client: Arc<dyn HttpClient> = if cli.offline {
            Arc::new(NoopHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };
        let factory = AdapterFactory::builtin(http_client);

        let registry = Arc::new(AdapterRegistry::new());
        let report = registry.load_from_configs(&factory, &config.adapters).await;
        let warnings = report
            .failed
            .iter()
            .map(|failure| format!("adapter '{}' not loaded: {}", failure.id, failure.error))
            .collect();

        let breaker = Arc::new(CircuitBreaker::new(config.breaker_config()));
        Ok(Self {
            dispatcher: ResearchDispatcher::new(registry, breaker),
            config,
            warnings,
        })
    }

    pub fn registry(&self) -> &AdapterRegistry {
        self.dispatcher.registry()
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let started = Instant::now();
    let runtime = Runtime::start(cli).await?;

    let (name, result) = match &cli.command {
        Command::Search(args) => ("search", search::run(args, &runtime).await?),
        Command::Chain(args) => ("chain", chain::run(args, &runtime)?),
        Command::Adapters => ("adapters", adapters::run(&runtime)?),
        Command::Health => ("health", health::run(&runtime).await?),
        Command::Cite(args) => ("cite", cite::run(args, &runtime).await?),
        Command::Validate(args) => ("validate", validate::run(args, &runtime).await?),
    };

    let mut warnings = runtime.warnings;
    warnings.extend(result.warnings);
    let latency_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
    Ok(Envelope::new(name, result.data, latency_ms, warnings))
}

/// Validates shared query flags into a query and preferences.
fn build_query(args: &QueryArgs) -> Result<(ResearchQuery, QueryPreferences), CliError> {
    let jurisdictions = args
        .jurisdictions
        .iter()
        .map(|code| Jurisdiction::parse(code))
        .collect::<Result<Vec<_>, _>>()?;
    let query_type = args.query_type.parse::<QueryType>()?;

    let mut query = ResearchQuery::new(args.text.trim(), jurisdictions)?.with_type(query_type);
    if args.from.is_some() || args.to.is_some() {
        query = query.with_date_range(DateRange::new(args.from, args.to)?);
    }

    let mut preferences = QueryPreferences {
        prefer_free: args.prefer_free,
        ..QueryPreferences::default()
    };
    if let Some(max_cost) = args.max_cost {
        preferences = preferences.with_max_cost(max_cost)?;
    }
    Ok((query, preferences))
}

fn attempts_json(attempts: &[Attempt]) -> Value {
    Value::Array(
        attempts
            .iter()
            .map(|attempt| match &attempt.outcome {
                AttemptOutcome::Failed { error } | AttemptOutcome::Declined { error } => json!({
                    "adapter": attempt.adapter,
                    "outcome": attempt.outcome.label(),
                    "code": error.code(),
                    "message": error.message(),
                }),
                outcome => json!({
                    "adapter": attempt.adapter,
                    "outcome": outcome.label(),
                }),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use lexroute_core::{AdapterId, SourceError};

    use super::*;

    fn args(codes: &[&str], query_type: &str) -> QueryArgs {
        QueryArgs {
            text: String::from(" fair use "),
            jurisdictions: codes.iter().map(|code| code.to_string()).collect(),
            query_type: query_type.to_owned(),
            prefer_free: true,
            max_cost: Some(0.25),
            from: None,
            to: None,
        }
    }

    #[test]
    fn builds_query_and_preferences() {
        let (query, preferences) = build_query(&args(&["us", "US-CA"], "statute")).expect("valid");

        assert_eq!(query.text, "fair use");
        assert_eq!(query.jurisdictions[1].as_str(), "us-ca");
        assert_eq!(query.query_type, QueryType::Statute);
        assert!(preferences.prefer_free);
        assert_eq!(preferences.max_cost, Some(0.25));
    }

    #[test]
    fn rejects_wildcard_query_jurisdiction() {
        let error = build_query(&args(&["us-*"], "mixed")).err().expect("invalid");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn rejects_unknown_query_type() {
        assert!(build_query(&args(&["us"], "treaty")).is_err());
    }

    fn offline_cli(config: &std::path::Path, command: &[&str]) -> Cli {
        let config = config.to_str().expect("utf-8 temp path");
        let mut argv = vec!["lexroute", "--offline", "--config", config];
        argv.extend_from_slice(command);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    fn write_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("lexroute.yaml");
        std::fs::write(
            &path,
            "adapters:\n  - id: courtlistener\n  - id: govinfo\n  - id: casetext\n    plugin: casetext\n",
        )
        .expect("config written");
        path
    }

    #[tokio::test]
    async fn offline_chain_ranks_configured_adapters() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cli = offline_cli(
            &write_config(&dir),
            &["chain", "fair use", "-j", "us", "--prefer-free"],
        );

        let envelope = run(&cli).await.expect("chain runs");

        assert_eq!(envelope.meta.command, "chain");
        assert_eq!(envelope.data["chain"][0]["adapter"], "courtlistener");
        assert_eq!(envelope.data["chain"][1]["adapter"], "govinfo");
        assert!(envelope
            .meta
            .warnings
            .iter()
            .any(|warning| warning.contains("casetext")));
    }

    #[tokio::test]
    async fn offline_search_is_served_by_top_candidate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cli = offline_cli(&write_config(&dir), &["search", "fair use", "-j", "us"]);

        let envelope = run(&cli).await.expect("search runs");

        assert_eq!(envelope.data["served_by"], "courtlistener");
        assert_eq!(envelope.data["results"], json!([]));
    }

    #[tokio::test]
    async fn offline_health_reports_adapters_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cli = offline_cli(&write_config(&dir), &["health"]);

        let envelope = run(&cli).await.expect("health runs");

        assert!(envelope.data["adapters"].get("courtlistener").is_some());
        assert!(envelope.data["adapters"].get("govinfo").is_some());
        assert!(envelope.data.get("circuits").is_none());
    }

    #[test]
    fn failed_attempts_carry_error_code() {
        let attempts = vec![
            Attempt {
                adapter: AdapterId::parse("westlaw").expect("valid id"),
                outcome: AttemptOutcome::SkippedCircuitOpen,
            },
            Attempt {
                adapter: AdapterId::parse("govinfo").expect("valid id"),
                outcome: AttemptOutcome::Failed {
                    error: SourceError::unavailable("down"),
                },
            },
            Attempt {
                adapter: AdapterId::parse("courtlistener").expect("valid id"),
                outcome: AttemptOutcome::Declined {
                    error: SourceError::throttled("budget spent"),
                },
            },
        ];

        let value = attempts_json(&attempts);
        assert_eq!(value[0]["outcome"], "skipped_circuit_open");
        assert_eq!(value[1]["code"], "source.unavailable");
        assert_eq!(value[2]["outcome"], "declined");
        assert_eq!(value[2]["code"], "source.throttled");
    }
}

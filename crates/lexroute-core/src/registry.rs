//! Adapter registry: registration, lookup, ranking and fleet health.
//!
//! The registry owns every registered adapter together with its
//! configuration and the parsed form of its declared jurisdictions. It is
//! shared as `Arc<AdapterRegistry>`; entries live in a sharded map so
//! concurrent lookups and registrations never serialize on one lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::config::AdapterConfig;
use crate::data_source::{CostParams, LegalSource, Operation, QueryPreferences, ResearchQuery};
use crate::domain::{Jurisdiction, JurisdictionPattern};
use crate::error::RegistryError;
use crate::factory::AdapterFactory;
use crate::scoring::{self, ScoredCandidate, ScoringPolicy};
use crate::AdapterId;

/// One registered adapter.
#[derive(Clone)]
pub struct RegistryEntry {
    adapter: Arc<dyn LegalSource>,
    config: AdapterConfig,
    patterns: Vec<JurisdictionPattern>,
    sequence: u64,
}

impl RegistryEntry {
    pub fn adapter(&self) -> &Arc<dyn LegalSource> {
        &self.adapter
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn patterns(&self) -> &[JurisdictionPattern] {
        &self.patterns
    }

    /// Registration order; earlier registrations win ties.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", self.adapter.id())
            .field("config", &self.config)
            .field("patterns", &self.patterns)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Registry counters grouped by category and declared jurisdiction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub enabled: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_jurisdiction: BTreeMap<String, usize>,
}

/// Per-record failure from [`AdapterRegistry::load_from_configs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub id: AdapterId,
    pub error: RegistryError,
}

/// Outcome of a batch load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<AdapterId>,
    pub failed: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct AdapterRegistry {
    entries: DashMap<AdapterId, RegistryEntry>,
    next_sequence: AtomicU64,
    policy: ScoringPolicy,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ScoringPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Registers `adapter` under its own id.
    ///
    /// Fails on a duplicate id or a malformed jurisdiction entry; the
    /// existing registration is left untouched in both cases.
    pub fn register(
        &self,
        adapter: Arc<dyn LegalSource>,
        config: AdapterConfig,
    ) -> Result<(), RegistryError> {
        let id = adapter.id().clone();
        if config.id != id {
            tracing::warn!(
                adapter = %id,
                configured = %config.id,
                "config id differs from adapter id, registering under adapter id"
            );
        }

        let patterns = adapter
            .descriptor()
            .jurisdictions
            .iter()
            .map(|entry| JurisdictionPattern::parse(entry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| RegistryError::InvalidJurisdiction {
                id: id.clone(),
                source,
            })?;

        match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateAdapter { id }),
            Entry::Vacant(slot) => {
                let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    adapter = %id,
                    enabled = config.enabled,
                    priority = ?config.priority,
                    "adapter registered"
                );
                slot.insert(RegistryEntry {
                    adapter,
                    config,
                    patterns,
                    sequence,
                });
                Ok(())
            }
        }
    }

    /// Registers with default settings (enabled, no priority).
    pub fn register_adapter(&self, adapter: Arc<dyn LegalSource>) -> Result<(), RegistryError> {
        let config = AdapterConfig::new(adapter.id().clone());
        self.register(adapter, config)
    }

    /// Disconnects and removes `id`. Disconnect failures are logged only.
    pub async fn unregister(&self, id: &str) -> bool {
        let Some(adapter) = self.get(id) else {
            return false;
        };

        if let Err(error) = adapter.disconnect().await {
            tracing::warn!(adapter = id, %error, "disconnect failed during unregistration");
        }

        let removed = self.entries.remove(id).is_some();
        if removed {
            tracing::info!(adapter = id, "adapter unregistered");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn LegalSource>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry.adapter))
    }

    pub fn entry(&self, id: &str) -> Option<RegistryEntry> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let mut entries = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    /// Adapters declaring coverage of `jurisdiction`, wildcards included.
    pub fn by_jurisdiction(&self, jurisdiction: &Jurisdiction) -> Vec<Arc<dyn LegalSource>> {
        self.entries()
            .into_iter()
            .filter(|entry| {
                entry
                    .patterns
                    .iter()
                    .any(|pattern| pattern.matches(jurisdiction))
            })
            .map(|entry| entry.adapter)
            .collect()
    }

    /// Enabled adapters able to serve `query`, in registration order.
    pub fn candidates(&self, query: &ResearchQuery) -> Vec<RegistryEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.config.enabled)
            .filter(|entry| scoring::is_capable(entry.adapter.descriptor(), &entry.patterns, query))
            .collect()
    }

    /// Capable adapters ranked best first; cost-excluded ones are dropped.
    pub fn get_adapter_chain(
        &self,
        query: &ResearchQuery,
        preferences: &QueryPreferences,
    ) -> Vec<ScoredCandidate> {
        let params = CostParams {
            expected_results: query
                .max_results
                .map(|cap| u32::try_from(cap).unwrap_or(u32::MAX)),
        };

        let scored = self
            .candidates(query)
            .into_iter()
            .filter_map(|entry| {
                let cost = entry.adapter.cost_estimate(Operation::Search, Some(params));
                let descriptor = entry.adapter.descriptor();
                match scoring::score(descriptor.category, &cost, preferences, &self.policy) {
                    Some(score) => Some(ScoredCandidate {
                        id: descriptor.id.clone(),
                        score,
                        estimated_cost: cost.estimated_total,
                        priority: entry.config.priority,
                        sequence: entry.sequence,
                    }),
                    None => {
                        tracing::debug!(
                            adapter = %descriptor.id,
                            cost = cost.estimated_total,
                            "excluded by cost ceiling"
                        );
                        None
                    }
                }
            })
            .collect();

        scoring::rank(scored)
    }

    pub fn get_optimal_adapter(
        &self,
        query: &ResearchQuery,
        preferences: &QueryPreferences,
    ) -> Option<ScoredCandidate> {
        self.get_adapter_chain(query, preferences).into_iter().next()
    }

    /// Probes every adapter concurrently.
    ///
    /// Every registered id appears in the result; a check that panics or
    /// exceeds `timeout` reports `false` for that adapter only.
    pub async fn health_check_all(&self, timeout: Duration) -> BTreeMap<AdapterId, bool> {
        let entries = self.entries();
        let mut results = entries
            .iter()
            .map(|entry| (entry.adapter.id().clone(), false))
            .collect::<BTreeMap<_, _>>();

        let mut tasks = JoinSet::new();
        for entry in entries {
            let adapter = entry.adapter;
            tasks.spawn(async move {
                let id = adapter.id().clone();
                let healthy = match tokio::time::timeout(timeout, adapter.health_check()).await {
                    Ok(status) => status.healthy,
                    Err(_) => {
                        tracing::warn!(adapter = %id, "health check timed out");
                        false
                    }
                };
                (id, healthy)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, healthy)) => {
                    results.insert(id, healthy);
                }
                Err(error) => tracing::warn!(%error, "health check task failed"),
            }
        }
        results
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for entry in self.entries() {
            stats.total += 1;
            if entry.config.enabled {
                stats.enabled += 1;
            }

            let descriptor = entry.adapter.descriptor();
            *stats
                .by_category
                .entry(descriptor.category.as_str().to_owned())
                .or_default() += 1;
            for pattern in &entry.patterns {
                *stats.by_jurisdiction.entry(pattern.to_string()).or_default() += 1;
            }
        }
        stats
    }

    /// Builds, connects and registers each record; failures are collected
    /// per record and never abort the batch.
    pub async fn load_from_configs(
        &self,
        factory: &AdapterFactory,
        configs: &[AdapterConfig],
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for config in configs {
            match self.load_one(factory, config).await {
                Ok(()) => report.loaded.push(config.id.clone()),
                Err(error) => {
                    tracing::warn!(adapter = %config.id, %error, "adapter failed to load");
                    report.failed.push(LoadFailure {
                        id: config.id.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    async fn load_one(
        &self,
        factory: &AdapterFactory,
        config: &AdapterConfig,
    ) -> Result<(), RegistryError> {
        let adapter = factory.build(config)?;

        let mut connected = false;
        if config.enabled {
            if let Some(credentials) = config.usable_credentials() {
                adapter
                    .connect(credentials.clone())
                    .await
                    .map_err(|error| RegistryError::Connect {
                        id: config.id.clone(),
                        message: error.to_string(),
                    })?;
                connected = true;
            }
        }

        let outcome = self.register(adapter.clone(), config.clone());
        if outcome.is_err() && connected {
            if let Err(error) = adapter.disconnect().await {
                tracing::warn!(adapter = %config.id, %error, "disconnect after rejected registration failed");
            }
        }
        outcome
    }
}

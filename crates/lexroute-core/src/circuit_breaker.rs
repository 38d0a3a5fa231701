//! Per-dependency circuit breaking.
//!
//! Each dependency name owns an independent state machine:
//!
//! ```text
//!            failures >= threshold              now >= next_attempt
//!  Closed ───────────────────────────▶ Open ──────────────────────────▶ HalfOpen
//!    ▲  │ success: failures -= 1         ▲        (on admission check)     │
//!    │  └──────┘                         └──────── probe failure ──────────┤
//!    └──────────────────────────── probe success ──────────────────────────┘
//! ```
//!
//! The Open → HalfOpen transition happens lazily inside [`CircuitBreaker::can_attempt`];
//! there is no background timer. While half-open every caller is admitted, so
//! concurrent requests may all act as probes.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::UtcDateTime;

/// Runtime circuit state for one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Read-only view of one dependency's circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<UtcDateTime>,
    pub last_success_at: Option<UtcDateTime>,
    pub next_attempt_at: Option<UtcDateTime>,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<UtcDateTime>,
    last_success_at: Option<UtcDateTime>,
    next_attempt: Option<Instant>,
    next_attempt_at: Option<UtcDateTime>,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            last_success_at: None,
            next_attempt: None,
            next_attempt_at: None,
        }
    }
}

impl CircuitInner {
    fn trip(&mut self, reset_timeout: Duration) {
        self.state = CircuitState::Open;
        self.next_attempt = Some(Instant::now() + reset_timeout);
        self.next_attempt_at = Some(UtcDateTime::now().saturating_add(reset_timeout));
    }

    fn snapshot(&self, name: &str) -> CircuitSnapshot {
        CircuitSnapshot {
            name: name.to_owned(),
            state: self.state,
            failure_count: self.consecutive_failures,
            last_failure_at: self.last_failure_at,
            last_success_at: self.last_success_at,
            next_attempt_at: self.next_attempt_at,
        }
    }
}

/// Thread-safe, name-keyed circuit breaker.
///
/// State for a name is created on first reference and kept for the life of
/// the breaker. Every read-modify-write happens under the map's per-shard
/// lock for that key, so concurrent outcome recording for the same name
/// never loses an update, while different names do not contend on a single
/// lock.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: DashMap<String, CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: DashMap::new(),
        }
    }

    pub fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Admission check performed immediately before an outbound call.
    pub fn can_attempt(&self, name: &str) -> bool {
        let mut circuit = self.circuits.entry(name.to_owned()).or_default();
        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let can_probe = circuit
                    .next_attempt
                    .map(|next_attempt| Instant::now() >= next_attempt)
                    .unwrap_or(true);

                if can_probe {
                    circuit.state = CircuitState::HalfOpen;
                    tracing::info!(dependency = name, "circuit half-open, admitting probe");
                }
                can_probe
            }
        }
    }

    pub fn record_success(&self, name: &str) {
        let mut circuit = self.circuits.entry(name.to_owned()).or_default();
        circuit.last_success_at = Some(UtcDateTime::now());

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.state = CircuitState::Closed;
                circuit.consecutive_failures = 0;
                circuit.next_attempt = None;
                circuit.next_attempt_at = None;
                tracing::info!(dependency = name, "circuit closed after successful probe");
            }
            CircuitState::Closed => {
                circuit.consecutive_failures = circuit.consecutive_failures.saturating_sub(1);
            }
            // A call admitted before the trip finished late; the circuit must
            // still go through a probe before closing.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, name: &str) {
        let mut circuit = self.circuits.entry(name.to_owned()).or_default();
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        circuit.last_failure_at = Some(UtcDateTime::now());

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.trip(self.config.reset_timeout);
                tracing::warn!(dependency = name, "probe failed, circuit reopened");
            }
            CircuitState::Closed
                if circuit.consecutive_failures >= self.config.failure_threshold =>
            {
                circuit.trip(self.config.reset_timeout);
                tracing::warn!(
                    dependency = name,
                    failures = circuit.consecutive_failures,
                    "failure threshold reached, circuit opened"
                );
            }
            CircuitState::Open => {
                circuit.trip(self.config.reset_timeout);
            }
            CircuitState::Closed => {}
        }
    }

    /// Current state without performing the lazy Open → HalfOpen transition.
    pub fn state(&self, name: &str) -> CircuitState {
        self.circuits
            .get(name)
            .map(|circuit| circuit.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn failure_count(&self, name: &str) -> u32 {
        self.circuits
            .get(name)
            .map(|circuit| circuit.consecutive_failures)
            .unwrap_or(0)
    }

    pub fn snapshot(&self, name: &str) -> Option<CircuitSnapshot> {
        self.circuits.get(name).map(|circuit| circuit.snapshot(name))
    }

    /// Snapshots of every known dependency, sorted by name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let mut snapshots = self
            .circuits
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect::<Vec<_>>();
        snapshots.sort_by(|left, right| left.name.cmp(&right.name));
        snapshots
    }

    /// Operator override: forget all history for `name`.
    pub fn reset(&self, name: &str) {
        if self.circuits.remove(name).is_some() {
            tracing::info!(dependency = name, "circuit reset by operator");
        }
    }
}

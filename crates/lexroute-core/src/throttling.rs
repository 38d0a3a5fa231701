//! Client-side request budgets for upstream research APIs.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::data_source::SourceError;

/// Published request quota for one upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub window: Duration,
    pub limit: u32,
}

impl RatePolicy {
    pub const fn new(window: Duration, limit: u32) -> Self {
        Self { window, limit }
    }

    /// Authenticated CourtListener REST quota.
    pub const fn courtlistener_default() -> Self {
        Self::new(Duration::from_secs(3_600), 5_000)
    }

    /// api.data.gov key quota shared by GovInfo endpoints.
    pub const fn govinfo_default() -> Self {
        Self::new(Duration::from_secs(3_600), 1_000)
    }

    pub const fn westlaw_default() -> Self {
        Self::new(Duration::from_secs(60), 60)
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token-bucket gate checked before each upstream call.
///
/// Exhausted budget surfaces as a `throttled` source error. No request left
/// the process, so the dispatcher moves on without touching the circuit.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<DirectRateLimiter>,
    policy: RatePolicy,
}

impl Throttle {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_policy(policy))),
            policy,
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn try_acquire(&self, source: &str) -> Result<(), SourceError> {
        self.limiter.check().map_err(|_| {
            SourceError::throttled(format!(
                "{source} request budget of {} per {}s is exhausted",
                self.policy.limit,
                self.policy.window.as_secs()
            ))
        })
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn quota_from_policy(policy: RatePolicy) -> Quota {
    let burst = NonZeroU32::new(policy.limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (policy.window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

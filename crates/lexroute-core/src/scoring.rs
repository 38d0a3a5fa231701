//! Capability filtering and suitability scoring.
//!
//! Everything here is pure: the registry feeds in descriptors, parsed
//! jurisdiction entries and cost estimates, and gets back a deterministic
//! ranking.

use std::cmp::Ordering;

use serde::Serialize;

use crate::data_source::{AdapterDescriptor, CostEstimate, QueryPreferences, ResearchQuery};
use crate::domain::JurisdictionPattern;
use crate::{AdapterCategory, AdapterId};

/// Weights applied when scoring candidates.
///
/// Magnitudes are tunable; the invariants callers rely on are that a free
/// source outranks a paid one under `prefer_free`, that a cost ceiling is a
/// hard exclusion, and that cheaper sources win among otherwise-equal ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub baseline: f64,
    pub free_bonus: f64,
    /// Points subtracted per currency unit of estimated cost.
    pub cost_penalty: f64,
    pub open_source_bonus: f64,
    pub government_bonus: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            baseline: 100.0,
            free_bonus: 50.0,
            cost_penalty: 20.0,
            open_source_bonus: 15.0,
            government_bonus: 10.0,
        }
    }
}

/// Candidate that survived filtering, with its ranking keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub id: AdapterId,
    pub score: f64,
    pub estimated_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip)]
    pub sequence: u64,
}

/// True when any declared entry covers any requested jurisdiction.
pub fn covers_jurisdiction(patterns: &[JurisdictionPattern], query: &ResearchQuery) -> bool {
    query
        .jurisdictions
        .iter()
        .any(|jurisdiction| patterns.iter().any(|pattern| pattern.matches(jurisdiction)))
}

/// Jurisdiction coverage plus the feature required by the query type.
pub fn is_capable(
    descriptor: &AdapterDescriptor,
    patterns: &[JurisdictionPattern],
    query: &ResearchQuery,
) -> bool {
    let feature_ok = query
        .query_type
        .required_feature()
        .map_or(true, |feature| descriptor.features.supports(feature));

    feature_ok && covers_jurisdiction(patterns, query)
}

/// Suitability score, or `None` when the cost ceiling excludes the adapter.
pub fn score(
    category: AdapterCategory,
    cost: &CostEstimate,
    preferences: &QueryPreferences,
    policy: &ScoringPolicy,
) -> Option<f64> {
    let total = cost.estimated_total;
    if let Some(max_cost) = preferences.max_cost {
        if total > max_cost {
            return None;
        }
    }

    let mut score = policy.baseline;
    if preferences.prefer_free && cost.is_free() {
        score += policy.free_bonus;
    }
    score -= total * policy.cost_penalty;

    score += match category {
        AdapterCategory::OpenSource => policy.open_source_bonus,
        AdapterCategory::Government => policy.government_bonus,
        AdapterCategory::Commercial | AdapterCategory::Academic => 0.0,
    };

    Some(score)
}

/// Sorts by score (desc), then priority (asc, unset last), then registration order.
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(compare_candidates);
    candidates
}

fn compare_candidates(left: &ScoredCandidate, right: &ScoredCandidate) -> Ordering {
    right
        .score
        .total_cmp(&left.score)
        .then_with(|| {
            let left_priority = left.priority.unwrap_or(u32::MAX);
            let right_priority = right.priority.unwrap_or(u32::MAX);
            left_priority.cmp(&right_priority)
        })
        .then_with(|| left.sequence.cmp(&right.sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{Feature, QueryType};

    fn descriptor(features: &[Feature]) -> AdapterDescriptor {
        AdapterDescriptor::new(
            AdapterId::parse("stub").expect("valid id"),
            "Stub",
            AdapterCategory::Commercial,
            ["us-*"],
            features.iter().copied(),
        )
    }

    fn patterns(entries: &[&str]) -> Vec<JurisdictionPattern> {
        entries
            .iter()
            .map(|entry| JurisdictionPattern::parse(entry).expect("valid pattern"))
            .collect()
    }

    fn candidate(id: &str, score: f64, priority: Option<u32>, sequence: u64) -> ScoredCandidate {
        ScoredCandidate {
            id: AdapterId::parse(id).expect("valid id"),
            score,
            estimated_cost: 0.0,
            priority,
            sequence,
        }
    }

    #[test]
    fn capability_requires_type_feature() {
        let query = ResearchQuery::parse("negligence", &["us-ca"])
            .expect("valid query")
            .with_type(QueryType::Statute);

        assert!(!is_capable(&descriptor(&[Feature::CaseSearch]), &patterns(&["us-*"]), &query));
        assert!(is_capable(&descriptor(&[Feature::StatuteSearch]), &patterns(&["us-*"]), &query));
    }

    #[test]
    fn mixed_queries_need_only_jurisdiction() {
        let query = ResearchQuery::parse("negligence", &["uk", "us-ny"]).expect("valid query");

        assert!(is_capable(&descriptor(&[]), &patterns(&["us-*"]), &query));
        assert!(!is_capable(&descriptor(&[]), &patterns(&["us-ca"]), &query));
    }

    #[test]
    fn prefer_free_outranks_paid() {
        let preferences = QueryPreferences::prefer_free();
        let policy = ScoringPolicy::default();

        let free = score(AdapterCategory::Commercial, &CostEstimate::free(), &preferences, &policy)
            .expect("free is never excluded");
        let paid = score(
            AdapterCategory::Commercial,
            &CostEstimate::new(0.50, 0.0, None),
            &preferences,
            &policy,
        )
        .expect("no ceiling");

        assert!(free > paid);
    }

    #[test]
    fn cost_ceiling_excludes() {
        let preferences = QueryPreferences::default()
            .with_max_cost(0.10)
            .expect("valid ceiling");

        let paid = score(
            AdapterCategory::Commercial,
            &CostEstimate::new(0.50, 0.0, None),
            &preferences,
            &ScoringPolicy::default(),
        );
        assert_eq!(paid, None);

        let at_ceiling = score(
            AdapterCategory::Commercial,
            &CostEstimate::new(0.10, 0.0, None),
            &preferences,
            &ScoringPolicy::default(),
        );
        assert!(at_ceiling.is_some());
    }

    #[test]
    fn authority_bonus_orders_categories() {
        let preferences = QueryPreferences::default();
        let policy = ScoringPolicy::default();
        let cost = CostEstimate::free();

        let open = score(AdapterCategory::OpenSource, &cost, &preferences, &policy);
        let government = score(AdapterCategory::Government, &cost, &preferences, &policy);
        let commercial = score(AdapterCategory::Commercial, &cost, &preferences, &policy);

        assert!(open > government);
        assert!(government > commercial);
    }

    #[test]
    fn ties_break_by_priority_then_sequence() {
        let ranked = rank(vec![
            candidate("late", 100.0, None, 3),
            candidate("unprioritized", 100.0, None, 1),
            candidate("second", 100.0, Some(2), 4),
            candidate("first", 100.0, Some(1), 5),
            candidate("best", 150.0, None, 6),
        ]);

        let order = ranked.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["best", "first", "second", "unprioritized", "late"]);
    }
}

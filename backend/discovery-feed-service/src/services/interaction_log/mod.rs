// ============================================
// Interaction Log (滑動決策紀錄)
// ============================================
//
// Append-only record of accept/reject decisions for one user.
//
// - `record` never rejects duplicates; consumers must be duplicate-safe
// - `observed_at` is monotonically non-decreasing
// - The log is the source of truth; the store mirror is best-effort
//
// Store layout (Redis):
// - {prefix}:{user_id}:interactions - JSON list, oldest first

pub mod mirror;
pub mod store;

pub use mirror::{with_retry, RetryConfig, StoreMirror, StoreMirrorHandle};
pub use store::{InMemoryInteractionStore, InteractionStore, RedisInteractionStore};

use crate::models::{Decision, Interaction};
use crate::utils::monotonic_now;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Max retries ({0}) exceeded")]
    MaxRetriesExceeded(u32),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// How repeated decisions on the same item are folded before profiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Every interaction counts
    #[default]
    CountAll,
    /// Keep only the oldest interaction per item
    FirstDecisionWins,
    /// Keep only the newest interaction per item
    LastDecisionWins,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count_all" | "all" => Ok(DuplicatePolicy::CountAll),
            "first" | "first_decision_wins" => Ok(DuplicatePolicy::FirstDecisionWins),
            "last" | "last_decision_wins" => Ok(DuplicatePolicy::LastDecisionWins),
            other => Err(format!("unknown duplicate policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    entries: Vec<Interaction>,
}

impl InteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted history, sorted oldest first
    pub fn from_history(mut history: Vec<Interaction>) -> Self {
        history.sort_by_key(|i| i.observed_at);
        Self { entries: history }
    }

    /// Append a decision. Duplicates are accepted.
    pub fn record(&mut self, item_id: impl Into<String>, decision: Decision) -> Interaction {
        let interaction = Interaction {
            item_id: item_id.into(),
            decision,
            observed_at: monotonic_now(self.entries.last().map(|i| i.observed_at)),
        };

        debug!(
            item_id = %interaction.item_id,
            decision = decision.as_str(),
            position = self.entries.len(),
            "Interaction recorded"
        );

        self.entries.push(interaction.clone());
        interaction
    }

    /// All interactions, oldest first
    pub fn all(&self) -> &[Interaction] {
        &self.entries
    }

    pub fn seen_ids(&self) -> HashSet<String> {
        self.entries.iter().map(|i| i.item_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// View of the log with duplicates folded per `policy`, preserving order
    pub fn deduplicated(&self, policy: DuplicatePolicy) -> Vec<Interaction> {
        match policy {
            DuplicatePolicy::CountAll => self.entries.clone(),
            DuplicatePolicy::FirstDecisionWins => {
                let mut seen = HashSet::new();
                self.entries
                    .iter()
                    .filter(|i| seen.insert(i.item_id.as_str()))
                    .cloned()
                    .collect()
            }
            DuplicatePolicy::LastDecisionWins => {
                let last: HashMap<&str, usize> = self
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(pos, i)| (i.item_id.as_str(), pos))
                    .collect();
                self.entries
                    .iter()
                    .enumerate()
                    .filter(|(pos, i)| last.get(i.item_id.as_str()) == Some(pos))
                    .map(|(_, i)| i.clone())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_record_appends_in_order() {
        let mut log = InteractionLog::new();
        log.record("1", Decision::Accept);
        log.record("2", Decision::Reject);

        let ids: Vec<&str> = log.all().iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(log.all()[0].observed_at <= log.all()[1].observed_at);
    }

    #[test]
    fn test_duplicates_are_tolerated() {
        let mut log = InteractionLog::new();
        log.record("1", Decision::Accept);
        log.record("1", Decision::Accept);

        assert_eq!(log.len(), 2);
        assert_eq!(log.seen_ids().len(), 1);
    }

    #[test]
    fn test_observed_at_never_goes_backwards() {
        let future = Utc::now() + Duration::minutes(5);
        let mut log = InteractionLog::from_history(vec![Interaction {
            item_id: "1".to_string(),
            decision: Decision::Accept,
            observed_at: future,
        }]);

        let next = log.record("2", Decision::Reject);
        assert!(next.observed_at >= future);
    }

    #[test]
    fn test_from_history_sorts_oldest_first() {
        let now = Utc::now();
        let log = InteractionLog::from_history(vec![
            Interaction {
                item_id: "late".to_string(),
                decision: Decision::Accept,
                observed_at: now,
            },
            Interaction {
                item_id: "early".to_string(),
                decision: Decision::Reject,
                observed_at: now - Duration::hours(1),
            },
        ]);

        assert_eq!(log.all()[0].item_id, "early");
    }

    #[test]
    fn test_deduplicated_policies() {
        let mut log = InteractionLog::new();
        log.record("1", Decision::Accept);
        log.record("2", Decision::Reject);
        log.record("1", Decision::Reject);

        let all = log.deduplicated(DuplicatePolicy::CountAll);
        assert_eq!(all.len(), 3);

        let first = log.deduplicated(DuplicatePolicy::FirstDecisionWins);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].decision, Decision::Accept);

        let last = log.deduplicated(DuplicatePolicy::LastDecisionWins);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].item_id, "2");
        assert_eq!(last[1].item_id, "1");
        assert_eq!(last[1].decision, Decision::Reject);
    }

    #[test]
    fn test_duplicate_policy_from_str() {
        assert_eq!("count_all".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::CountAll));
        assert_eq!(
            "FIRST".parse::<DuplicatePolicy>(),
            Ok(DuplicatePolicy::FirstDecisionWins)
        );
        assert_eq!(
            "last_decision_wins".parse::<DuplicatePolicy>(),
            Ok(DuplicatePolicy::LastDecisionWins)
        );
        assert!("newest".parse::<DuplicatePolicy>().is_err());
    }
}

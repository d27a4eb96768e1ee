// ============================================
// Preference Profile Builder (偏好畫像構建器)
// ============================================
//
// Derives a tag -> weight mapping from the interaction log and the catalog.
//
// weight(tag) = number of accept interactions whose item carries `tag`
//
// - Rejects contribute nothing (they only exclude items from ranking)
// - Interactions whose item is missing from the catalog contribute nothing
// - Duplicate accepts each contribute; fold them upstream if unwanted
// - Always rebuilt from scratch, never patched

use crate::models::Interaction;
use crate::services::catalog::Catalog;
use std::collections::HashMap;
use tracing::debug;

/// Tag weights learned from accepted items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceProfile {
    weights: HashMap<String, f64>,
}

impl PreferenceProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight of `tag`, zero when absent
    pub fn weight(&self, tag: &str) -> f64 {
        self.weights.get(tag).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(tag, weight)| (tag.as_str(), *weight))
    }

    /// Up to `n` tags by descending weight; equal weights order by tag name
    pub fn top_tags(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, f64)> =
            self.weights.iter().map(|(tag, weight)| (tag, *weight)).collect();

        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        ranked
            .into_iter()
            .take(n)
            .map(|(tag, _)| tag.clone())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PreferenceProfile {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            weights: iter
                .into_iter()
                .map(|(tag, weight)| (tag.into(), weight))
                .collect(),
        }
    }
}

/// Build a fresh profile from `(catalog, interactions)`
pub fn build(catalog: &Catalog, interactions: &[Interaction]) -> PreferenceProfile {
    let mut weights: HashMap<String, f64> = HashMap::new();
    let mut unresolved = 0usize;

    for interaction in interactions.iter().filter(|i| i.decision.is_accept()) {
        let Some(item) = catalog.get(&interaction.item_id) else {
            unresolved += 1;
            continue;
        };

        for tag in &item.tags {
            *weights.entry(tag.clone()).or_insert(0.0) += 1.0;
        }
    }

    debug!(
        interactions = interactions.len(),
        unresolved = unresolved,
        tags = weights.len(),
        "Preference profile built"
    );

    PreferenceProfile { weights }
}

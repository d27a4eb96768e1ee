/// Ranking Module
///
/// Scores unseen catalog items against the preference profile and orders them
/// for the feed.
///
/// # Scoring
/// - `score = Σ profile.weight(tag)` over the item's tags
/// - ranking key = `score + U[0, jitter_range)`, one draw per item
/// - sort by ranking key, descending
///
/// The jitter keeps zero-score items discoverable: score gaps below the jitter
/// range are frequently reordered, gaps above it never are.
///
/// `match_percent` is display-only: `min(99, round(70 + score * 5 + U[0, 10)))`.
use crate::models::{Item, ScoredItem};
use crate::services::catalog::Catalog;
use crate::services::profile_builder::PreferenceProfile;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

const MATCH_PERCENT_BASE: f64 = 70.0;
const MATCH_PERCENT_PER_SCORE: f64 = 5.0;
const MATCH_PERCENT_NOISE: f64 = 10.0;
const MATCH_PERCENT_CAP: u8 = 99;

/// Ranking Layer - profile-based scoring with discovery jitter
#[derive(Debug, Clone)]
pub struct RankingLayer {
    jitter_range: f64,
}

impl Default for RankingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingLayer {
    pub fn new() -> Self {
        Self { jitter_range: 2.0 }
    }

    /// Custom jitter width; invalid values keep the default
    pub fn with_jitter_range(mut self, jitter_range: f64) -> Self {
        if jitter_range.is_finite() && jitter_range >= 0.0 {
            self.jitter_range = jitter_range;
        }
        self
    }

    pub fn jitter_range(&self) -> f64 {
        self.jitter_range
    }

    /// Rank every catalog item not in `seen_ids`. Empty output means the feed
    /// has nothing left to show.
    pub fn rank<R: Rng>(
        &self,
        catalog: &Catalog,
        profile: &PreferenceProfile,
        seen_ids: &HashSet<String>,
        rng: &mut R,
    ) -> Vec<ScoredItem> {
        let mut keyed: Vec<(f64, ScoredItem)> = catalog
            .items()
            .iter()
            .filter(|item| !seen_ids.contains(&item.id))
            .map(|item| {
                let score = score_item(item, profile);
                let key = score + self.jitter(rng);
                let scored = ScoredItem {
                    item: item.clone(),
                    score,
                    match_percent: match_percent(score, rng),
                };
                (key, scored)
            })
            .collect();

        // Stable sort keeps catalog order for exact ties
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

        debug!(
            catalog_size = catalog.len(),
            seen = seen_ids.len(),
            ranked = keyed.len(),
            top_score = keyed.first().map(|(_, s)| s.score),
            "Ranking pass complete"
        );

        keyed.into_iter().map(|(_, scored)| scored).collect()
    }

    fn jitter<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.jitter_range > 0.0 {
            rng.gen_range(0.0..self.jitter_range)
        } else {
            0.0
        }
    }
}

/// Sum of the profile weights of the item's tags
pub fn score_item(item: &Item, profile: &PreferenceProfile) -> f64 {
    item.tags.iter().map(|tag| profile.weight(tag)).sum()
}

/// "Mostly high, slightly noisy" match badge value in `[0, 99]`
pub fn match_percent<R: Rng>(score: f64, rng: &mut R) -> u8 {
    let noise = rng.gen_range(0.0..MATCH_PERCENT_NOISE);
    let raw = (MATCH_PERCENT_BASE + score * MATCH_PERCENT_PER_SCORE + noise).round();

    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, MATCH_PERCENT_CAP as f64) as u8
}

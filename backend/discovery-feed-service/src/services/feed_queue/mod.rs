// ============================================
// Feed Queue (推薦佇列)
// ============================================
//
// Ordered view of one ranking pass plus a forward-only cursor.
//
// - Each pass carries a generation number; a pass older than (or equal to)
//   the applied generation is discarded, so a stale ranking never replaces a
//   fresher one regardless of completion order
// - `active_index` only moves forward within a generation and resets to 0
//   when a newer pass is applied

use crate::models::ScoredItem;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Output of one complete ranking pass
#[derive(Debug, Clone)]
pub struct RankingPass {
    pub generation: u64,
    pub items: Vec<ScoredItem>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedQueue {
    generation: u64,
    items: Vec<ScoredItem>,
    active_index: usize,
}

impl FeedQueue {
    /// Empty queue at generation 0, before the first pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `pass` if it is newer than the current generation.
    /// Returns false when the pass was stale and dropped.
    pub fn apply(&mut self, pass: RankingPass) -> bool {
        if pass.generation <= self.generation {
            warn!(
                stale_generation = pass.generation,
                current_generation = self.generation,
                "Discarding stale ranking pass"
            );
            return false;
        }

        let mut ids = HashSet::with_capacity(pass.items.len());
        let ranked = pass.items.len();
        let items: Vec<ScoredItem> = pass
            .items
            .into_iter()
            .filter(|scored| ids.insert(scored.item.id.clone()))
            .collect();

        if items.len() != ranked {
            warn!(
                generation = pass.generation,
                dropped = ranked - items.len(),
                "Ranking pass contained duplicate ids"
            );
        }

        info!(
            generation = pass.generation,
            size = items.len(),
            "Feed queue generation applied"
        );

        self.generation = pass.generation;
        self.items = items;
        self.active_index = 0;
        true
    }

    /// Item at the cursor, `None` once exhausted
    pub fn current(&self) -> Option<&ScoredItem> {
        self.items.get(self.active_index)
    }

    /// Move the cursor forward by one. Never wraps; saturates past the end.
    pub fn advance(&mut self) {
        if self.active_index < self.items.len() {
            self.active_index += 1;
            debug!(
                generation = self.generation,
                active_index = self.active_index,
                "Feed queue advanced"
            );
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Items from the cursor onwards
    pub fn remaining(&self) -> &[ScoredItem] {
        &self.items[self.active_index.min(self.items.len())..]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }
}

// ============================================
// Feed Session (個人化推薦會話)
// ============================================
//
// Owns everything one user's feed needs: catalog, interaction log, cached
// preference profile, feed queue, swipe machine and random source.
//
// Live learning:
// 1. A committed swipe records an interaction (and mirrors it to the store)
// 2. The session is marked dirty
// 3. Once the swipe machine is back at rest, the profile is rebuilt and the
//    remaining unseen items are re-ranked into a new queue generation
//
// Rebuilds are split into `begin_ranking` (snapshot + generation number) and
// `complete_ranking` (apply if still newest), so a pass that finishes after a
// newer one is dropped instead of overwriting it.
//
// Every state change is published as a `FeedView` on a watch channel.

use crate::config::{Config, SwipeConfig};
use crate::models::{Decision, Interaction, Item, ScoredItem, SwipeDirection};
use crate::services::assistant::StylistContext;
use crate::services::catalog::{Catalog, CatalogError};
use crate::services::feed_queue::{FeedQueue, RankingPass};
use crate::services::interaction_log::{DuplicatePolicy, InteractionLog, StoreMirrorHandle};
use crate::services::profile_builder::{self, PreferenceProfile};
use crate::services::ranking::RankingLayer;
use crate::services::swipe::{
    CardPose, Commit, Overlay, SwipePhase, SwipeSession, SwipeStep, SwipeTimer,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
    pub generation: u64,
    pub active_index: usize,
    pub current: Option<ScoredItem>,
    pub remaining: usize,
    pub phase: SwipePhase,
    pub pose: CardPose,
    pub overlay: Overlay,
    pub exhausted: bool,
}

/// Construction options, see `SessionOptions::from_config`
pub struct SessionOptions {
    pub swipe: SwipeConfig,
    pub ranking: RankingLayer,
    pub duplicate_policy: DuplicatePolicy,
    pub rng_seed: Option<u64>,
    pub history: Vec<Interaction>,
    pub mirror: Option<StoreMirrorHandle>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            swipe: SwipeConfig::default(),
            ranking: RankingLayer::new(),
            duplicate_policy: DuplicatePolicy::default(),
            rng_seed: None,
            history: Vec::new(),
            mirror: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            swipe: config.swipe,
            ranking: RankingLayer::new().with_jitter_range(config.ranking.jitter_range),
            duplicate_policy: config.profile.duplicate_policy,
            rng_seed: config.ranking.seed,
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Interaction>) -> Self {
        self.history = history;
        self
    }

    pub fn with_mirror(mut self, mirror: StoreMirrorHandle) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// Inputs captured for one ranking pass
#[derive(Debug, Clone)]
pub struct RankingTicket {
    pub generation: u64,
    catalog: Arc<Catalog>,
    interactions: Vec<Interaction>,
    seen_ids: HashSet<String>,
}

/// Result of running a ticket
#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub profile: PreferenceProfile,
    pub pass: RankingPass,
}

impl RankingTicket {
    /// Self-contained: touches no session state
    pub fn run(&self, ranking: &RankingLayer, rng: &mut StdRng) -> RankingOutcome {
        let profile = profile_builder::build(&self.catalog, &self.interactions);
        let items = ranking.rank(&self.catalog, &profile, &self.seen_ids, rng);
        RankingOutcome {
            profile,
            pass: RankingPass {
                generation: self.generation,
                items,
            },
        }
    }
}

pub struct FeedSession {
    user_id: String,
    catalog: Arc<Catalog>,
    log: InteractionLog,
    profile: PreferenceProfile,
    queue: FeedQueue,
    swipe: SwipeSession,
    ranking: RankingLayer,
    duplicate_policy: DuplicatePolicy,
    rng: StdRng,
    next_generation: u64,
    dirty: bool,
    mirror: Option<StoreMirrorHandle>,
    view_tx: watch::Sender<FeedView>,
}

impl FeedSession {
    pub fn new(user_id: impl Into<String>, catalog: Catalog, options: SessionOptions) -> Self {
        let swipe = SwipeSession::new(options.swipe);
        let queue = FeedQueue::new();
        let initial_view = FeedView {
            generation: queue.generation(),
            active_index: 0,
            current: None,
            remaining: 0,
            phase: swipe.phase(),
            pose: swipe.pose(),
            overlay: swipe.overlay(),
            exhausted: true,
        };
        let (view_tx, _) = watch::channel(initial_view);

        let rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut session = Self {
            user_id: user_id.into(),
            catalog: Arc::new(catalog),
            log: InteractionLog::from_history(options.history),
            profile: PreferenceProfile::new(),
            queue,
            swipe,
            ranking: options.ranking,
            duplicate_policy: options.duplicate_policy,
            rng,
            next_generation: 1,
            dirty: true,
            mirror: options.mirror,
            view_tx,
        };

        info!(
            user_id = %session.user_id,
            catalog_size = session.catalog.len(),
            history = session.log.len(),
            "Feed session started"
        );

        session.refresh();
        session
    }

    // ---- gestures ----

    pub fn pointer_down(&mut self, x: f64) -> bool {
        let accepted = self.swipe.pointer_down(x);
        if accepted {
            self.publish();
        }
        accepted
    }

    pub fn pointer_move(&mut self, x: f64) -> bool {
        let accepted = self.swipe.pointer_move(x);
        if accepted {
            self.publish();
        }
        accepted
    }

    /// Release the pointer; a hard swipe records its decision immediately
    pub fn pointer_up(&mut self) -> Option<Commit> {
        let commit = self.swipe.pointer_up();
        self.apply_commit(commit)
    }

    /// Button swipe on the current item
    pub fn fling(&mut self, direction: SwipeDirection) -> Option<Commit> {
        let commit = self.swipe.fling(direction);
        self.apply_commit(commit)
    }

    fn apply_commit(&mut self, commit: Option<Commit>) -> Option<Commit> {
        let Some(commit) = commit else {
            self.publish();
            return None;
        };

        let Some(item_id) = self.queue.current().map(|s| s.item.id.clone()) else {
            // Idle implies a current item; reaching here means the queue was empty
            self.swipe.set_exhausted(true);
            self.publish();
            return None;
        };

        info!(
            user_id = %self.user_id,
            item_id = %item_id,
            decision = commit.decision.as_str(),
            generation = self.queue.generation(),
            "Swipe committed"
        );

        self.record(item_id, commit.decision);
        Some(commit)
    }

    /// Drive the commit animation forward
    pub fn on_timer(&mut self, timer: SwipeTimer) -> Option<SwipeStep> {
        let step = self.swipe.on_timer(timer)?;

        match step {
            SwipeStep::Advance => self.queue.advance(),
            SwipeStep::Settled => {
                self.refresh();
            }
        }
        self.swipe.set_exhausted(self.queue.is_exhausted());
        self.publish();
        Some(step)
    }

    // ---- external changes ----

    /// Append an interaction. Duplicates are accepted. Mirrors to the store
    /// without waiting and schedules a rebuild.
    pub fn record(&mut self, item_id: impl Into<String>, decision: Decision) -> Interaction {
        let interaction = self.log.record(item_id, decision);

        if let Some(mirror) = &self.mirror {
            mirror.mirror(&interaction);
        }

        self.invalidate();
        self.refresh();
        interaction
    }

    /// Replace the catalog with a provider snapshot (seed catalog on failure)
    pub fn update_catalog(&mut self, snapshot: Result<Vec<Item>, CatalogError>) {
        self.catalog = Arc::new(Catalog::from_snapshot(snapshot));
        info!(
            user_id = %self.user_id,
            catalog_size = self.catalog.len(),
            source = ?self.catalog.source(),
            "Catalog updated"
        );
        self.invalidate();
        self.refresh();
    }

    fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Rebuild if dirty and no commit is animating
    pub fn refresh(&mut self) -> bool {
        if !self.dirty || self.swipe.phase().is_animating() {
            if self.dirty {
                debug!(phase = ?self.swipe.phase(), "Rebuild deferred until swipe settles");
            }
            self.publish();
            return false;
        }

        self.swipe.cancel_drag();
        let ticket = self.begin_ranking();
        let outcome = ticket.run(&self.ranking, &mut self.rng);
        self.complete_ranking(outcome)
    }

    // ---- generation-tagged rebuilds ----

    /// Snapshot current inputs under a fresh generation number
    pub fn begin_ranking(&mut self) -> RankingTicket {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.dirty = false;

        RankingTicket {
            generation,
            catalog: Arc::clone(&self.catalog),
            interactions: self.log.deduplicated(self.duplicate_policy),
            seen_ids: self.log.seen_ids(),
        }
    }

    /// Apply a finished pass unless a newer generation already landed.
    /// A pass finishing mid-commit is dropped and the rebuild rerun once the
    /// swipe settles, so the pending advance still lands on the decided item.
    pub fn complete_ranking(&mut self, outcome: RankingOutcome) -> bool {
        if self.swipe.phase().is_animating() {
            debug!(
                generation = outcome.pass.generation,
                phase = ?self.swipe.phase(),
                "Ranking pass completed mid-commit, rebuilding after settle"
            );
            self.invalidate();
            self.publish();
            return false;
        }

        let applied = self.queue.apply(outcome.pass);
        if applied {
            self.profile = outcome.profile;
            self.swipe.cancel_drag();
            self.swipe.set_exhausted(self.queue.is_exhausted());
        }
        self.publish();
        applied
    }

    /// Run a ticket with the session's ranking layer and random source
    pub fn run_ticket(&mut self, ticket: &RankingTicket) -> RankingOutcome {
        ticket.run(&self.ranking, &mut self.rng)
    }

    // ---- queries ----

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn current(&self) -> Option<&ScoredItem> {
        self.queue.current()
    }

    pub fn queue(&self) -> &FeedQueue {
        &self.queue
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn profile(&self) -> &PreferenceProfile {
        &self.profile
    }

    pub fn interactions(&self) -> &[Interaction] {
        self.log.all()
    }

    pub fn phase(&self) -> SwipePhase {
        self.swipe.phase()
    }

    pub fn swipe_config(&self) -> &SwipeConfig {
        self.swipe.config()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_exhausted()
    }

    /// Tags with the highest profile weight, for the assistant
    pub fn top_tags(&self, n: usize) -> Vec<String> {
        self.profile.top_tags(n)
    }

    pub fn stylist_context(&self, n: usize) -> StylistContext {
        StylistContext::from_profile(&self.profile, n)
    }

    pub fn view(&self) -> FeedView {
        FeedView {
            generation: self.queue.generation(),
            active_index: self.queue.active_index(),
            current: self.queue.current().cloned(),
            remaining: self.queue.remaining().len(),
            phase: self.swipe.phase(),
            pose: self.swipe.pose(),
            overlay: self.swipe.overlay(),
            exhausted: self.queue.is_exhausted(),
        }
    }

    /// Change notifications; the receiver always holds the latest view
    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.view_tx.subscribe()
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}

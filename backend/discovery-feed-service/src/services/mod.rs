pub mod assistant;
pub mod catalog;
pub mod feed_queue;
pub mod feed_session;
pub mod interaction_log;
pub mod profile_builder;
pub mod ranking;
pub mod swipe;

pub use assistant::StylistContext;
pub use catalog::{Catalog, CatalogError, CatalogSource};
pub use feed_queue::{FeedQueue, RankingPass};
pub use feed_session::{FeedSession, FeedView, RankingOutcome, RankingTicket, SessionOptions};
pub use interaction_log::{
    DuplicatePolicy, InMemoryInteractionStore, InteractionLog, InteractionStore,
    RedisInteractionStore, StoreError, StoreMirror, StoreMirrorHandle,
};
pub use profile_builder::PreferenceProfile;
pub use ranking::RankingLayer;
pub use swipe::{SwipePhase, SwipeSession, SwipeTimer, SwipeTimerKind};

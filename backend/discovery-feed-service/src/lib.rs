pub mod config;
pub mod jobs;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use jobs::{FeedDriver, FeedEvent};
pub use models::{Decision, Interaction, Item, ScoredItem, SwipeDirection};
pub use services::{Catalog, FeedSession, FeedView, PreferenceProfile, RankingLayer, SessionOptions};

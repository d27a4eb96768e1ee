// Durable interaction stores. The in-memory log stays authoritative; these
// only mirror it and seed it on startup.

use super::{Result, StoreError};
use crate::models::Interaction;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Append one interaction to the user's history
    async fn append(&self, user_id: &str, interaction: &Interaction) -> Result<()>;

    /// Full history for the user, oldest first
    async fn load(&self, user_id: &str) -> Result<Vec<Interaction>>;
}

/// Redis list per user, one JSON document per interaction
pub struct RedisInteractionStore {
    redis: redis::Client,
    key_prefix: String,
}

impl RedisInteractionStore {
    pub fn new(redis: redis::Client) -> Self {
        Self {
            redis,
            key_prefix: "feed".to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn interactions_key(&self, user_id: &str) -> String {
        format!("{}:{}:interactions", self.key_prefix, user_id)
    }
}

#[async_trait]
impl InteractionStore for RedisInteractionStore {
    async fn append(&self, user_id: &str, interaction: &Interaction) -> Result<()> {
        let mut conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))?;

        let json = serde_json::to_string(interaction)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let _: () = conn
            .rpush(self.interactions_key(user_id), json)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))?;

        debug!(
            user_id = user_id,
            item_id = %interaction.item_id,
            "Interaction persisted"
        );

        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Vec<Interaction>> {
        let mut conn = self
            .redis
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))?;

        let raw: Vec<String> = conn
            .lrange(self.interactions_key(user_id), 0, -1)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))?;

        // Unreadable entries are skipped rather than failing the whole history
        let interactions = raw
            .iter()
            .filter_map(|json| match serde_json::from_str::<Interaction>(json) {
                Ok(interaction) => Some(interaction),
                Err(e) => {
                    warn!(user_id = user_id, error = %e, "Skipping malformed stored interaction");
                    None
                }
            })
            .collect();

        Ok(interactions)
    }
}

/// Process-local store, used offline and in tests
#[derive(Default)]
pub struct InMemoryInteractionStore {
    histories: Mutex<HashMap<String, Vec<Interaction>>>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn append(&self, user_id: &str, interaction: &Interaction) -> Result<()> {
        let mut histories = self
            .histories
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        histories
            .entry(user_id.to_string())
            .or_default()
            .push(interaction.clone());
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Vec<Interaction>> {
        let histories = self
            .histories
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(histories.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;
    use chrono::Utc;

    fn interaction(item_id: &str, decision: Decision) -> Interaction {
        Interaction {
            item_id: item_id.to_string(),
            decision,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_keeps_users_apart() {
        let store = InMemoryInteractionStore::new();
        store.append("alice", &interaction("1", Decision::Accept)).await.unwrap();
        store.append("alice", &interaction("2", Decision::Reject)).await.unwrap();
        store.append("bob", &interaction("3", Decision::Accept)).await.unwrap();

        let alice = store.load("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[1].item_id, "2");
        assert_eq!(store.load("bob").await.unwrap().len(), 1);
        assert!(store.load("carol").await.unwrap().is_empty());
    }

    #[test]
    fn test_redis_key_layout() {
        let client = redis::Client::open("redis://localhost:6379").unwrap();
        let store = RedisInteractionStore::new(client).with_key_prefix("styleswipe");
        assert_eq!(store.interactions_key("u1"), "styleswipe:u1:interactions");
    }
}

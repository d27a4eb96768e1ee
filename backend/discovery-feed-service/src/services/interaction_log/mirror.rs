/// Best-effort mirroring of recorded interactions to the durable store
///
/// The feed session hands every committed interaction to a `StoreMirrorHandle`
/// and moves on. A background task drains the queue in order and appends each
/// interaction with exponential backoff. Failures are logged and dropped; the
/// local log has already taken effect.
use super::{InteractionStore, Result, StoreError};
use crate::config::StoreConfig;
use crate::models::Interaction;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Backoff policy for store calls, built from `StoreConfig`
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Spread each delay by up to ±30%
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for RetryConfig {
    fn from(config: &StoreConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based), capped at `max_backoff`
    pub fn delay_for<R: Rng>(&self, retry: u32, rng: &mut R) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let base = Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);

        if self.jitter {
            base.mul_f64(1.0 + rng.gen_range(-0.3..0.3))
        } else {
            base
        }
    }
}

/// Run one store call under `config`. `operation` labels the log lines.
/// Gives up with `MaxRetriesExceeded` after `max_retries` failed retries.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;

    loop {
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        retry += 1;
        if retry > config.max_retries {
            warn!(
                operation,
                error = %error,
                max_retries = config.max_retries,
                "Store call failed, giving up"
            );
            return Err(StoreError::MaxRetriesExceeded(config.max_retries));
        }

        let delay = config.delay_for(retry, &mut rand::thread_rng());
        debug!(
            operation,
            error = %error,
            retry,
            delay_ms = delay.as_millis() as u64,
            "Store call failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Cheap handle the session uses to enqueue interactions
#[derive(Debug, Clone)]
pub struct StoreMirrorHandle {
    tx: UnboundedSender<Interaction>,
}

impl StoreMirrorHandle {
    /// Enqueue without waiting. A closed mirror only logs.
    pub fn mirror(&self, interaction: &Interaction) {
        if self.tx.send(interaction.clone()).is_err() {
            warn!(
                item_id = %interaction.item_id,
                "Store mirror closed, interaction kept locally only"
            );
        }
    }
}

pub struct StoreMirror {
    store: Arc<dyn InteractionStore>,
    user_id: String,
    retry: RetryConfig,
}

impl StoreMirror {
    pub fn new(store: Arc<dyn InteractionStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Load the user's history for session hydration; failures yield an empty history
    pub async fn load_history(&self) -> Vec<Interaction> {
        match with_retry(&self.retry, "load", || self.store.load(&self.user_id)).await {
            Ok(history) => {
                info!(
                    user_id = %self.user_id,
                    count = history.len(),
                    "Interaction history loaded"
                );
                history
            }
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    error = %e,
                    "Interaction history unavailable, starting from an empty log"
                );
                Vec::new()
            }
        }
    }

    /// Start the background writer; it stops once every handle is dropped
    pub fn spawn(self) -> (StoreMirrorHandle, JoinHandle<()>) {
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (StoreMirrorHandle { tx }, task)
    }

    /// Handle plus receiver, for callers that drive the writer themselves
    pub fn channel() -> (StoreMirrorHandle, UnboundedReceiver<Interaction>) {
        let (tx, rx) = unbounded_channel();
        (StoreMirrorHandle { tx }, rx)
    }

    pub async fn run(self, mut rx: UnboundedReceiver<Interaction>) {
        while let Some(interaction) = rx.recv().await {
            let result = with_retry(&self.retry, "append", || {
                self.store.append(&self.user_id, &interaction)
            })
            .await;

            if let Err(e) = result {
                warn!(
                    user_id = %self.user_id,
                    item_id = %interaction.item_id,
                    error = %e,
                    "Failed to persist interaction, keeping local state"
                );
            }
        }

        debug!(user_id = %self.user_id, "Store mirror stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;
    use crate::services::interaction_log::InMemoryInteractionStore;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            jitter: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_retry(3), "test", move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(StoreError::Unavailable("temporary".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_max_retries_exceeded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_retry(2), "test", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(StoreError::Unavailable("down".into())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::MaxRetriesExceeded(2))));
        assert_eq!(counter.load(Ordering::SeqCst), 3); // Initial + 2 retries
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_millis(3500),
            jitter: false,
            ..Default::default()
        };
        let mut rng = rand::thread_rng();

        assert_eq!(config.delay_for(1, &mut rng), Duration::from_secs(1));
        assert_eq!(config.delay_for(2, &mut rng), Duration::from_secs(2));
        assert_eq!(config.delay_for(3, &mut rng), Duration::from_millis(3500));
        assert_eq!(config.delay_for(40, &mut rng), Duration::from_millis(3500));
    }

    #[test]
    fn test_delay_jitter_stays_within_spread() {
        use rand::{rngs::StdRng, SeedableRng};

        let config = RetryConfig {
            initial_backoff: Duration::from_millis(1000),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..50 {
            let delay = config.delay_for(1, &mut rng);
            assert!(delay >= Duration::from_millis(700) && delay <= Duration::from_millis(1300));
        }
    }

    #[tokio::test]
    async fn test_mirror_persists_in_order() {
        let store = Arc::new(InMemoryInteractionStore::new());
        let mirror = StoreMirror::new(store.clone(), "alice").with_retry_config(fast_retry(0));
        let (handle, task) = mirror.spawn();

        for (id, decision) in [("1", Decision::Accept), ("2", Decision::Reject)] {
            handle.mirror(&Interaction {
                item_id: id.to_string(),
                decision,
                observed_at: Utc::now(),
            });
        }
        drop(handle);
        task.await.unwrap();

        let stored = store.load("alice").await.unwrap();
        let ids: Vec<&str> = stored.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_load_history_from_store() {
        let store = Arc::new(InMemoryInteractionStore::new());
        let interaction = Interaction {
            item_id: "5".to_string(),
            decision: Decision::Accept,
            observed_at: Utc::now(),
        };
        tokio_test::block_on(store.append("dana", &interaction)).unwrap();

        let mirror = StoreMirror::new(store, "dana").with_retry_config(fast_retry(0));
        let history = tokio_test::block_on(mirror.load_history());
        assert_eq!(history, vec![interaction]);
    }

    #[test]
    fn test_mirror_on_closed_channel_does_not_panic() {
        let (handle, rx) = StoreMirror::channel();
        drop(rx);
        handle.mirror(&Interaction {
            item_id: "1".to_string(),
            decision: Decision::Accept,
            observed_at: Utc::now(),
        });
    }
}

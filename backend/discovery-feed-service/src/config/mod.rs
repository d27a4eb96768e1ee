use crate::services::interaction_log::DuplicatePolicy;
use crate::utils::sanitize_threshold;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub service: ServiceConfig,
    pub redis: RedisConfig,
    pub swipe: SwipeConfig,
    pub ranking: RankingConfig,
    pub profile: ProfileConfig,
    pub store: StoreConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub user_id: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "discovery-feed-service".to_string(),
            user_id: "guest".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `None` keeps interactions in memory only
    pub url: Option<String>,
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: "feed".to_string(),
        }
    }
}

/// Gesture thresholds and animation timings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeConfig {
    /// Release beyond this magnitude commits a decision
    pub commit_threshold: f64,
    /// LIKE/NOPE overlays appear beyond this magnitude
    pub overlay_threshold: f64,
    /// Delay between commit and queue advance
    pub commit_delay: Duration,
    /// Settle animation length, input is ignored meanwhile
    pub settle_duration: Duration,
    /// Offset the card is flung to on commit
    pub fling_offset: f64,
    /// Degrees of card rotation per unit of offset
    pub rotation_factor: f64,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            commit_threshold: 100.0,
            overlay_threshold: 50.0,
            commit_delay: Duration::ZERO,
            settle_duration: Duration::from_millis(300),
            fling_offset: 1000.0,
            rotation_factor: 0.05,
        }
    }
}

impl SwipeConfig {
    /// Replace invalid thresholds with defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            commit_threshold: sanitize_threshold(self.commit_threshold, defaults.commit_threshold),
            overlay_threshold: sanitize_threshold(
                self.overlay_threshold,
                defaults.overlay_threshold,
            ),
            fling_offset: sanitize_threshold(self.fling_offset, defaults.fling_offset),
            rotation_factor: if self.rotation_factor.is_finite() {
                self.rotation_factor
            } else {
                defaults.rotation_factor
            },
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    /// Width of the uniform discovery jitter added to each score
    pub jitter_range: f64,
    /// Fixed seed for reproducible rankings
    pub seed: Option<u64>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            jitter_range: 2.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub top_tags: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { top_tags: 3 }
    }
}

impl Config {
    /// Load from the environment (and `.env`), falling back to defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let service = ServiceConfig::default();
        let redis = RedisConfig::default();
        let swipe = SwipeConfig::default();
        let ranking = RankingConfig::default();
        let store = StoreConfig::default();
        let assistant = AssistantConfig::default();

        Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME").unwrap_or(service.service_name),
                user_id: env::var("FEED_USER_ID").unwrap_or(service.user_id),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
                key_prefix: env::var("REDIS_KEY_PREFIX").unwrap_or(redis.key_prefix),
            },
            swipe: SwipeConfig {
                commit_threshold: parse_env("SWIPE_COMMIT_THRESHOLD", swipe.commit_threshold),
                overlay_threshold: parse_env("SWIPE_OVERLAY_THRESHOLD", swipe.overlay_threshold),
                commit_delay: Duration::from_millis(parse_env(
                    "SWIPE_COMMIT_MS",
                    swipe.commit_delay.as_millis() as u64,
                )),
                settle_duration: Duration::from_millis(parse_env(
                    "SWIPE_SETTLE_MS",
                    swipe.settle_duration.as_millis() as u64,
                )),
                fling_offset: parse_env("SWIPE_FLING_OFFSET", swipe.fling_offset),
                rotation_factor: swipe.rotation_factor,
            }
            .sanitized(),
            ranking: RankingConfig {
                jitter_range: sanitize_threshold(
                    parse_env("RANKING_JITTER_RANGE", ranking.jitter_range),
                    ranking.jitter_range,
                ),
                seed: env::var("RANKING_SEED").ok().and_then(|raw| {
                    raw.parse()
                        .map_err(|_| warn!(value = %raw, "RANKING_SEED is not a u64, ignoring"))
                        .ok()
                }),
            },
            profile: ProfileConfig {
                duplicate_policy: parse_env("PROFILE_DUPLICATE_POLICY", DuplicatePolicy::default()),
            },
            store: StoreConfig {
                max_retries: parse_env("STORE_MAX_RETRIES", store.max_retries),
                initial_backoff: Duration::from_millis(parse_env(
                    "STORE_INITIAL_BACKOFF_MS",
                    store.initial_backoff.as_millis() as u64,
                )),
                max_backoff: store.max_backoff,
            },
            assistant: AssistantConfig {
                top_tags: parse_env("ASSISTANT_TOP_TAGS", assistant.top_tags),
            },
        }
    }
}

/// Parse an env var, warning and keeping the default when it is malformed
fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_defaults() {
        let swipe = SwipeConfig::default();
        assert_eq!(swipe.commit_threshold, 100.0);
        assert_eq!(swipe.overlay_threshold, 50.0);
        assert_eq!(swipe.settle_duration, Duration::from_millis(300));
    }

    #[test]
    fn test_negative_threshold_falls_back() {
        let swipe = SwipeConfig {
            commit_threshold: -20.0,
            overlay_threshold: f64::NAN,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(swipe.commit_threshold, 100.0);
        assert_eq!(swipe.overlay_threshold, 50.0);
    }

    #[test]
    fn test_parse_env_invalid_value() {
        env::set_var("DISCOVERY_FEED_TEST_BAD_U32", "not-a-number");
        assert_eq!(parse_env("DISCOVERY_FEED_TEST_BAD_U32", 7u32), 7);
        env::set_var("DISCOVERY_FEED_TEST_GOOD_U32", " 12 ");
        assert_eq!(parse_env("DISCOVERY_FEED_TEST_GOOD_U32", 7u32), 12);
        assert_eq!(parse_env("DISCOVERY_FEED_TEST_MISSING", 7u32), 7);
    }
}

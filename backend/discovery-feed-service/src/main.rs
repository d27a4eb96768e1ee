use anyhow::Context;
use discovery_feed_service::{
    services::interaction_log::{
        InMemoryInteractionStore, InteractionStore, RedisInteractionStore, RetryConfig,
        StoreMirror,
    },
    Catalog, Config, FeedDriver, FeedEvent, FeedSession, SessionOptions,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr; stdout carries feed views)
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    tracing_subscriber::registry()
        .with(json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let user_id = config.service.user_id.clone();

    info!(
        service = %config.service.service_name,
        user_id = %user_id,
        "Starting discovery feed"
    );

    // Interaction store: Redis when configured, otherwise process-local
    let store: Arc<dyn InteractionStore> = match &config.redis.url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            Arc::new(RedisInteractionStore::new(client).with_key_prefix(&config.redis.key_prefix))
        }
        None => {
            warn!("REDIS_URL not set, interactions will not outlive this process");
            Arc::new(InMemoryInteractionStore::new())
        }
    };

    let mirror = StoreMirror::new(store, user_id.clone())
        .with_retry_config(RetryConfig::from(&config.store));
    let history = mirror.load_history().await;
    let (mirror_handle, mirror_task) = mirror.spawn();

    let session = FeedSession::new(
        user_id,
        Catalog::seed(),
        SessionOptions::from_config(&config)
            .with_history(history)
            .with_mirror(mirror_handle),
    );

    let driver = FeedDriver::new(session, EVENT_BUFFER);
    let events = driver.sender();
    let mut views = driver.subscribe();
    let driver_task = tokio::spawn(driver.run());

    // Publish every view change as one JSON line
    let printer = tokio::spawn(async move {
        loop {
            let line = serde_json::to_string(&*views.borrow_and_update());
            match line {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to encode feed view"),
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event: FeedEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed event");
                continue;
            }
        };
        let shutdown = event == FeedEvent::Shutdown;
        if events.send(event).await.is_err() || shutdown {
            break;
        }
    }
    drop(events);

    let session = driver_task.await.context("Feed driver panicked")?;
    info!(
        interactions = session.interactions().len(),
        stylist_context = %session.stylist_context(config.assistant.top_tags).summary(),
        "Feed session finished"
    );

    // Dropping the session closes the view channel and the mirror queue
    drop(session);
    printer.await.context("View printer panicked")?;
    mirror_task.await.context("Store mirror panicked")?;

    Ok(())
}

// ============================================
// Feed Driver (事件驅動迴圈)
// ============================================
//
// Owns the FeedSession on a single task. Every input arrives as a FeedEvent:
// - pointer/fling gestures from the renderer
// - catalog snapshots from the provider
// - swipe timers scheduled here with tokio::time::sleep and sent back into the
//   same channel, tagged with the commit sequence
//
// Timers hold only a weak sender, so the loop ends once every external sender
// is dropped (or on Shutdown) and returns the session to the caller.

use crate::models::{Decision, Item, SwipeDirection};
use crate::services::catalog::CatalogError;
use crate::services::feed_session::{FeedSession, FeedView};
use crate::services::swipe::{Commit, SwipeStep, SwipeTimer, SwipeTimerKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    PointerDown { x: f64 },
    PointerMove { x: f64 },
    PointerUp,
    Fling { direction: SwipeDirection },
    Record { item_id: String, decision: Decision },
    Catalog { items: Vec<Item> },
    CatalogUnavailable { reason: String },
    /// Scheduled by the driver only; never accepted from the wire
    #[serde(skip_deserializing)]
    Timer(SwipeTimer),
    Shutdown,
}

pub struct FeedDriver {
    session: FeedSession,
    tx: mpsc::Sender<FeedEvent>,
    rx: mpsc::Receiver<FeedEvent>,
}

impl FeedDriver {
    pub fn new(session: FeedSession, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        Self { session, tx, rx }
    }

    pub fn sender(&self) -> mpsc::Sender<FeedEvent> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.session.subscribe()
    }

    /// Process events until Shutdown or until all senders are gone
    pub async fn run(self) -> FeedSession {
        let FeedDriver {
            mut session,
            tx,
            mut rx,
        } = self;
        let timers = tx.downgrade();
        drop(tx);

        info!(user_id = %session.user_id(), "Feed driver started");

        while let Some(event) = rx.recv().await {
            match event {
                FeedEvent::PointerDown { x } => {
                    session.pointer_down(x);
                }
                FeedEvent::PointerMove { x } => {
                    session.pointer_move(x);
                }
                FeedEvent::PointerUp => {
                    let commit = session.pointer_up();
                    schedule_commit(&session, &timers, commit);
                }
                FeedEvent::Fling { direction } => {
                    let commit = session.fling(direction);
                    schedule_commit(&session, &timers, commit);
                }
                FeedEvent::Record { item_id, decision } => {
                    session.record(item_id, decision);
                }
                FeedEvent::Catalog { items } => session.update_catalog(Ok(items)),
                FeedEvent::CatalogUnavailable { reason } => {
                    session.update_catalog(Err(CatalogError::Unavailable(reason)))
                }
                FeedEvent::Timer(timer) => {
                    if let Some(SwipeStep::Advance) = session.on_timer(timer) {
                        let settle = session.swipe_config().settle_duration;
                        schedule(
                            &timers,
                            settle,
                            SwipeTimer {
                                seq: timer.seq,
                                kind: SwipeTimerKind::SettleElapsed,
                            },
                        );
                    }
                }
                FeedEvent::Shutdown => {
                    info!(user_id = %session.user_id(), "Feed driver shutting down");
                    break;
                }
            }
        }

        debug!(
            user_id = %session.user_id(),
            interactions = session.interactions().len(),
            "Feed driver stopped"
        );
        session
    }
}

fn schedule_commit(
    session: &FeedSession,
    timers: &mpsc::WeakSender<FeedEvent>,
    commit: Option<Commit>,
) {
    if let Some(commit) = commit {
        schedule(
            timers,
            session.swipe_config().commit_delay,
            SwipeTimer {
                seq: commit.seq,
                kind: SwipeTimerKind::CommitElapsed,
            },
        );
    }
}

fn schedule(timers: &mpsc::WeakSender<FeedEvent>, delay: Duration, timer: SwipeTimer) {
    let timers = timers.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // Driver gone: nothing left to animate
        if let Some(tx) = timers.upgrade() {
            let _ = tx.send(FeedEvent::Timer(timer)).await;
        }
    });
}

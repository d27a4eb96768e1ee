// ============================================
// Runtime Jobs (執行期任務)
// ============================================
//
// Long-running tasks around a feed session:
// 1. Feed driver - serialises gestures, catalog snapshots and swipe timers
//    onto the task that owns the session
// 2. Store mirror - lives in services::interaction_log, spawned by the binary

pub mod feed_driver;

pub use feed_driver::{FeedDriver, FeedEvent};

// ============================================
// Swipe Session State Machine (滑動手勢狀態機)
// ============================================
//
// Collapses continuous pointer input into discrete accept/reject decisions.
//
//   Idle --pointer_down--> Dragging --pointer_move--> Dragging
//   Dragging --pointer_up, |offset| <= threshold--> Idle        (no decision)
//   Dragging --pointer_up, |offset| >  threshold--> Committing  (decision)
//   Idle --fling(direction)--> Committing                        (button swipe)
//   Committing --commit timer--> Settling   (queue advances, offset -> 0)
//   Settling --settle timer--> Idle
//   any --queue exhausted--> Exhausted --non-empty queue--> Idle
//
// Pointer input is ignored while Committing/Settling/Exhausted. Timers carry
// the commit sequence number so a timer from an earlier commit is a no-op.
//
// The machine holds no queue or log; the owning session applies the returned
// decisions and steps.

use crate::config::SwipeConfig;
use crate::models::{Decision, SwipeDirection};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipePhase {
    Idle,
    Dragging,
    Committing,
    Settling,
    Exhausted,
}

impl SwipePhase {
    /// True while a committed swipe is animating out
    pub fn is_animating(&self) -> bool {
        matches!(self, SwipePhase::Committing | SwipePhase::Settling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeTimerKind {
    CommitElapsed,
    SettleElapsed,
}

/// Timer event addressed to one commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeTimer {
    pub seq: u64,
    pub kind: SwipeTimerKind,
}

/// A decision that just entered Committing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub seq: u64,
    pub decision: Decision,
}

/// Work the owner must do after a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeStep {
    /// Committing -> Settling: advance the queue
    Advance,
    /// Settling -> Idle: expose the next item
    Settled,
}

/// Card transform for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardPose {
    pub translate_x: f64,
    pub rotate_deg: f64,
    pub animating: bool,
}

/// LIKE/NOPE stamp visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub like: bool,
    pub nope: bool,
}

#[derive(Debug, Clone)]
pub struct SwipeSession {
    config: SwipeConfig,
    phase: SwipePhase,
    drag_origin: f64,
    drag_offset: f64,
    commit_seq: u64,
}

impl Default for SwipeSession {
    fn default() -> Self {
        Self::new(SwipeConfig::default())
    }
}

impl SwipeSession {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config: config.sanitized(),
            phase: SwipePhase::Exhausted,
            drag_origin: 0.0,
            drag_offset: 0.0,
            commit_seq: 0,
        }
    }

    pub fn config(&self) -> &SwipeConfig {
        &self.config
    }

    pub fn phase(&self) -> SwipePhase {
        self.phase
    }

    pub fn drag_offset(&self) -> f64 {
        self.drag_offset
    }

    /// Sequence number of the latest commit
    pub fn commit_seq(&self) -> u64 {
        self.commit_seq
    }

    pub fn pointer_down(&mut self, x: f64) -> bool {
        if self.phase != SwipePhase::Idle || !x.is_finite() {
            return false;
        }
        self.phase = SwipePhase::Dragging;
        self.drag_origin = x;
        self.drag_offset = 0.0;
        true
    }

    pub fn pointer_move(&mut self, x: f64) -> bool {
        if self.phase != SwipePhase::Dragging || !x.is_finite() {
            return false;
        }
        self.drag_offset = x - self.drag_origin;
        true
    }

    /// Release the pointer. Returns the commit when the drag passed the threshold.
    pub fn pointer_up(&mut self) -> Option<Commit> {
        if self.phase != SwipePhase::Dragging {
            return None;
        }

        let offset = self.drag_offset;
        match SwipeDirection::from_offset(offset) {
            Some(direction) if offset.abs() > self.config.commit_threshold => {
                Some(self.begin_commit(direction))
            }
            _ => {
                debug!(offset, "Soft swipe released, snapping back");
                self.reset_to_idle();
                None
            }
        }
    }

    /// Button swipe: commit without a drag
    pub fn fling(&mut self, direction: SwipeDirection) -> Option<Commit> {
        if self.phase != SwipePhase::Idle {
            return None;
        }
        Some(self.begin_commit(direction))
    }

    fn begin_commit(&mut self, direction: SwipeDirection) -> Commit {
        self.commit_seq += 1;
        self.phase = SwipePhase::Committing;
        self.drag_offset = direction.sign() * self.config.fling_offset;

        let commit = Commit {
            seq: self.commit_seq,
            decision: direction.decision(),
        };
        debug!(seq = commit.seq, decision = commit.decision.as_str(), "Swipe committing");
        commit
    }

    /// Advance the animation. Stale or out-of-phase timers return `None`.
    pub fn on_timer(&mut self, timer: SwipeTimer) -> Option<SwipeStep> {
        if timer.seq != self.commit_seq {
            return None;
        }

        match (self.phase, timer.kind) {
            (SwipePhase::Committing, SwipeTimerKind::CommitElapsed) => {
                self.phase = SwipePhase::Settling;
                self.drag_offset = 0.0;
                Some(SwipeStep::Advance)
            }
            (SwipePhase::Settling, SwipeTimerKind::SettleElapsed) => {
                self.phase = SwipePhase::Idle;
                Some(SwipeStep::Settled)
            }
            _ => None,
        }
    }

    /// Drop an in-flight drag, e.g. when the queue is rebuilt underneath it
    pub fn cancel_drag(&mut self) {
        if self.phase == SwipePhase::Dragging {
            debug!(offset = self.drag_offset, "Drag cancelled");
            self.reset_to_idle();
        }
    }

    /// Sync with queue state. Ignored while a commit is animating.
    pub fn set_exhausted(&mut self, exhausted: bool) {
        match (self.phase, exhausted) {
            (SwipePhase::Committing | SwipePhase::Settling, _) => {}
            (SwipePhase::Exhausted, false) => self.phase = SwipePhase::Idle,
            (_, true) => {
                self.phase = SwipePhase::Exhausted;
                self.drag_offset = 0.0;
            }
            _ => {}
        }
    }

    pub fn pose(&self) -> CardPose {
        CardPose {
            translate_x: self.drag_offset,
            rotate_deg: self.drag_offset * self.config.rotation_factor,
            animating: self.phase.is_animating(),
        }
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            like: self.drag_offset > self.config.overlay_threshold,
            nope: self.drag_offset < -self.config.overlay_threshold,
        }
    }

    fn reset_to_idle(&mut self) {
        self.phase = SwipePhase::Idle;
        self.drag_origin = 0.0;
        self.drag_offset = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_session() -> SwipeSession {
        let mut session = SwipeSession::default();
        session.set_exhausted(false);
        session
    }

    fn drag(session: &mut SwipeSession, dx: f64) -> Option<Commit> {
        assert!(session.pointer_down(200.0));
        assert!(session.pointer_move(200.0 + dx));
        session.pointer_up()
    }

    fn timer(seq: u64, kind: SwipeTimerKind) -> SwipeTimer {
        SwipeTimer { seq, kind }
    }

    #[test]
    fn test_starts_exhausted_and_ignores_input() {
        let mut session = SwipeSession::default();
        assert_eq!(session.phase(), SwipePhase::Exhausted);
        assert!(!session.pointer_down(0.0));
        assert!(session.fling(SwipeDirection::Right).is_none());
    }

    #[test]
    fn test_soft_swipe_snaps_back() {
        let mut session = idle_session();

        assert!(drag(&mut session, 99.0).is_none());
        assert_eq!(session.phase(), SwipePhase::Idle);
        assert_eq!(session.drag_offset(), 0.0);

        assert!(drag(&mut session, -100.0).is_none());
        assert_eq!(session.phase(), SwipePhase::Idle);
    }

    #[test]
    fn test_hard_swipe_commits() {
        let mut session = idle_session();

        let commit = drag(&mut session, 101.0).unwrap();
        assert_eq!(commit.decision, Decision::Accept);
        assert_eq!(session.phase(), SwipePhase::Committing);
        assert_eq!(session.drag_offset(), 1000.0);

        let mut session = idle_session();
        let commit = drag(&mut session, -150.0).unwrap();
        assert_eq!(commit.decision, Decision::Reject);
        assert_eq!(session.drag_offset(), -1000.0);
    }

    #[test]
    fn test_full_commit_cycle() {
        let mut session = idle_session();
        let commit = drag(&mut session, 120.0).unwrap();

        assert_eq!(
            session.on_timer(timer(commit.seq, SwipeTimerKind::CommitElapsed)),
            Some(SwipeStep::Advance)
        );
        assert_eq!(session.phase(), SwipePhase::Settling);
        assert_eq!(session.drag_offset(), 0.0);

        assert_eq!(
            session.on_timer(timer(commit.seq, SwipeTimerKind::SettleElapsed)),
            Some(SwipeStep::Settled)
        );
        assert_eq!(session.phase(), SwipePhase::Idle);
    }

    #[test]
    fn test_input_ignored_while_animating() {
        let mut session = idle_session();
        let commit = session.fling(SwipeDirection::Left).unwrap();

        assert!(!session.pointer_down(0.0));
        assert!(!session.pointer_move(500.0));
        assert!(session.pointer_up().is_none());
        assert!(session.fling(SwipeDirection::Right).is_none());

        session.on_timer(timer(commit.seq, SwipeTimerKind::CommitElapsed));
        assert!(!session.pointer_down(0.0));
        assert!(session.fling(SwipeDirection::Right).is_none());
        assert_eq!(session.commit_seq(), 1);
    }

    #[test]
    fn test_out_of_order_and_stale_timers_ignored() {
        let mut session = idle_session();
        let first = session.fling(SwipeDirection::Right).unwrap();

        assert!(session
            .on_timer(timer(first.seq, SwipeTimerKind::SettleElapsed))
            .is_none());
        assert!(session
            .on_timer(timer(first.seq + 1, SwipeTimerKind::CommitElapsed))
            .is_none());
        assert_eq!(session.phase(), SwipePhase::Committing);

        session.on_timer(timer(first.seq, SwipeTimerKind::CommitElapsed));
        session.on_timer(timer(first.seq, SwipeTimerKind::SettleElapsed));
        let second = session.fling(SwipeDirection::Right).unwrap();

        assert!(session
            .on_timer(timer(first.seq, SwipeTimerKind::CommitElapsed))
            .is_none());
        assert_eq!(second.seq, first.seq + 1);
    }

    #[test]
    fn test_overlay_thresholds() {
        let mut session = idle_session();
        session.pointer_down(0.0);

        session.pointer_move(50.0);
        assert_eq!(session.overlay(), Overlay::default());

        session.pointer_move(51.0);
        assert!(session.overlay().like);
        assert!(!session.overlay().nope);

        session.pointer_move(-51.0);
        assert!(session.overlay().nope);
        assert!(!session.overlay().like);
        assert_eq!(session.phase(), SwipePhase::Dragging);
    }

    #[test]
    fn test_pose_follows_offset() {
        let mut session = idle_session();
        session.pointer_down(10.0);
        session.pointer_move(70.0);

        let pose = session.pose();
        assert_eq!(pose.translate_x, 60.0);
        assert!((pose.rotate_deg - 3.0).abs() < 1e-9);
        assert!(!pose.animating);

        session.pointer_move(300.0);
        session.pointer_up();
        assert!(session.pose().animating);
    }

    #[test]
    fn test_exhaustion_transitions() {
        let mut session = idle_session();
        session.pointer_down(0.0);
        session.set_exhausted(true);
        assert_eq!(session.phase(), SwipePhase::Exhausted);
        assert_eq!(session.drag_offset(), 0.0);

        session.set_exhausted(false);
        assert_eq!(session.phase(), SwipePhase::Idle);

        let commit = session.fling(SwipeDirection::Right).unwrap();
        session.set_exhausted(true);
        assert_eq!(session.phase(), SwipePhase::Committing);
        session.on_timer(timer(commit.seq, SwipeTimerKind::CommitElapsed));
        session.on_timer(timer(commit.seq, SwipeTimerKind::SettleElapsed));
        session.set_exhausted(true);
        assert_eq!(session.phase(), SwipePhase::Exhausted);
    }

    #[test]
    fn test_cancel_drag() {
        let mut session = idle_session();
        session.pointer_down(0.0);
        session.pointer_move(80.0);
        session.cancel_drag();

        assert_eq!(session.phase(), SwipePhase::Idle);
        assert_eq!(session.drag_offset(), 0.0);
        assert!(session.pointer_up().is_none());
    }
}

// THEORY:
// The lock tracker turns the region detector's per-frame answer into the lock state
// the engagement machine consumes. It is deliberately memoryless: the state after
// frame n depends only on the detection in frame n. There is no hysteresis, no
// debounce and no interpolation, so one dropped detection unlocks immediately and
// a locked box snaps to the latest detection.
//
// It still reports *how* the state changed, because acquiring and losing a lock are
// the moments worth logging.

use crate::core_modules::region::{Point, TargetBox};
use tracing::debug;

/// Whether a target is currently held, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    NoLock,
    Locked(TargetBox),
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked(_))
    }

    pub fn target(&self) -> Option<TargetBox> {
        match self {
            LockState::Locked(target) => Some(*target),
            LockState::NoLock => None,
        }
    }

    pub fn target_center(&self) -> Option<Point> {
        self.target().map(|target| target.center())
    }
}

/// How the lock state moved during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTransition {
    /// `NoLock -> Locked`.
    Acquired(TargetBox),
    /// `Locked -> Locked`, box replaced by the new detection.
    Held(TargetBox),
    /// `Locked -> NoLock`.
    Lost,
    /// `NoLock -> NoLock`.
    Searching,
}

#[derive(Debug, Default)]
pub struct LockTracker {
    state: LockState,
}

impl LockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Applies this frame's detection. Must be called exactly once per frame.
    pub fn update(&mut self, detection: Option<TargetBox>) -> LockTransition {
        let transition = match (self.state, detection) {
            (LockState::NoLock, Some(target)) => LockTransition::Acquired(target),
            (LockState::Locked(_), Some(target)) => LockTransition::Held(target),
            (LockState::Locked(_), None) => LockTransition::Lost,
            (LockState::NoLock, None) => LockTransition::Searching,
        };
        self.state = match detection {
            Some(target) => LockState::Locked(target),
            None => LockState::NoLock,
        };

        match transition {
            LockTransition::Acquired(target) => debug!(?target, "lock acquired"),
            LockTransition::Lost => debug!("lock lost"),
            _ => {}
        }
        transition
    }
}

// THEORY:
// The `engagement` module is the top of the per-frame stack. It turns the lock state
// and an operator's launch trigger into a single, consistent engagement sequence:
//
//     Idle --launch & locked--> InFlight --distance < impact--> Exploding --ticks > limit--> Idle
//                                   |
//                                   +--lock lost--> Idle
//
// Key architectural principles:
// 1.  **One tagged state**: the missile and the explosion are payloads of mutually
//     exclusive variants, so "both active at once" cannot be represented.
// 2.  **One transition per tick**: `tick` runs once per frame, after the lock
//     tracker, and takes at most one edge. Decisions for frame n only ever see
//     frame n's lock state.
// 3.  **Exponential pursuit**: each in-flight tick closes a fixed fraction (the
//     pursuit gain) of the remaining distance to the *current* target center. The
//     impact test uses the distance measured at the start of the tick.
// 4.  **Total transitions**: a launch outside `Idle & Locked` is silently dropped;
//     nothing here returns an error.
// 5.  **Lock loss is terminal for the missile**: a missile whose lock drops is
//     discarded immediately, with no unguided coast and no miss animation. A running
//     explosion, by contrast, plays out regardless of lock.

use crate::core_modules::event_log::{EventLog, HIT_MESSAGE, LAUNCH_MESSAGE, LOST_MESSAGE};
use crate::core_modules::lock_tracker::LockState;
use crate::core_modules::region::Point;
use tracing::info;

/// Fixed tuning for one session's engagement machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementParams {
    /// Fraction of the remaining distance closed per tick, in (0, 1].
    pub pursuit_gain: f64,
    /// Impact fires when the missile starts a tick strictly closer than this.
    pub impact_distance: f64,
    /// The explosion stays active while `elapsed_ticks <= explosion_tick_limit`.
    pub explosion_tick_limit: u32,
    pub launch_origin: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EngagementState {
    #[default]
    Idle,
    InFlight {
        missile: Point,
    },
    Exploding {
        /// Target center at the moment of impact.
        center: Point,
        elapsed_ticks: u32,
    },
}

/// A discrete, log-worthy edge of the engagement machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngagementEvent {
    Launched { origin: Point },
    Hit { at: Point },
    MissileLost { last_position: Point },
    ExplosionFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MissileStatus {
    pub active: bool,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExplosionStatus {
    pub active: bool,
    pub elapsed_ticks: u32,
    pub center: Point,
}

impl ExplosionStatus {
    /// Visual radius: grows linearly with elapsed ticks.
    pub fn radius(&self, scale: f64) -> f64 {
        self.elapsed_ticks as f64 * scale
    }
}

/// Running totals for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngagementStats {
    pub launches: u64,
    pub hits: u64,
    pub missiles_lost: u64,
}

/// Turns a per-frame trigger level into a single launch command on its rising edge,
/// so a held key cannot re-launch every frame.
#[derive(Debug, Default)]
pub struct TriggerLatch {
    held: bool,
}

impl TriggerLatch {
    pub fn rising_edge(&mut self, held: bool) -> bool {
        let fired = held && !self.held;
        self.held = held;
        fired
    }
}

/// The engagement state machine. Owns the missile and explosion exclusively.
#[derive(Debug)]
pub struct Engagement {
    params: EngagementParams,
    state: EngagementState,
    stats: EngagementStats,
}

impl Engagement {
    pub fn new(params: EngagementParams) -> Self {
        Self {
            params,
            state: EngagementState::Idle,
            stats: EngagementStats::default(),
        }
    }

    pub fn state(&self) -> EngagementState {
        self.state
    }

    pub fn stats(&self) -> EngagementStats {
        self.stats
    }

    pub fn params(&self) -> &EngagementParams {
        &self.params
    }

    pub fn weapon_ready(&self) -> bool {
        matches!(self.state, EngagementState::Idle)
    }

    pub fn missile(&self) -> MissileStatus {
        match self.state {
            EngagementState::InFlight { missile } => MissileStatus {
                active: true,
                position: missile,
            },
            _ => MissileStatus::default(),
        }
    }

    pub fn explosion(&self) -> ExplosionStatus {
        match self.state {
            EngagementState::Exploding {
                center,
                elapsed_ticks,
            } => ExplosionStatus {
                active: true,
                elapsed_ticks,
                center,
            },
            _ => ExplosionStatus::default(),
        }
    }

    /// Advances the machine by one frame. `launch` is the edge-triggered command.
    pub fn tick(
        &mut self,
        lock: &LockState,
        launch: bool,
        log: &mut EventLog,
    ) -> Option<EngagementEvent> {
        let (next, event) = match (self.state, lock.target_center()) {
            (EngagementState::Idle, Some(_)) if launch => {
                let origin = self.params.launch_origin;
                (
                    EngagementState::InFlight { missile: origin },
                    Some(EngagementEvent::Launched { origin }),
                )
            }
            (EngagementState::Idle, _) => (EngagementState::Idle, None),
            (EngagementState::InFlight { missile }, None) => (
                EngagementState::Idle,
                Some(EngagementEvent::MissileLost {
                    last_position: missile,
                }),
            ),
            (EngagementState::InFlight { missile }, Some(center)) => {
                if missile.distance_to(center) < self.params.impact_distance {
                    (
                        EngagementState::Exploding {
                            center,
                            elapsed_ticks: 0,
                        },
                        Some(EngagementEvent::Hit { at: center }),
                    )
                } else {
                    let missile = missile.step_towards(center, self.params.pursuit_gain);
                    (EngagementState::InFlight { missile }, None)
                }
            }
            (
                EngagementState::Exploding {
                    center,
                    elapsed_ticks,
                },
                _,
            ) => {
                let elapsed_ticks = elapsed_ticks + 1;
                if elapsed_ticks > self.params.explosion_tick_limit {
                    (
                        EngagementState::Idle,
                        Some(EngagementEvent::ExplosionFinished),
                    )
                } else {
                    (
                        EngagementState::Exploding {
                            center,
                            elapsed_ticks,
                        },
                        None,
                    )
                }
            }
        };

        self.state = next;
        if let Some(event) = event {
            self.record(event, log);
        }
        event
    }

    fn record(&mut self, event: EngagementEvent, log: &mut EventLog) {
        match event {
            EngagementEvent::Launched { origin } => {
                self.stats.launches += 1;
                info!(x = origin.x, y = origin.y, "missile launched");
                log.append(LAUNCH_MESSAGE);
            }
            EngagementEvent::Hit { at } => {
                self.stats.hits += 1;
                info!(x = at.x, y = at.y, "target hit");
                log.append(HIT_MESSAGE);
            }
            EngagementEvent::MissileLost { last_position } => {
                self.stats.missiles_lost += 1;
                info!(
                    x = last_position.x,
                    y = last_position.y,
                    "lock dropped, missile lost"
                );
                log.append(LOST_MESSAGE);
            }
            EngagementEvent::ExplosionFinished => info!("explosion finished, weapon ready"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::TargetBox;

    const EPS: f64 = 1e-9;

    fn params() -> EngagementParams {
        EngagementParams {
            pursuit_gain: 0.15,
            impact_distance: 20.0,
            explosion_tick_limit: 10,
            launch_origin: Point::new(512.0, 600.0),
        }
    }

    fn locked_at(x: u32, y: u32) -> LockState {
        // 40x40 box centered on (x, y).
        LockState::Locked(TargetBox::new(x - 20, y - 20, 40, 40))
    }

    fn in_flight_at(missile: Point) -> Engagement {
        let mut engagement = Engagement::new(params());
        engagement.state = EngagementState::InFlight { missile };
        engagement
    }

    #[test]
    fn launch_requires_lock() {
        let mut engagement = Engagement::new(params());
        let mut log = EventLog::new(10);
        assert_eq!(engagement.tick(&LockState::NoLock, true, &mut log), None);
        assert_eq!(engagement.state(), EngagementState::Idle);
        assert!(log.is_empty());
    }

    #[test]
    fn launch_places_missile_at_origin_and_logs() {
        let mut engagement = Engagement::new(params());
        let mut log = EventLog::new(10);
        let event = engagement.tick(&locked_at(120, 120), true, &mut log);
        assert_eq!(
            event,
            Some(EngagementEvent::Launched {
                origin: Point::new(512.0, 600.0)
            })
        );
        let missile = engagement.missile();
        assert!(missile.active);
        assert_eq!(missile.position, Point::new(512.0, 600.0));
        assert!(log.contains(LAUNCH_MESSAGE));
        assert!(!engagement.weapon_ready());
    }

    #[test]
    fn no_trigger_no_launch() {
        let mut engagement = Engagement::new(params());
        let mut log = EventLog::new(10);
        engagement.tick(&locked_at(120, 120), false, &mut log);
        assert_eq!(engagement.state(), EngagementState::Idle);
    }

    #[test]
    fn relaunch_is_ignored_while_in_flight() {
        let mut engagement = Engagement::new(params());
        let mut log = EventLog::new(10);
        let lock = locked_at(120, 120);
        engagement.tick(&lock, true, &mut log);
        let before = engagement.missile().position;
        engagement.tick(&lock, true, &mut log);
        let after = engagement.missile().position;
        assert_ne!(before, after, "missile should have advanced, not reset");
        assert_eq!(engagement.stats().launches, 1);
        assert_eq!(log.entries().filter(|e| *e == LAUNCH_MESSAGE).count(), 1);
    }

    #[test]
    fn pursuit_closes_fifteen_percent_per_tick() {
        let target = Point::new(500.0, 300.0);
        let mut engagement = in_flight_at(Point::new(525.0, 300.0));
        let mut log = EventLog::new(10);
        engagement.tick(&locked_at(500, 300), false, &mut log);
        let distance = engagement.missile().position.distance_to(target);
        assert!((distance - 21.25).abs() < EPS, "{distance}");
    }

    #[test]
    fn distance_shrinks_geometrically() {
        let target = Point::new(400.0, 200.0);
        let start = Point::new(512.0, 600.0);
        let d0 = start.distance_to(target);
        let mut engagement = in_flight_at(start);
        let mut log = EventLog::new(10);
        for k in 1..=8 {
            engagement.tick(&locked_at(400, 200), false, &mut log);
            let expected = d0 * 0.85f64.powi(k);
            let actual = engagement.missile().position.distance_to(target);
            assert!((actual - expected).abs() < 1e-6, "tick {k}: {actual} vs {expected}");
        }
    }

    #[test]
    fn inside_impact_distance_explodes_and_logs() {
        let mut engagement = in_flight_at(Point::new(519.0, 300.0));
        let mut log = EventLog::new(10);
        let event = engagement.tick(&locked_at(500, 300), false, &mut log);
        assert_eq!(
            event,
            Some(EngagementEvent::Hit {
                at: Point::new(500.0, 300.0)
            })
        );
        assert!(!engagement.missile().active);
        let explosion = engagement.explosion();
        assert!(explosion.active);
        assert_eq!(explosion.elapsed_ticks, 0);
        assert!(log.contains(HIT_MESSAGE));
    }

    #[test]
    fn exactly_at_impact_distance_keeps_flying() {
        let mut engagement = in_flight_at(Point::new(520.0, 300.0));
        let mut log = EventLog::new(10);
        engagement.tick(&locked_at(500, 300), false, &mut log);
        assert!(engagement.missile().active);
    }

    #[test]
    fn losing_lock_in_flight_discards_missile() {
        let mut engagement = in_flight_at(Point::new(300.0, 300.0));
        let mut log = EventLog::new(10);
        let event = engagement.tick(&LockState::NoLock, false, &mut log);
        assert!(matches!(event, Some(EngagementEvent::MissileLost { .. })));
        assert_eq!(engagement.state(), EngagementState::Idle);
        assert!(!engagement.explosion().active);
        assert!(log.contains(LOST_MESSAGE));
        assert_eq!(engagement.stats().missiles_lost, 1);
    }

    #[test]
    fn explosion_ends_one_tick_after_the_limit() {
        let mut engagement = in_flight_at(Point::new(505.0, 300.0));
        let mut log = EventLog::new(10);
        engagement.tick(&locked_at(500, 300), false, &mut log);
        for expected in 1..=10 {
            engagement.tick(&LockState::NoLock, false, &mut log);
            let explosion = engagement.explosion();
            assert!(explosion.active, "still active at {expected}");
            assert_eq!(explosion.elapsed_ticks, expected);
        }
        let event = engagement.tick(&LockState::NoLock, false, &mut log);
        assert_eq!(event, Some(EngagementEvent::ExplosionFinished));
        assert!(!engagement.explosion().active);
        assert!(engagement.weapon_ready());
    }

    #[test]
    fn launch_is_ignored_while_exploding() {
        let mut engagement = in_flight_at(Point::new(505.0, 300.0));
        let mut log = EventLog::new(10);
        let lock = locked_at(500, 300);
        engagement.tick(&lock, false, &mut log);
        engagement.tick(&lock, true, &mut log);
        assert!(engagement.explosion().active);
        assert!(!engagement.missile().active);
        assert_eq!(engagement.stats().launches, 0);
    }

    #[test]
    fn explosion_radius_scales_with_ticks() {
        let explosion = ExplosionStatus {
            active: true,
            elapsed_ticks: 4,
            center: Point::default(),
        };
        assert_eq!(explosion.radius(15.0), 60.0);
    }

    #[test]
    fn missile_and_explosion_are_never_both_active() {
        let mut engagement = Engagement::new(params());
        let mut log = EventLog::new(10);
        let pattern = [true, true, false, true, true, true, false, false, true, true];
        for (frame, &locked) in pattern.iter().cycle().take(400).enumerate() {
            let lock = if locked { locked_at(480, 320) } else { LockState::NoLock };
            engagement.tick(&lock, frame % 7 == 0, &mut log);
            assert!(!(engagement.missile().active && engagement.explosion().active));
        }
    }

    #[test]
    fn trigger_latch_fires_once_per_press() {
        let mut latch = TriggerLatch::default();
        let fired: Vec<bool> = [false, true, true, true, false, true]
            .into_iter()
            .map(|held| latch.rising_edge(held))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }
}

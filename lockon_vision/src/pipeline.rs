// THEORY:
// The `pipeline` module is the top-level API for the engine. It wires the stages
// into the fixed per-frame order and owns every piece of state that outlives a
// frame, so callers see one object and one call per tick:
//
//     Frame -> color segmenter -> region detector -> lock tracker -> engagement -> FrameReport
//
// Masks, regions and scratch buffers are created and dropped inside a single call.
// Lock state, the engagement machine, the event log and the frame counter live in
// the `Session` and are only touched from `process_*`, one frame at a time. Nothing
// here blocks or spawns; capture, display and input belong to the caller.

use crate::core_modules::color_segmenter;
use crate::core_modules::engagement::{Engagement, TriggerLatch};
use crate::core_modules::event_log::EventLog;
use crate::core_modules::lock_tracker::LockTracker;
use crate::core_modules::region_detector::region_detector;
use crate::error::{Result, VisionError};
use tracing::{debug, trace};

// Re-export key data structures for the public API.
pub use crate::config::{EngagementConfig, SegmenterConfig};
pub use crate::core_modules::color_segmenter::{HsvRange, Mask};
pub use crate::core_modules::engagement::{
    EngagementEvent, EngagementState, EngagementStats, ExplosionStatus, MissileStatus,
};
pub use crate::core_modules::event_log::{
    FixedPing, HIT_MESSAGE, LAUNCH_MESSAGE, LOST_MESSAGE, PingSource, RandomPing,
};
pub use crate::core_modules::frame::Frame;
pub use crate::core_modules::lock_tracker::{LockState, LockTransition};
pub use crate::core_modules::pixel::pixel::{Hsv, Pixel};
pub use crate::core_modules::region::{Point, TargetBox};
pub use crate::core_modules::region_detector::Connectivity;

/// Everything a renderer needs to draw one frame. Plain data, no references back
/// into the session.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Zero-based index of the frame this report describes.
    pub frame_index: u64,
    pub lock: LockState,
    pub lock_transition: LockTransition,
    pub missile: MissileStatus,
    pub explosion: ExplosionStatus,
    /// `explosion.elapsed_ticks * explosion_radius_scale`, zero when inactive.
    pub explosion_radius: f64,
    /// No missile or explosion is active, so a launch would be accepted on lock.
    pub weapon_ready: bool,
    /// The engagement edge taken this frame, if any.
    pub event: Option<EngagementEvent>,
    pub log: Vec<String>,
}

impl FrameReport {
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn target(&self) -> Option<TargetBox> {
        self.lock.target()
    }
}

/// The engagement session: the single owner of all cross-frame state.
pub struct Session {
    config: EngagementConfig,
    lock_tracker: LockTracker,
    engagement: Engagement,
    trigger: TriggerLatch,
    log: EventLog,
    ping: Box<dyn PingSource + Send>,
    frame_counter: u64,
}

impl Session {
    /// Validates `config` and starts a session with a randomized heartbeat.
    pub fn new(config: EngagementConfig) -> Result<Self> {
        Self::with_ping_source(config, RandomPing::new())
    }

    pub fn with_ping_source(
        config: EngagementConfig,
        ping: impl PingSource + Send + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let boot_lines = config.boot_messages.iter().cloned();
        let log = EventLog::with_entries(config.log_capacity, boot_lines);
        debug!(
            width = config.image_width,
            height = config.image_height,
            min_area = config.min_target_area,
            gain = config.pursuit_gain,
            "session started"
        );
        Ok(Self {
            engagement: Engagement::new(config.engagement_params()),
            lock_tracker: LockTracker::new(),
            trigger: TriggerLatch::default(),
            log,
            ping: Box::new(ping),
            frame_counter: 0,
            config,
        })
    }

    /// Runs the full pipeline on one frame. `trigger_held` is the launch input's
    /// level this frame; only its rising edge launches.
    pub fn process_frame(&mut self, frame: &Frame, trigger_held: bool) -> Result<FrameReport> {
        self.check_dimensions(frame.width(), frame.height())?;
        let mask = color_segmenter::segment(
            frame,
            &self.config.segmenter.color_range,
            self.config.segmenter.open_kernel,
        );
        self.process_mask(&mask, trigger_held)
    }

    /// Runs the pipeline from an already segmented mask.
    pub fn process_mask(&mut self, mask: &Mask, trigger_held: bool) -> Result<FrameReport> {
        self.check_dimensions(mask.width(), mask.height())?;
        let detection = region_detector::select_target(mask, &self.config.selector_params());
        Ok(self.process_detection(detection, trigger_held))
    }

    /// Runs the stateful half of the pipeline from this frame's selection result.
    pub fn process_detection(
        &mut self,
        detection: Option<TargetBox>,
        trigger_held: bool,
    ) -> FrameReport {
        let frame_index = self.frame_counter;
        trace!(frame_index, ?detection, "frame selected");

        self.log.heartbeat(
            frame_index,
            self.config.heartbeat_interval,
            self.ping.as_mut(),
        );

        let lock_transition = self.lock_tracker.update(detection);
        let lock = self.lock_tracker.state();
        let launch = self.trigger.rising_edge(trigger_held);
        let event = self.engagement.tick(&lock, launch, &mut self.log);

        self.frame_counter += 1;

        let explosion = self.engagement.explosion();
        FrameReport {
            frame_index,
            lock,
            lock_transition,
            missile: self.engagement.missile(),
            explosion,
            explosion_radius: if explosion.active {
                explosion.radius(self.config.explosion_radius_scale)
            } else {
                0.0
            },
            weapon_ready: self.engagement.weapon_ready(),
            event,
            log: self.log.snapshot(),
        }
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if width != self.config.image_width || height != self.config.image_height {
            return Err(VisionError::FrameSizeMismatch {
                expected_width: self.config.image_width,
                expected_height: self.config.image_height,
                actual_width: width,
                actual_height: height,
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &EngagementConfig {
        &self.config
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_tracker.state()
    }

    pub fn engagement_state(&self) -> EngagementState {
        self.engagement.state()
    }

    pub fn stats(&self) -> EngagementStats {
        self.engagement.stats()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_counter
    }
}

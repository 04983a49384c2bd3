// THEORY:
// All tuning for a session lives in one static `EngagementConfig`, fixed before the
// first frame and never mutated afterwards. It deserializes from JSON with every
// field optional (missing fields fall back to the defaults below), and it is checked
// once by `validate` so the per-frame stages can stay total.

use crate::core_modules::color_segmenter::HsvRange;
use crate::core_modules::engagement::EngagementParams;
use crate::core_modules::region::Point;
use crate::core_modules::region_detector::{Connectivity, SelectorParams};
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_IMAGE_WIDTH: u32 = 1024;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 600;

pub const DEFAULT_BOOT_MESSAGES: [&str; 3] =
    ["SYS_INIT... OK", "RADAR_M... ACTIVE", "LINK_16... SECURE"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub color_range: HsvRange,
    /// Side of the elliptical kernel for a morphological opening. `None` disables it.
    pub open_kernel: Option<u32>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            color_range: HsvRange::default(),
            open_kernel: None,
        }
    }
}

/// Configuration for a `Session`, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Every frame of the session must have exactly these dimensions.
    pub image_width: u32,
    pub image_height: u32,
    pub segmenter: SegmenterConfig,
    pub connectivity: Connectivity,
    /// Smallest outer border area, in px², a region needs to count as a target.
    pub min_target_area: u64,
    pub pursuit_gain: f64,
    pub impact_distance: f64,
    pub explosion_tick_limit: u32,
    /// Pixels of explosion radius per elapsed tick.
    pub explosion_radius_scale: f64,
    /// Where missiles appear. Defaults to the bottom-center of the frame.
    pub launch_origin: Option<Point>,
    pub log_capacity: usize,
    /// Frames between heartbeat entries. Zero disables the heartbeat.
    pub heartbeat_interval: u64,
    pub boot_messages: Vec<String>,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            segmenter: SegmenterConfig::default(),
            connectivity: Connectivity::default(),
            min_target_area: 400,
            pursuit_gain: 0.15,
            impact_distance: 20.0,
            explosion_tick_limit: 10,
            explosion_radius_scale: 15.0,
            launch_origin: None,
            log_capacity: 10,
            heartbeat_interval: 50,
            boot_messages: DEFAULT_BOOT_MESSAGES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl EngagementConfig {
    /// Defaults, sized for a particular frame source.
    pub fn for_frame_size(image_width: u32, image_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| VisionError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(VisionError::InvalidConfig(msg)) };

        if self.image_width == 0 || self.image_height == 0 {
            return invalid(format!(
                "frame size {}x{} must be non-zero",
                self.image_width, self.image_height
            ));
        }
        let range = &self.segmenter.color_range;
        if range.lower.iter().zip(range.upper.iter()).any(|(lo, hi)| lo > hi) {
            return invalid(format!(
                "color range lower {:?} exceeds upper {:?}",
                range.lower, range.upper
            ));
        }
        if self.segmenter.open_kernel == Some(0) {
            return invalid("open_kernel must be at least 1".into());
        }
        if !(self.pursuit_gain > 0.0 && self.pursuit_gain <= 1.0) {
            return invalid(format!("pursuit_gain {} not in (0, 1]", self.pursuit_gain));
        }
        if !(self.impact_distance.is_finite() && self.impact_distance > 0.0) {
            return invalid(format!(
                "impact_distance {} must be positive",
                self.impact_distance
            ));
        }
        if !(self.explosion_radius_scale.is_finite() && self.explosion_radius_scale >= 0.0) {
            return invalid(format!(
                "explosion_radius_scale {} must be non-negative",
                self.explosion_radius_scale
            ));
        }
        if let Some(origin) = self.launch_origin {
            if !(origin.x.is_finite() && origin.y.is_finite()) {
                return invalid(format!("launch_origin {origin:?} must be finite"));
            }
        }
        if self.log_capacity == 0 {
            return invalid("log_capacity must be at least 1".into());
        }
        Ok(())
    }

    pub fn launch_origin(&self) -> Point {
        self.launch_origin.unwrap_or(Point::new(
            (self.image_width / 2) as f64,
            self.image_height as f64,
        ))
    }

    pub fn selector_params(&self) -> SelectorParams {
        SelectorParams {
            min_area: self.min_target_area as f64,
            connectivity: self.connectivity,
        }
    }

    pub fn engagement_params(&self) -> EngagementParams {
        EngagementParams {
            pursuit_gain: self.pursuit_gain,
            impact_distance: self.impact_distance,
            explosion_tick_limit: self.explosion_tick_limit,
            launch_origin: self.launch_origin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_launch_from_bottom_center() {
        let config = EngagementConfig::default();
        config.validate().unwrap();
        assert_eq!(config.launch_origin(), Point::new(512.0, 600.0));
        assert_eq!(config.segmenter.color_range.lower, [100, 150, 0]);
        assert_eq!(config.segmenter.color_range.upper, [140, 255, 255]);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = EngagementConfig::from_json_str(
            r#"{
                "min_target_area": 900,
                "segmenter": { "open_kernel": 5 },
                "connectivity": "four"
            }"#,
        )
        .unwrap();
        assert_eq!(config.min_target_area, 900);
        assert_eq!(config.segmenter.open_kernel, Some(5));
        assert_eq!(config.connectivity, Connectivity::Four);
        assert_eq!(config.pursuit_gain, 0.15);
        assert_eq!(config.boot_messages.len(), 3);
    }

    #[test]
    fn explicit_launch_origin_wins() {
        let config =
            EngagementConfig::from_json_str(r#"{ "launch_origin": { "x": 10.0, "y": 20.0 } }"#)
                .unwrap();
        assert_eq!(config.engagement_params().launch_origin, Point::new(10.0, 20.0));
    }

    #[test]
    fn rejects_out_of_range_gain() {
        for gain in [0.0, -0.1, 1.5, f64::NAN] {
            let config = EngagementConfig {
                pursuit_gain: gain,
                ..EngagementConfig::default()
            };
            assert!(matches!(config.validate(), Err(VisionError::InvalidConfig(_))));
        }
        let full = EngagementConfig {
            pursuit_gain: 1.0,
            ..EngagementConfig::default()
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_color_range() {
        let mut config = EngagementConfig::default();
        config.segmenter.color_range = HsvRange::new([140, 0, 0], [100, 255, 255]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_capacity_and_empty_frames() {
        let config = EngagementConfig {
            log_capacity: 0,
            ..EngagementConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(EngagementConfig::for_frame_size(0, 480).validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngagementConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, VisionError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EngagementConfig::from_json_file("/nonexistent/lockon.json").unwrap_err();
        assert!(matches!(err, VisionError::ConfigIo { .. }));
    }

    #[test]
    fn round_trips_through_pretty_json() {
        let config = EngagementConfig::for_frame_size(640, 480);
        let json = config.to_json_pretty().unwrap();
        assert_eq!(EngagementConfig::from_json_str(&json).unwrap(), config);
    }
}

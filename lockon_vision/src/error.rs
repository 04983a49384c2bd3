// THEORY:
// The engine has very few ways to fail. Everything inside the per-frame state
// machines is total; the only errors are at the edges, where raw bytes become a
// `Frame` or a file becomes an `EngagementConfig`. Those edges report through a
// single `VisionError` so callers can `?` straight through to their own error type.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, VisionError>;

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    /// A raw pixel buffer did not hold exactly `width * height * channels` bytes.
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    FrameBufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// A frame arrived with dimensions other than the session's.
    #[error("frame is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

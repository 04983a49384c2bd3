// THEORY:
// This file is the entry point for the `lockon_vision` library crate. The public
// face of the engine is the `pipeline` module: `EngagementConfig` in, one
// `Session::process_frame` call per video frame, a `FrameReport` out. The stages
// behind it (`core_modules`) stay public for tools and tests that want to drive a
// single stage, but a frame source and renderer only ever need `pipeline`.
//
// The crate does no capture, drawing or I/O beyond reading a config file.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use error::{Result, VisionError};

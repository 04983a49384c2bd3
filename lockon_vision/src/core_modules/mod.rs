pub mod color_segmenter;
pub mod engagement;
pub mod event_log;
pub mod frame;
pub mod lock_tracker;
pub mod pixel;
pub mod region;
pub mod region_detector;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use lockon_vision::core_modules::color_segmenter;
use lockon_vision::pipeline::{EngagementConfig, EngagementStats, Frame, Session};
use opencv::{
    core::{self, Mat},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod hud;
mod trigger;

const WINDOW_NAME: &str = "LOCKON";
const KEY_ESCAPE: i32 = 27;
const KEY_SPACE: i32 = 32;
const FRAME_DELAY_MS: i32 = 30;

#[derive(Parser, Debug, Clone)]
#[command(name = "visual_tester", about = "Color-lock tracker with a simulated engagement HUD")]
#[command(group(ArgGroup::new("input").required(true).args(["camera", "file"])))]
struct Args {
    /// Camera index to capture from.
    #[arg(long, value_name = "INDEX")]
    camera: Option<i32>,
    /// Video file to replay instead of a camera.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// JSON engagement config. Defaults are used for any missing field.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Write the rendered HUD to this video file.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Save the segmentation mask of the last processed frame as a PNG.
    #[arg(long, value_name = "PATH")]
    dump_mask: Option<PathBuf>,
    /// Run without a window. SPACE/ESC are unavailable; use --auto-launch / Ctrl-C.
    #[arg(long)]
    headless: bool,
    /// Do not mirror camera frames horizontally.
    #[arg(long)]
    no_mirror: bool,
    /// Fire automatically whenever a target is locked and the weapon is ready.
    #[arg(long)]
    auto_launch: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Debug, Default)]
struct RunSummary {
    frames: u64,
    locked_frames: u64,
    stats: EngagementStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lockon_vision=info,visual_tester=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngagementConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngagementConfig::default(),
    };
    info!(
        width = config.image_width,
        height = config.image_height,
        "config loaded"
    );

    // Ctrl-C is the external stop signal; the frame loop polls it once per frame.
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested");
            let _ = stop_tx.send(true);
        }
    });

    let summary = tokio::task::spawn_blocking(move || run(args, config, stop_rx))
        .await
        .context("frame loop panicked")??;

    info!(
        frames = summary.frames,
        locked_frames = summary.locked_frames,
        launches = summary.stats.launches,
        hits = summary.stats.hits,
        missiles_lost = summary.stats.missiles_lost,
        "session ended"
    );
    Ok(())
}

fn open_capture(args: &Args) -> Result<VideoCapture> {
    let cap = match (&args.file, args.camera) {
        (Some(path), _) => {
            let path = path.to_str().context("video path is not valid UTF-8")?;
            VideoCapture::from_file(path, videoio::CAP_ANY)?
        }
        (None, Some(index)) => VideoCapture::new(index, videoio::CAP_ANY)?,
        (None, None) => bail!("no input selected"),
    };
    if !cap.is_opened()? {
        bail!("could not open video input");
    }
    Ok(cap)
}

/// Camera -> session frame: mirror, resize to the session size, BGR -> RGBA.
fn to_session_frame(raw: &Mat, config: &EngagementConfig, mirror: bool) -> Result<(Mat, Frame)> {
    let mut oriented = Mat::default();
    if mirror {
        core::flip(raw, &mut oriented, 1)?;
    } else {
        oriented = raw.try_clone()?;
    }

    let mut display = Mat::default();
    imgproc::resize(
        &oriented,
        &mut display,
        core::Size::new(config.image_width as i32, config.image_height as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut rgba = Mat::default();
    imgproc::cvt_color(&display, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)?;
    let frame = Frame::from_rgba(
        config.image_width,
        config.image_height,
        rgba.data_bytes()?.to_vec(),
    )?;
    Ok((display, frame))
}

fn run(args: Args, config: EngagementConfig, stop_rx: watch::Receiver<bool>) -> Result<RunSummary> {
    let mut cap = open_capture(&args)?;
    let fps = match cap.get(videoio::CAP_PROP_FPS)? {
        fps if fps > 0.0 => fps,
        _ => 1000.0 / FRAME_DELAY_MS as f64,
    };

    let mut writer = match &args.output {
        Some(path) => {
            let path = path.to_str().context("output path is not valid UTF-8")?;
            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            let size = core::Size::new(config.image_width as i32, config.image_height as i32);
            Some(VideoWriter::new(path, fourcc, fps, size, true)?)
        }
        None => None,
    };

    if !args.headless {
        highgui::named_window(WINDOW_NAME, highgui::WINDOW_NORMAL)?;
        highgui::resize_window(WINDOW_NAME, 1280, 720)?;
    }

    // Mirroring only makes sense for a live camera.
    let mirror = args.file.is_none() && !args.no_mirror;
    let launch_origin = config.launch_origin();
    let mut session = Session::new(config.clone())?;
    let mut summary = RunSummary::default();
    let mut last_frame: Option<Frame> = None;
    let mut auto_trigger_held = false;
    let mut space = trigger::KeyHold::default();
    let mut ready_to_fire = false;
    let mut key = -1;

    let mut raw = Mat::default();
    loop {
        if *stop_rx.borrow() {
            break;
        }
        if args.max_frames.is_some_and(|max| summary.frames >= max) {
            break;
        }
        // Acquisition failure ends the session.
        match cap.read(&mut raw) {
            Ok(true) if !raw.empty() => {}
            Ok(_) => {
                info!("frame source exhausted");
                break;
            }
            Err(e) => {
                warn!(error = %e, "frame acquisition failed");
                break;
            }
        }

        let (mut display, frame) = to_session_frame(&raw, &config, mirror)?;

        let trigger_held = if args.auto_launch {
            auto_trigger_held = ready_to_fire && !auto_trigger_held;
            auto_trigger_held
        } else {
            space.observe(key == KEY_SPACE)
        };

        let report = session.process_frame(&frame, trigger_held)?;
        summary.frames += 1;
        if report.is_locked() {
            summary.locked_frames += 1;
        }
        ready_to_fire = report.is_locked() && report.weapon_ready;

        hud::draw(&mut display, &report, launch_origin)?;
        if let Some(writer) = writer.as_mut() {
            writer.write(&display)?;
        }
        last_frame = Some(frame);

        if !args.headless {
            highgui::imshow(WINDOW_NAME, &display)?;
            key = highgui::wait_key(FRAME_DELAY_MS)?;
            if key == KEY_ESCAPE {
                info!("escape pressed");
                break;
            }
        }
    }

    if let (Some(path), Some(frame)) = (&args.dump_mask, &last_frame) {
        let mask = color_segmenter::segment(
            frame,
            &config.segmenter.color_range,
            config.segmenter.open_kernel,
        );
        mask.to_gray_image()
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("saving mask to {}", path.display()))?;
        info!(path = %path.display(), "mask written");
    }

    if !args.headless {
        highgui::destroy_all_windows()?;
    }
    summary.stats = session.stats();
    Ok(summary)
}

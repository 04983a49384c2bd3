// Draws a `FrameReport` over the camera image. Pure presentation: nothing here
// feeds back into the session.

use lockon_vision::pipeline::{FrameReport, Point, TargetBox};
use opencv::{
    core::{self, Mat, Rect, Scalar},
    imgproc,
    prelude::*,
};

const LOG_PANEL_X: i32 = 20;
const LOG_PANEL_Y: i32 = 130;
const WEAPON_BAYS: i32 = 4;

fn cyan() -> Scalar {
    Scalar::new(255.0, 255.0, 0.0, 0.0)
}
fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}
fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}
fn white() -> Scalar {
    Scalar::new(200.0, 200.0, 200.0, 0.0)
}
fn yellow() -> Scalar {
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}
fn smoke() -> Scalar {
    Scalar::new(100.0, 100.0, 100.0, 0.0)
}

fn pt(point: Point) -> core::Point {
    core::Point::new(point.x.round() as i32, point.y.round() as i32)
}

fn text(
    img: &mut Mat,
    s: &str,
    org: core::Point,
    scale: f64,
    color: Scalar,
    thickness: i32,
) -> opencv::Result<()> {
    imgproc::put_text(
        img,
        s,
        org,
        imgproc::FONT_HERSHEY_SIMPLEX,
        scale,
        color,
        thickness,
        imgproc::LINE_8,
        false,
    )
}

fn line(
    img: &mut Mat,
    a: core::Point,
    b: core::Point,
    color: Scalar,
    thickness: i32,
) -> opencv::Result<()> {
    imgproc::line(img, a, b, color, thickness, imgproc::LINE_8, 0)
}

/// `thickness` of `imgproc::FILLED` gives a solid disc.
fn circle(
    img: &mut Mat,
    center: core::Point,
    radius: i32,
    color: Scalar,
    thickness: i32,
) -> opencv::Result<()> {
    imgproc::circle(img, center, radius, color, thickness, imgproc::LINE_8, 0)
}

fn outline(img: &mut Mat, rect: Rect, color: Scalar) -> opencv::Result<()> {
    imgproc::rectangle(img, rect, color, 1, imgproc::LINE_8, 0)
}

/// Corner brackets instead of a full rectangle.
fn bracket(img: &mut Mat, x: i32, y: i32, w: i32, h: i32, color: Scalar) -> opencv::Result<()> {
    let len = w / 4;
    let p = core::Point::new;
    line(img, p(x, y), p(x + len, y), color, 2)?;
    line(img, p(x, y), p(x, y + len), color, 2)?;
    line(img, p(x + w, y), p(x + w - len, y), color, 2)?;
    line(img, p(x + w, y), p(x + w, y + len), color, 2)?;
    line(img, p(x, y + h), p(x + len, y + h), color, 2)?;
    line(img, p(x, y + h), p(x, y + h - len), color, 2)?;
    line(img, p(x + w, y + h), p(x + w - len, y + h), color, 2)?;
    line(img, p(x + w, y + h), p(x + w, y + h - len), color, 2)
}

fn draw_target(img: &mut Mat, target: TargetBox) -> opencv::Result<()> {
    let (x, y) = (target.x as i32, target.y as i32);
    let (w, h) = (target.width as i32, target.height as i32);
    bracket(img, x - 10, y - 10, w + 20, h + 20, red())?;
    circle(img, pt(target.center()), 5, red(), imgproc::FILLED)?;
    text(img, "LOCK", core::Point::new(x, y - 20), 0.8, red(), 2)
}

fn draw_search(img: &mut Mat, frame_index: u64) -> opencv::Result<()> {
    let center = core::Point::new(img.cols() / 2, img.rows() / 2);
    bracket(img, center.x - 100, center.y - 100, 200, 200, white())?;
    if frame_index % 40 < 20 {
        let org = core::Point::new(center.x - 60, center.y + 130);
        text(img, "NO TARGET", org, 0.7, red(), 1)?;
    }
    Ok(())
}

fn draw_missile(img: &mut Mat, origin: Point, position: Point) -> opencv::Result<()> {
    line(img, pt(origin), pt(position), smoke(), 1)?;
    circle(img, pt(position), 5, yellow(), imgproc::FILLED)?;
    let org = core::Point::new(img.cols() / 2 - 80, img.rows() / 2 + 150);
    text(img, ">> MISSILE AWAY >>", org, 0.6, red(), 2)
}

fn draw_explosion(img: &mut Mat, center: Point, radius: f64) -> opencv::Result<()> {
    let c = pt(center);
    let r = radius.round() as i32;
    circle(img, c, r, red(), 4)?;
    circle(img, c, r / 2, yellow(), imgproc::FILLED)?;
    let reach = r + 10;
    for (dx, dy) in [(1, 1), (-1, -1), (1, -1), (-1, 1)] {
        let tip = core::Point::new(c.x + dx * reach, c.y + dy * reach);
        line(img, c, tip, yellow(), 2)?;
    }
    let org = core::Point::new(c.x - 100, c.y - 50);
    text(img, "!! IMPACT CONFIRMED !!", org, 0.7, red(), 2)
}

fn draw_log(img: &mut Mat, log: &[String]) -> opencv::Result<()> {
    outline(img, Rect::new(LOG_PANEL_X, LOG_PANEL_Y, 150, 270), cyan())?;
    let title = core::Point::new(LOG_PANEL_X + 5, LOG_PANEL_Y + 15);
    text(img, "SYSTEM LOG", title, 0.4, cyan(), 1)?;
    for (i, entry) in log.iter().enumerate() {
        let org = core::Point::new(LOG_PANEL_X + 5, LOG_PANEL_Y + 40 + i as i32 * 20);
        text(img, entry, org, 0.35, white(), 1)?;
    }
    Ok(())
}

fn draw_weapon_bays(img: &mut Mat, weapon_ready: bool) -> opencv::Result<()> {
    let bottom = img.rows() - 60;
    for i in 0..WEAPON_BAYS {
        let spent = i == 0 && !weapon_ready;
        let (color, label) = if spent { (red(), "EMPTY") } else { (cyan(), "RDY") };
        let x = 300 + i * 110;
        outline(img, Rect::new(x, bottom, 100, 40), color)?;
        let name = format!("M-{}", i + 1);
        let name_org = core::Point::new(x + 10, bottom + 25);
        text(img, &name, name_org, 0.45, white(), 1)?;
        let status_org = core::Point::new(x + 55, bottom + 25);
        let status_color = if spent { red() } else { green() };
        text(img, label, status_org, 0.45, status_color, 1)?;
    }
    Ok(())
}

/// Renders one report onto `img` in place.
pub fn draw(img: &mut Mat, report: &FrameReport, launch_origin: Point) -> opencv::Result<()> {
    if report.missile.active {
        draw_missile(img, launch_origin, report.missile.position)?;
    }
    if report.explosion.active {
        draw_explosion(img, report.explosion.center, report.explosion_radius)?;
    }
    match report.target() {
        Some(target) if !report.explosion.active => draw_target(img, target)?,
        Some(_) => {}
        None => draw_search(img, report.frame_index)?,
    }
    draw_log(img, &report.log)?;
    draw_weapon_bays(img, report.weapon_ready)
}

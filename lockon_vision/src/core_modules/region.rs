// THEORY:
// The `region` module holds the plain data that leaves the spatial grouping stage.
// A `Region` is one externally connected patch of foreground in a single mask; it
// only exists inside the region detector and is boiled down to a `TargetBox`
// before anything downstream sees it.
//
// Key principles:
// 1.  **Frame-scoped**: regions and boxes carry no identity across frames. A box
//     in frame n and a box in frame n+1 are unrelated values.
// 2.  **Integer boxes, real-valued points**: boxes snap to the pixel grid, while
//     the missile and every derived center live in continuous space so that
//     proportional pursuit does not stall on rounding.

use serde::{Deserialize, Serialize};

/// A point in continuous image space (pixels, origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Moves `gain` of the way from `self` towards `target`.
    pub fn step_towards(&self, target: Point, gain: f64) -> Point {
        Point {
            x: self.x + (target.x - self.x) * gain,
            y: self.y + (target.y - self.y) * gain,
        }
    }
}

/// An axis-aligned rectangle on the pixel grid. Always non-degenerate when it
/// leaves the region detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TargetBox {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center, truncated to the pixel grid the same way the box corner is.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.width / 2) as f64,
            (self.y + self.height / 2) as f64,
        )
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One externally connected foreground patch found in a single mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Discovery index in raster scan order. Not persistent.
    pub id: usize,
    /// Tight bounding box of the outer boundary.
    pub bounding_box: TargetBox,
    /// Polygon area of the outer border traced through pixel centres, in px².
    /// Holes are ignored; one pixel wide shapes measure zero.
    pub area: f64,
    /// Foreground pixels only, holes excluded.
    pub foreground_pixels: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_forty_pixel_box() {
        let target = TargetBox::new(100, 100, 40, 40);
        assert_eq!(target.center(), Point::new(120.0, 120.0));
        assert_eq!(target.area(), 1600);
    }

    #[test]
    fn odd_sizes_truncate_center() {
        assert_eq!(TargetBox::new(0, 0, 5, 3).center(), Point::new(2.0, 1.0));
    }

    #[test]
    fn step_towards_closes_the_requested_fraction() {
        let start = Point::new(0.0, 0.0);
        let next = start.step_towards(Point::new(100.0, 0.0), 0.25);
        assert_eq!(next, Point::new(25.0, 0.0));
        assert!((next.distance_to(Point::new(100.0, 0.0)) - 75.0).abs() < 1e-9);
    }
}

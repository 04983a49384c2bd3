// THEORY:
// The color segmenter is the first stage of every tick. It is a pure function: a
// borrowed `Frame` and a configured HSV band go in, a binary `Mask` of the same
// dimensions comes out. It keeps no state between frames, and it cannot fail; a
// black, empty or uniform frame just produces an empty mask.
//
// A pixel is foreground iff all three of its 8-bit HSV components lie inside the
// inclusive [lower, upper] band. The band does not wrap around the hue circle, so
// tracking reds that straddle 0 needs two sessions or a shifted band.
//
// An optional morphological opening (erode, then dilate, with an elliptical
// structuring element) knocks out speckle before the region detector sees it.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::Hsv;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

const FOREGROUND: u8 = u8::MAX;
const BACKGROUND: u8 = 0;

/// Inclusive lower/upper bounds in the 8-bit HSV model (H in [0, 180)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: Hsv) -> bool {
        let components = [hsv.hue, hsv.saturation, hsv.value];
        components
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(c, (lo, hi))| lo <= c && c <= hi)
    }
}

impl Default for HsvRange {
    /// Saturated blues.
    fn default() -> Self {
        Self::new([100, 150, 0], [140, 255, 255])
    }
}

/// A binary image, same dimensions as the frame it came from. Frame-scoped.
#[derive(Debug, Clone)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    /// Builds a mask by evaluating `f` at every cell.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| {
                Luma([if f(x, y) { FOREGROUND } else { BACKGROUND }])
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] != BACKGROUND
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.image
            .put_pixel(x, y, Luma([if on { FOREGROUND } else { BACKGROUND }]));
    }

    /// Sets every cell in the rectangle, clipped to the mask.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        for py in y..(y + height).min(self.height()) {
            for px in x..(x + width).min(self.width()) {
                self.set(px, py, true);
            }
        }
    }

    pub fn count_set(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] != BACKGROUND).count()
    }

    /// A 0/255 grayscale copy, handy for dumping what the segmenter saw.
    pub fn to_gray_image(&self) -> GrayImage {
        self.image.clone()
    }
}

/// Produces the foreground mask for `frame` under `range`, then optionally opens
/// it with a `kernel x kernel` ellipse.
pub fn segment(frame: &Frame, range: &HsvRange, open_kernel: Option<u32>) -> Mask {
    let width = frame.width();
    let mut mask = Mask::new(width, frame.height());
    for (i, pixel) in frame.pixels().enumerate() {
        if range.contains(pixel.to_hsv()) {
            let i = i as u32;
            mask.set(i % width, i / width, true);
        }
    }
    match open_kernel {
        Some(size) if size > 1 => open(&mask, &elliptical_kernel(size)),
        _ => mask,
    }
}

/// Offsets of the set cells of a `size x size` elliptical structuring element,
/// relative to its anchor at the center.
fn elliptical_kernel(size: u32) -> Vec<(i32, i32)> {
    let size = size as i32;
    let r = size / 2;
    let c = size / 2;
    let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
    let mut offsets = Vec::new();
    for i in 0..size {
        let dy = i - r;
        let (j1, j2) = if dy.abs() <= r {
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            ((c - dx).max(0), (c + dx + 1).min(size))
        } else {
            (0, 0)
        };
        for j in j1..j2 {
            offsets.push((j - c, dy));
        }
    }
    offsets
}

/// Erosion followed by dilation. Cells outside the mask never contribute, so
/// objects touching the border are not eaten away from that side.
fn open(mask: &Mask, kernel: &[(i32, i32)]) -> Mask {
    let eroded = morph(mask, kernel, true);
    morph(&eroded, kernel, false)
}

fn morph(mask: &Mask, kernel: &[(i32, i32)], erode: bool) -> Mask {
    let (width, height) = (mask.width() as i32, mask.height() as i32);
    Mask::from_fn(mask.width(), mask.height(), |x, y| {
        let mut in_bounds = kernel.iter().filter_map(|(dx, dy)| {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            (nx >= 0 && nx < width && ny >= 0 && ny < height)
                .then(|| mask.is_set(nx as u32, ny as u32))
        });
        if erode {
            in_bounds.all(|set| set)
        } else {
            in_bounds.any(|set| set)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn blue() -> Pixel {
        Pixel::rgb(20, 40, 220)
    }

    #[test]
    fn uniform_background_yields_empty_mask() {
        let frame = Frame::filled(32, 16, Pixel::rgb(200, 200, 200));
        let mask = segment(&frame, &HsvRange::default(), None);
        assert_eq!((mask.width(), mask.height()), (32, 16));
        assert_eq!(mask.count_set(), 0);
    }

    #[test]
    fn marks_exactly_the_in_range_pixels() {
        let mut frame = Frame::filled(32, 16, Pixel::rgb(10, 10, 10));
        frame.paint_rect(4, 2, 6, 5, blue());
        let mask = segment(&frame, &HsvRange::default(), None);
        assert_eq!(mask.count_set(), 30);
        assert!(mask.is_set(4, 2));
        assert!(mask.is_set(9, 6));
        assert!(!mask.is_set(10, 6));
    }

    #[test]
    fn bounds_are_inclusive() {
        let hsv = Pixel::rgb(0, 0, 255).to_hsv();
        let exact = HsvRange::new(
            [hsv.hue, hsv.saturation, hsv.value],
            [hsv.hue, hsv.saturation, hsv.value],
        );
        assert!(exact.contains(hsv));
        let above = HsvRange::new([hsv.hue + 1, 0, 0], [179, 255, 255]);
        assert!(!above.contains(hsv));
    }

    #[test]
    fn five_by_five_ellipse_matches_the_classic_shape() {
        let kernel = elliptical_kernel(5);
        // 1 + 5 + 5 + 5 + 1
        assert_eq!(kernel.len(), 17);
        assert!(kernel.contains(&(0, -2)));
        assert!(!kernel.contains(&(-1, -2)));
        assert!(kernel.contains(&(-2, 0)));
    }

    #[test]
    fn opening_removes_speckle_but_keeps_solid_blobs() {
        let mut frame = Frame::filled(40, 40, Pixel::rgb(0, 0, 0));
        frame.paint_rect(5, 5, 12, 12, blue());
        frame.paint_rect(30, 30, 2, 2, blue());
        let mask = segment(&frame, &HsvRange::default(), Some(5));
        assert!(!mask.is_set(30, 30));
        assert!(mask.is_set(10, 10));
        assert!(mask.is_set(5, 10));
    }
}

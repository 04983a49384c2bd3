// THEORY:
// A `Frame` is one immutable time step of the video stream. It is owned by whoever
// pulls it from the camera and is only ever borrowed, read-only, by the color
// segmenter. Like the other data containers it knows nothing about tracking; it
// only guarantees that its buffer is exactly `width * height` RGBA samples.
//
// Frames arrive as raw RGBA byte buffers (what a capture layer produces after a
// BGR -> RGBA conversion) or as `image` crate buffers.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Result, VisionError};
use image::{RgbImage, RgbaImage};

const CHANNELS: usize = 4;

/// A read-only grid of RGBA samples for one tick.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    /// Wraps a raw RGBA buffer, rejecting it unless it holds exactly one full frame.
    pub fn from_rgba(width: u32, height: u32, buffer: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        let actual = buffer.len();
        RgbaImage::from_raw(width, height, buffer)
            .filter(|_| actual == expected)
            .map(|image| Self { image })
            .ok_or(VisionError::FrameBufferSize {
                width,
                height,
                expected,
                actual,
            })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn from_rgb_image(image: &RgbImage) -> Self {
        let rgba = RgbaImage::from_fn(image.width(), image.height(), |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0;
            image::Rgba([r, g, b, u8::MAX])
        });
        Self { image: rgba }
    }

    /// A frame filled with a single color.
    pub fn filled(width: u32, height: u32, fill: Pixel) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, fill.into()),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        Pixel::from(*self.image.get_pixel(x, y))
    }

    /// Row-major iterator over every pixel in the frame.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.image.pixels().map(|rgba| Pixel::from(*rgba))
    }

    /// Paints an axis-aligned rectangle, clipped to the frame. Used to build
    /// synthetic scenes.
    pub fn paint_rect(&mut self, x: u32, y: u32, width: u32, height: u32, fill: Pixel) {
        let x_end = (x + width).min(self.width());
        let y_end = (y + height).min(self.height());
        for py in y..y_end {
            for px in x..x_end {
                self.image.put_pixel(px, py, fill.into());
            }
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

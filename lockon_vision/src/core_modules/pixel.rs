// THEORY (Single-Pixel Color Model):
// The `Pixel` module is the smallest unit of the vision system: a "dumb" data
// container for one RGBA sample plus the 1-dimensional heuristics the color lock
// needs. Nothing here looks at neighbors or history. Anything that needs more than
// one pixel (masks, regions, tracking) belongs to higher modules.
//
// What lives here:
// - Raw channels (RGBA) and their normalized (0..1, still gamma-encoded) forms.
// - Hue, HSV saturation and HSV value, each in an optimal and an accurate flavor.
// - `to_hsv`, which quantizes those into the 8-bit hue model used by the color
//   range configuration: H in [0, 180) (degrees halved), S and V in [0, 255].
//
// Optimal vs Accurate (feature-selected):
// - optimal (default): normalized sRGB directly. This is what camera-side HSV
//   thresholds are usually tuned against.
// - accurate: sRGB -> linear through a 256-entry `OnceLock` LUT before the math.
// Enable accurate with `--features accurate`.

pub mod pixel {
    use std::sync::OnceLock;

    pub type Channel = u8;
    pub type NormalizedChannel = f32;
    pub type Hue = f32;
    pub type SaturationHSV = f32;
    pub type ValueHSV = f32;
    pub type Chroma = f32;

    static SRGB_TO_LINEAR_LUT: OnceLock<[NormalizedChannel; 256]> = OnceLock::new();

    /// An 8-bit HSV triple. Hue is in half-degrees, [0, 180).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv {
        pub hue: u8,
        pub saturation: u8,
        pub value: u8,
    }

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha channel value (0-255). Carried through, never thresholded.
        pub alpha: Channel,
        pub red_normalized: NormalizedChannel,
        pub green_normalized: NormalizedChannel,
        pub blue_normalized: NormalizedChannel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
                red_normalized: red as NormalizedChannel / 255.0f32,
                green_normalized: green as NormalizedChannel / 255.0f32,
                blue_normalized: blue as NormalizedChannel / 255.0f32,
            }
        }

        pub fn rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, u8::MAX)
        }

        #[inline]
        fn srgb_to_linear_normalized_from_byte(srgb_value: Channel) -> NormalizedChannel {
            let table = SRGB_TO_LINEAR_LUT.get_or_init(|| {
                let mut table = [0.0f32; 256];
                for (i, entry) in table.iter_mut().enumerate() {
                    let srgb_normalized = i as NormalizedChannel / 255.0f32;
                    *entry = if srgb_normalized <= 0.04045f32 {
                        srgb_normalized / 12.92f32
                    } else {
                        ((srgb_normalized + 0.055f32) / 1.055f32).powf(2.4f32)
                    };
                }
                table
            });
            table[srgb_value as usize]
        }

        fn linear_channels(&self) -> (f32, f32, f32) {
            (
                Self::srgb_to_linear_normalized_from_byte(self.red),
                Self::srgb_to_linear_normalized_from_byte(self.green),
                Self::srgb_to_linear_normalized_from_byte(self.blue),
            )
        }

        fn normalized_channels(&self) -> (f32, f32, f32) {
            (self.red_normalized, self.green_normalized, self.blue_normalized)
        }

        /// Hue angle in degrees [0, 360) from any (r, g, b) triple in 0..1.
        fn hue_from(red: f32, green: f32, blue: f32) -> Hue {
            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            if chroma <= 1e-6 {
                return 0.0;
            }

            let inverse_chroma = 1.0 / chroma;

            let (base_difference, sector_offset) = if maximum_channel == red {
                (green - blue, 0.0)
            } else if maximum_channel == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        fn saturation_from(red: f32, green: f32, blue: f32) -> SaturationHSV {
            let maximum_channel = red.max(green.max(blue));
            if maximum_channel <= 1e-6 {
                return 0.0;
            }
            (maximum_channel - red.min(green.min(blue))) / maximum_channel
        }

        /// Hue angle in degrees [0, 360), fast gamma-encoded variant.
        pub fn hue_optimal(&self) -> Hue {
            let (r, g, b) = self.normalized_channels();
            Self::hue_from(r, g, b)
        }

        /// Hue angle in degrees [0, 360), computed in linear light.
        pub fn hue_accurate(&self) -> Hue {
            let (r, g, b) = self.linear_channels();
            Self::hue_from(r, g, b)
        }

        #[cfg(feature = "accurate")]
        pub fn hue(&self) -> Hue {
            self.hue_accurate()
        }

        #[cfg(not(feature = "accurate"))]
        pub fn hue(&self) -> Hue {
            self.hue_optimal()
        }

        /// Chroma (C): max(R,G,B) - min(R,G,B) on normalized channels.
        pub fn chroma(&self) -> Chroma {
            let (r, g, b) = self.normalized_channels();
            r.max(g.max(b)) - r.min(g.min(b))
        }

        /// Saturation (HSV): S = chroma / value.
        pub fn saturation_hsv_optimal(&self) -> SaturationHSV {
            let (r, g, b) = self.normalized_channels();
            Self::saturation_from(r, g, b)
        }

        pub fn saturation_hsv_accurate(&self) -> SaturationHSV {
            let (r, g, b) = self.linear_channels();
            Self::saturation_from(r, g, b)
        }

        #[cfg(feature = "accurate")]
        pub fn saturation_hsv(&self) -> SaturationHSV {
            self.saturation_hsv_accurate()
        }

        #[cfg(not(feature = "accurate"))]
        pub fn saturation_hsv(&self) -> SaturationHSV {
            self.saturation_hsv_optimal()
        }

        /// HSV Value (V): max(R, G, B), normalized.
        pub fn value_hsv_optimal(&self) -> ValueHSV {
            let (r, g, b) = self.normalized_channels();
            r.max(g.max(b))
        }

        pub fn value_hsv_accurate(&self) -> ValueHSV {
            let (r, g, b) = self.linear_channels();
            r.max(g.max(b))
        }

        #[cfg(feature = "accurate")]
        pub fn value_hsv(&self) -> ValueHSV {
            self.value_hsv_accurate()
        }

        #[cfg(not(feature = "accurate"))]
        pub fn value_hsv(&self) -> ValueHSV {
            self.value_hsv_optimal()
        }

        /// Quantizes hue, saturation and value into the 8-bit HSV model.
        ///
        /// Hue is halved so a full turn fits a byte; 360 degrees wraps back to 0.
        pub fn to_hsv(&self) -> Hsv {
            let half_degrees = (self.hue() * 0.5).round() as u16;
            Hsv {
                hue: (half_degrees % 180) as u8,
                saturation: (self.saturation_hsv() * 255.0).round().clamp(0.0, 255.0) as u8,
                value: (self.value_hsv() * 255.0).round().clamp(0.0, 255.0) as u8,
            }
        }
    }

    impl From<[Channel; 4]> for Pixel {
        fn from(bytes: [Channel; 4]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<image::Rgba<u8>> for Pixel {
        fn from(rgba: image::Rgba<u8>) -> Self {
            Pixel::from(rgba.0)
        }
    }

    impl From<Pixel> for image::Rgba<u8> {
        fn from(pixel: Pixel) -> Self {
            image::Rgba([pixel.red, pixel.green, pixel.blue, pixel.alpha])
        }
    }
}

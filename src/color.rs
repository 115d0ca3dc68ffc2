//! Color space conversion.

use crate::grid::{ColorImage, GrayImage};

/// A color space that frames can be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// 8-bit hue/saturation/value. Hue is halved to fit into `0..180`.
    Hsv,
    /// 8-bit luma and red/blue chroma, in the channel order Y, Cr, Cb.
    YCrCb,
    /// The frame's own RGB channels.
    Rgb,
}

/// Converts RGB frames into the color spaces read by the skin models.
///
/// Implementations must return images with the same size as the input.
pub trait ColorConverter {
    fn convert(&self, image: &ColorImage, space: ColorSpace) -> ColorImage;

    /// Computes the luma of every pixel. Used as input for optical flow and feature extraction.
    fn gray(&self, image: &ColorImage) -> GrayImage;
}

/// Conversion using the conventional 8-bit formulas.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConverter;

impl StandardConverter {
    pub fn hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let v = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = v - min;

        let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
        let h = if diff == 0.0 {
            0.0
        } else if v == r {
            60.0 * (g - b) / diff
        } else if v == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        let h = if h < 0.0 { h + 360.0 } else { h };

        [((h / 2.0).round() as u32 % 180) as u8, sat(s), sat(v)]
    }

    pub fn ycrcb([r, g, b]: [u8; 3]) -> [u8; 3] {
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let y = luma(r, g, b);
        let cr = (r - y) * 0.713 + 128.0;
        let cb = (b - y) * 0.564 + 128.0;
        [sat(y), sat(cr), sat(cb)]
    }
}

fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn sat(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

impl ColorConverter for StandardConverter {
    fn convert(&self, image: &ColorImage, space: ColorSpace) -> ColorImage {
        match space {
            ColorSpace::Hsv => image.map(|&px| Self::hsv(px)),
            ColorSpace::YCrCb => image.map(|&px| Self::ycrcb(px)),
            ColorSpace::Rgb => image.clone(),
        }
    }

    fn gray(&self, image: &ColorImage) -> GrayImage {
        image.map(|&[r, g, b]| sat(luma(f32::from(r), f32::from(g), f32::from(b))))
    }
}

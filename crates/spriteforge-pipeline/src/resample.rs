//! Resampling to the fixed sprite cell size.
//!
//! Unlike a plain `imageops::resize`, color is premultiplied by alpha
//! before filtering and divided back out afterwards. Without that, the
//! (usually white or black) color stored under fully transparent pixels
//! bleeds into the visible edge of the sprite, leaving a halo that the
//! quantizer then locks in as a palette color.
//!
//! Filtering happens in `f32` so the premultiply round trip does not lose
//! precision on faint edge pixels.
//!
//! This is stage 2 of the pipeline.

use std::fmt;

use image::{Rgba, Rgba32FImage};
use serde::{Deserialize, Serialize};

use crate::background::TRANSPARENT;
use crate::types::{Dimensions, RgbaImage};

/// Resampling filter used to reach the target size.
///
/// Ordered from fastest/lowest-quality to slowest/sharpest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: blocky, keeps hard pixel-art edges.
    Nearest,
    /// Bilinear (area-averaging when shrinking): no ringing.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): sharper, slight overshoot.
    CatmullRom,
    /// Gaussian: smooth, slightly soft.
    Gaussian,
    /// Lanczos with 3 lobes: sharpest, may ring on hard edges.
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Resample `image` to exactly `target`.
///
/// An image already at `target` is returned unchanged. `target` must be
/// non-degenerate; [`PipelineConfig::validate`](crate::PipelineConfig::validate)
/// guarantees that for pipeline runs.
#[must_use = "returns the resampled image"]
pub fn resample(image: &RgbaImage, target: Dimensions, filter: ResampleFilter) -> RgbaImage {
    if Dimensions::of(image) == target {
        return image.clone();
    }
    if Dimensions::of(image).is_degenerate() {
        return RgbaImage::from_pixel(target.width, target.height, TRANSPARENT);
    }

    let premultiplied = Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        premultiply(*image.get_pixel(x, y))
    });
    let resized = image::imageops::resize(
        &premultiplied,
        target.width,
        target.height,
        filter.to_image_filter(),
    );
    RgbaImage::from_fn(target.width, target.height, |x, y| {
        unpremultiply(*resized.get_pixel(x, y))
    })
}

/// Normalize to `0.0..=1.0` and scale color by alpha.
fn premultiply(pixel: Rgba<u8>) -> Rgba<f32> {
    let [r, g, b, a] = pixel.0.map(|c| f32::from(c) / 255.0);
    Rgba([r * a, g * a, b * a, a])
}

/// Divide color back out of a filtered premultiplied pixel.
///
/// Pixels whose alpha rounds to zero become [`TRANSPARENT`].
fn unpremultiply(pixel: Rgba<f32>) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    let a = a.clamp(0.0, 1.0);
    let alpha = unit_to_u8(a);
    if alpha == 0 {
        return TRANSPARENT;
    }
    Rgba([
        unit_to_u8(r / a),
        unit_to_u8(g / a),
        unit_to_u8(b / a),
        alpha,
    ])
}

/// Map `0.0..=1.0` to `0..=255`, clamping overshoot from sharp filters.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

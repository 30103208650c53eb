//! Optional unsharp mask after resampling.
//!
//! Downscaling to a small cell softens detail; a light unsharp mask
//! brings back edge contrast before colors are snapped to the palette.
//!
//! Wraps [`imageproc::filter::sharpen_gaussian`], which only accepts
//! `GrayImage`, by splitting out the R/G/B channels, sharpening each and
//! reassembling. Alpha is left untouched so the silhouette the outline
//! stage sees is exactly the resampled one.

use image::{GrayImage, Luma, Rgba};

use crate::types::{PipelineConfig, RgbaImage};

/// Sharpen the color channels of `image`.
///
/// Non-positive or non-finite `sigma` or `amount` returns the image
/// unchanged, since the underlying Gaussian kernel panics on
/// `sigma <= 0.0`. `sigma` is clamped to
/// [`PipelineConfig::MAX_SHARPEN_SIGMA`]; the kernel allocation panics
/// for huge values.
#[must_use = "returns the sharpened image"]
pub fn sharpen_rgba(image: &RgbaImage, sigma: f32, amount: f32) -> RgbaImage {
    if !sigma.is_finite() || !amount.is_finite() || sigma <= 0.0 || amount <= 0.0 {
        return image.clone();
    }
    let sigma = sigma.min(PipelineConfig::MAX_SHARPEN_SIGMA);

    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 3] =
        std::array::from_fn(|c| GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).0[c]])));

    let sharpened: [GrayImage; 3] = std::array::from_fn(|c| {
        imageproc::filter::sharpen_gaussian(&channels[c], sigma, amount)
    });

    RgbaImage::from_fn(w, h, |x, y| {
        let alpha = image.get_pixel(x, y).0[3];
        Rgba([
            sharpened[0].get_pixel(x, y).0[0],
            sharpened[1].get_pixel(x, y).0[0],
            sharpened[2].get_pixel(x, y).0[0],
            alpha,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_edge() -> RgbaImage {
        RgbaImage::from_fn(12, 12, |x, y| {
            let level = if x < 6 { 80 } else { 170 };
            Rgba([level, level, level, u8::try_from(y * 20).unwrap_or(255)])
        })
    }

    #[test]
    fn zero_amount_is_identity() {
        let img = step_edge();
        assert_eq!(sharpen_rgba(&img, 1.0, 0.0), img);
    }

    #[test]
    fn non_positive_sigma_is_identity() {
        let img = step_edge();
        assert_eq!(sharpen_rgba(&img, 0.0, 1.0), img);
        assert_eq!(sharpen_rgba(&img, -2.0, 1.0), img);
    }

    #[test]
    fn huge_sigma_is_clamped() {
        let img = step_edge();
        let out = sharpen_rgba(&img, 1e30, 1.0);
        assert_eq!(out.dimensions(), img.dimensions());
        assert_eq!(sharpen_rgba(&img, f32::NAN, 1.0), img);
        assert_eq!(sharpen_rgba(&img, 1.0, f32::INFINITY), img);
    }

    #[test]
    fn alpha_channel_is_preserved() {
        let img = step_edge();
        let out = sharpen_rgba(&img, 1.0, 2.0);
        for (a, b) in img.pixels().zip(out.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
        }
    }

    #[test]
    fn edge_contrast_increases() {
        let img = step_edge();
        let out = sharpen_rgba(&img, 1.0, 2.0);
        let dark_side = out.get_pixel(5, 6).0[0];
        let light_side = out.get_pixel(6, 6).0[0];
        assert!(dark_side < 80, "dark side should undershoot, got {dark_side}");
        assert!(light_side > 170, "light side should overshoot, got {light_side}");
    }

    #[test]
    fn dimensions_preserved() {
        let img = RgbaImage::new(9, 17);
        let out = sharpen_rgba(&img, 1.0, 1.0);
        assert_eq!(out.dimensions(), (9, 17));
    }
}

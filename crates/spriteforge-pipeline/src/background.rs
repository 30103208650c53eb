//! Light background removal.
//!
//! Source art is usually drawn on a white or near-white canvas. Pixels
//! that are uniformly bright are reclassified as transparent:
//!
//! - all of R, G, B at or above the hard threshold: fully transparent,
//!   color zeroed;
//! - all of R, G, B at or above the soft threshold (but not all past the
//!   hard one): alpha scaled by a linear ramp of the average brightness,
//!   full opacity at the soft threshold down to zero at the hard one.
//!   This eats the anti-aliased fringe around the subject.
//!
//! This is stage 1 of the pipeline.

use image::Rgba;

use crate::types::RgbaImage;

/// Fully transparent black, the canonical "nothing here" pixel.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Remove a light background.
///
/// When `soft >= hard` the ramp has zero width and only the hard cutoff
/// applies. Never fails; the output has the input's dimensions.
#[must_use = "returns the image with its background removed"]
pub fn remove_background(image: &RgbaImage, hard: u8, soft: u8) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = classify(*pixel, hard, soft);
    }
    out
}

/// Apply the threshold rules to a single pixel.
fn classify(pixel: Rgba<u8>, hard: u8, soft: u8) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    let darkest = r.min(g).min(b);

    if darkest >= hard {
        return TRANSPARENT;
    }
    if soft >= hard || darkest < soft {
        return pixel;
    }

    let alpha = ramp_alpha(a, r, g, b, hard, soft);
    if alpha == 0 {
        TRANSPARENT
    } else {
        Rgba([r, g, b, alpha])
    }
}

/// Scale `alpha` by where the average brightness sits between `soft`
/// (factor 1) and `hard` (factor 0). Requires `soft < hard`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn ramp_alpha(alpha: u8, r: u8, g: u8, b: u8, hard: u8, soft: u8) -> u8 {
    let average = (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0;
    let width = f32::from(hard) - f32::from(soft);
    let factor = ((f32::from(hard) - average) / width).clamp(0.0, 1.0);
    (f32::from(alpha) * factor).round() as u8
}

/// Count fully transparent pixels.
#[must_use]
pub fn count_transparent(image: &RgbaImage) -> u64 {
    image.pixels().map(|p| u64::from(p.0[3] == 0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARD: u8 = 240;
    const SOFT: u8 = 220;

    fn single(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(pixel))
    }

    fn alpha_after(pixel: [u8; 4]) -> u8 {
        remove_background(&single(pixel), HARD, SOFT).get_pixel(0, 0).0[3]
    }

    #[test]
    fn all_white_becomes_fully_transparent() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
        let out = remove_background(&img, HARD, SOFT);
        assert_eq!(out.dimensions(), (64, 64));
        assert!(out.pixels().all(|p| *p == TRANSPARENT));
        assert_eq!(count_transparent(&out), 64 * 64);
    }

    #[test]
    fn exactly_hard_threshold_is_removed() {
        assert_eq!(alpha_after([240, 240, 240, 255]), 0);
    }

    #[test]
    fn dark_pixels_pass_through() {
        let pixel = [12, 200, 250, 255];
        let out = remove_background(&single(pixel), HARD, SOFT);
        assert_eq!(out.get_pixel(0, 0).0, pixel);
    }

    #[test]
    fn one_dark_channel_protects_bright_pixel() {
        // Bright yellow is not background.
        let pixel = [255, 255, 0, 255];
        let out = remove_background(&single(pixel), HARD, SOFT);
        assert_eq!(out.get_pixel(0, 0).0, pixel);
    }

    #[test]
    fn soft_threshold_keeps_full_opacity() {
        assert_eq!(alpha_after([220, 220, 220, 255]), 255);
    }

    #[test]
    fn ramp_midpoint_halves_alpha() {
        // Average 230 sits halfway between 220 and 240.
        assert_eq!(alpha_after([230, 230, 230, 255]), 128);
    }

    #[test]
    fn ramp_is_monotonic_toward_hard_threshold() {
        let mut previous = u8::MAX;
        for level in SOFT..HARD {
            let alpha = alpha_after([level, level, level, 255]);
            assert!(
                alpha <= previous,
                "alpha rose from {previous} to {alpha} at brightness {level}",
            );
            previous = alpha;
        }
        assert!(previous < 255 / 10);
    }

    #[test]
    fn ramp_scales_existing_alpha() {
        assert_eq!(alpha_after([230, 230, 230, 100]), 50);
    }

    #[test]
    fn ramp_to_zero_also_zeroes_color() {
        // Average is above `hard` even though one channel is below it.
        let out = remove_background(&single([255, 255, 235, 255]), HARD, SOFT);
        assert_eq!(*out.get_pixel(0, 0), TRANSPARENT);
    }

    #[test]
    fn inverted_thresholds_act_as_single_cutoff() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([250, 250, 250, 255]),
            1 => Rgba([230, 230, 230, 255]),
            _ => Rgba([10, 10, 10, 255]),
        });
        let out = remove_background(&img, 240, 240);
        assert_eq!(*out.get_pixel(0, 0), TRANSPARENT);
        assert_eq!(out.get_pixel(1, 0).0, [230, 230, 230, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [10, 10, 10, 255]);

        let swapped = remove_background(&img, 240, 250);
        assert_eq!(swapped, out);
    }

    #[test]
    fn already_transparent_bright_pixel_is_canonicalized() {
        let out = remove_background(&single([255, 255, 255, 0]), HARD, SOFT);
        assert_eq!(*out.get_pixel(0, 0), TRANSPARENT);
    }
}

//! Palette quantization: snap every visible pixel to the nearest palette
//! color.
//!
//! This is the dominant cost of the pipeline (`width * height * palette
//! size` distance evaluations), so rows are mapped in parallel with
//! `rayon`. Each pixel's result depends only on its own color and the
//! shared read-only palette, so the output is identical to a sequential
//! scan.
//!
//! Fully transparent pixels are never touched: recoloring them would
//! leave visible color under alpha 0 and confuse the outline stage that
//! follows.
//!
//! This is stage 3 of the pipeline.

use image::Rgba;
use rayon::prelude::*;

use crate::palette::{Palette, Rgb};
use crate::types::RgbaImage;

/// Replace every pixel with non-zero alpha by its nearest palette color,
/// keeping alpha. Pixels with zero alpha are copied unchanged.
#[must_use = "returns the quantized image"]
pub fn quantize(image: &RgbaImage, palette: &Palette) -> RgbaImage {
    let mut out = image.clone();
    let row_len = image.width() as usize * 4;
    if row_len == 0 {
        return out;
    }

    let buffer: &mut [u8] = &mut out;
    buffer.par_chunks_mut(row_len).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            if px[3] == 0 {
                continue;
            }
            let nearest = palette.nearest(Rgb::new(px[0], px[1], px[2]));
            px[0] = nearest.r;
            px[1] = nearest.g;
            px[2] = nearest.b;
        }
    });
    out
}

/// Counters describing a quantization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantizeStats {
    /// Pixels with non-zero alpha (the ones that were looked up).
    pub visible_pixels: u64,
    /// Visible pixels whose color was already a palette entry.
    pub exact_matches: u64,
    /// Distinct palette entries used in the output.
    pub colors_used: usize,
}

/// Compare a buffer before and after quantization.
#[must_use]
pub fn quantize_stats(before: &RgbaImage, after: &RgbaImage, palette: &Palette) -> QuantizeStats {
    let mut stats = QuantizeStats::default();
    let mut used = vec![false; palette.len()];

    for (src, dst) in before.pixels().zip(after.pixels()) {
        if src.0[3] == 0 {
            continue;
        }
        stats.visible_pixels += 1;
        if src == dst {
            stats.exact_matches += 1;
        }
        used[palette.nearest_index(Rgb::of(*dst))] = true;
    }
    stats.colors_used = used.iter().filter(|u| **u).count();
    stats
}

/// Returns `true` if every visible pixel carries a palette color.
#[must_use]
pub fn is_quantized(image: &RgbaImage, palette: &Palette) -> bool {
    image
        .pixels()
        .all(|p: &Rgba<u8>| p.0[3] == 0 || palette.contains(Rgb::of(*p)))
}

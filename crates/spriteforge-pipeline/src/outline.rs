//! Outline generation around the sprite silhouette.
//!
//! Every transparent pixel that has a visible pixel within `thickness`
//! (in the configured neighborhood) is painted with the outline color at
//! full opacity. Visible pixels are never overwritten, so the outline is
//! a ring grown outward from the silhouette.
//!
//! The scan reads an [`AlphaMask`] built once from the input and writes
//! into a separate output buffer, so pixels painted earlier in the scan
//! never feed back into later neighbor checks.
//!
//! This is stage 4 of the pipeline.

use crate::palette::Rgb;
use crate::types::{Connectivity, OutlineConfig, RgbaImage};

/// Read-only view of which pixels are visible (alpha > 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
    width: u32,
    height: u32,
    visible: Vec<bool>,
}

impl AlphaMask {
    /// Build the mask from an image's alpha channel.
    #[must_use]
    pub fn from_image(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            visible: image.pixels().map(|p| p.0[3] > 0).collect(),
        }
    }

    /// Whether the pixel at `(x, y)` is visible. Out-of-bounds is `false`.
    #[must_use]
    pub fn is_visible(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.visible[y as usize * self.width as usize + x as usize]
    }

    /// Returns `true` if no pixel is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.visible.iter().any(|v| *v)
    }

    /// Number of visible pixels.
    #[must_use]
    pub fn visible_count(&self) -> u64 {
        self.visible.iter().map(|v| u64::from(*v)).sum()
    }

    /// Whether any visible pixel lies within `radius` of `(x, y)`,
    /// excluding `(x, y)` itself. The window is clamped to the mask
    /// bounds; nothing wraps around.
    #[must_use]
    pub fn has_visible_neighbor(
        &self,
        x: u32,
        y: u32,
        radius: u32,
        connectivity: Connectivity,
    ) -> bool {
        let x_lo = x.saturating_sub(radius);
        let y_lo = y.saturating_sub(radius);
        let x_hi = x.saturating_add(radius).min(self.width.saturating_sub(1));
        let y_hi = y.saturating_add(radius).min(self.height.saturating_sub(1));

        for ny in y_lo..=y_hi {
            for nx in x_lo..=x_hi {
                if (nx, ny) == (x, y) {
                    continue;
                }
                if connectivity == Connectivity::Four && x.abs_diff(nx) + y.abs_diff(ny) > radius {
                    continue;
                }
                if self.is_visible(nx, ny) {
                    return true;
                }
            }
        }
        false
    }
}

/// Paint an outline ring around the silhouette of `image`.
///
/// Thickness zero, or an image with no visible pixels, yields an
/// unchanged copy.
#[must_use = "returns the outlined image"]
pub fn outline(image: &RgbaImage, config: &OutlineConfig) -> RgbaImage {
    let mask = AlphaMask::from_image(image);
    outline_with_mask(image, &mask, config.color, config.thickness, config.connectivity)
}

/// Paint an outline ring using a precomputed mask of `image`.
#[must_use = "returns the outlined image"]
pub fn outline_with_mask(
    image: &RgbaImage,
    mask: &AlphaMask,
    color: Rgb,
    thickness: u32,
    connectivity: Connectivity,
) -> RgbaImage {
    let mut out = image.clone();
    if thickness == 0 || mask.is_empty() {
        return out;
    }

    let paint = color.with_alpha(u8::MAX);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if mask.is_visible(x, y) {
            continue;
        }
        if mask.has_visible_neighbor(x, y, thickness, connectivity) {
            *pixel = paint;
        }
    }
    out
}

/// Count pixels that changed between two same-size buffers.
#[must_use]
pub fn count_changed(before: &RgbaImage, after: &RgbaImage) -> u64 {
    before
        .pixels()
        .zip(after.pixels())
        .map(|(a, b)| u64::from(a != b))
        .sum()
}

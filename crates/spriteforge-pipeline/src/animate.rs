//! Animation frame synthesis.
//!
//! A finished sprite is expanded into a short loop by translating it
//! vertically, one offset per frame. The default `[0, -1, 0, 1]` gives a
//! four-frame idle "bob"; other offset lists reuse the same machinery.
//!
//! This is stage 5 of the pipeline.

use crate::background::TRANSPARENT;
use crate::types::{Dimensions, PipelineError, RgbaImage};

/// An ordered, non-empty sequence of same-size frames forming one
/// animation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<RgbaImage>,
}

impl FrameSet {
    /// Build a frame set, checking that it is non-empty and that every
    /// frame has the same dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] on an empty list or a size
    /// mismatch.
    pub fn new(frames: Vec<RgbaImage>) -> Result<Self, PipelineError> {
        let Some(first) = frames.first() else {
            return Err(PipelineError::Dimension(
                "a frame set needs at least one frame".to_string(),
            ));
        };
        let expected = first.dimensions();
        if let Some((i, odd)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != expected)
        {
            return Err(PipelineError::Dimension(format!(
                "frame {i} is {}x{}, expected {}x{}",
                odd.width(),
                odd.height(),
                expected.0,
                expected.1,
            )));
        }
        Ok(Self { frames })
    }

    /// The frames in playback order.
    #[must_use]
    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    /// Number of frames (always at least one).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`; provided for API symmetry with [`len`](Self::len).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Dimensions shared by every frame.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.frames
            .first()
            .map_or(Dimensions::new(0, 0), Dimensions::of)
    }

    /// Consume the set and return the frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<RgbaImage> {
        self.frames
    }
}

/// Translate `image` vertically by `offset` pixels (positive moves down).
///
/// Rows pushed past the top or bottom edge are dropped; exposed rows are
/// fully transparent. Columns never move.
#[must_use = "returns the translated image"]
pub fn translate_vertical(image: &RgbaImage, offset: i32) -> RgbaImage {
    if offset == 0 {
        return image.clone();
    }
    let height = i64::from(image.height());
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let source_y = i64::from(y) - i64::from(offset);
        if (0..height).contains(&source_y) {
            u32::try_from(source_y).map_or(TRANSPARENT, |sy| *image.get_pixel(x, sy))
        } else {
            TRANSPARENT
        }
    })
}

/// Produce one translated copy of `sprite` per entry of `offsets`.
///
/// # Errors
///
/// Returns [`PipelineError::Dimension`] if `offsets` is empty.
pub fn synthesize_frames(sprite: &RgbaImage, offsets: &[i32]) -> Result<FrameSet, PipelineError> {
    FrameSet::new(
        offsets
            .iter()
            .map(|&offset| translate_vertical(sprite, offset))
            .collect(),
    )
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::types::AnimationConfig;

    /// Every pixel distinct so any misplaced row is caught.
    fn striped(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 7, 255]))
    }

    fn row_is_transparent(img: &RgbaImage, y: u32) -> bool {
        (0..img.width()).all(|x| *img.get_pixel(x, y) == TRANSPARENT)
    }

    #[test]
    fn zero_offset_is_identity() {
        let img = striped(5, 6);
        assert_eq!(translate_vertical(&img, 0), img);
    }

    #[test]
    fn positive_offset_moves_down_and_clears_top_rows() {
        let img = striped(4, 8);
        for k in 1..4_u32 {
            let out = translate_vertical(&img, k as i32);
            for y in 0..k {
                assert!(row_is_transparent(&out, y), "row {y} should be clear for k={k}");
            }
            for y in k..8 {
                for x in 0..4 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(x, y - k));
                }
            }
        }
    }

    #[test]
    fn negative_offset_moves_up_and_clears_bottom_rows() {
        let img = striped(3, 5);
        let out = translate_vertical(&img, -2);
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(out.get_pixel(x, y), img.get_pixel(x, y + 2));
            }
        }
        assert!(row_is_transparent(&out, 3));
        assert!(row_is_transparent(&out, 4));
    }

    #[test]
    fn offset_beyond_height_clears_everything() {
        let img = striped(3, 3);
        let out = translate_vertical(&img, 10);
        assert!(out.pixels().all(|p| *p == TRANSPARENT));
        assert_eq!(out.dimensions(), (3, 3));
    }

    #[test]
    fn idle_bob_produces_four_frames() {
        let img = striped(6, 6);
        let set = synthesize_frames(&img, &AnimationConfig::IDLE_BOB).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.dimensions(), Dimensions::new(6, 6));
        assert_eq!(set.frames()[0], img);
        assert_eq!(set.frames()[2], img);
        assert_eq!(set.frames()[1], translate_vertical(&img, -1));
        assert_eq!(set.frames()[3], translate_vertical(&img, 1));
    }

    #[test]
    fn synthesis_is_repeatable() {
        let img = striped(9, 4);
        let a = synthesize_frames(&img, &[0, 2, -3]).unwrap();
        let b = synthesize_frames(&img, &[0, 2, -3]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_offsets_are_rejected() {
        let result = synthesize_frames(&striped(2, 2), &[]);
        assert!(matches!(result, Err(PipelineError::Dimension(_))));
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let result = FrameSet::new(vec![RgbaImage::new(2, 2), RgbaImage::new(2, 3)]);
        assert!(matches!(result, Err(PipelineError::Dimension(_))));
    }
}

//! Shared types for the spriteforge processing pipeline.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::animate::FrameSet;
use crate::palette::{Palette, Rgb};
use crate::resample::ResampleFilter;

/// Re-export `RgbaImage` so downstream crates can reference pipeline
/// buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an existing buffer.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Which neighbors count as adjacent when growing the outline ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Diamond neighborhood: Manhattan distance at most `thickness`.
    Four,
    /// Square neighborhood: Chebyshev distance at most `thickness`.
    #[default]
    Eight,
}

/// Settings for the outline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineConfig {
    /// Color painted (at full opacity) around the silhouette.
    pub color: Rgb,
    /// Ring width in pixels. Zero disables the ring.
    pub thickness: u32,
    /// Neighborhood shape used for the ring.
    pub connectivity: Connectivity,
}

impl OutlineConfig {
    /// Default outline color: black.
    pub const DEFAULT_COLOR: Rgb = Rgb::new(0, 0, 0);
    /// Default ring width.
    pub const DEFAULT_THICKNESS: u32 = 1;
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR,
            thickness: Self::DEFAULT_THICKNESS,
            connectivity: Connectivity::default(),
        }
    }
}

/// Settings for the animation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Vertical offset per frame in pixels (positive moves down).
    /// The frame count equals the number of offsets.
    pub offsets: Vec<i32>,
    /// How long each frame is shown by the host player, in milliseconds.
    /// Carried through to the export manifest; the pipeline ignores it.
    pub frame_interval_ms: u32,
}

impl AnimationConfig {
    /// The four-frame idle "bob": rest, up, rest, down.
    pub const IDLE_BOB: [i32; 4] = [0, -1, 0, 1];
    /// Default frame interval.
    pub const DEFAULT_FRAME_INTERVAL_MS: u32 = 200;

    /// Number of frames this cycle produces.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.offsets.len()
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            offsets: Self::IDLE_BOB.to_vec(),
            frame_interval_ms: Self::DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

/// Configuration for the sprite processing pipeline.
///
/// The palette is not part of the config: it is loaded once per run and
/// shared read-only across every sprite of a batch.
///
/// Call [`validate`](Self::validate) before processing; every entry point
/// that takes a config does so itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pixels whose R, G and B are all at least this bright become fully
    /// transparent.
    pub hard_threshold: u8,

    /// Pixels whose R, G and B are all at least this bright (but not all
    /// past `hard_threshold`) have their alpha ramped down. When
    /// `soft_threshold >= hard_threshold` the ramp has zero width.
    pub soft_threshold: u8,

    /// Output cell size. Both axes must be non-zero.
    pub target: Dimensions,

    /// Resampling filter used to reach `target`.
    pub resample_filter: ResampleFilter,

    /// Unsharp-mask strength applied after resampling. `0.0` disables it.
    pub sharpen_amount: f32,

    /// Gaussian sigma of the unsharp mask.
    pub sharpen_sigma: f32,

    /// Only the first `max_colors` palette entries are used, when set.
    pub max_colors: Option<usize>,

    /// Outline settings, or `None` to skip the outline stage.
    pub outline: Option<OutlineConfig>,

    /// Animation settings, or `None` to emit a single still sprite.
    pub animation: Option<AnimationConfig>,
}

impl PipelineConfig {
    /// Default hard (full removal) brightness threshold.
    pub const DEFAULT_HARD_THRESHOLD: u8 = 240;
    /// Default soft (ramp start) brightness threshold.
    pub const DEFAULT_SOFT_THRESHOLD: u8 = 220;
    /// Default cell width.
    pub const DEFAULT_TARGET_WIDTH: u32 = 32;
    /// Default cell height.
    pub const DEFAULT_TARGET_HEIGHT: u32 = 32;
    /// Default resampling filter.
    pub const DEFAULT_RESAMPLE_FILTER: ResampleFilter = ResampleFilter::Triangle;
    /// Default unsharp-mask amount (disabled).
    pub const DEFAULT_SHARPEN_AMOUNT: f32 = 0.0;
    /// Default unsharp-mask sigma.
    pub const DEFAULT_SHARPEN_SIGMA: f32 = 1.0;
    /// Largest accepted unsharp-mask sigma. The Gaussian kernel spans
    /// `4 * sigma` pixels; beyond this it is far wider than any sprite.
    pub const MAX_SHARPEN_SIGMA: f32 = 64.0;

    /// Check the configuration for degenerate values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if the target size has a zero
    /// axis, a sharpen parameter is not finite, the sharpen sigma exceeds
    /// [`MAX_SHARPEN_SIGMA`](Self::MAX_SHARPEN_SIGMA), `max_colors` is
    /// zero, or the animation has no frames.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.target.is_degenerate() {
            return Err(PipelineError::Dimension(format!(
                "target size must be non-zero, got {}x{}",
                self.target.width, self.target.height,
            )));
        }
        if !self.sharpen_amount.is_finite() || !self.sharpen_sigma.is_finite() {
            return Err(PipelineError::Dimension(format!(
                "sharpen parameters must be finite, got amount={} sigma={}",
                self.sharpen_amount, self.sharpen_sigma,
            )));
        }
        if self.sharpen_sigma > Self::MAX_SHARPEN_SIGMA {
            return Err(PipelineError::Dimension(format!(
                "sharpen sigma must be at most {}, got {}",
                Self::MAX_SHARPEN_SIGMA,
                self.sharpen_sigma,
            )));
        }
        if self.max_colors == Some(0) {
            return Err(PipelineError::Dimension(
                "max_colors must be at least 1".to_string(),
            ));
        }
        if let Some(animation) = &self.animation
            && animation.offsets.is_empty()
        {
            return Err(PipelineError::Dimension(
                "animation needs at least one frame offset".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the configuration and apply `max_colors` to `palette`.
    ///
    /// Borrows the palette unchanged when no limit is set or the limit
    /// covers every entry.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if [`validate`](Self::validate)
    /// fails.
    pub fn resolve_palette<'p>(&self, palette: &'p Palette) -> Result<Cow<'p, Palette>, PipelineError> {
        self.validate()?;
        match self.max_colors {
            Some(limit) if limit < palette.len() => Ok(Cow::Owned(palette.truncated(limit)?)),
            _ => Ok(Cow::Borrowed(palette)),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hard_threshold: Self::DEFAULT_HARD_THRESHOLD,
            soft_threshold: Self::DEFAULT_SOFT_THRESHOLD,
            target: Dimensions::new(Self::DEFAULT_TARGET_WIDTH, Self::DEFAULT_TARGET_HEIGHT),
            resample_filter: Self::DEFAULT_RESAMPLE_FILTER,
            sharpen_amount: Self::DEFAULT_SHARPEN_AMOUNT,
            sharpen_sigma: Self::DEFAULT_SHARPEN_SIGMA,
            max_colors: None,
            outline: Some(OutlineConfig::default()),
            animation: Some(AnimationConfig::default()),
        }
    }
}

/// Result of running the pipeline with every intermediate buffer kept.
///
/// Each field captures the output of one stage so callers (and tests) can
/// inspect the chain without re-running it.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 0: decoded source image.
    pub original: RgbaImage,
    /// Stage 1: light background removed.
    pub background_removed: RgbaImage,
    /// Stage 2: resampled to the target cell size.
    pub resampled: RgbaImage,
    /// Stage 2b: sharpened (identical to `resampled` when disabled).
    pub sharpened: RgbaImage,
    /// Stage 3: palette-quantized.
    pub quantized: RgbaImage,
    /// Stage 4: outlined (identical to `quantized` when disabled).
    pub outlined: RgbaImage,
    /// Stage 5: animation frames, `None` when animation is disabled.
    pub frames: Option<FrameSet>,
    /// Dimensions of the finished sprite.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// The finished still sprite (the animation's source frame).
    #[must_use]
    pub const fn sprite(&self) -> &RgbaImage {
        &self.outlined
    }
}

/// Errors that can occur during pipeline processing.
///
/// [`Dimension`](Self::Dimension) means the run is misconfigured and no
/// sprite can succeed; the other variants concern a single input.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A size, palette or frame list is degenerate.
    #[error("invalid dimensions: {0}")]
    Dimension(String),
}

impl PipelineError {
    /// Whether this error invalidates the whole batch rather than one sprite.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Dimension(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_width_target_is_rejected() {
        let config = PipelineConfig {
            target: Dimensions::new(0, 32),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Dimension(_))
        ));
    }

    #[test]
    fn zero_max_colors_is_rejected() {
        let config = PipelineConfig {
            max_colors: Some(0),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Dimension(_))
        ));
    }

    #[test]
    fn oversized_sharpen_sigma_is_rejected() {
        let config = PipelineConfig {
            sharpen_amount: 1.0,
            sharpen_sigma: 1e30,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Dimension(_))));

        let at_cap = PipelineConfig {
            sharpen_amount: 1.0,
            sharpen_sigma: PipelineConfig::MAX_SHARPEN_SIGMA,
            ..PipelineConfig::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn empty_offsets_are_rejected() {
        let config = PipelineConfig {
            animation: Some(AnimationConfig {
                offsets: Vec::new(),
                ..AnimationConfig::default()
            }),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Dimension(_))
        ));
    }

    #[test]
    fn disabled_stages_are_valid() {
        let config = PipelineConfig {
            outline: None,
            animation: None,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_animation_is_idle_bob() {
        let animation = AnimationConfig::default();
        assert_eq!(animation.offsets, vec![0, -1, 0, 1]);
        assert_eq!(animation.frame_count(), 4);
        assert_eq!(animation.frame_interval_ms, 200);
    }

    #[test]
    fn only_dimension_errors_are_configuration_errors() {
        assert!(PipelineError::Dimension("x".to_string()).is_configuration());
        assert!(!PipelineError::EmptyInput.is_configuration());
    }

    #[test]
    fn config_json_roundtrip_preserves_fields() {
        let config = PipelineConfig {
            target: Dimensions::new(16, 24),
            max_colors: Some(6),
            outline: Some(OutlineConfig {
                color: Rgb::new(17, 6, 2),
                thickness: 2,
                connectivity: Connectivity::Four,
            }),
            ..PipelineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "target": { "width": 48, "height": 48 } }"#).unwrap();
        assert_eq!(config.target, Dimensions::new(48, 48));
        assert_eq!(config.hard_threshold, PipelineConfig::DEFAULT_HARD_THRESHOLD);
        assert!(config.animation.is_some());
    }

    #[test]
    fn connectivity_serializes_lowercase() {
        let json = serde_json::to_string(&Connectivity::Four).unwrap();
        assert_eq!(json, r#""four""#);
    }

    #[test]
    fn resolve_palette_borrows_without_limit() {
        let palette = Palette::earthy();
        let resolved = PipelineConfig::default().resolve_palette(&palette).unwrap();
        assert!(matches!(resolved, Cow::Borrowed(_)));
        assert_eq!(resolved.len(), palette.len());
    }

    #[test]
    fn resolve_palette_applies_max_colors() {
        let palette = Palette::earthy();
        let config = PipelineConfig {
            max_colors: Some(6),
            ..PipelineConfig::default()
        };
        let resolved = config.resolve_palette(&palette).unwrap();
        assert_eq!(resolved.len(), 6);
        assert_eq!(resolved.entries(), &palette.entries()[..6]);
    }

    #[test]
    fn resolve_palette_rejects_invalid_config() {
        let config = PipelineConfig {
            max_colors: Some(0),
            ..PipelineConfig::default()
        };
        assert!(config.resolve_palette(&Palette::earthy()).is_err());
    }
}

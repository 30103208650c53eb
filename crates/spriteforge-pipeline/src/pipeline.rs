//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate buffer before continuing.
//!
//! Unlike [`crate::process`] which runs the whole chain in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use spriteforge_pipeline::{Palette, Pipeline, PipelineConfig, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let palette = Palette::earthy();
//! let staged = Pipeline::new(png, PipelineConfig::default(), &palette)
//!     .decode()?
//!     .remove_background()
//!     .resample()
//!     .sharpen()
//!     .quantize()
//!     .outline()
//!     .animate()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying every previously computed
//! buffer. Stages cannot be skipped or reordered: the outline stage only
//! ever sees a quantized buffer, and the quantizer only ever sees a
//! resampled one.
//!
//! # Memory
//!
//! Every stage retains the full-size decoded original alongside the
//! small target-size buffers, because [`StagedResult`] hands all of them
//! back. Callers processing large batches that only need the finished
//! sprite can drop the result as soon as it is encoded.

use std::borrow::Cow;

use crate::animate::FrameSet;
use crate::diagnostics::StageMetrics;
use crate::palette::Palette;
use crate::types::{Dimensions, PipelineConfig, PipelineError, RgbaImage, StagedResult};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source bytes, config and palette are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing, call .decode() to continue"]
pub struct Pending<'p> {
    config: PipelineConfig,
    palette: &'p Palette,
    source: Vec<u8>,
}

impl<'p> Pending<'p> {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if the config is degenerate.
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty. Returns [`PipelineError::ImageDecode`] if the image format
    /// is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded<'p>, PipelineError> {
        let palette = self.config.resolve_palette(self.palette)?;
        let original = crate::decode::decode(&self.source)?;
        log::debug!(
            "decoded {} bytes into {}x{}",
            self.source.len(),
            original.width(),
            original.height(),
        );
        Ok(Decoded {
            config: self.config,
            palette,
            original,
            input_bytes: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image into RGBA.
///
/// Call [`remove_background`](Self::remove_background) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .remove_background() to continue"]
pub struct Decoded<'p> {
    config: PipelineConfig,
    palette: Cow<'p, Palette>,
    original: RgbaImage,
    input_bytes: usize,
}

impl<'p> Decoded<'p> {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The palette the quantizer will use, after `max_colors` is applied.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Decode metrics. This stage always runs.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Decode {
            input_bytes: self.input_bytes,
            width: self.original.width(),
            height: self.original.height(),
            pixel_count: Dimensions::of(&self.original).pixel_count(),
        }
    }

    /// Advance to the background removal stage.
    pub fn remove_background(self) -> BackgroundRemoved<'p> {
        let cleared = crate::background::remove_background(
            &self.original,
            self.config.hard_threshold,
            self.config.soft_threshold,
        );
        log::debug!(
            "background removed: {} of {} pixels transparent",
            crate::background::count_transparent(&cleared),
            Dimensions::of(&cleared).pixel_count(),
        );
        BackgroundRemoved {
            config: self.config,
            palette: self.palette,
            original: self.original,
            cleared,
        }
    }
}

// ───────────────────────── Stage 2: BackgroundRemoved ────────────────

/// Pipeline state after the light background has been made transparent.
///
/// Dimensions still match the source image. Call
/// [`resample`](Self::resample) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .resample() to continue"]
pub struct BackgroundRemoved<'p> {
    config: PipelineConfig,
    palette: Cow<'p, Palette>,
    original: RgbaImage,
    cleared: RgbaImage,
}

impl<'p> BackgroundRemoved<'p> {
    /// The image with its light background removed.
    #[must_use]
    pub const fn background_removed(&self) -> &RgbaImage {
        &self.cleared
    }

    /// Background removal metrics. This stage always runs.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Background {
            hard_threshold: self.config.hard_threshold,
            soft_threshold: self.config.soft_threshold,
            transparent_pixels: crate::background::count_transparent(&self.cleared),
            total_pixel_count: Dimensions::of(&self.cleared).pixel_count(),
        }
    }

    /// Advance to the resample stage.
    pub fn resample(self) -> Resampled<'p> {
        let resampled =
            crate::resample::resample(&self.cleared, self.config.target, self.config.resample_filter);
        log::debug!(
            "resampled {}x{} to {}x{} ({:?})",
            self.cleared.width(),
            self.cleared.height(),
            resampled.width(),
            resampled.height(),
            self.config.resample_filter,
        );
        Resampled {
            config: self.config,
            palette: self.palette,
            original: self.original,
            cleared: self.cleared,
            resampled,
        }
    }
}

// ───────────────────────── Stage 3: Resampled ────────────────────────

/// Pipeline state after resampling to the target cell size.
///
/// Call [`sharpen`](Self::sharpen) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .sharpen() to continue"]
pub struct Resampled<'p> {
    config: PipelineConfig,
    palette: Cow<'p, Palette>,
    original: RgbaImage,
    cleared: RgbaImage,
    resampled: RgbaImage,
}

impl<'p> Resampled<'p> {
    /// The image at the target cell size.
    #[must_use]
    pub const fn resampled(&self) -> &RgbaImage {
        &self.resampled
    }

    /// Resample metrics. This stage always runs.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        StageMetrics::Resample {
            filter: self.config.resample_filter.to_string(),
            from: Dimensions::of(&self.cleared),
            to: Dimensions::of(&self.resampled),
        }
    }

    /// Advance to the sharpen stage.
    ///
    /// With the default `sharpen_amount` of zero this copies the
    /// resampled buffer unchanged.
    pub fn sharpen(self) -> Sharpened<'p> {
        let sharpened = crate::sharpen::sharpen_rgba(
            &self.resampled,
            self.config.sharpen_sigma,
            self.config.sharpen_amount,
        );
        Sharpened {
            config: self.config,
            palette: self.palette,
            original: self.original,
            cleared: self.cleared,
            resampled: self.resampled,
            sharpened,
        }
    }
}

// ───────────────────────── Stage 4: Sharpened ────────────────────────

/// Pipeline state after the optional unsharp mask.
///
/// Call [`quantize`](Self::quantize) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .quantize() to continue"]
pub struct Sharpened<'p> {
    config: PipelineConfig,
    palette: Cow<'p, Palette>,
    original: RgbaImage,
    cleared: RgbaImage,
    resampled: RgbaImage,
    sharpened: RgbaImage,
}

impl<'p> Sharpened<'p> {
    /// The sharpened image (identical to the resampled one when disabled).
    #[must_use]
    pub const fn sharpened(&self) -> &RgbaImage {
        &self.sharpened
    }

    /// Whether the unsharp mask actually ran.
    #[must_use]
    pub fn applied(&self) -> bool {
        self.config.sharpen_amount > 0.0 && self.config.sharpen_sigma > 0.0
    }

    /// Advance to the quantize stage.
    pub fn quantize(self) -> Quantized<'p> {
        let quantized = crate::quantize::quantize(&self.sharpened, &self.palette);
        log::debug!("quantized to {} colors of {:?}", self.palette.len(), self.palette.name());
        Quantized {
            config: self.config,
            palette: self.palette,
            original: self.original,
            cleared: self.cleared,
            resampled: self.resampled,
            sharpened: self.sharpened,
            quantized,
        }
    }
}

// ───────────────────────── Stage 5: Quantized ────────────────────────

/// Pipeline state after every visible pixel has been snapped to the
/// palette.
///
/// Call [`outline`](Self::outline) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .outline() to continue"]
pub struct Quantized<'p> {
    config: PipelineConfig,
    palette: Cow<'p, Palette>,
    original: RgbaImage,
    cleared: RgbaImage,
    resampled: RgbaImage,
    sharpened: RgbaImage,
    quantized: RgbaImage,
}

impl Quantized<'_> {
    /// The palette-quantized image.
    #[must_use]
    pub const fn quantized(&self) -> &RgbaImage {
        &self.quantized
    }

    /// Quantization metrics. This stage always runs.
    #[must_use]
    pub fn stage_metrics(&self) -> StageMetrics {
        let stats = crate::quantize::quantize_stats(&self.sharpened, &self.quantized, &self.palette);
        StageMetrics::Quantize {
            palette: self.palette.name().to_string(),
            palette_size: self.palette.len(),
            visible_pixels: stats.visible_pixels,
            exact_matches: stats.exact_matches,
            colors_used: stats.colors_used,
        }
    }

    /// Advance to the outline stage.
    ///
    /// When `config.outline` is `None` the quantized buffer passes
    /// through unchanged.
    pub fn outline(self) -> Outlined {
        let outlined = match &self.config.outline {
            Some(outline) => crate::outline::outline(&self.quantized, outline),
            None => self.quantized.clone(),
        };
        log::debug!(
            "outline: {} pixels painted",
            crate::outline::count_changed(&self.quantized, &outlined),
        );
        Outlined {
            config: self.config,
            original: self.original,
            cleared: self.cleared,
            resampled: self.resampled,
            sharpened: self.sharpened,
            quantized: self.quantized,
            outlined,
        }
    }
}

// ───────────────────────── Stage 6: Outlined ─────────────────────────

/// Pipeline state after the outline ring has been painted.
///
/// The palette is no longer needed and has been released. Call
/// [`animate`](Self::animate) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .animate() to continue"]
pub struct Outlined {
    config: PipelineConfig,
    original: RgbaImage,
    cleared: RgbaImage,
    resampled: RgbaImage,
    sharpened: RgbaImage,
    quantized: RgbaImage,
    outlined: RgbaImage,
}

impl Outlined {
    /// The outlined sprite.
    #[must_use]
    pub const fn outlined(&self) -> &RgbaImage {
        &self.outlined
    }

    /// Advance to the animation stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if the animation has no frame
    /// offsets.
    pub fn animate(self) -> Result<Animated, PipelineError> {
        let frames = match &self.config.animation {
            Some(animation) => Some(crate::animate::synthesize_frames(
                &self.outlined,
                &animation.offsets,
            )?),
            None => None,
        };
        Ok(Animated {
            config: self.config,
            original: self.original,
            cleared: self.cleared,
            resampled: self.resampled,
            sharpened: self.sharpened,
            quantized: self.quantized,
            outlined: self.outlined,
            frames,
        })
    }
}

// ───────────────────────── Stage 7: Animated ─────────────────────────

/// Final pipeline state: the animation frames, if any, have been
/// synthesized.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`].
pub struct Animated {
    config: PipelineConfig,
    original: RgbaImage,
    cleared: RgbaImage,
    resampled: RgbaImage,
    sharpened: RgbaImage,
    quantized: RgbaImage,
    outlined: RgbaImage,
    frames: Option<FrameSet>,
}

impl Animated {
    /// The animation frames, or `None` when animation is disabled.
    #[must_use]
    pub const fn frames(&self) -> Option<&FrameSet> {
        self.frames.as_ref()
    }

    /// Consume the pipeline and return every intermediate buffer.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let dimensions = Dimensions::of(&self.outlined);
        StagedResult {
            original: self.original,
            background_removed: self.cleared,
            resampled: self.resampled,
            sharpened: self.sharpened,
            quantized: self.quantized,
            outlined: self.outlined,
            frames: self.frames,
            dimensions,
        }
    }
}

// ───────────────────────── Uniform stage access ──────────────────────

/// Trait implemented by every pipeline stage.
///
/// Gives uniform access to a stage's name and diagnostics metrics, and
/// lets any stage be run to completion.
pub trait PipelineStage: Sized {
    /// Name of this stage as shown in diagnostics (e.g. `"outline"`).
    const NAME: &'static str;

    /// Stage-specific metrics for diagnostics.
    ///
    /// Returns `None` for [`Pending`] and for optional stages that were
    /// disabled by the config.
    fn metrics(&self) -> Option<StageMetrics>;

    /// Run all remaining stages and return the final [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending<'_> {
    const NAME: &'static str = "source";

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded<'_> {
    const NAME: &'static str = "decode";

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.remove_background().complete()
    }
}

impl PipelineStage for BackgroundRemoved<'_> {
    const NAME: &'static str = "background";

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.resample().complete()
    }
}

impl PipelineStage for Resampled<'_> {
    const NAME: &'static str = "resample";

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.sharpen().complete()
    }
}

impl PipelineStage for Sharpened<'_> {
    const NAME: &'static str = "sharpen";

    fn metrics(&self) -> Option<StageMetrics> {
        if !self.applied() {
            return None;
        }
        Some(StageMetrics::Sharpen {
            sigma: self.config.sharpen_sigma,
            amount: self.config.sharpen_amount,
            changed_pixels: crate::outline::count_changed(&self.resampled, &self.sharpened),
        })
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.quantize().complete()
    }
}

impl PipelineStage for Quantized<'_> {
    const NAME: &'static str = "quantize";

    fn metrics(&self) -> Option<StageMetrics> {
        Some(self.stage_metrics())
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.outline().complete()
    }
}

impl PipelineStage for Outlined {
    const NAME: &'static str = "outline";

    fn metrics(&self) -> Option<StageMetrics> {
        let outline = self.config.outline.as_ref()?;
        Some(StageMetrics::Outline {
            color: outline.color.to_string(),
            thickness: outline.thickness,
            connectivity: outline.connectivity,
            painted_pixels: crate::outline::count_changed(&self.quantized, &self.outlined),
        })
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.animate()?.into_result())
    }
}

impl PipelineStage for Animated {
    const NAME: &'static str = "animate";

    fn metrics(&self) -> Option<StageMetrics> {
        let animation = self.config.animation.as_ref()?;
        let frames = self.frames.as_ref()?;
        Some(StageMetrics::Animate {
            frame_count: frames.len(),
            offsets: animation.offsets.clone(),
            frame_interval_ms: animation.frame_interval_ms,
        })
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental sprite processing pipeline.
///
/// Created via [`Pipeline::new`], which stores the source bytes, config
/// and palette without doing any processing, or via
/// [`Pipeline::from_image`] when the caller already holds a decoded
/// buffer.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes, config and palette.
    ///
    /// No processing is performed. The config is validated when
    /// [`.decode()`](Pending::decode) runs.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: PipelineConfig, palette: &Palette) -> Pending<'_> {
        Pending {
            config,
            palette,
            source: image_bytes,
        }
    }

    /// Start from an already decoded RGBA buffer, skipping the decode
    /// step.
    ///
    /// The decode metrics report the raw buffer length as the input size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if the config is degenerate.
    pub fn from_image(
        image: RgbaImage,
        config: PipelineConfig,
        palette: &Palette,
    ) -> Result<Decoded<'_>, PipelineError> {
        let palette = config.resolve_palette(palette)?;
        Ok(Decoded {
            input_bytes: image.as_raw().len(),
            config,
            palette,
            original: image,
        })
    }
}

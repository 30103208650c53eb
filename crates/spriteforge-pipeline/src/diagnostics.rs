//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Collected by [`process_with_diagnostics`] for parameter tuning. Every
//! metric is computed from the buffers a stage already produced, so a run
//! with diagnostics yields byte-identical sprites to one without.
//!
//! Time is read through the [`Clock`] trait, keeping this crate free of
//! any particular timer. Durations are serialized as fractional seconds
//! (`f64`) for JSON compatibility, since `std::time::Duration` does not
//! implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::palette::Palette;
use crate::pipeline::{
    Animated, BackgroundRemoved, Decoded, Outlined, Pipeline, PipelineStage, Quantized, Resampled,
    Sharpened,
};
use crate::types::{Connectivity, Dimensions, PipelineConfig, PipelineError, StagedResult};

/// Source of monotonic time for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// Stages that the config disables (sharpen, outline, animate) have
/// `Option` fields that are `None` when the stage did no work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: background removal.
    pub background: StageDiagnostics,
    /// Stage 3: resampling to the target cell.
    pub resample: StageDiagnostics,
    /// Stage 4: unsharp mask (only when `sharpen_amount > 0`).
    pub sharpen: Option<StageDiagnostics>,
    /// Stage 5: palette quantization.
    pub quantize: StageDiagnostics,
    /// Stage 6: outline ring (only when `config.outline` is set).
    pub outline: Option<StageDiagnostics>,
    /// Stage 7: frame synthesis (only when `config.animation` is set).
    pub animate: Option<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Background removal metrics.
    Background {
        /// Full-removal threshold.
        hard_threshold: u8,
        /// Ramp start threshold.
        soft_threshold: u8,
        /// Fully transparent pixels after removal.
        transparent_pixels: u64,
        /// Total pixel count for computing coverage.
        total_pixel_count: u64,
    },
    /// Resampling metrics.
    Resample {
        /// Filter name.
        filter: String,
        /// Size before resampling.
        from: Dimensions,
        /// Size after resampling.
        to: Dimensions,
    },
    /// Unsharp mask metrics.
    Sharpen {
        /// Gaussian sigma.
        sigma: f32,
        /// Mask strength.
        amount: f32,
        /// Pixels whose color changed.
        changed_pixels: u64,
    },
    /// Palette quantization metrics.
    Quantize {
        /// Palette name.
        palette: String,
        /// Entries available after `max_colors`.
        palette_size: usize,
        /// Pixels with non-zero alpha.
        visible_pixels: u64,
        /// Visible pixels that already carried a palette color.
        exact_matches: u64,
        /// Distinct palette entries present in the output.
        colors_used: usize,
    },
    /// Outline metrics.
    Outline {
        /// Outline color as `#rrggbb`.
        color: String,
        /// Ring width in pixels.
        thickness: u32,
        /// Neighborhood shape.
        connectivity: Connectivity,
        /// Transparent pixels painted with the outline color.
        painted_pixels: u64,
    },
    /// Frame synthesis metrics.
    Animate {
        /// Number of frames produced.
        frame_count: usize,
        /// Vertical offset per frame.
        offsets: Vec<i32>,
        /// Playback interval per frame.
        frame_interval_ms: u32,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub source_width: u32,
    /// Source image height in pixels.
    pub source_height: u32,
    /// Finished sprite width in pixels.
    pub sprite_width: u32,
    /// Finished sprite height in pixels.
    pub sprite_height: u32,
    /// Non-transparent pixels in the finished sprite.
    pub visible_pixels: u64,
    /// Frames written for this sprite (1 when animation is disabled).
    pub frame_count: usize,
}

impl PipelineDiagnostics {
    /// Stages that ran, in order, labelled with their
    /// [`PipelineStage::NAME`].
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut s = vec![
            (Decoded::NAME, &self.decode),
            (BackgroundRemoved::NAME, &self.background),
            (Resampled::NAME, &self.resample),
        ];
        if let Some(ref sharpen) = self.sharpen {
            s.push((Sharpened::NAME, sharpen));
        }
        s.push((Quantized::NAME, &self.quantize));
        if let Some(ref outline) = self.outline {
            s.push((Outlined::NAME, outline));
        }
        if let Some(ref animate) = self.animate {
            s.push((Animated::NAME, animate));
        }
        s
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Source: {}x{}  ->  Sprite: {}x{}",
            self.summary.source_width,
            self.summary.source_height,
            self.summary.sprite_width,
            self.summary.sprite_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Visible pixels: {}  |  Frames: {}",
            self.summary.visible_pixels, self.summary.frame_count,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Percentage of `part` in `whole`, zero when `whole` is zero.
#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Background {
            hard_threshold,
            soft_threshold,
            transparent_pixels,
            total_pixel_count,
        } => format!(
            "soft={soft_threshold} hard={hard_threshold} cleared={transparent_pixels} ({:.1}%)",
            percent(*transparent_pixels, *total_pixel_count),
        ),
        StageMetrics::Resample { filter, from, to } => format!(
            "{filter} {}x{} -> {}x{}",
            from.width, from.height, to.width, to.height,
        ),
        StageMetrics::Sharpen {
            sigma,
            amount,
            changed_pixels,
        } => format!("sigma={sigma:.2} amount={amount:.2} changed={changed_pixels}"),
        StageMetrics::Quantize {
            palette,
            palette_size,
            visible_pixels,
            exact_matches,
            colors_used,
        } => format!(
            "{palette}[{palette_size}] visible={visible_pixels} exact={exact_matches} used={colors_used}",
        ),
        StageMetrics::Outline {
            color,
            thickness,
            connectivity,
            painted_pixels,
        } => format!("{color} t={thickness} {connectivity:?} painted={painted_pixels}"),
        StageMetrics::Animate {
            frame_count,
            offsets,
            frame_interval_ms,
        } => format!("{frame_count} frames {offsets:?} @{frame_interval_ms}ms"),
    }
}

/// Time one stage transition.
fn timed<C, S, F>(clock: &C, advance: F) -> Result<(S, Duration), PipelineError>
where
    C: Clock,
    F: FnOnce() -> Result<S, PipelineError>,
{
    let start = clock.now();
    let stage = advance()?;
    Ok((stage, clock.elapsed(&start)))
}

/// Pair a duration with the metrics of an optional stage.
fn optional<S: PipelineStage>(stage: &S, duration: Duration) -> Option<StageDiagnostics> {
    stage
        .metrics()
        .map(|metrics| StageDiagnostics { duration, metrics })
}

/// Run the full pipeline and collect per-stage diagnostics.
///
/// Produces the same [`StagedResult`] as [`crate::process`].
///
/// # Errors
///
/// Returns the same errors as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &PipelineConfig,
    palette: &Palette,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();
    let pending = Pipeline::new(image_bytes.to_vec(), config.clone(), palette);

    let (decoded, t) = timed(clock, || pending.decode())?;
    let decode = StageDiagnostics {
        duration: t,
        metrics: decoded.stage_metrics(),
    };
    let (cleared, t) = timed(clock, || Ok(decoded.remove_background()))?;
    let background = StageDiagnostics {
        duration: t,
        metrics: cleared.stage_metrics(),
    };
    let (resampled, t) = timed(clock, || Ok(cleared.resample()))?;
    let resample = StageDiagnostics {
        duration: t,
        metrics: resampled.stage_metrics(),
    };
    let (sharpened, t) = timed(clock, || Ok(resampled.sharpen()))?;
    let sharpen = optional(&sharpened, t);
    let (quantized, t) = timed(clock, || Ok(sharpened.quantize()))?;
    let quantize = StageDiagnostics {
        duration: t,
        metrics: quantized.stage_metrics(),
    };
    let (outlined, t) = timed(clock, || Ok(quantized.outline()))?;
    let outline = optional(&outlined, t);
    let (animated, t) = timed(clock, || outlined.animate())?;
    let animate = optional(&animated, t);

    // Metric counting happens between timed sections, so it is part of
    // the total but not of any stage.
    let total_duration = clock.elapsed(&total_start);
    let staged = animated.into_result();

    let summary = PipelineSummary {
        source_width: staged.original.width(),
        source_height: staged.original.height(),
        sprite_width: staged.dimensions.width,
        sprite_height: staged.dimensions.height,
        visible_pixels: staged.dimensions.pixel_count()
            - crate::background::count_transparent(staged.sprite()),
        frame_count: staged.frames.as_ref().map_or(1, crate::animate::FrameSet::len),
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        background,
        resample,
        sharpen,
        quantize,
        outline,
        animate,
        total_duration,
        summary,
    };
    Ok((staged, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock that advances one millisecond per reading.
    struct StepClock {
        ticks: Cell<u64>,
    }

    impl StepClock {
        const fn new() -> Self {
            Self {
                ticks: Cell::new(0),
            }
        }
    }

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn blob_png() -> Vec<u8> {
        let img = image::RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                image::Rgba([60, 100, 40, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_do_not_change_output() {
        let palette = Palette::earthy();
        let config = PipelineConfig::default();
        let png = blob_png();
        let plain = crate::process(&png, &config, &palette).unwrap();
        let (staged, _) = process_with_diagnostics(&png, &config, &palette, &StepClock::new()).unwrap();
        assert_eq!(plain.outlined, staged.outlined);
        assert_eq!(plain.frames, staged.frames);
    }

    #[test]
    fn default_config_reports_every_enabled_stage() {
        let palette = Palette::earthy();
        let (_, diag) =
            process_with_diagnostics(&blob_png(), &PipelineConfig::default(), &palette, &StepClock::new())
                .unwrap();
        assert!(diag.sharpen.is_none());
        assert!(diag.outline.is_some());
        assert!(diag.animate.is_some());
        assert_eq!(diag.summary.frame_count, 4);
        assert_eq!(diag.summary.source_width, 40);
        assert_eq!(diag.summary.sprite_width, 32);
        assert!(diag.total_duration >= diag.decode.duration);
        assert!(matches!(
            diag.resample.metrics,
            StageMetrics::Resample { to, .. } if to == Dimensions::new(32, 32)
        ));
    }

    #[test]
    fn errors_propagate() {
        let palette = Palette::earthy();
        let result =
            process_with_diagnostics(&[], &PipelineConfig::default(), &palette, &StepClock::new());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn report_lists_stages_that_ran() {
        let palette = Palette::earthy();
        let config = PipelineConfig {
            sharpen_amount: 1.0,
            animation: None,
            ..PipelineConfig::default()
        };
        let (_, diag) = process_with_diagnostics(&blob_png(), &config, &palette, &StepClock::new()).unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        let stages: Vec<&str> = diag.stages().iter().map(|(name, _)| *name).collect();
        assert_eq!(stages, ["decode", "background", "resample", "sharpen", "quantize", "outline"]);
        assert!(report.contains("\nsharpen "));
        assert!(!report.contains("animate"));
        assert!(report.contains("earthy[13]"));
    }

    #[test]
    fn diagnostics_serialize_durations_as_seconds() {
        let palette = Palette::earthy();
        let (_, diag) =
            process_with_diagnostics(&blob_png(), &PipelineConfig::default(), &palette, &StepClock::new())
                .unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        assert!(json["total_duration"].is_f64());
        assert!(json["decode"]["duration"].as_f64().unwrap() > 0.0);

        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.quantize.metrics, diag.quantize.metrics);
    }
}

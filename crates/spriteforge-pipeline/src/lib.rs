//! spriteforge-pipeline: Pure sprite processing pipeline (sans-IO).
//!
//! Turns an arbitrary raster image into a small palette-limited sprite
//! through:
//! decode -> background removal -> resample -> optional sharpen ->
//! palette quantization -> outline -> frame synthesis.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and returns structured data. Encoding and filesystem
//! interaction live in `spriteforge-export` and the `spriteforge` CLI.

pub mod animate;
pub mod background;
pub mod batch;
pub mod decode;
pub mod diagnostics;
pub mod outline;
pub mod palette;
pub mod pipeline;
pub mod quantize;
pub mod resample;
pub mod sharpen;
pub mod types;

pub use animate::FrameSet;
pub use batch::{BatchReport, BatchRunner, FailedSprite};
pub use palette::{Palette, PaletteEntry, Rgb};
pub use pipeline::{Pipeline, PipelineStage};
pub use resample::ResampleFilter;
pub use types::{
    AnimationConfig, Connectivity, Dimensions, OutlineConfig, PipelineConfig, PipelineError,
    RgbaImage, StagedResult,
};

/// Run the full sprite pipeline on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), a configuration and the
/// palette to quantize against, and returns every intermediate buffer
/// along with the finished sprite and its animation frames.
///
/// # Pipeline steps
///
/// 1. Decode to RGBA
/// 2. Remove the light background (hard cutoff plus soft ramp)
/// 3. Resample to `config.target`
/// 4. Optional unsharp mask
/// 5. Snap visible pixels to the palette (first `max_colors` entries)
/// 6. Optional outline ring around the silhouette
/// 7. Optional vertical-offset animation frames
///
/// # Errors
///
/// Returns [`PipelineError::Dimension`] if the config is degenerate.
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process(
    image_bytes: &[u8],
    config: &PipelineConfig,
    palette: &Palette,
) -> Result<StagedResult, PipelineError> {
    Pipeline::new(image_bytes.to_vec(), config.clone(), palette).complete()
}

/// Run the sprite pipeline on an already decoded RGBA buffer.
///
/// # Errors
///
/// Returns [`PipelineError::Dimension`] if the config is degenerate.
pub fn process_image(
    image: RgbaImage,
    config: &PipelineConfig,
    palette: &Palette,
) -> Result<StagedResult, PipelineError> {
    Pipeline::from_image(image, config.clone(), palette)?.complete()
}

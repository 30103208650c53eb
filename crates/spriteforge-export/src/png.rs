//! PNG export.
//!
//! A sprite becomes either one `<name>.png` (animation disabled) or one
//! `<name>_frame<N>.png` per frame, `N` counting from zero in playback
//! order. Every file of a sprite is encoded before any is returned, so
//! an encoding failure yields no partial set.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use spriteforge_pipeline::{RgbaImage, StagedResult};

use crate::ExportError;

/// A named file held in memory, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    /// File name relative to the output directory.
    pub file_name: String,
    /// Encoded contents.
    pub bytes: Vec<u8>,
}

/// Encode an RGBA buffer as an 8-bit RGBA PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the buffer.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// File name of a still sprite: `<name>.png`.
#[must_use]
pub fn sprite_file_name(name: &str) -> String {
    format!("{name}.png")
}

/// File name of animation frame `index`: `<name>_frame<index>.png`.
#[must_use]
pub fn frame_file_name(name: &str, index: usize) -> String {
    format!("{name}_frame{index}.png")
}

/// Names of every image file [`encode_sprite`] produces for `staged`.
#[must_use]
pub fn sprite_file_names(name: &str, staged: &StagedResult) -> Vec<String> {
    match &staged.frames {
        Some(frames) => (0..frames.len()).map(|i| frame_file_name(name, i)).collect(),
        None => vec![sprite_file_name(name)],
    }
}

/// Encode every image file of one sprite.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if any image fails to encode; no
/// files are returned in that case.
pub fn encode_sprite(name: &str, staged: &StagedResult) -> Result<Vec<EncodedFile>, ExportError> {
    let images: Vec<&RgbaImage> = match &staged.frames {
        Some(frames) => frames.frames().iter().collect(),
        None => vec![staged.sprite()],
    };

    images
        .into_iter()
        .zip(sprite_file_names(name, staged))
        .map(|(image, file_name)| {
            Ok(EncodedFile {
                file_name,
                bytes: encode_png(image)?,
            })
        })
        .collect()
}

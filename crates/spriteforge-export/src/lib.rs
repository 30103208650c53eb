//! spriteforge-export: Pure sprite encoders (sans-IO)
//!
//! Turns pipeline results into named, in-memory output files: PNG
//! images for the still sprite or each animation frame, plus an optional
//! JSON manifest describing the frame set. Nothing here touches the
//! filesystem; the caller decides where and how the bytes are written.

pub mod manifest;
pub mod png;

pub use manifest::{SpriteManifest, encode_manifest, manifest_file_name};
pub use png::{
    EncodedFile, encode_png, encode_sprite, frame_file_name, sprite_file_name, sprite_file_names,
};

/// Whether `file_name` is one of the files written for sprite `name`:
/// `<name>.png`, `<name>_frame<N>.png` or `<name>.json`.
#[must_use]
pub fn is_sprite_output(name: &str, file_name: &str) -> bool {
    if file_name == sprite_file_name(name) || file_name == manifest_file_name(name) {
        return true;
    }
    file_name
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix("_frame"))
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Errors that can occur while encoding output files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// PNG encoding failed.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    /// The manifest could not be serialized.
    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_output_name() {
        assert!(is_sprite_output("hero", "hero.png"));
        assert!(is_sprite_output("hero", "hero.json"));
        assert!(is_sprite_output("hero", &frame_file_name("hero", 0)));
        assert!(is_sprite_output("hero", &frame_file_name("hero", 17)));
    }

    #[test]
    fn ignores_other_files() {
        assert!(!is_sprite_output("hero", "heroine.png"));
        assert!(!is_sprite_output("hero", "hero_frame.png"));
        assert!(!is_sprite_output("hero", "hero_framex.png"));
        assert!(!is_sprite_output("hero", "hero_frame1.json"));
        assert!(!is_sprite_output("hero", "villain_frame0.png"));
        assert!(!is_sprite_output("hero_frame0", "hero.png"));
    }
}

//! Animation manifest export.
//!
//! A small JSON document written next to a sprite's images so a host
//! (game, web page, sprite viewer) can play the set back without
//! guessing file names:
//!
//! ```json
//! {
//!   "name": "hero",
//!   "cell": { "width": 32, "height": 32 },
//!   "frame_interval_ms": 200,
//!   "frames": ["hero_frame0.png", "hero_frame1.png"]
//! }
//! ```
//!
//! `frame_interval_ms` is `null` for a still sprite.

use serde::{Deserialize, Serialize};

use spriteforge_pipeline::{Dimensions, PipelineConfig, StagedResult};

use crate::ExportError;
use crate::png::{EncodedFile, sprite_file_names};

/// Description of one sprite's output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteManifest {
    /// Sprite name (the file stem shared by every image).
    pub name: String,
    /// Size of every frame.
    pub cell: Dimensions,
    /// Playback interval per frame, `None` for a still sprite.
    pub frame_interval_ms: Option<u32>,
    /// Image file names in playback order.
    pub frames: Vec<String>,
}

impl SpriteManifest {
    /// Describe the files produced for `staged` under `config`.
    #[must_use]
    pub fn new(name: &str, staged: &StagedResult, config: &PipelineConfig) -> Self {
        let frame_interval_ms = staged
            .frames
            .as_ref()
            .and(config.animation.as_ref())
            .map(|a| a.frame_interval_ms);
        Self {
            name: name.to_string(),
            cell: staged.dimensions,
            frame_interval_ms,
            frames: sprite_file_names(name, staged),
        }
    }
}

/// File name of a sprite's manifest: `<name>.json`.
#[must_use]
pub fn manifest_file_name(name: &str) -> String {
    format!("{name}.json")
}

/// Serialize the manifest for `staged` as a pretty-printed JSON file.
///
/// # Errors
///
/// Returns [`ExportError::Manifest`] if serialization fails.
pub fn encode_manifest(
    name: &str,
    staged: &StagedResult,
    config: &PipelineConfig,
) -> Result<EncodedFile, ExportError> {
    let manifest = SpriteManifest::new(name, staged, config);
    let mut bytes = serde_json::to_vec_pretty(&manifest)?;
    bytes.push(b'\n');
    Ok(EncodedFile {
        file_name: manifest_file_name(name),
        bytes,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use spriteforge_pipeline::{AnimationConfig, Palette, RgbaImage};

    use super::*;

    fn run(config: &PipelineConfig) -> StagedResult {
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([90, 60, 30, 255]));
        spriteforge_pipeline::process_image(img, config, &Palette::earthy()).unwrap()
    }

    #[test]
    fn animated_manifest_lists_frames_and_interval() {
        let config = PipelineConfig {
            animation: Some(AnimationConfig {
                offsets: vec![0, 1],
                frame_interval_ms: 150,
            }),
            ..PipelineConfig::default()
        };
        let manifest = SpriteManifest::new("slime", &run(&config), &config);
        assert_eq!(manifest.frame_interval_ms, Some(150));
        assert_eq!(manifest.frames, ["slime_frame0.png", "slime_frame1.png"]);
        assert_eq!(manifest.cell, Dimensions::new(32, 32));
    }

    #[test]
    fn still_manifest_has_no_interval() {
        let config = PipelineConfig {
            animation: None,
            ..PipelineConfig::default()
        };
        let manifest = SpriteManifest::new("rock", &run(&config), &config);
        assert_eq!(manifest.frame_interval_ms, None);
        assert_eq!(manifest.frames, ["rock.png"]);
    }

    #[test]
    fn encoded_manifest_parses_back() {
        let config = PipelineConfig::default();
        let file = encode_manifest("hero", &run(&config), &config).unwrap();
        assert_eq!(file.file_name, "hero.json");
        let back: SpriteManifest = serde_json::from_slice(&file.bytes).unwrap();
        assert_eq!(back.frames.len(), 4);
        assert_eq!(back.frame_interval_ms, Some(AnimationConfig::DEFAULT_FRAME_INTERVAL_MS));
    }
}

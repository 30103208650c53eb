//! Integration test: run a synthetic source image through the full
//! pipeline, export the frame set, and decode the PNGs back.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::Rgba;
use spriteforge_pipeline::{Palette, PipelineConfig, RgbaImage};

/// A mushroom-ish silhouette on a white card with a soft grey halo.
fn source_png() -> Vec<u8> {
    let img = RgbaImage::from_fn(96, 96, |x, y| {
        let dx = i64::from(x) - 48;
        let dy = i64::from(y) - 40;
        let cap = dx * dx + dy * dy * 2 < 30 * 30 && y < 48;
        let stem = (40..56).contains(&x) && (48..80).contains(&y);
        let halo = dx * dx + dy * dy < 34 * 34;
        if cap {
            Rgba([204, 68, 68, 255])
        } else if stem {
            Rgba([238, 221, 187, 255])
        } else if halo {
            Rgba([232, 232, 232, 255])
        } else {
            Rgba([255, 255, 255, 255])
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
fn exported_frames_decode_to_pipeline_output() {
    let config = PipelineConfig::default();
    let palette = Palette::earthy();
    let staged = spriteforge_pipeline::process(&source_png(), &config, &palette)
        .expect("pipeline should succeed");

    let files = spriteforge_export::encode_sprite("mushroom", &staged).unwrap();
    let frames = staged.frames.as_ref().expect("animation is on by default");
    assert_eq!(files.len(), frames.len());

    for (file, frame) in files.iter().zip(frames.frames()) {
        let decoded = image::load_from_memory(&file.bytes).unwrap().to_rgba8();
        assert_eq!(&decoded, frame, "{} differs from its frame", file.file_name);
        assert_eq!(decoded.dimensions(), (32, 32));
    }
}

#[test]
fn exported_sprite_uses_only_palette_and_outline_colors() {
    let config = PipelineConfig {
        animation: None,
        ..PipelineConfig::default()
    };
    let palette = Palette::earthy();
    let staged = spriteforge_pipeline::process(&source_png(), &config, &palette).unwrap();
    let files = spriteforge_export::encode_sprite("mushroom", &staged).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name, "mushroom.png");

    let outline = config.outline.unwrap().color;
    let decoded = image::load_from_memory(&files[0].bytes).unwrap().to_rgba8();
    let mut visible = 0;
    for p in decoded.pixels() {
        if p.0[3] == 0 {
            continue;
        }
        visible += 1;
        let rgb = spriteforge_pipeline::Rgb::of(*p);
        assert!(palette.contains(rgb) || rgb == outline, "unexpected color {rgb}");
    }
    assert!(visible > 0, "the silhouette should survive background removal");
}

#[test]
fn manifest_matches_exported_files() {
    let config = PipelineConfig::default();
    let staged =
        spriteforge_pipeline::process(&source_png(), &config, &Palette::earthy()).unwrap();
    let files = spriteforge_export::encode_sprite("mushroom", &staged).unwrap();
    let manifest_file = spriteforge_export::encode_manifest("mushroom", &staged, &config).unwrap();

    let manifest: spriteforge_export::SpriteManifest =
        serde_json::from_slice(&manifest_file.bytes).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.file_name.clone()).collect();
    assert_eq!(manifest.frames, names);
    assert_eq!(manifest.name, "mushroom");
}

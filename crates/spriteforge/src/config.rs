//! Run-level setup: palette loading and input discovery.
//!
//! Everything here happens once, before any sprite is processed. Any
//! failure is a [`ConfigError`] and aborts the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use spriteforge_pipeline::{Palette, PipelineError};

/// File extensions treated as images when expanding a directory.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Errors that abort a run before processing starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `--config-json` is not a valid config serialization.
    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),

    /// The resolved config is degenerate.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] PipelineError),

    /// The palette file could not be read.
    #[error("cannot read palette {}: {source}", path.display())]
    PaletteRead {
        /// Palette path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The palette file is not a valid palette.
    #[error("invalid palette {}: {source}", path.display())]
    PaletteParse {
        /// Palette path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An input path does not exist or its directory cannot be listed.
    #[error("cannot read input {}: {source}", path.display())]
    Input {
        /// Input path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Two inputs would write to the same output files.
    #[error("inputs {} and {} both produce sprite {name:?}", first.display(), second.display())]
    DuplicateName {
        /// Shared sprite name.
        name: String,
        /// First input with this name.
        first: PathBuf,
        /// Second input with this name.
        second: PathBuf,
    },

    /// One sprite's still file would carry the name of another's frame.
    #[error("sprite {name:?} collides with the frame files of sprite {other:?}")]
    NameClash {
        /// Sprite whose name looks like a frame file.
        name: String,
        /// Sprite whose frames it collides with.
        other: String,
    },

    /// No images were found among the inputs.
    #[error("no input images found")]
    NoInputs,

    /// The output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutDir {
        /// Output directory.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// One image to turn into a sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteInput {
    /// Output name (the input's file stem).
    pub name: String,
    /// Input path.
    pub path: PathBuf,
}

/// Load the palette from `path`, or the built-in earthy palette.
///
/// # Errors
///
/// Returns [`ConfigError::PaletteRead`] or [`ConfigError::PaletteParse`].
/// An empty color list is a parse error.
pub fn load_palette(path: Option<&Path>) -> Result<Palette, ConfigError> {
    let Some(path) = path else {
        return Ok(Palette::earthy());
    };
    let bytes = std::fs::read(path).map_err(|source| ConfigError::PaletteRead {
        path: path.to_path_buf(),
        source,
    })?;
    let palette: Palette =
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::PaletteParse {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("loaded palette {:?} with {} colors", palette.name(), palette.len());
    Ok(palette)
}

/// Whether `path` has an image file extension.
fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Sprite name for an input path.
fn sprite_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "sprite".to_string(), |s| s.to_string_lossy().into_owned())
}

/// Expand the command-line inputs into one [`SpriteInput`] per image.
///
/// Files are taken as given, whatever their extension. Directories are
/// listed (not recursively) and their image files added in name order.
///
/// # Errors
///
/// Returns [`ConfigError::Input`] for a missing path or unreadable
/// directory, [`ConfigError::DuplicateName`] if two inputs share a file
/// stem, [`ConfigError::NameClash`] if one name is another's frame name
/// (`hero` and `hero_frame0`), and [`ConfigError::NoInputs`] if nothing
/// was found.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<SpriteInput>, ConfigError> {
    let mut files = Vec::new();
    for path in paths {
        let input_error = |source| ConfigError::Input {
            path: path.clone(),
            source,
        };
        if std::fs::metadata(path).map_err(input_error)?.is_dir() {
            let mut listed: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(input_error)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            listed.sort();
            log::debug!("{}: {} images", path.display(), listed.len());
            files.extend(listed);
        } else {
            files.push(path.clone());
        }
    }

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut inputs = Vec::with_capacity(files.len());
    for path in files {
        let name = sprite_name(&path);
        if let Some(first) = seen.get(&name) {
            return Err(ConfigError::DuplicateName {
                name,
                first: first.clone(),
                second: path,
            });
        }
        seen.insert(name.clone(), path.clone());
        inputs.push(SpriteInput { name, path });
    }

    for input in &inputs {
        let file_name = spriteforge_export::sprite_file_name(&input.name);
        let clash = input.name.match_indices("_frame").find_map(|(i, _)| {
            let other = &input.name[..i];
            (seen.contains_key(other) && spriteforge_export::is_sprite_output(other, &file_name))
                .then_some(other)
        });
        if let Some(other) = clash {
            return Err(ConfigError::NameClash {
                name: input.name.clone(),
                other: other.to_string(),
            });
        }
    }

    if inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }
    Ok(inputs)
}

/// Create the output directory if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::OutDir`] if creation fails or the path is not
/// a directory.
pub fn prepare_out_dir(path: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(path).map_err(|source| ConfigError::OutDir {
        path: path.to_path_buf(),
        source,
    })
}

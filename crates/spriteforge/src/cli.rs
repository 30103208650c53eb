//! Command-line arguments and their mapping onto [`PipelineConfig`].

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use spriteforge_pipeline::{
    AnimationConfig, Connectivity, Dimensions, OutlineConfig, PipelineConfig, ResampleFilter, Rgb,
};

use crate::config::ConfigError;

/// Turn source images into palette-reduced, outlined, animated sprites.
///
/// Each input image becomes `<name>.png` (or `<name>_frame<N>.png` per
/// animation frame) in the output directory, where `<name>` is the input
/// file stem. Directories are expanded to the images they contain.
#[derive(Debug, Parser)]
#[command(name = "spriteforge", version)]
pub struct Cli {
    /// Input images (PNG, JPEG, BMP, WebP) or directories of images.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the sprites are written to (created if missing).
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Palette JSON file. Defaults to the built-in earthy palette.
    #[arg(long)]
    pub palette: Option<PathBuf>,

    /// Use only the first N palette colors.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_colors: Option<usize>,

    /// Sprite width in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_TARGET_WIDTH, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    pub width: u32,

    /// Sprite height in pixels.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_TARGET_HEIGHT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    pub height: u32,

    /// Brightness at or above which a pixel becomes fully transparent.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_HARD_THRESHOLD)]
    pub hard_threshold: u8,

    /// Brightness at which background alpha starts ramping down.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SOFT_THRESHOLD)]
    pub soft_threshold: u8,

    /// Resampling filter.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    pub filter: Filter,

    /// Unsharp-mask strength after resampling (0 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SHARPEN_AMOUNT)]
    pub sharpen: f32,

    /// Unsharp-mask Gaussian sigma.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_SHARPEN_SIGMA)]
    pub sharpen_sigma: f32,

    /// Outline color as `#rrggbb` or `r,g,b`.
    #[arg(long, default_value_t = OutlineConfig::DEFAULT_COLOR)]
    pub outline_color: Rgb,

    /// Outline ring width in pixels.
    #[arg(long, default_value_t = OutlineConfig::DEFAULT_THICKNESS)]
    pub outline_thickness: u32,

    /// Outline neighborhood.
    #[arg(long, value_enum, default_value_t = Neighborhood::Eight)]
    pub connectivity: Neighborhood,

    /// Skip the outline stage.
    #[arg(long)]
    pub no_outline: bool,

    /// Vertical offset per animation frame, comma separated (positive moves down).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = AnimationConfig::IDLE_BOB)]
    pub offsets: Vec<i32>,

    /// Frame interval recorded in the manifest, in milliseconds.
    #[arg(long, default_value_t = AnimationConfig::DEFAULT_FRAME_INTERVAL_MS)]
    pub frame_interval_ms: u32,

    /// Write a single still sprite instead of animation frames.
    #[arg(long)]
    pub no_animation: bool,

    /// Also write `<name>.json` describing each sprite's files.
    #[arg(long)]
    pub manifest: bool,

    /// Worker threads (0 = one per CPU).
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Print the batch report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Print per-stage timing and metrics for every sprite to stderr.
    #[arg(long)]
    pub diagnostics: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    pub config_json: Option<String>,
}

/// Resampling filter selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Filter {
    /// Nearest-neighbor (blocky, no new colors).
    Nearest,
    /// Bilinear (smooth, no ringing).
    Triangle,
    /// Bicubic Catmull-Rom (sharper, slight ringing).
    CatmullRom,
    /// Gaussian (softest).
    Gaussian,
    /// Lanczos with 3 lobes (sharpest, most ringing).
    Lanczos3,
}

/// Maps a [`ResampleFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResampleFilter) -> Filter {
    match f {
        ResampleFilter::Nearest => Filter::Nearest,
        ResampleFilter::Triangle => Filter::Triangle,
        ResampleFilter::CatmullRom => Filter::CatmullRom,
        ResampleFilter::Gaussian => Filter::Gaussian,
        ResampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from
/// [`PipelineConfig::DEFAULT_RESAMPLE_FILTER`] so the two cannot silently
/// diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(PipelineConfig::DEFAULT_RESAMPLE_FILTER);

impl From<Filter> for ResampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Outline neighborhood selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Neighborhood {
    /// Edge neighbors only (diamond ring).
    Four,
    /// Edge and corner neighbors (square ring).
    Eight,
}

impl From<Neighborhood> for Connectivity {
    fn from(n: Neighborhood) -> Self {
        match n {
            Neighborhood::Four => Self::Four,
            Neighborhood::Eight => Self::Eight,
        }
    }
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags. Either way the result is
/// validated before it is returned.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigJson`] if the JSON does not parse and
/// [`ConfigError::Invalid`] if the config is degenerate.
pub fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, ConfigError> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(ConfigError::ConfigJson)?
    } else {
        PipelineConfig {
            hard_threshold: cli.hard_threshold,
            soft_threshold: cli.soft_threshold,
            target: Dimensions::new(cli.width, cli.height),
            resample_filter: cli.filter.into(),
            sharpen_amount: cli.sharpen,
            sharpen_sigma: cli.sharpen_sigma,
            max_colors: cli.max_colors,
            outline: (!cli.no_outline).then_some(OutlineConfig {
                color: cli.outline_color,
                thickness: cli.outline_thickness,
                connectivity: cli.connectivity.into(),
            }),
            animation: (!cli.no_animation).then(|| AnimationConfig {
                offsets: cli.offsets.clone(),
                frame_interval_ms: cli.frame_interval_ms,
            }),
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use spriteforge_pipeline::PipelineError;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("spriteforge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let config = config_from_cli(&parse(&["a.png"])).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = parse(&[
            "a.png",
            "--width",
            "16",
            "--height",
            "24",
            "--filter",
            "nearest",
            "--outline-color",
            "#102030",
            "--connectivity",
            "four",
            "--offsets",
            "-2,0,2",
            "--max-colors",
            "6",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.target, Dimensions::new(16, 24));
        assert_eq!(config.resample_filter, ResampleFilter::Nearest);
        assert_eq!(config.max_colors, Some(6));
        let outline = config.outline.unwrap();
        assert_eq!(outline.color, Rgb::new(0x10, 0x20, 0x30));
        assert_eq!(outline.connectivity, Connectivity::Four);
        assert_eq!(config.animation.unwrap().offsets, [-2, 0, 2]);
    }

    #[test]
    fn disable_flags_remove_optional_stages() {
        let config = config_from_cli(&parse(&["a.png", "--no-outline", "--no-animation"])).unwrap();
        assert!(config.outline.is_none());
        assert!(config.animation.is_none());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "a.png",
            "--width",
            "16",
            "--config-json",
            r#"{"target":{"width":8,"height":8},"animation":null}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.target, Dimensions::new(8, 8));
        assert!(config.animation.is_none());
        assert!(config.outline.is_some());
    }

    #[test]
    fn malformed_config_json_is_a_config_error() {
        let cli = parse(&["a.png", "--config-json", "{not json"]);
        assert!(matches!(config_from_cli(&cli), Err(ConfigError::ConfigJson(_))));
    }

    #[test]
    fn degenerate_config_json_is_rejected() {
        let cli = parse(&["a.png", "--config-json", r#"{"target":{"width":0,"height":8}}"#]);
        assert!(matches!(
            config_from_cli(&cli),
            Err(ConfigError::Invalid(PipelineError::Dimension(_)))
        ));
    }

    #[test]
    fn zero_width_flag_is_rejected_by_clap() {
        let result = Cli::try_parse_from(["spriteforge", "a.png", "--width", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn inputs_are_required() {
        assert!(Cli::try_parse_from(["spriteforge"]).is_err());
    }
}

//! Processing and writing a single sprite.

use std::path::{Path, PathBuf};

use spriteforge_export::ExportError;
use spriteforge_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use spriteforge_pipeline::{Palette, PipelineConfig, PipelineError, StagedResult};

use crate::config::SpriteInput;
use crate::write::{WriteError, write_all_or_nothing};

/// Why one sprite failed. Other sprites in the batch are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum SpriteError {
    /// The input file could not be read.
    #[error("cannot read input: {0}")]
    Read(#[source] std::io::Error),

    /// The pipeline rejected the image.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The sprite could not be encoded.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The output directory could not be scanned for stale files.
    #[error("cannot list output directory: {0}")]
    ListOutput(#[source] std::io::Error),

    /// The sprite's files could not be written.
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Settings shared by every sprite of a run.
#[derive(Debug)]
pub struct RunContext<'a> {
    /// Validated pipeline config.
    pub config: &'a PipelineConfig,
    /// Palette to quantize against.
    pub palette: &'a Palette,
    /// Output directory (already created).
    pub out_dir: &'a Path,
    /// Also write `<name>.json`.
    pub manifest: bool,
    /// Collect per-stage diagnostics.
    pub diagnostics: bool,
}

/// Result of one sprite.
#[derive(Debug)]
pub struct SpriteRun {
    /// Sprite name.
    pub name: String,
    /// Written paths, or why nothing was written.
    pub result: Result<Vec<PathBuf>, SpriteError>,
    /// Stage diagnostics, when requested and the pipeline succeeded.
    pub diagnostics: Option<PipelineDiagnostics>,
}

/// Read, process, encode, and write one sprite.
///
/// Never panics on bad input: every failure is captured in
/// [`SpriteRun::result`].
pub fn run_sprite<C: Clock>(input: &SpriteInput, ctx: &RunContext<'_>, clock: &C) -> SpriteRun {
    let mut diagnostics = None;
    let result = forge(input, ctx, clock, &mut diagnostics);
    match &result {
        Ok(paths) => log::info!("{}: wrote {} files", input.name, paths.len()),
        Err(e) => log::warn!("{}: {e}", input.name),
    }
    SpriteRun {
        name: input.name.clone(),
        result,
        diagnostics,
    }
}

fn forge<C: Clock>(
    input: &SpriteInput,
    ctx: &RunContext<'_>,
    clock: &C,
    diagnostics: &mut Option<PipelineDiagnostics>,
) -> Result<Vec<PathBuf>, SpriteError> {
    let bytes = std::fs::read(&input.path).map_err(SpriteError::Read)?;
    log::debug!("{}: read {} bytes from {}", input.name, bytes.len(), input.path.display());

    let staged: StagedResult = if ctx.diagnostics {
        let (staged, diag) = spriteforge_pipeline::diagnostics::process_with_diagnostics(
            &bytes,
            ctx.config,
            ctx.palette,
            clock,
        )?;
        *diagnostics = Some(diag);
        staged
    } else {
        spriteforge_pipeline::process(&bytes, ctx.config, ctx.palette)?
    };

    let mut files = spriteforge_export::encode_sprite(&input.name, &staged)?;
    if ctx.manifest {
        files.push(spriteforge_export::encode_manifest(
            &input.name,
            &staged,
            ctx.config,
        )?);
    }
    let retired = stale_outputs(ctx.out_dir, &input.name, &files)?;
    if !retired.is_empty() {
        log::debug!("{}: retiring {} stale files", input.name, retired.len());
    }
    Ok(write_all_or_nothing(ctx.out_dir, &files, &retired)?)
}

/// Files a previous run wrote for sprite `name` that the new set does not
/// replace, e.g. frames from an animated run before a still one.
fn stale_outputs(
    out_dir: &Path,
    name: &str,
    files: &[spriteforge_export::EncodedFile],
) -> Result<Vec<String>, SpriteError> {
    let mut stale = Vec::new();
    for entry in std::fs::read_dir(out_dir).map_err(SpriteError::ListOutput)? {
        let entry = entry.map_err(SpriteError::ListOutput)?;
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if spriteforge_export::is_sprite_output(name, &file_name)
            && !files.iter().any(|f| f.file_name == file_name)
        {
            stale.push(file_name);
        }
    }
    stale.sort();
    Ok(stale)
}

// ABOUTME: Pipeline module for the slidecast application
// ABOUTME: Runs script parsing, deck building, rasterization, narration and composition in order

use crate::compose::{self, ComposeConfig, CompositionSummary};
use crate::convert::DocumentConverter;
use crate::deck;
use crate::errors::{Result, Stage};
use crate::narration::{self, NarrationConfig, SpeechSynthesizer};
use crate::rasterize::{self, PageRasterizer, RasterConfig};
use crate::script::Script;
use crate::utils::{self, ScratchDir};
use log::info;
use std::path::{Path, PathBuf};

/// Everything the pipeline needs besides its external backends
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub raster: RasterConfig,
    pub narration: NarrationConfig,
    pub compose: ComposeConfig,
    /// Keep intermediates here instead of a scratch directory
    pub work_dir: Option<PathBuf>,
}

/// External collaborators used by the pipeline
pub struct Backends<'a> {
    pub converter: &'a dyn DocumentConverter,
    pub rasterizer: &'a dyn PageRasterizer,
    pub synthesizer: &'a dyn SpeechSynthesizer,
}

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub slides: usize,
    pub deck: PathBuf,
    pub images: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    pub video: CompositionSummary,
}

/// Turn the script at `script_path` into a narrated video at `output_video`.
///
/// Intermediate paths in the report only survive the call when `work_dir` is set.
pub fn run_pipeline(
    script_path: &Path,
    output_video: &Path,
    config: &PipelineConfig,
    backends: &Backends<'_>,
) -> Result<PipelineReport> {
    let script = Script::from_file(script_path).map_err(|e| e.in_stage(Stage::Script))?;
    run_script(&script, output_video, config, backends)
}

/// Run the pipeline for an already parsed script.
pub fn run_script(
    script: &Script,
    output_video: &Path,
    config: &PipelineConfig,
    backends: &Backends<'_>,
) -> Result<PipelineReport> {
    info!("Running pipeline for {} slides", script.len());

    let (work_dir, _scratch) = match &config.work_dir {
        Some(dir) => (dir.clone(), None),
        None => {
            let scratch = ScratchDir::new("slidecast-work-")?;
            (scratch.path().to_path_buf(), Some(scratch))
        }
    };
    utils::validate_directory_writable(&work_dir)?;

    let deck_path = work_dir.join("deck.pptx");
    let image_dir = work_dir.join("slides");
    let audio_dir = work_dir.join("audio");

    deck::build_deck(script, &deck_path).map_err(|e| e.in_stage(Stage::Deck))?;

    let images = rasterize::rasterize_deck(
        &deck_path,
        &image_dir,
        &config.raster,
        backends.converter,
        backends.rasterizer,
    )
    .map_err(|e| e.in_stage(Stage::Rasterize))?;

    let audio = narration::render_narration(
        script,
        &audio_dir,
        &config.narration,
        backends.synthesizer,
    )
    .map_err(|e| e.in_stage(Stage::Narrate))?;

    let video = compose::pair_by_position(images.clone(), &audio)
        .and_then(|segments| compose::compose_video(&segments, output_video, &config.compose))
        .map_err(|e| e.in_stage(Stage::Compose))?;

    info!("Pipeline finished: {:?}", video.output);
    Ok(PipelineReport {
        slides: script.len(),
        deck: deck_path,
        images,
        audio,
        video,
    })
}

// ABOUTME: Main entry point for the slidecast program.
// ABOUTME: Provides CLI interface and executes commands from the library.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use slidecast::{
    Backends, Config, GoogleTranslateTts, LibreOfficeConverter, PipelineConfig, PopplerRasterizer,
    Script,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a PPTX deck from a JSON script
    BuildDeck(BuildDeckArgs),

    /// Render every slide of a PPTX deck to PNG images
    Rasterize(RasterizeArgs),

    /// Synthesize one narration clip per slide
    Narrate(NarrateArgs),

    /// Mux slide images and narration clips into a video
    Compose(ComposeArgs),

    /// Run the whole pipeline from script to video
    Render(RenderArgs),
}

#[derive(Args)]
struct BuildDeckArgs {
    /// Path to the JSON script
    script: PathBuf,

    /// Path of the PPTX file to write
    output: PathBuf,
}

#[derive(Args)]
struct RasterizeArgs {
    /// Path to the .pptx deck
    input_deck_path: PathBuf,

    /// Directory for the slide images
    output_folder: PathBuf,

    /// Rendering resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Keep the intermediate PDF next to the images
    #[arg(long)]
    keep_pdf: bool,
}

#[derive(Args)]
struct NarrateArgs {
    /// Path to the JSON script
    script: PathBuf,

    /// Directory for the audio clips
    audio_dir: PathBuf,

    /// Speech language code
    #[arg(long)]
    lang: Option<String>,
}

#[derive(Args)]
struct ComposeArgs {
    /// Directory holding the slide images
    image_dir: PathBuf,

    /// Path of the video to write
    output: PathBuf,

    /// Narration clips in slide order
    #[arg(long, value_delimiter = ',', required = true)]
    audio: Vec<PathBuf>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Args)]
struct RenderArgs {
    /// Path to the JSON script
    script: PathBuf,

    /// Path of the video to write
    output: PathBuf,

    /// Keep intermediates (deck, images, audio) in this directory
    #[arg(long)]
    work_dir: Option<PathBuf>,

    #[arg(long)]
    dpi: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    lang: Option<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn rasterize(args: &RasterizeArgs, config: &Config) -> Result<(), String> {
    let input = &args.input_deck_path;

    // Validate before touching the output folder.
    if !input.exists() {
        return Err(format!("File not found: {}", input.display()));
    }
    if slidecast::utils::validate_extension(input, "pptx").is_err() {
        return Err(format!(
            "Input file must be a .pptx file: {}",
            input.display()
        ));
    }

    let raster_config = config.raster_config(args.dpi, args.keep_pdf);
    let converter = LibreOfficeConverter::from_config(config);
    let rasterizer = PopplerRasterizer::from_config(config);

    match slidecast::rasterize_deck(
        input,
        &args.output_folder,
        &raster_config,
        &converter,
        &rasterizer,
    ) {
        Ok(images) => {
            println!(
                "Successfully converted presentation to {} PNG images.",
                images.len()
            );
            println!("Images saved in: {}", args.output_folder.display());
            Ok(())
        }
        Err(e) => Err(format!("Conversion failed: {}", e)),
    }
}

fn run(command: &Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::BuildDeck(args) => {
            let script = Script::from_file(&args.script)?;
            slidecast::build_deck(&script, &args.output)?;
            println!(
                "Deck with {} slides written to {}",
                script.len(),
                args.output.display()
            );
        }
        Commands::Rasterize(args) => rasterize(args, config).map_err(anyhow::Error::msg)?,
        Commands::Narrate(args) => {
            let script = Script::from_file(&args.script)?;
            let synthesizer = GoogleTranslateTts::from_config(config)?;
            let paths = slidecast::render_narration(
                &script,
                &args.audio_dir,
                &config.narration_config(args.lang.clone()),
                &synthesizer,
            )?;
            println!(
                "Synthesized {} narration clips into {}",
                paths.len(),
                args.audio_dir.display()
            );
        }
        Commands::Compose(args) => {
            let summary = slidecast::make_video(
                &args.image_dir,
                &args.audio,
                &args.output,
                &config.compose_config(args.fps),
            )?;
            println!(
                "Video with {} segments ({:.1}s) written to {}",
                summary.segments,
                summary.duration_secs,
                summary.output.display()
            );
        }
        Commands::Render(args) => {
            let pipeline_config = PipelineConfig {
                raster: config.raster_config(args.dpi, args.work_dir.is_some()),
                narration: config.narration_config(args.lang.clone()),
                compose: config.compose_config(args.fps),
                work_dir: args.work_dir.clone(),
            };
            let converter = LibreOfficeConverter::from_config(config);
            let rasterizer = PopplerRasterizer::from_config(config);
            let synthesizer = GoogleTranslateTts::from_config(config)
                .context("Failed to set up speech synthesis")?;
            let backends = Backends {
                converter: &converter,
                rasterizer: &rasterizer,
                synthesizer: &synthesizer,
            };

            let report =
                slidecast::run_pipeline(&args.script, &args.output, &pipeline_config, &backends)?;
            println!(
                "Rendered {} slides into {} ({:.1}s)",
                report.slides,
                report.video.output.display(),
                report.video.duration_secs
            );
        }
    }
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version output are not failures.
            if !e.use_stderr() {
                e.exit();
            }
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);
    let config = Config::from_env();

    if let Err(e) = run(&cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

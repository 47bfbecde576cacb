// ABOUTME: Library module for the slidecast program.
// ABOUTME: Contains the deck, rasterization, narration and video composition stages.

// Reexport modules
pub mod compose;
pub mod config;
pub mod convert;
pub mod deck;
pub mod errors;
pub mod narration;
pub mod pipeline;
pub mod rasterize;
pub mod script;
pub mod utils;

// Reexport common types and functions
pub use compose::{compose_video, make_video, pair_segments, ComposeConfig, Segment};
pub use config::Config;
pub use convert::{DocumentConverter, LibreOfficeConverter};
pub use deck::{build_deck, read_deck, DeckSlide};
pub use errors::{ErrorKind, Result, SlidecastError, Stage};
pub use narration::{render_narration, GoogleTranslateTts, NarrationConfig, SpeechSynthesizer};
pub use pipeline::{run_pipeline, Backends, PipelineConfig, PipelineReport};
pub use rasterize::{rasterize_deck, rasterize_pdf, PageRasterizer, PopplerRasterizer, RasterConfig};
pub use script::{Script, Slide};

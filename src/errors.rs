// ABOUTME: Error types for the slidecast application
// ABOUTME: Provides structured error handling for each stage of the pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlidecastError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Invalid input format: {0}")]
    InputFormat(String),

    #[error("Slide {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("Failed to parse script JSON: {0}")]
    ScriptParse(#[from] serde_json::Error),

    #[error("External process `{program}` failed: {message}")]
    ExternalProcess { program: String, message: String },

    #[error("External process `{program}` killed after exceeding deadline of {timeout_ms} ms")]
    Timeout { program: String, timeout_ms: u64 },

    #[error("Rasterization error: {0}")]
    Rasterization(String),

    #[error("Speech synthesis failed for slide {index}: {message}")]
    Synthesis { index: usize, message: String },

    #[error("Video composition error: {0}")]
    Composition(String),

    #[error("Deck error: {0}")]
    Deck(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<SlidecastError>,
    },
}

/// Pipeline stage a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Script,
    Deck,
    Rasterize,
    Narrate,
    Compose,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Script => "script",
            Stage::Deck => "deck",
            Stage::Rasterize => "rasterize",
            Stage::Narrate => "narrate",
            Stage::Compose => "compose",
        };
        f.write_str(name)
    }
}

/// Coarse classification of a failure, independent of stage wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    InputNotFound,
    InputFormat,
    ExternalProcess,
    Rasterization,
    Synthesis,
    Composition,
    Io,
    Other,
}

impl SlidecastError {
    /// Wrap this error with the stage it surfaced from.
    pub fn in_stage(self, stage: Stage) -> Self {
        SlidecastError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The error kind, looking through any stage context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SlidecastError::Usage(_) => ErrorKind::Usage,
            SlidecastError::InputNotFound(_) => ErrorKind::InputNotFound,
            SlidecastError::InputFormat(_)
            | SlidecastError::MissingField { .. }
            | SlidecastError::ScriptParse(_) => ErrorKind::InputFormat,
            SlidecastError::ExternalProcess { .. } | SlidecastError::Timeout { .. } => {
                ErrorKind::ExternalProcess
            }
            SlidecastError::Rasterization(_) => ErrorKind::Rasterization,
            SlidecastError::Synthesis { .. } => ErrorKind::Synthesis,
            SlidecastError::Composition(_) => ErrorKind::Composition,
            SlidecastError::Io(_) => ErrorKind::Io,
            SlidecastError::Stage { source, .. } => source.kind(),
            SlidecastError::Deck(_)
            | SlidecastError::Config(_)
            | SlidecastError::Http(_)
            | SlidecastError::Xml(_) => ErrorKind::Other,
        }
    }
}

// Implement conversion from zip errors
impl From<zip::result::ZipError> for SlidecastError {
    fn from(err: zip::result::ZipError) -> Self {
        SlidecastError::Deck(format!("ZIP operation failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, SlidecastError>;

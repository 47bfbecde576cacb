// ABOUTME: Script model for the slidecast application
// ABOUTME: Parses the JSON slide script into typed, validated slide records

use crate::errors::{Result, SlidecastError};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One slide of the script: what is shown and what is said
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub title: String,
    pub bullets: Vec<String>,
    pub narration: String,
}

/// Ordered slide descriptors. Order is the slide order for every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub slides: Vec<Slide>,
}

// Every field is optional on the wire so a missing one can be reported with its slide index.
#[derive(Deserialize)]
struct RawSlide {
    title: Option<String>,
    bullets: Option<Vec<String>>,
    narration: Option<String>,
}

impl Script {
    /// Parse a script from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawSlide> = serde_json::from_str(json)?;

        let slides = raw
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let title = raw.title.ok_or(SlidecastError::MissingField {
                    index,
                    field: "title",
                })?;
                let bullets = raw.bullets.ok_or(SlidecastError::MissingField {
                    index,
                    field: "bullets",
                })?;
                let narration = raw.narration.ok_or(SlidecastError::MissingField {
                    index,
                    field: "narration",
                })?;
                Ok(Slide {
                    title,
                    bullets,
                    narration,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Parsed script with {} slides", slides.len());
        Ok(Self { slides })
    }

    /// Read and parse a script file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SlidecastError::InputNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

// ABOUTME: Narration module for the slidecast application
// ABOUTME: Synthesizes one speech clip per slide through a text-to-speech backend

use crate::errors::{Result, SlidecastError};
use crate::script::Script;
use crate::utils;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Extension of the synthesized audio clips
pub const AUDIO_EXT: &str = "mp3";

/// Longest text the translate endpoint accepts in one request
pub const MAX_CHUNK_CHARS: usize = 100;

const PUNCTUATION: &[char] = &['.', '!', '?', ';', ':', ',', '\n', '。', '！', '？', '、'];

/// Configuration for narration synthesis
#[derive(Debug, Clone)]
pub struct NarrationConfig {
    pub language: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

/// File name of the audio clip for 0-based slide `index`
pub fn audio_file_name(index: usize) -> String {
    format!("slide_{}.{}", index, AUDIO_EXT)
}

/// A text-to-speech backend producing encoded audio bytes
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>>;
}

/// Backend speaking to the Google Translate TTS endpoint
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: Url,
}

impl GoogleTranslateTts {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            SlidecastError::Config(format!("Invalid TTS endpoint {:?}: {}", endpoint, e))
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(
            &config.tts_endpoint,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    fn request_url(&self, chunk: &str, language: &str, index: usize, total: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("ie", "UTF-8")
            .append_pair("client", "tw-ob")
            .append_pair("tl", language)
            .append_pair("total", &total.to_string())
            .append_pair("idx", &index.to_string())
            .append_pair("textlen", &chunk.chars().count().to_string())
            .append_pair("q", chunk);
        url
    }
}

impl SpeechSynthesizer for GoogleTranslateTts {
    fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let mut audio = Vec::new();

        // MP3 streams concatenate frame-wise.
        for (i, chunk) in chunks.iter().enumerate() {
            let url = self.request_url(chunk, language, i, chunks.len());
            debug!("Requesting speech chunk {}/{}", i + 1, chunks.len());
            let response = self
                .client
                .get(url.as_str())
                .header(USER_AGENT, "Mozilla/5.0 (slidecast)")
                .send()?
                .error_for_status()?;
            audio.extend_from_slice(&response.bytes()?);
        }

        Ok(audio)
    }
}

/// Split text into pieces of at most `max_chars` characters.
///
/// Splits prefer punctuation, then whitespace; a single word longer than
/// `max_chars` is cut at the limit.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in normalized.chars() {
        current.push(c);
        if PUNCTUATION.contains(&c) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    let mut chunks = Vec::new();
    let mut chunk = String::new();
    for word in sentences.iter().flat_map(|s| s.split(' ')) {
        if word.is_empty() {
            continue;
        }
        let word_len = word.chars().count();
        let chunk_len = chunk.chars().count();
        if chunk_len > 0 && chunk_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut chunk));
        }
        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        if !chunk.is_empty() {
            chunk.push(' ');
        }
        chunk.push_str(word);
        if PUNCTUATION.contains(&word.chars().last().unwrap_or(' ')) {
            chunks.push(std::mem::take(&mut chunk));
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Synthesize each slide's narration into `audio_dir/slide_<index>.mp3`.
///
/// Returns clip paths aligned with the script's slide order. The first failing
/// slide aborts the run.
pub fn render_narration(
    script: &Script,
    audio_dir: &Path,
    config: &NarrationConfig,
    synthesizer: &dyn SpeechSynthesizer,
) -> Result<Vec<PathBuf>> {
    utils::ensure_directory_exists(audio_dir)?;
    info!(
        "Synthesizing narration for {} slides into {:?}",
        script.len(),
        audio_dir
    );

    let mut audio_paths = Vec::with_capacity(script.len());
    for (index, slide) in script.slides.iter().enumerate() {
        if slide.narration.trim().is_empty() {
            return Err(SlidecastError::Synthesis {
                index,
                message: "narration text is empty".to_string(),
            });
        }

        let audio = synthesizer
            .synthesize(&slide.narration, &config.language)
            .map_err(|e| SlidecastError::Synthesis {
                index,
                message: e.to_string(),
            })?;

        let path = audio_dir.join(audio_file_name(index));
        fs::write(&path, &audio)?;
        info!("Wrote narration for slide {} to {:?}", index, path);
        audio_paths.push(path);
    }

    Ok(audio_paths)
}

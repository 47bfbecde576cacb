// ABOUTME: Configuration module for the slidecast application
// ABOUTME: Provides configuration settings and environment variable handling

use crate::compose::ComposeConfig;
use crate::narration::NarrationConfig;
use crate::rasterize::RasterConfig;
use std::env;

pub const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DPI: u32 = 300;
pub const DEFAULT_FPS: u32 = 1;

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub libreoffice_path: String,
    pub pdfinfo_path: String,
    pub pdftoppm_path: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub tts_endpoint: String,
    pub language: String,
    /// Deadline for every external process, in milliseconds
    pub default_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub dpi: u32,
    pub fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            libreoffice_path: "libreoffice".to_string(),
            pdfinfo_path: "pdfinfo".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            tts_endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            language: "en".to_string(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            dpi: DEFAULT_DPI,
            fps: DEFAULT_FPS,
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

fn env_parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            libreoffice_path: env_or("LIBREOFFICE_PATH", defaults.libreoffice_path),
            pdfinfo_path: env_or("PDFINFO_PATH", defaults.pdfinfo_path),
            pdftoppm_path: env_or("PDFTOPPM_PATH", defaults.pdftoppm_path),
            ffmpeg_path: env_or("FFMPEG_PATH", defaults.ffmpeg_path),
            ffprobe_path: env_or("FFPROBE_PATH", defaults.ffprobe_path),
            tts_endpoint: env_or("TTS_ENDPOINT", defaults.tts_endpoint),
            language: env_or("TTS_LANG", defaults.language),
            default_timeout_ms: env_parse_or("DEFAULT_TIMEOUT_MS", defaults.default_timeout_ms),
            request_timeout_ms: env_parse_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            dpi: env_parse_or("DEFAULT_DPI", defaults.dpi),
            fps: env_parse_or("DEFAULT_FPS", defaults.fps),
        }
    }

    /// Get a rasterization configuration with defaults from this config
    pub fn raster_config(&self, dpi: Option<u32>, keep_pdf: bool) -> RasterConfig {
        RasterConfig {
            dpi: dpi.unwrap_or(self.dpi),
            keep_pdf,
        }
    }

    /// Get a narration configuration with defaults from this config
    pub fn narration_config(&self, language: Option<String>) -> NarrationConfig {
        NarrationConfig {
            language: language.unwrap_or_else(|| self.language.clone()),
        }
    }

    /// Get a composition configuration with defaults from this config
    pub fn compose_config(&self, fps: Option<u32>) -> ComposeConfig {
        ComposeConfig {
            fps: fps.unwrap_or(self.fps),
            ffmpeg_path: self.ffmpeg_path.clone(),
            ffprobe_path: self.ffprobe_path.clone(),
            timeout_ms: self.default_timeout_ms,
        }
    }
}

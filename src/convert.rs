// ABOUTME: Document conversion module for the slidecast application
// ABOUTME: Turns a deck into a fixed-layout PDF through a headless office suite

use crate::errors::{Result, SlidecastError};
use crate::utils;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Extension of the fixed-layout documents produced by converters
pub const FIXED_LAYOUT_EXT: &str = "pdf";

/// Converts an editable document into a fixed-layout document
pub trait DocumentConverter {
    /// Convert `input` into `<out_dir>/<input stem>.pdf` and return that path.
    fn convert_to_fixed_layout(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// Expected converter output location for `input` inside `out_dir`
pub fn expected_output_path(input: &Path, out_dir: &Path) -> Result<PathBuf> {
    let stem = utils::file_stem(input)?;
    Ok(out_dir.join(format!("{}.{}", stem, FIXED_LAYOUT_EXT)))
}

/// Converter backed by `libreoffice --headless --convert-to pdf`
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    pub binary: String,
    pub timeout: Duration,
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self {
            binary: "libreoffice".to_string(),
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
        }
    }
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.libreoffice_path.clone(),
            Duration::from_millis(config.default_timeout_ms),
        )
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn convert_to_fixed_layout(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        let pdf_path = expected_output_path(input, out_dir)?;
        utils::ensure_directory_exists(out_dir)?;

        info!("Converting {:?} to {}", input, FIXED_LAYOUT_EXT);
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg(FIXED_LAYOUT_EXT)
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);

        let output = utils::run_checked(&mut cmd, self.timeout)?;
        debug!(
            "{} output: {}",
            self.binary,
            String::from_utf8_lossy(&output.stdout).trim()
        );

        // A zero exit without the file is still a failed conversion.
        if !pdf_path.exists() {
            return Err(SlidecastError::ExternalProcess {
                program: self.binary.clone(),
                message: format!(
                    "exited successfully but produced no output at {:?}: {}",
                    pdf_path,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        info!("Converted deck to {:?}", pdf_path);
        Ok(pdf_path)
    }
}

// ABOUTME: Rasterization module for the slidecast application
// ABOUTME: Converts a deck to PDF and renders each page to a numbered PNG slide image

use crate::convert::DocumentConverter;
use crate::errors::{Result, SlidecastError};
use crate::utils::{self, ScratchDir};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Extension of the rendered slide images
pub const IMAGE_EXT: &str = "png";

/// Configuration for deck rasterization
#[derive(Debug, Clone)]
pub struct RasterConfig {
    pub dpi: u32,
    /// Keep the intermediate PDF in the output directory instead of a scratch location
    pub keep_pdf: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: crate::config::DEFAULT_DPI,
            keep_pdf: false,
        }
    }
}

/// File name of the 1-based slide image `number`; sorts in slide order.
pub fn slide_image_name(number: usize) -> String {
    format!("slide_{:03}.{}", number, IMAGE_EXT)
}

/// Renders pages of a fixed-layout document to raster images
pub trait PageRasterizer {
    fn page_count(&self, pdf: &Path) -> Result<usize>;

    /// Render 1-based `page` at `dpi` into a PNG at `output`.
    fn render_page(&self, pdf: &Path, page: usize, dpi: u32, output: &Path) -> Result<()>;
}

/// Rasterizer backed by poppler's `pdfinfo` and `pdftoppm`
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    pub pdfinfo: String,
    pub pdftoppm: String,
    pub timeout: Duration,
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self {
            pdfinfo: "pdfinfo".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
        }
    }
}

impl PopplerRasterizer {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            pdfinfo: config.pdfinfo_path.clone(),
            pdftoppm: config.pdftoppm_path.clone(),
            timeout: Duration::from_millis(config.default_timeout_ms),
        }
    }
}

// Poppler failures are rasterization failures; deadline kills stay as they are.
fn as_raster_error(err: SlidecastError) -> SlidecastError {
    match err {
        SlidecastError::ExternalProcess { program, message } => {
            SlidecastError::Rasterization(format!("{}: {}", program, message))
        }
        other => other,
    }
}

/// Extract the page count from `pdfinfo` output
pub fn parse_page_count(pdfinfo_output: &str) -> Option<usize> {
    pdfinfo_output.lines().find_map(|line| {
        let rest = line.strip_prefix("Pages:")?;
        rest.trim().parse().ok()
    })
}

impl PageRasterizer for PopplerRasterizer {
    fn page_count(&self, pdf: &Path) -> Result<usize> {
        let mut cmd = Command::new(&self.pdfinfo);
        cmd.arg(pdf);
        let output = utils::run_checked(&mut cmd, self.timeout).map_err(as_raster_error)?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_page_count(&text).ok_or_else(|| {
            SlidecastError::Rasterization(format!("could not read page count of {:?}", pdf))
        })
    }

    fn render_page(&self, pdf: &Path, page: usize, dpi: u32, output: &Path) -> Result<()> {
        // With -singlefile pdftoppm appends the extension to the given prefix.
        let prefix = output.with_extension("");
        let page = page.to_string();
        let mut cmd = Command::new(&self.pdftoppm);
        cmd.arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix);
        utils::run_checked(&mut cmd, self.timeout).map_err(as_raster_error)?;
        Ok(())
    }
}

/// Render every page of `pdf` into `output_dir` as `slide_NNN.png`.
///
/// Returns the written image paths in page order.
pub fn rasterize_pdf(
    pdf: &Path,
    output_dir: &Path,
    dpi: u32,
    rasterizer: &dyn PageRasterizer,
) -> Result<Vec<PathBuf>> {
    if dpi == 0 {
        return Err(SlidecastError::Rasterization(
            "DPI must be greater than zero".to_string(),
        ));
    }
    if !pdf.is_file() {
        return Err(SlidecastError::Rasterization(format!(
            "cannot open fixed-layout document {:?}",
            pdf
        )));
    }
    utils::ensure_directory_exists(output_dir)?;

    let pages = rasterizer.page_count(pdf)?;
    info!("Rasterizing {} pages at {} DPI", pages, dpi);

    let mut image_paths = Vec::with_capacity(pages);
    for page in 1..=pages {
        let output = output_dir.join(slide_image_name(page));
        rasterizer.render_page(pdf, page, dpi, &output)?;

        // Make sure what landed on disk is a decodable image.
        let (width, height) = image::image_dimensions(&output).map_err(|e| {
            SlidecastError::Rasterization(format!("page {} produced no usable image: {}", page, e))
        })?;
        info!("Rendered page {} ({}x{}) to {:?}", page, width, height, output);
        image_paths.push(output);
    }

    Ok(image_paths)
}

/// Convert a deck to PDF and rasterize each page into `output_dir`.
///
/// Unless `config.keep_pdf` is set, the PDF is produced in a scratch directory
/// that is removed on every exit path.
pub fn rasterize_deck(
    deck: &Path,
    output_dir: &Path,
    config: &RasterConfig,
    converter: &dyn DocumentConverter,
    rasterizer: &dyn PageRasterizer,
) -> Result<Vec<PathBuf>> {
    info!("Rasterizing deck {:?} into {:?}", deck, output_dir);
    utils::validate_file_exists(deck)?;

    let scratch = if config.keep_pdf {
        None
    } else {
        Some(ScratchDir::new("slidecast-pdf-")?)
    };
    let pdf_dir = match &scratch {
        Some(dir) => dir.path().to_path_buf(),
        None => output_dir.to_path_buf(),
    };

    let pdf = converter.convert_to_fixed_layout(deck, &pdf_dir)?;
    let images = rasterize_pdf(&pdf, output_dir, config.dpi, rasterizer)?;

    if images.is_empty() {
        warn!("Deck {:?} produced no pages", deck);
    }
    info!("Rasterized {} slides into {:?}", images.len(), output_dir);
    Ok(images)
}

// ABOUTME: Video composition module for the slidecast application
// ABOUTME: Pairs slide images with narration clips and muxes them into one video with ffmpeg

use crate::errors::{Result, SlidecastError};
use crate::rasterize::IMAGE_EXT;
use crate::utils::{self, ScratchDir};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Configuration for video composition
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub fps: u32,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub timeout_ms: u64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            fps: crate::config::DEFAULT_FPS,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            timeout_ms: crate::config::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ComposeConfig {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One still image shown for the length of its narration clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub image: PathBuf,
    pub audio: PathBuf,
}

/// Result of a successful composition
#[derive(Debug, Clone)]
pub struct CompositionSummary {
    pub output: PathBuf,
    pub segments: usize,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

/// Slide images in `dir`, in file-name order
pub fn find_slide_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SlidecastError::InputNotFound(dir.to_path_buf()));
    }
    utils::sorted_files_with_extension(dir, IMAGE_EXT)
}

/// Pair sorted images from `image_dir` with `audio_paths` by position.
pub fn pair_segments(image_dir: &Path, audio_paths: &[PathBuf]) -> Result<Vec<Segment>> {
    let images = find_slide_images(image_dir)?;
    pair_by_position(images, audio_paths)
}

/// Pair two equally long lists into segments; any count mismatch is an error.
pub fn pair_by_position(images: Vec<PathBuf>, audio_paths: &[PathBuf]) -> Result<Vec<Segment>> {
    if images.len() != audio_paths.len() {
        return Err(SlidecastError::Composition(format!(
            "found {} slide images but {} audio clips",
            images.len(),
            audio_paths.len()
        )));
    }
    if images.is_empty() {
        return Err(SlidecastError::Composition(
            "nothing to compose: no slides".to_string(),
        ));
    }

    Ok(images
        .into_iter()
        .zip(audio_paths.iter().cloned())
        .map(|(image, audio)| Segment { image, audio })
        .collect())
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    format: Option<ProbeFormat>,
}

/// Read the `format.duration` field from ffprobe JSON output
pub fn parse_probe_duration(json: &[u8]) -> Option<f64> {
    let parsed: ProbeOut = serde_json::from_slice(json).ok()?;
    let duration = parsed.format?.duration?.trim().parse::<f64>().ok()?;
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

/// Duration of an audio file in seconds, probed with ffprobe
pub fn probe_duration(audio: &Path, config: &ComposeConfig) -> Result<f64> {
    if !audio.is_file() {
        return Err(SlidecastError::Composition(format!(
            "audio clip not found: {:?}",
            audio
        )));
    }

    let mut cmd = Command::new(&config.ffprobe_path);
    cmd.args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(audio);
    let output = utils::run_with_timeout(&mut cmd, config.timeout())?;
    if !output.status.success() {
        return Err(SlidecastError::Composition(format!(
            "unreadable audio clip {:?}: {}",
            audio,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_duration(&output.stdout).ok_or_else(|| {
        SlidecastError::Composition(format!("audio clip {:?} has no usable duration", audio))
    })
}

fn round_up_even(n: u32) -> u32 {
    n + (n % 2)
}

/// Smallest even-sized canvas that holds every image
pub fn canvas_size(images: &[&Path]) -> Result<(u32, u32)> {
    let mut width = 0;
    let mut height = 0;
    for image in images {
        let (w, h) = image::image_dimensions(image).map_err(|e| {
            SlidecastError::Composition(format!("unreadable slide image {:?}: {}", image, e))
        })?;
        width = width.max(w);
        height = height.max(h);
    }
    Ok((round_up_even(width), round_up_even(height)))
}

/// ffmpeg arguments encoding one segment onto a `canvas`-sized frame
pub fn segment_args(
    segment: &Segment,
    duration_secs: f64,
    canvas: (u32, u32),
    fps: u32,
    output: &Path,
) -> Vec<String> {
    let (w, h) = canvas;
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1",
        w = w,
        h = h
    );
    let fps = fps.to_string();

    vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        fps.clone(),
        "-i".to_string(),
        segment.image.to_string_lossy().into_owned(),
        "-i".to_string(),
        segment.audio.to_string_lossy().into_owned(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-t".to_string(),
        format!("{:.3}", duration_secs),
        "-vf".to_string(),
        filter,
        "-r".to_string(),
        fps,
        "-c:v".to_string(),
        "libx264".to_string(),
        "-tune".to_string(),
        "stillimage".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Contents of an ffmpeg concat-demuxer list for `files`
pub fn concat_list(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|f| format!("file '{}'\n", f.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

/// Encode `segments` in order into one video at `output`.
pub fn compose_video(
    segments: &[Segment],
    output: &Path,
    config: &ComposeConfig,
) -> Result<CompositionSummary> {
    if segments.is_empty() {
        return Err(SlidecastError::Composition(
            "nothing to compose: no segments".to_string(),
        ));
    }
    if config.fps == 0 {
        return Err(SlidecastError::Composition(
            "frame rate must be greater than zero".to_string(),
        ));
    }

    info!("Composing {} segments into {:?}", segments.len(), output);

    let durations = segments
        .iter()
        .map(|s| probe_duration(&s.audio, config))
        .collect::<Result<Vec<f64>>>()?;
    let images: Vec<&Path> = segments.iter().map(|s| s.image.as_path()).collect();
    let canvas = canvas_size(&images)?;
    debug!("Canvas size {}x{}", canvas.0, canvas.1);

    let scratch = ScratchDir::new("slidecast-segments-")?;
    let mut segment_files = Vec::with_capacity(segments.len());
    for (i, (segment, duration)) in segments.iter().zip(&durations).enumerate() {
        let segment_file = scratch.path().join(format!("segment_{:03}.mp4", i + 1));
        info!(
            "Encoding segment {} ({:.2}s): {:?} + {:?}",
            i + 1,
            duration,
            segment.image,
            segment.audio
        );
        let mut cmd = Command::new(&config.ffmpeg_path);
        cmd.args(segment_args(segment, *duration, canvas, config.fps, &segment_file));
        utils::run_checked(&mut cmd, config.timeout())?;
        segment_files.push(segment_file);
    }

    let list = scratch.path().join("segments.txt");
    fs::write(&list, concat_list(&segment_files))?;

    utils::ensure_parent_directory_exists(output)?;
    info!("Concatenating segments into {:?}", output);
    let mut cmd = Command::new(&config.ffmpeg_path);
    cmd.args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list)
        .args(["-c", "copy", "-movflags", "+faststart"])
        .arg(output);
    utils::run_checked(&mut cmd, config.timeout())?;

    let duration_secs: f64 = durations.iter().sum();
    info!(
        "Video written to {:?} ({} segments, {:.2}s)",
        output,
        segments.len(),
        duration_secs
    );
    Ok(CompositionSummary {
        output: output.to_path_buf(),
        segments: segments.len(),
        duration_secs,
        width: canvas.0,
        height: canvas.1,
    })
}

/// Compose the images in `image_dir` with `audio_paths`, pairing by position.
pub fn make_video(
    image_dir: &Path,
    audio_paths: &[PathBuf],
    output: &Path,
    config: &ComposeConfig,
) -> Result<CompositionSummary> {
    let segments = pair_segments(image_dir, audio_paths)?;
    compose_video(&segments, output, config)
}

// Exercises the subprocess-backed converter, rasterizer and composer against small
// shell scripts standing in for libreoffice, poppler and ffmpeg.
#![cfg(unix)]

use slidecast::convert::DocumentConverter;
use slidecast::rasterize::PageRasterizer;
use slidecast::{
    ComposeConfig, ErrorKind, LibreOfficeConverter, PopplerRasterizer, SlidecastError,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write fake tool");
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("Failed to make fake tool executable");
    path.to_string_lossy().into_owned()
}

fn deck_file(dir: &Path) -> PathBuf {
    let deck = dir.join("talk.pptx");
    fs::write(&deck, b"placeholder deck").unwrap();
    deck
}

fn converter(binary: String, timeout_ms: u64) -> LibreOfficeConverter {
    LibreOfficeConverter::new(binary, Duration::from_millis(timeout_ms))
}

#[test]
fn test_converter_writes_expected_pdf() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tool = fake_tool(
        temp_dir.path(),
        "office.sh",
        r#"echo "$@" > "$5/args.txt"
stem=$(basename "$6" .pptx)
touch "$5/$stem.pdf""#,
    );
    let out_dir = temp_dir.path().join("pdf");

    let pdf = converter(tool, 10_000)
        .convert_to_fixed_layout(&deck_file(temp_dir.path()), &out_dir)
        .unwrap();

    assert_eq!(pdf, out_dir.join("talk.pdf"));
    let args = fs::read_to_string(out_dir.join("args.txt")).unwrap();
    assert!(args.starts_with("--headless --convert-to pdf --outdir"));
}

#[test]
fn test_converter_success_without_output_is_an_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tool = fake_tool(temp_dir.path(), "office.sh", "exit 0");

    let err = converter(tool, 10_000)
        .convert_to_fixed_layout(&deck_file(temp_dir.path()), &temp_dir.path().join("pdf"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
    assert!(err.to_string().contains("no output"), "{}", err);
}

#[test]
fn test_converter_nonzero_exit_reports_stderr() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tool = fake_tool(
        temp_dir.path(),
        "office.sh",
        "echo 'source file could not be loaded' >&2\nexit 3",
    );

    let err = converter(tool, 10_000)
        .convert_to_fixed_layout(&deck_file(temp_dir.path()), &temp_dir.path().join("pdf"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
    assert!(err.to_string().contains("could not be loaded"), "{}", err);
}

#[test]
fn test_converter_is_killed_after_deadline() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tool = fake_tool(temp_dir.path(), "office.sh", "exec sleep 30");

    let started = std::time::Instant::now();
    let err = converter(tool, 300)
        .convert_to_fixed_layout(&deck_file(temp_dir.path()), &temp_dir.path().join("pdf"))
        .unwrap_err();

    assert!(matches!(err, SlidecastError::Timeout { timeout_ms: 300, .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_converter_missing_binary() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let err = converter("/nonexistent/libreoffice".to_string(), 1_000)
        .convert_to_fixed_layout(&deck_file(temp_dir.path()), &temp_dir.path().join("pdf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
}

fn poppler(dir: &Path, pdfinfo_body: &str, pdftoppm_body: &str) -> PopplerRasterizer {
    PopplerRasterizer {
        pdfinfo: fake_tool(dir, "pdfinfo.sh", pdfinfo_body),
        pdftoppm: fake_tool(dir, "pdftoppm.sh", pdftoppm_body),
        timeout: Duration::from_secs(10),
    }
}

#[test]
fn test_poppler_rasterizer_renders_each_page() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let fixture = temp_dir.path().join("fixture.png");
    image::RgbImage::from_pixel(16, 9, image::Rgb([255, 255, 255]))
        .save(&fixture)
        .unwrap();
    let pdf = temp_dir.path().join("talk.pdf");
    fs::write(&pdf, b"%PDF-1.4").unwrap();

    let rasterizer = poppler(
        temp_dir.path(),
        "echo 'Producer:       LibreOffice'\necho 'Pages:          2'",
        // $3 is the DPI, ${10} the output prefix
        &format!(
            "test \"$3\" = 150 || exit 9\ncp '{}' \"${{10}}.png\"",
            fixture.display()
        ),
    );
    assert_eq!(rasterizer.page_count(&pdf).unwrap(), 2);

    let out_dir = temp_dir.path().join("slides");
    let images = slidecast::rasterize_pdf(&pdf, &out_dir, 150, &rasterizer).unwrap();
    assert_eq!(
        images,
        vec![out_dir.join("slide_001.png"), out_dir.join("slide_002.png")]
    );
}

#[test]
fn test_poppler_failure_is_a_rasterization_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let pdf = temp_dir.path().join("talk.pdf");
    fs::write(&pdf, b"not a pdf").unwrap();

    let rasterizer = poppler(
        temp_dir.path(),
        "echo 'Syntax Error: Could not find trailer dictionary' >&2\nexit 1",
        "exit 1",
    );
    let err = slidecast::rasterize_pdf(&pdf, &temp_dir.path().join("slides"), 300, &rasterizer)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rasterization);
}

/// Slide images and narration clips for `durations.len()` slides
fn compose_inputs(dir: &Path, durations: &[&str]) -> (PathBuf, Vec<PathBuf>) {
    let slides = dir.join("slides");
    fs::create_dir_all(&slides).unwrap();
    let mut audio = Vec::new();
    for i in 0..durations.len() {
        image::RgbImage::from_pixel(16, 9, image::Rgb([0, 0, 0]))
            .save(slides.join(format!("slide_{:03}.png", i + 1)))
            .unwrap();
        let clip = dir.join(format!("slide_{}.mp3", i));
        fs::write(&clip, b"ID3").unwrap();
        audio.push(clip);
    }
    (slides, audio)
}

/// A fake ffprobe reporting `durations[i]` for `slide_<i>.mp3`
fn ffprobe_body(durations: &[&str]) -> String {
    let cases: String = durations
        .iter()
        .enumerate()
        .map(|(i, d)| format!("  */slide_{}.mp3) d={} ;;\n", i, d))
        .collect();
    // The clip is the last argument.
    format!(
        "for clip; do :; done\ncase \"$clip\" in\n{}  *) exit 1 ;;\nesac\necho \"{{\\\"format\\\": {{\\\"duration\\\": \\\"$d\\\"}}}}\"",
        cases
    )
}

/// A fake ffmpeg appending each invocation to `log` and creating its output
fn ffmpeg_body(log: &Path) -> String {
    format!(
        "echo \"$*\" >> '{}'\nfor out; do :; done\ntouch \"$out\"",
        log.display()
    )
}

#[test]
fn test_compose_encodes_each_segment_in_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let durations = ["1.5", "2.25", "3"];
    let (slides, audio) = compose_inputs(temp_dir.path(), &durations);
    let log = temp_dir.path().join("ffmpeg.log");
    let config = ComposeConfig {
        fps: 1,
        ffmpeg_path: fake_tool(temp_dir.path(), "ffmpeg.sh", &ffmpeg_body(&log)),
        ffprobe_path: fake_tool(temp_dir.path(), "ffprobe.sh", &ffprobe_body(&durations)),
        timeout_ms: 10_000,
    };
    let video = temp_dir.path().join("out").join("talk.mp4");

    let summary = slidecast::make_video(&slides, &audio, &video, &config).unwrap();

    assert_eq!(summary.segments, 3);
    assert!((summary.duration_secs - 6.75).abs() < 1e-9);
    assert_eq!((summary.width, summary.height), (16, 10));
    assert_eq!(summary.output, video);
    assert!(video.exists());

    let calls: Vec<String> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(String::from)
        .collect();
    assert_eq!(calls.len(), 4, "calls: {:#?}", calls);

    let expected_t = ["-t 1.500", "-t 2.250", "-t 3.000"];
    for (i, call) in calls[..3].iter().enumerate() {
        let image = slides.join(format!("slide_{:03}.png", i + 1));
        let inputs = format!("-i {} -i {}", image.display(), audio[i].display());
        assert!(call.contains(&inputs), "call {}: {}", i, call);
        assert!(call.contains(expected_t[i]), "call {}: {}", i, call);
        assert!(call.ends_with(&format!("segment_{:03}.mp4", i + 1)), "call {}: {}", i, call);
    }

    let concat = &calls[3];
    assert!(concat.contains("-f concat"), "{}", concat);
    assert!(concat.ends_with(&video.display().to_string()), "{}", concat);

    // Segment files live in a scratch directory removed after composition.
    let segment = PathBuf::from(calls[0].rsplit(' ').next().unwrap());
    assert!(!segment.parent().unwrap().exists());
}

#[test]
fn test_compose_unreadable_clip_is_a_composition_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (slides, audio) = compose_inputs(temp_dir.path(), &["1", "1"]);
    let log = temp_dir.path().join("ffmpeg.log");
    let config = ComposeConfig {
        fps: 1,
        ffmpeg_path: fake_tool(temp_dir.path(), "ffmpeg.sh", &ffmpeg_body(&log)),
        ffprobe_path: fake_tool(
            temp_dir.path(),
            "ffprobe.sh",
            "echo 'Invalid data found when processing input' >&2\nexit 1",
        ),
        timeout_ms: 10_000,
    };
    let video = temp_dir.path().join("talk.mp4");

    let err = slidecast::make_video(&slides, &audio, &video, &config).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Composition);
    assert!(err.to_string().contains("Invalid data"), "{}", err);
    assert!(!log.exists(), "ffmpeg should not run when a clip is unreadable");
    assert!(!video.exists());
}

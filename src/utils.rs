// ABOUTME: Utility functions for the slidecast application
// ABOUTME: Provides path validation, directory handling and deadline-bound subprocess execution

use crate::errors::{Result, SlidecastError};
use log::{debug, warn};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Validate that an input file exists
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SlidecastError::InputNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(SlidecastError::InputFormat(format!(
            "Path is not a file: {:?}",
            path
        )));
    }
    Ok(())
}

/// Validate that a file carries the expected extension (case-insensitive)
pub fn validate_extension(path: &Path, expected: &str) -> Result<()> {
    let matches = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(expected))
        .unwrap_or(false);
    if !matches {
        return Err(SlidecastError::InputFormat(format!(
            "Input file must be a .{} file: {:?}",
            expected, path
        )));
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(SlidecastError::InputFormat(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent_directory_exists(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory_exists(parent)?;
        }
    }
    Ok(())
}

/// Validate write permissions for a directory
pub fn validate_directory_writable(path: &Path) -> Result<()> {
    ensure_directory_exists(path)?;

    let probe = path.join(format!(".slidecast_write_{}.tmp", uuid::Uuid::new_v4()));
    match std::fs::File::create(&probe) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&probe) {
                warn!("Failed to clean up probe file {:?}: {}", probe, e);
            }
            Ok(())
        }
        Err(e) => Err(SlidecastError::InputFormat(format!(
            "Directory is not writable: {:?} - {}",
            path, e
        ))),
    }
}

/// Self-created scratch directory, removed when dropped.
///
/// Removal failures are logged and never surface as errors.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<tempfile::TempDir>,
}

impl ScratchDir {
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!("Created scratch directory {:?}", dir.path());
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed scratch directory {:?}", path),
                Err(e) => warn!("Failed to remove scratch directory {:?}: {}", path, e),
            }
        }
    }
}

/// File stem of a path as an owned string
pub fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| SlidecastError::InputFormat(format!("Path has no file name: {:?}", path)))
}

/// Collect the files in `dir` whose extension matches `ext`, sorted by file name
pub fn sorted_files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    // Directory names may contain glob metacharacters such as `[`.
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped).join(format!("*.{}", ext));
    let pattern = pattern.to_string_lossy();
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| SlidecastError::InputFormat(format!("Invalid glob pattern: {}", e)))?
        .flatten()
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run a command to completion, killing it once `timeout` elapses.
///
/// Stdout and stderr are captured. A non-zero exit is *not* an error here;
/// callers decide what the status means.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!("Running {:?}", command);

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SlidecastError::ExternalProcess {
            program: program.clone(),
            message: format!("failed to spawn (is it installed and on PATH?): {}", e),
        })?;

    // Drain pipes concurrently so a chatty child cannot block on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            warn!(
                "{} exceeded deadline of {} ms, killing it",
                program,
                timeout.as_millis()
            );
            let _ = child.kill();
            let _ = child.wait();
            return Err(SlidecastError::Timeout {
                program,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Run a command and require a zero exit status
pub fn run_checked(command: &mut Command, timeout: Duration) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = run_with_timeout(command, timeout)?;
    if !output.status.success() {
        return Err(SlidecastError::ExternalProcess {
            program,
            message: format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output)
}

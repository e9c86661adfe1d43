// SPDX-License-Identifier: GPL-3.0-only

//! Storage for encoded composites

use crate::constants::{DEFAULT_SAVE_FOLDER, FILE_NAME_TIME_FORMAT};
use crate::errors::CaptureError;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Destination for encoded composites
///
/// Location policy belongs to the implementation; callers only suggest a
/// file name.
pub trait OutputSink: Send + Sync {
    /// Persist `bytes`, returning where they ended up
    fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, CaptureError>;
}

/// File name for a composite taken at `time`, e.g. `20240102_030405.jpg`
pub fn suggested_file_name(time: DateTime<Local>, extension: &str) -> String {
    format!("{}.{}", time.format(FILE_NAME_TIME_FORMAT), extension)
}

/// `~/Pictures/DualCamera`, falling back to the working directory
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_SAVE_FOLDER)
}

/// Writes composites into one directory, never overwriting
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, CaptureError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CaptureError::PersistFailed(format!(
                "Failed to create {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let name = Path::new(suggested_name);
        let stem = name
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("capture");
        let extension = name.extension().and_then(|s| s.to_str());

        // Two captures within one second share a timestamp
        for attempt in 0u32.. {
            let file_name = match (attempt, extension) {
                (0, _) => suggested_name.to_string(),
                (n, Some(ext)) => format!("{}_{}.{}", stem, n, ext),
                (n, None) => format!("{}_{}", stem, n),
            };
            let path = self.dir.join(file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let written = file.write_all(bytes).and_then(|()| file.sync_all());
                    drop(file);
                    discard_on_error(&path, written)?;
                    info!(path = %path.display(), size = bytes.len(), "Composite saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Name taken, trying next suffix");
                }
                Err(e) => {
                    return Err(CaptureError::PersistFailed(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(CaptureError::PersistFailed("No free file name".to_string()))
    }
}

/// Remove a partially written `path` so it never shows up as a capture
fn discard_on_error(path: &Path, written: std::io::Result<()>) -> Result<(), CaptureError> {
    let Err(e) = written else {
        return Ok(());
    };
    warn!(path = %path.display(), error = %e, "Write failed, removing partial file");
    if let Err(remove_err) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %remove_err, "Failed to remove partial file");
    }
    Err(CaptureError::PersistFailed(format!(
        "Failed to write {}: {}",
        path.display(),
        e
    )))
}

/// Most recently modified JPEG or PNG in `dir`
pub fn latest_capture(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter(|entry| {
            entry.path().extension().is_some_and(|ext| {
                let ext = ext.to_string_lossy();
                ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("png")
            })
        })
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for virtual cameras
//!
//! A virtual camera renders either a synthetic test pattern or a still image
//! loaded from disk. Static sources are rendered once and the same pixel
//! buffer is shared by every frame; only the gradient animates.

use crate::backends::camera::types::{BYTES_PER_PIXEL, BackendError, BackendResult, CameraFrame};
use crate::constants::file_formats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a virtual camera shows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameSource {
    /// Eight vertical SMPTE-style bars
    #[default]
    ColorBars,
    /// Horizontal red / vertical green ramp with a blue channel that cycles
    Gradient,
    /// A single colour
    Solid { rgba: [u8; 4] },
    /// A still image file (PNG, JPEG, ...)
    File { path: PathBuf },
}

const BARS: [[u8; 4]; 8] = [
    [235, 235, 235, 255],
    [235, 235, 16, 255],
    [16, 235, 235, 255],
    [16, 235, 16, 255],
    [235, 16, 235, 255],
    [235, 16, 16, 255],
    [16, 16, 235, 255],
    [16, 16, 16, 255],
];

/// Produces successive frames for one stream
pub struct FrameGenerator {
    width: u32,
    height: u32,
    /// Pre-rendered frame for static sources
    still: Option<CameraFrame>,
}

impl FrameGenerator {
    /// Prepare a generator; image files are loaded here
    ///
    /// Image sources keep the file's own dimensions; `width`/`height` apply
    /// to patterns only.
    pub fn new(source: &FrameSource, width: u32, height: u32) -> BackendResult<Self> {
        let still = match source {
            FrameSource::ColorBars => Some(render_color_bars(width, height)?),
            FrameSource::Solid { rgba } => Some(render_solid(width, height, *rgba)?),
            FrameSource::File { path } => Some(load_image_as_frame(path)?),
            FrameSource::Gradient => None,
        };

        Ok(Self {
            width,
            height,
            still,
        })
    }

    /// Frame number `sequence`
    pub fn frame(&self, sequence: u64) -> BackendResult<CameraFrame> {
        match &self.still {
            Some(still) => Ok(still.clone().with_sequence(sequence)),
            None => render_gradient(self.width, self.height, sequence),
        }
    }
}

/// Load a still image as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::Other(format!(
            "Unsupported image format: {}",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    info!(width, height, "Image loaded successfully");

    CameraFrame::from_rgba(width, height, rgba.into_raw())
}

fn render_solid(width: u32, height: u32, rgba: [u8; 4]) -> BackendResult<CameraFrame> {
    let len = CameraFrame::packed_len(width, height)?;
    let data = rgba.repeat(len / BYTES_PER_PIXEL as usize);
    CameraFrame::from_rgba(width, height, data)
}

fn render_color_bars(width: u32, height: u32) -> BackendResult<CameraFrame> {
    CameraFrame::packed_len(width, height)?;
    let mut row = Vec::with_capacity(width as usize * BYTES_PER_PIXEL as usize);
    for x in 0..width {
        let bar = (x as usize * BARS.len()) / width.max(1) as usize;
        row.extend_from_slice(&BARS[bar.min(BARS.len() - 1)]);
    }
    CameraFrame::from_rgba(width, height, row.repeat(height as usize))
}

fn render_gradient(width: u32, height: u32, sequence: u64) -> BackendResult<CameraFrame> {
    let mut data = Vec::with_capacity(CameraFrame::packed_len(width, height)?);
    let blue = (sequence.wrapping_mul(4) % 256) as u8;
    for y in 0..height {
        let green = (u64::from(y) * 255 / u64::from(height.max(1))) as u8;
        for x in 0..width {
            let red = (u64::from(x) * 255 / u64::from(width.max(1))) as u8;
            data.extend_from_slice(&[red, green, blue, 255]);
        }
    }
    Ok(CameraFrame::from_rgba(width, height, data)?.with_sequence(sequence))
}

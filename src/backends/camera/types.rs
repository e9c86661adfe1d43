// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Bytes per pixel of the RGBA8 format every surface renders in
pub const BYTES_PER_PIXEL: u32 = 4;

/// Opaque platform identifier of one physical camera
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Direction a camera lens points, as reported by device metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    /// Facing the user (selfie camera)
    Front,
    /// Facing away from the user
    Back,
    /// Detachable or USB camera with no fixed direction
    External,
}

impl LensFacing {
    /// Parse a location string ("front", "back", "external")
    pub fn from_location(location: &str) -> Option<Self> {
        match location.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Some(LensFacing::Front),
            "back" | "rear" | "environment" => Some(LensFacing::Back),
            "external" => Some(LensFacing::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Front => write!(f, "front"),
            LensFacing::Back => write!(f, "back"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// Static metadata of a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCharacteristics {
    pub id: DeviceId,
    pub name: String,
    /// None when the platform does not report a facing
    pub facing: Option<LensFacing>,
    /// Native preview resolution
    pub width: u32,
    pub height: u32,
}

/// Request template, mirrors the platform's template kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTemplate {
    /// Continuous low-latency frames for a preview surface
    Preview,
}

/// A capture request targeting one or more surfaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub template: RequestTemplate,
    pub targets: Vec<u64>,
}

impl CaptureRequest {
    /// Preview request with a single target surface
    pub fn preview(surface_id: u64) -> Self {
        Self {
            template: RequestTemplate::Preview,
            targets: vec![surface_id],
        }
    }
}

/// A single RGBA8 frame rendered to a preview surface
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    pub data: Arc<[u8]>,
    /// Monotonic per-stream frame counter
    pub sequence: u64,
    /// When the frame reached the surface
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed RGBA frame, validating the buffer length
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> BackendResult<Self> {
        let stride = width.checked_mul(BYTES_PER_PIXEL).ok_or_else(|| {
            BackendError::InvalidFrame(format!("row of {} pixels overflows stride", width))
        })?;
        Self::with_stride(width, height, stride, data)
    }

    /// Byte length of a packed `width` x `height` RGBA buffer
    pub fn packed_len(width: u32, height: u32) -> BackendResult<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL as usize))
            .ok_or_else(|| {
                BackendError::InvalidFrame(format!("{}x{} frame is too large", width, height))
            })
    }

    /// Build an RGBA frame whose rows are `stride` bytes apart
    pub fn with_stride(width: u32, height: u32, stride: u32, data: Vec<u8>) -> BackendResult<Self> {
        if width == 0 || height == 0 {
            return Err(BackendError::InvalidFrame(format!(
                "empty frame {}x{}",
                width, height
            )));
        }
        let row_len = width as usize * BYTES_PER_PIXEL as usize;
        if (stride as usize) < row_len {
            return Err(BackendError::InvalidFrame(format!(
                "stride {} shorter than row of {} pixels",
                stride, width
            )));
        }
        let needed = (stride as usize)
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_len))
            .ok_or_else(|| {
                BackendError::InvalidFrame(format!("{}x{} frame is too large", width, height))
            })?;
        if data.len() < needed {
            return Err(BackendError::InvalidFrame(format!(
                "{} bytes for {}x{} (stride {}), need {}",
                data.len(),
                width,
                height,
                stride,
                needed
            )));
        }

        Ok(Self {
            width,
            height,
            stride,
            data: Arc::from(data.into_boxed_slice()),
            sequence: 0,
            captured_at: Instant::now(),
        })
    }

    /// Same pixels, new sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Visible pixels of row `y`, without stride padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL as usize]
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let row = self.row(y);
        let i = x as usize * BYTES_PER_PIXEL as usize;
        [row[i], row[i + 1], row[i + 2], row[i + 3]]
    }

    /// Copy into a packed `RgbaImage`
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut packed = Vec::with_capacity(self.height as usize * self.row(0).len());
        for y in 0..self.height {
            packed.extend_from_slice(self.row(y));
        }
        // Length matches width * height * 4 by construction
        RgbaImage::from_raw(self.width, self.height, packed)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Caller lacks camera permission
    PermissionDenied,
    /// Device went away while in use
    Disconnected(String),
    /// Request targets a surface the session was not configured with
    InvalidTarget(u64),
    /// Pixel buffer does not match its declared geometry
    InvalidFrame(String),
    /// Operation on a closed session or device
    Closed,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::PermissionDenied => write!(f, "Camera permission denied"),
            BackendError::Disconnected(msg) => write!(f, "Device disconnected: {}", msg),
            BackendError::InvalidTarget(id) => write!(f, "Surface {} is not a session output", id),
            BackendError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            BackendError::Closed => write!(f, "Session is closed"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

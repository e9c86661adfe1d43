// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the dual camera coordinator

use crate::backends::camera::BackendError;
use crate::backends::permissions::PermissionKind;
use crate::role::Role;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture coordination errors
    Capture(CaptureError),
    /// Camera platform errors
    Backend(BackendError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors surfaced by the capture coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// A required permission is not granted
    PermissionDenied(PermissionKind),
    /// No camera with the role's facing exists
    DeviceUnavailable(Role),
    /// The platform could not open the role's camera
    OpenFailed { role: Role, reason: String },
    /// The capture session for the role could not be configured
    ConfigureFailed { role: Role, reason: String },
    /// The role's camera went away while in use
    DeviceDisconnected(Role),
    /// One or both roles had no renderable frame at capture time
    FrameUnavailable { missing: Vec<Role> },
    /// Frame widths differ and the width policy rejects that
    DimensionMismatch { front_width: u32, back_width: u32 },
    /// The stacked frames do not fit in one image
    CompositeTooLarge { width: u32, height: u64 },
    /// Encoding the composite failed
    EncodingFailed(String),
    /// The output sink could not persist the composite
    PersistFailed(String),
}

impl CaptureError {
    /// Whether a later attempt can succeed without the host intervening
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::FrameUnavailable { .. })
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Backend(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(kind) => write!(f, "{} permission denied", kind),
            CaptureError::DeviceUnavailable(role) => write!(f, "No {} camera available", role),
            CaptureError::OpenFailed { role, reason } => {
                write!(f, "Failed to open {} camera: {}", role, reason)
            }
            CaptureError::ConfigureFailed { role, reason } => {
                write!(f, "Failed to configure {} camera: {}", role, reason)
            }
            CaptureError::DeviceDisconnected(role) => write!(f, "{} camera disconnected", role),
            CaptureError::FrameUnavailable { missing } => {
                let roles: Vec<&str> = missing.iter().map(Role::as_str).collect();
                write!(f, "No frame available from: {}", roles.join(", "))
            }
            CaptureError::DimensionMismatch {
                front_width,
                back_width,
            } => write!(
                f,
                "Frame widths differ (front {}, back {})",
                front_width, back_width
            ),
            CaptureError::CompositeTooLarge { width, height } => {
                write!(f, "Composite of {}x{} is too large", width, height)
            }
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::PersistFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CaptureError {}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::PersistFailed(err.to_string())
    }
}

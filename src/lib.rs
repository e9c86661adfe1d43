// SPDX-License-Identifier: GPL-3.0-only

//! Dual Camera - front and back cameras stacked into one still
//!
//! This library coordinates two independent cameras through their
//! asynchronous open / configure / stream lifecycle and composes one frame
//! from each into a single image when the user presses the shutter.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera platform traits, permissions, virtual cameras
//! - [`session`]: Per-role session state machines and the coordinator
//! - [`pipelines`]: Composite, encode and persist a captured frame pair
//! - [`config`]: User configuration handling
//! - [`storage`]: Output sinks and file naming
//!
//! # Example
//!
//! ```ignore
//! let permissions = Arc::new(StaticPermissions::granted());
//! let service = Arc::new(VirtualCameraService::new(config::default_devices()));
//! let mut coordinator = DualCameraCoordinator::new(service, permissions);
//! coordinator.enumerate_devices()?;
//! coordinator.on_surface_ready(Role::Front, PreviewSurface::new(640, 480));
//! coordinator.on_surface_ready(Role::Back, PreviewSurface::new(640, 480));
//! coordinator.dispatch();
//! let pair = coordinator.on_capture_requested()?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod role;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use backends::camera::{CameraFrame, DeviceId, LensFacing, PreviewSurface};
pub use config::Config;
pub use errors::{AppError, AppResult, CaptureError};
pub use pipelines::photo::{CompositePipeline, WidthPolicy};
pub use role::{Role, RoleTable};
pub use session::{DualCameraCoordinator, FramePair, SessionState};

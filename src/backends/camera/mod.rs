// SPDX-License-Identifier: GPL-3.0-only

//! Camera platform abstraction
//!
//! The coordinator drives cameras through the same three-stage lifecycle the
//! platform camera services expose:
//!
//! ```text
//! CameraService::open_device ──▶ DeviceStateCallback::on_opened(OpenedDevice)
//!                                         │
//! OpenedDevice::create_capture_session ──▶ SessionStateCallback::on_configured(ConfiguredSession)
//!                                         │
//! ConfiguredSession::set_repeating_request ──▶ frames presented to the PreviewSurface
//! ```
//!
//! Every stage completes through a callback. Implementations may invoke the
//! callback before returning or later from another thread; callers must not
//! assume either.

pub mod enumeration;
pub mod frame_loop;
pub mod surface;
pub mod types;

pub use enumeration::enumerate;
pub use surface::PreviewSurface;
pub use types::*;

use std::sync::Arc;

/// Platform camera service
pub trait CameraService: Send + Sync {
    /// Identifiers of all cameras currently known to the platform
    fn list_devices(&self) -> BackendResult<Vec<DeviceId>>;

    /// Static metadata for one camera
    fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics>;

    /// Start opening a camera
    ///
    /// Exactly one of `on_opened` or `on_error` is eventually invoked.
    /// `on_disconnected` may follow a successful open at any time.
    fn open_device(&self, id: &DeviceId, callback: Arc<dyn DeviceStateCallback>);
}

/// A camera that finished opening
pub trait OpenedDevice: Send {
    fn id(&self) -> &DeviceId;

    /// Configure a session streaming into `outputs`
    ///
    /// Completes through `on_configured` or `on_configure_failed`.
    fn create_capture_session(
        &mut self,
        outputs: Vec<PreviewSurface>,
        callback: Arc<dyn SessionStateCallback>,
    );

    /// Release the device; safe to call more than once
    fn close(&mut self);
}

/// A configured capture session
pub trait ConfiguredSession: Send {
    /// Start a request that repeats until stopped
    ///
    /// Replaces any repeating request already running.
    fn set_repeating_request(&mut self, request: CaptureRequest) -> BackendResult<()>;

    /// Stop the repeating request; no-op when none is running
    fn stop_repeating(&mut self);

    /// Stop streaming and release the session; safe to call more than once
    fn close(&mut self);
}

/// Device lifecycle notifications
pub trait DeviceStateCallback: Send + Sync {
    fn on_opened(&self, device: Box<dyn OpenedDevice>);
    fn on_disconnected(&self);
    fn on_error(&self, error: BackendError);
}

/// Session configuration notifications
pub trait SessionStateCallback: Send + Sync {
    fn on_configured(&self, session: Box<dyn ConfiguredSession>);
    fn on_configure_failed(&self, reason: String);
}

// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera platform
//!
//! A [`CameraService`] backed by configured virtual devices instead of real
//! hardware. Each device renders a test pattern or a still image and runs the
//! same open / configure / repeating-request lifecycle a platform camera
//! service does.
//!
//! ```text
//! open_device ──▶ on_opened(VirtualOpenedDevice)
//!                        │ create_capture_session
//!                        ▼
//!               on_configured(VirtualSession)
//!                        │ set_repeating_request
//!                        ▼
//!   first frame presented inline, then a CaptureLoopController thread
//!   presents one frame per interval until stopped
//! ```
//!
//! Callbacks are invoked before the triggering call returns. Faults can be
//! injected per device (`fail_open`, `fail_configure`) and a disconnect can be
//! simulated with [`VirtualCameraService::disconnect`].

mod file_source;

pub use file_source::{FrameGenerator, FrameSource, load_image_as_frame};

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::{
    BackendError, BackendResult, CaptureRequest, DeviceCharacteristics, DeviceId, LensFacing,
};
use crate::backends::camera::{
    CameraService, ConfiguredSession, DeviceStateCallback, OpenedDevice, PreviewSurface,
    SessionStateCallback,
};
use crate::backends::permissions::{PermissionKind, PermissionProvider};
use crate::constants::{timing, virtual_camera as defaults};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One configured virtual device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualDeviceConfig {
    pub id: DeviceId,
    pub name: String,
    pub facing: Option<LensFacing>,
    pub width: u32,
    pub height: u32,
    pub frame_interval_ms: u64,
    pub source: FrameSource,
    /// Every open fails with this message
    pub fail_open: Option<String>,
    /// Every session configuration fails with this message
    pub fail_configure: Option<String>,
}

impl Default for VirtualDeviceConfig {
    fn default() -> Self {
        Self {
            id: DeviceId::from("0"),
            name: "Virtual Camera".to_string(),
            facing: None,
            width: defaults::DEFAULT_WIDTH,
            height: defaults::DEFAULT_HEIGHT,
            frame_interval_ms: timing::DEFAULT_FRAME_INTERVAL_MS,
            source: FrameSource::default(),
            fail_open: None,
            fail_configure: None,
        }
    }
}

impl VirtualDeviceConfig {
    pub fn new(id: impl Into<DeviceId>, facing: Option<LensFacing>) -> Self {
        let id = id.into();
        let name = match facing {
            Some(facing) => format!("Virtual {} Camera", facing),
            None => "Virtual Camera".to_string(),
        };
        Self {
            id,
            name,
            facing,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_source(mut self, source: FrameSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_frame_interval(mut self, interval_ms: u64) -> Self {
        self.frame_interval_ms = interval_ms;
        self
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Bookkeeping for one open device, keyed by device id
struct OpenEntry {
    token: u64,
    callback: Arc<dyn DeviceStateCallback>,
    alive: Arc<AtomicBool>,
}

struct Shared {
    devices: Vec<VirtualDeviceConfig>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    open: Mutex<HashMap<DeviceId, OpenEntry>>,
    next_token: AtomicU64,
}

impl Shared {
    fn device(&self, id: &DeviceId) -> Option<&VirtualDeviceConfig> {
        self.devices.iter().find(|d| &d.id == id)
    }

    fn release(&self, id: &DeviceId, token: u64) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if open.get(id).is_some_and(|entry| entry.token == token) {
            open.remove(id);
        }
    }
}

/// Camera service over virtual devices
#[derive(Clone)]
pub struct VirtualCameraService {
    shared: Arc<Shared>,
}

impl VirtualCameraService {
    pub fn new(devices: Vec<VirtualDeviceConfig>) -> Self {
        Self::build(devices, None)
    }

    /// Service whose opens fail while `permissions` lacks camera access
    pub fn with_permissions(
        devices: Vec<VirtualDeviceConfig>,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Self {
        Self::build(devices, Some(permissions))
    }

    fn build(
        devices: Vec<VirtualDeviceConfig>,
        permissions: Option<Arc<dyn PermissionProvider>>,
    ) -> Self {
        info!(count = devices.len(), "Virtual camera service created");
        Self {
            shared: Arc::new(Shared {
                devices,
                permissions,
                open: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Simulate the device being unplugged
    ///
    /// Frame production stops and the opener's `on_disconnected` fires.
    /// Returns false if the device was not open.
    pub fn disconnect(&self, id: &DeviceId) -> bool {
        let entry = self
            .shared
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match entry {
            Some(entry) => {
                warn!(device = %id, "Virtual device disconnected");
                entry.alive.store(false, Ordering::SeqCst);
                entry.callback.on_disconnected();
                true
            }
            None => false,
        }
    }

    /// Whether `id` is currently held open
    pub fn is_open(&self, id: &DeviceId) -> bool {
        self.shared
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }
}

impl CameraService for VirtualCameraService {
    fn list_devices(&self) -> BackendResult<Vec<DeviceId>> {
        Ok(self.shared.devices.iter().map(|d| d.id.clone()).collect())
    }

    fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics> {
        let device = self
            .shared
            .device(id)
            .ok_or_else(|| BackendError::DeviceNotFound(id.to_string()))?;
        Ok(DeviceCharacteristics {
            id: device.id.clone(),
            name: device.name.clone(),
            facing: device.facing,
            width: device.width,
            height: device.height,
        })
    }

    fn open_device(&self, id: &DeviceId, callback: Arc<dyn DeviceStateCallback>) {
        let Some(config) = self.shared.device(id).cloned() else {
            warn!(device = %id, "Open requested for unknown virtual device");
            callback.on_error(BackendError::DeviceNotFound(id.to_string()));
            return;
        };

        if let Some(permissions) = &self.shared.permissions
            && !permissions.has_permission(PermissionKind::Camera)
        {
            callback.on_error(BackendError::PermissionDenied);
            return;
        }

        if let Some(reason) = &config.fail_open {
            debug!(device = %id, reason = %reason, "Injected open failure");
            callback.on_error(BackendError::Other(reason.clone()));
            return;
        }

        let token = self.shared.next_token.fetch_add(1, Ordering::SeqCst);
        let alive = Arc::new(AtomicBool::new(true));
        self.shared
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.clone(),
                OpenEntry {
                    token,
                    callback: Arc::clone(&callback),
                    alive: Arc::clone(&alive),
                },
            );

        info!(device = %id, name = %config.name, "Virtual device opened");
        callback.on_opened(Box::new(VirtualOpenedDevice {
            config,
            token,
            alive,
            shared: Arc::clone(&self.shared),
            closed: false,
        }));
    }
}

pub struct VirtualOpenedDevice {
    config: VirtualDeviceConfig,
    token: u64,
    alive: Arc<AtomicBool>,
    shared: Arc<Shared>,
    closed: bool,
}

impl OpenedDevice for VirtualOpenedDevice {
    fn id(&self) -> &DeviceId {
        &self.config.id
    }

    fn create_capture_session(
        &mut self,
        outputs: Vec<PreviewSurface>,
        callback: Arc<dyn SessionStateCallback>,
    ) {
        if self.closed || !self.alive.load(Ordering::SeqCst) {
            callback.on_configure_failed("device is closed".to_string());
            return;
        }
        if let Some(reason) = &self.config.fail_configure {
            debug!(device = %self.config.id, reason = %reason, "Injected configure failure");
            callback.on_configure_failed(reason.clone());
            return;
        }
        if outputs.is_empty() {
            callback.on_configure_failed("no output surfaces".to_string());
            return;
        }

        let generator = match FrameGenerator::new(
            &self.config.source,
            self.config.width,
            self.config.height,
        ) {
            Ok(generator) => Arc::new(generator),
            Err(e) => {
                callback.on_configure_failed(e.to_string());
                return;
            }
        };

        debug!(device = %self.config.id, outputs = outputs.len(), "Virtual session configured");
        callback.on_configured(Box::new(VirtualSession {
            device_id: self.config.id.clone(),
            outputs,
            generator,
            interval: self.config.frame_interval(),
            alive: Arc::clone(&self.alive),
            producer: None,
            closed: false,
        }));
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Sessions on this device stop producing with it
        self.alive.store(false, Ordering::SeqCst);
        self.shared.release(&self.config.id, self.token);
        info!(device = %self.config.id, "Virtual device closed");
    }
}

impl Drop for VirtualOpenedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct VirtualSession {
    device_id: DeviceId,
    outputs: Vec<PreviewSurface>,
    generator: Arc<FrameGenerator>,
    interval: Duration,
    alive: Arc<AtomicBool>,
    producer: Option<CaptureLoopController>,
    closed: bool,
}

/// State owned by a repeating request's producer thread
struct StreamState {
    generator: Arc<FrameGenerator>,
    targets: Vec<PreviewSurface>,
    alive: Arc<AtomicBool>,
    sequence: u64,
}

impl StreamState {
    /// Present frame `sequence` to every target; false once all are released
    fn present(&self) -> BackendResult<bool> {
        let frame = self.generator.frame(self.sequence)?;
        let mut delivered = false;
        for target in &self.targets {
            delivered |= target.present(frame.clone());
        }
        Ok(delivered)
    }
}

impl ConfiguredSession for VirtualSession {
    fn set_repeating_request(&mut self, request: CaptureRequest) -> BackendResult<()> {
        if self.closed || !self.alive.load(Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        if request.targets.is_empty() {
            return Err(BackendError::Other("request has no targets".to_string()));
        }

        let mut targets = Vec::with_capacity(request.targets.len());
        for target in &request.targets {
            let surface = self
                .outputs
                .iter()
                .find(|s| s.id() == *target)
                .ok_or(BackendError::InvalidTarget(*target))?;
            targets.push(surface.clone());
        }

        self.stop_repeating();

        let state = StreamState {
            generator: Arc::clone(&self.generator),
            targets,
            alive: Arc::clone(&self.alive),
            sequence: 1,
        };
        state.present()?;

        let name = format!("virtual-camera-{}", self.device_id);
        let device_id = self.device_id.clone();
        self.producer = Some(CaptureLoopController::start(
            &name,
            self.interval,
            move || Ok(state),
            move |state| {
                if !state.alive.load(Ordering::SeqCst) {
                    return LoopAction::Stop;
                }
                state.sequence += 1;
                match state.present() {
                    Ok(true) => {
                        if state.sequence % timing::FRAME_LOG_INTERVAL == 0 {
                            debug!(device = %device_id, sequence = state.sequence, "Frames presented");
                        }
                        LoopAction::Continue
                    }
                    Ok(false) => {
                        debug!(device = %device_id, "All targets released");
                        LoopAction::Stop
                    }
                    Err(e) => {
                        warn!(device = %device_id, error = %e, "Frame generation failed");
                        LoopAction::Stop
                    }
                }
            },
        ));
        Ok(())
    }

    fn stop_repeating(&mut self) {
        if let Some(mut producer) = self.producer.take() {
            producer.stop();
        }
    }

    fn close(&mut self) {
        self.stop_repeating();
        self.closed = true;
    }
}

impl Drop for VirtualSession {
    fn drop(&mut self) {
        self.stop_repeating();
    }
}

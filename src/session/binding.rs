// SPDX-License-Identifier: GPL-3.0-only

//! Device/surface pairing for one role
//!
//! Device ids come from enumeration and surfaces from the host, in either
//! order. The binding hands out the (device, surface) pair exactly once per
//! pairing; a new surface or a different device re-arms it.

use crate::backends::camera::{DeviceId, PreviewSurface};
use tracing::debug;

#[derive(Debug, Default)]
pub struct PreviewBinding {
    device_id: Option<DeviceId>,
    surface: Option<PreviewSurface>,
    open_requested: bool,
}

impl PreviewBinding {
    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device_id.as_ref()
    }

    pub fn surface(&self) -> Option<&PreviewSurface> {
        self.surface.as_ref()
    }

    /// Record the enumerated device; returns true if it changed
    pub fn set_device(&mut self, device_id: Option<DeviceId>) -> bool {
        if self.device_id == device_id {
            return false;
        }
        debug!(old = ?self.device_id, new = ?device_id, "Binding device changed");
        self.device_id = device_id;
        self.open_requested = false;
        true
    }

    /// Record a newly available surface
    pub fn surface_ready(&mut self, surface: PreviewSurface) {
        self.surface = Some(surface);
        self.open_requested = false;
    }

    /// Forget the surface; the caller releases it after teardown
    pub fn surface_destroyed(&mut self) -> Option<PreviewSurface> {
        self.open_requested = false;
        self.surface.take()
    }

    /// Bind an explicit pair and mark it as opened
    pub fn bind(&mut self, device_id: DeviceId, surface: PreviewSurface) {
        self.device_id = Some(device_id);
        self.surface = Some(surface);
        self.open_requested = true;
    }

    /// The pair to open, if complete and not handed out yet
    pub fn take_ready_pair(&mut self) -> Option<(DeviceId, PreviewSurface)> {
        if self.open_requested {
            return None;
        }
        let device_id = self.device_id.clone()?;
        let surface = self.surface.clone()?;
        self.open_requested = true;
        Some((device_id, surface))
    }

    /// Allow the current pair to be handed out again
    pub fn rearm(&mut self) {
        self.open_requested = false;
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Dual camera session coordinator
//!
//! Owns one [`RoleSession`] and one [`PreviewBinding`] per role and routes
//! host notifications (surface lifecycle, permission results, capture
//! trigger) to them.
//!
//! ```text
//!   enumerate ──▶ PreviewBinding ◀── on_surface_ready
//!                      │ ready pair (once)
//!                      ▼
//!                 RoleSession ◀── platform callbacks (queued, dispatch())
//!                      │ Streaming
//!                      ▼
//!               PreviewSurface::latest ──▶ on_capture_requested ──▶ FramePair
//! ```
//!
//! Everything here runs on the host's dispatch thread. Only frame producers
//! run elsewhere, and they touch nothing but a surface's latest-frame slot.

pub mod binding;
pub mod machine;
pub mod state;

pub use binding::PreviewBinding;
pub use machine::RoleSession;
pub use state::{SessionEvent, SessionFailure, SessionState};

use crate::backends::camera::{
    self, BackendResult, CameraFrame, CameraService, DeviceId, PreviewSurface,
};
use crate::backends::permissions::{PermissionKind, PermissionProvider};
use crate::errors::CaptureError;
use crate::role::{Role, RoleTable};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One frame from each role, taken at the same trigger
#[derive(Debug, Clone)]
pub struct FramePair {
    pub front: Arc<CameraFrame>,
    pub back: Arc<CameraFrame>,
}

/// Point-in-time view of a role for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleStatus {
    pub device_id: Option<DeviceId>,
    pub state: SessionState,
    pub frames_presented: u64,
}

#[derive(Debug)]
struct RoleSlot {
    binding: PreviewBinding,
    session: RoleSession,
}

pub struct DualCameraCoordinator {
    service: Arc<dyn CameraService>,
    permissions: Arc<dyn PermissionProvider>,
    roles: RoleTable<RoleSlot>,
    enumerated: bool,
    camera_request_pending: bool,
}

impl DualCameraCoordinator {
    pub fn new(service: Arc<dyn CameraService>, permissions: Arc<dyn PermissionProvider>) -> Self {
        Self {
            service,
            permissions,
            roles: RoleTable::from_fn(|role| RoleSlot {
                binding: PreviewBinding::default(),
                session: RoleSession::new(role),
            }),
            enumerated: false,
            camera_request_pending: false,
        }
    }

    /// Enumerate cameras and open every role whose surface is ready
    ///
    /// Runs at startup and again after every permission grant. A role
    /// whose device changed since the last run is closed before reopening.
    pub fn enumerate_devices(&mut self) -> BackendResult<RoleTable<Option<DeviceId>>> {
        let selected = camera::enumerate(self.service.as_ref())?;
        self.enumerated = true;

        for role in Role::ALL {
            let slot = self.roles.get_mut(role);
            let device_id = selected.get(role).clone();
            if slot.binding.set_device(device_id) && slot.session.state() != &SessionState::Closed
            {
                info!(role = %role, "Camera changed, closing previous session");
                slot.session.close();
            }
            self.drive(role);
        }

        Ok(selected)
    }

    /// Host surface for `role` can now be rendered to
    pub fn on_surface_ready(&mut self, role: Role, surface: PreviewSurface) {
        debug!(role = %role, surface = surface.id(), "Surface ready");
        let slot = self.roles.get_mut(role);
        if slot.session.state() != &SessionState::Closed {
            // Never keep streaming into a surface the host replaced
            slot.session.close();
        }
        slot.binding.surface_ready(surface);
        self.drive(role);
    }

    /// Host is about to invalidate the surface for `role`
    ///
    /// The session is torn down before the surface is released.
    pub fn on_surface_destroyed(&mut self, role: Role) {
        let slot = self.roles.get_mut(role);
        let surface = slot.binding.surface_destroyed();
        slot.session.close();
        if let Some(surface) = surface {
            surface.release();
            debug!(role = %role, surface = surface.id(), "Surface destroyed");
        }
    }

    /// Route a permission prompt's outcome back into the coordinator
    ///
    /// Any grant re-drives enumeration; a camera grant also reopens every
    /// role that was blocked on it. A denial leaves those roles in
    /// `Error(PermissionDenied)`; nothing is re-requested automatically.
    pub fn on_permission_result(
        &mut self,
        kind: PermissionKind,
        granted: bool,
    ) -> BackendResult<()> {
        info!(permission = %kind, granted, "Permission result");
        match kind {
            PermissionKind::Camera => {
                self.camera_request_pending = false;
                if !granted {
                    warn!("Camera permission denied, sessions stay blocked");
                    return Ok(());
                }
                for role in Role::ALL {
                    let slot = self.roles.get_mut(role);
                    if slot.session.state().failure() == Some(&SessionFailure::PermissionDenied) {
                        slot.session.close();
                        slot.binding.rearm();
                    }
                }
                self.enumerate_devices().map(|_| ())
            }
            PermissionKind::Storage => {
                if !granted {
                    warn!("Storage permission denied, captures cannot be saved");
                    return Ok(());
                }
                self.enumerate_devices().map(|_| ())
            }
        }
    }

    /// Open `device_id` for `role`, streaming into `surface`
    pub fn open(&mut self, role: Role, device_id: DeviceId, surface: PreviewSurface) {
        self.roles
            .get_mut(role)
            .binding
            .bind(device_id.clone(), surface.clone());
        self.open_bound(role, device_id, surface);
    }

    /// Close the role's session; no-op when already closed
    pub fn close(&mut self, role: Role) -> bool {
        self.roles.get_mut(role).session.close()
    }

    /// Close both sessions
    pub fn shutdown(&mut self) {
        for role in Role::ALL {
            self.close(role);
        }
    }

    pub fn is_streaming(&self, role: Role) -> bool {
        self.roles.get(role).session.is_streaming()
    }

    pub fn state(&self, role: Role) -> &SessionState {
        self.roles.get(role).session.state()
    }

    /// Apply queued platform callbacks for both roles
    pub fn dispatch(&mut self) -> usize {
        self.roles.front.session.dispatch() + self.roles.back.session.dispatch()
    }

    /// Most recent frame rendered for `role`
    ///
    /// Never waits: `None` unless the role is streaming and its surface has
    /// presented at least one frame.
    pub fn latest_frame(&self, role: Role) -> Option<Arc<CameraFrame>> {
        let session = &self.roles.get(role).session;
        if !session.is_streaming() {
            return None;
        }
        session.surface()?.latest()
    }

    /// User pressed the shutter
    ///
    /// Takes whatever each surface currently shows. The two frames are not
    /// timestamp-aligned.
    pub fn on_capture_requested(&self) -> Result<FramePair, CaptureError> {
        if !self.permissions.has_permission(PermissionKind::Storage) {
            warn!("Capture needs storage permission");
            self.permissions.request_permission(PermissionKind::Storage);
            return Err(CaptureError::PermissionDenied(PermissionKind::Storage));
        }

        let front = self.latest_frame(Role::Front);
        let back = self.latest_frame(Role::Back);
        match (front, back) {
            (Some(front), Some(back)) => {
                debug!(
                    front_seq = front.sequence,
                    back_seq = back.sequence,
                    "Captured frame pair"
                );
                Ok(FramePair { front, back })
            }
            (front, back) => {
                let missing: Vec<Role> = [(Role::Front, front.is_none()), (Role::Back, back.is_none())]
                    .into_iter()
                    .filter_map(|(role, missing)| missing.then_some(role))
                    .collect();
                warn!(?missing, "Capture aborted, frame unavailable");
                Err(CaptureError::FrameUnavailable { missing })
            }
        }
    }

    /// Why `role` is not streaming, if it is stuck
    pub fn role_error(&self, role: Role) -> Option<CaptureError> {
        let slot = self.roles.get(role);
        if let Some(failure) = slot.session.state().failure() {
            return Some(failure.clone().into_capture_error(role));
        }
        if self.enumerated && slot.binding.device_id().is_none() {
            return Some(CaptureError::DeviceUnavailable(role));
        }
        None
    }

    pub fn status(&self) -> RoleTable<RoleStatus> {
        self.roles.map(|_, slot| RoleStatus {
            device_id: slot.binding.device_id().cloned(),
            state: slot.session.state().clone(),
            frames_presented: slot
                .binding
                .surface()
                .map(PreviewSurface::frames_presented)
                .unwrap_or(0),
        })
    }

    fn drive(&mut self, role: Role) {
        let Some((device_id, surface)) = self.roles.get_mut(role).binding.take_ready_pair() else {
            return;
        };
        self.open_bound(role, device_id, surface);
    }

    fn open_bound(&mut self, role: Role, device_id: DeviceId, surface: PreviewSurface) {
        let session = &mut self.roles.get_mut(role).session;
        if self.permissions.has_permission(PermissionKind::Camera) {
            session.open(self.service.as_ref(), device_id, surface);
            return;
        }

        info!(role = %role, "Camera permission missing, open deferred");
        session.block_on_permission(device_id, surface);
        if !self.camera_request_pending {
            self.camera_request_pending = true;
            self.permissions.request_permission(PermissionKind::Camera);
        }
    }
}

impl Drop for DualCameraCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DualCameraCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualCameraCoordinator")
            .field("front", &self.roles.front)
            .field("back", &self.roles.back)
            .field("enumerated", &self.enumerated)
            .finish()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Runtime permission boundary
//!
//! Prompting the user is the host's job. The coordinator only asks whether a
//! permission is held and, if not, asks the host to request it. The answer
//! comes back through `DualCameraCoordinator::on_permission_result`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

/// Capabilities the coordinator depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    /// Open camera devices
    Camera,
    /// Write the composite to shared storage
    Storage,
}

impl std::fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionKind::Camera => write!(f, "camera"),
            PermissionKind::Storage => write!(f, "storage"),
        }
    }
}

/// Host permission collaborator
pub trait PermissionProvider: Send + Sync {
    fn has_permission(&self, kind: PermissionKind) -> bool;

    /// Ask the host to prompt; must not block
    fn request_permission(&self, kind: PermissionKind);
}

/// Permission state held in memory
///
/// Used by the CLI host (where there is nothing to prompt) and by tests that
/// flip grants at runtime.
#[derive(Debug)]
pub struct StaticPermissions {
    camera: AtomicBool,
    storage: AtomicBool,
    camera_requests: AtomicUsize,
    storage_requests: AtomicUsize,
}

impl StaticPermissions {
    pub fn new(camera: bool, storage: bool) -> Self {
        Self {
            camera: AtomicBool::new(camera),
            storage: AtomicBool::new(storage),
            camera_requests: AtomicUsize::new(0),
            storage_requests: AtomicUsize::new(0),
        }
    }

    /// Everything granted
    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn set(&self, kind: PermissionKind, granted: bool) {
        self.flag(kind).store(granted, Ordering::SeqCst);
    }

    /// How many times `request_permission` was called for `kind`
    pub fn request_count(&self, kind: PermissionKind) -> usize {
        match kind {
            PermissionKind::Camera => self.camera_requests.load(Ordering::SeqCst),
            PermissionKind::Storage => self.storage_requests.load(Ordering::SeqCst),
        }
    }

    fn flag(&self, kind: PermissionKind) -> &AtomicBool {
        match kind {
            PermissionKind::Camera => &self.camera,
            PermissionKind::Storage => &self.storage,
        }
    }
}

impl Default for StaticPermissions {
    fn default() -> Self {
        Self::granted()
    }
}

impl PermissionProvider for StaticPermissions {
    fn has_permission(&self, kind: PermissionKind) -> bool {
        self.flag(kind).load(Ordering::SeqCst)
    }

    fn request_permission(&self, kind: PermissionKind) {
        info!(permission = %kind, "Permission requested");
        match kind {
            PermissionKind::Camera => self.camera_requests.fetch_add(1, Ordering::SeqCst),
            PermissionKind::Storage => self.storage_requests.fetch_add(1, Ordering::SeqCst),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_permissions_track_requests() {
        let permissions = StaticPermissions::new(false, true);
        assert!(!permissions.has_permission(PermissionKind::Camera));
        assert!(permissions.has_permission(PermissionKind::Storage));

        permissions.request_permission(PermissionKind::Camera);
        permissions.request_permission(PermissionKind::Camera);
        assert_eq!(permissions.request_count(PermissionKind::Camera), 2);
        assert_eq!(permissions.request_count(PermissionKind::Storage), 0);

        permissions.set(PermissionKind::Camera, true);
        assert!(permissions.has_permission(PermissionKind::Camera));
    }
}

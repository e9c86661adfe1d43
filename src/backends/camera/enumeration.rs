// SPDX-License-Identifier: GPL-3.0-only

//! Camera enumeration and role assignment
//!
//! Walks every device the platform reports, reads its facing, and assigns one
//! device to each role. The first device seen for a facing keeps the role;
//! later duplicates are logged and ignored.

use super::CameraService;
use super::types::{BackendResult, DeviceId};
use crate::role::{Role, RoleTable};
use tracing::{debug, info, warn};

/// Select one front and one back camera
///
/// Fails only when the device list itself cannot be read. Devices whose
/// characteristics fail to load are skipped. A role with no matching device
/// stays `None`.
pub fn enumerate(service: &dyn CameraService) -> BackendResult<RoleTable<Option<DeviceId>>> {
    let devices = service.list_devices()?;
    debug!(count = devices.len(), "Enumerating cameras");

    let mut selected: RoleTable<Option<DeviceId>> = RoleTable::default();

    for id in devices {
        let characteristics = match service.characteristics(&id) {
            Ok(c) => c,
            Err(e) => {
                warn!(device = %id, error = %e, "Skipping camera with unreadable metadata");
                continue;
            }
        };

        let Some(facing) = characteristics.facing else {
            debug!(device = %id, "Camera reports no facing");
            continue;
        };
        let Some(role) = Role::from_facing(facing) else {
            debug!(device = %id, facing = %facing, "Camera has no role");
            continue;
        };

        if let Some(existing) = selected.get(role) {
            debug!(
                role = %role,
                kept = %existing,
                ignored = %id,
                "Duplicate camera for role"
            );
        } else {
            info!(role = %role, device = %id, name = %characteristics.name, "Camera assigned");
            *selected.get_mut(role) = Some(id);
        }
    }

    for (role, id) in selected.iter() {
        if id.is_none() {
            info!(role = %role, "No camera for role");
        }
    }

    Ok(selected)
}

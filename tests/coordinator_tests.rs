// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the dual camera coordinator on the virtual platform

use dual_camera::backends::camera::{
    BackendResult, CameraService, DeviceCharacteristics, DeviceStateCallback, LensFacing,
};
use dual_camera::backends::permissions::{PermissionKind, StaticPermissions};
use dual_camera::backends::virtual_camera::{FrameSource, VirtualCameraService, VirtualDeviceConfig};
use dual_camera::errors::CaptureError;
use dual_camera::session::SessionFailure;
use dual_camera::{DeviceId, DualCameraCoordinator, PreviewSurface, Role, RoleTable, SessionState};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn solid(id: &str, facing: LensFacing, width: u32, height: u32, rgba: [u8; 4]) -> VirtualDeviceConfig {
    VirtualDeviceConfig::new(id, Some(facing))
        .with_size(width, height)
        .with_source(FrameSource::Solid { rgba })
        // Only the frame presented inline matters here
        .with_frame_interval(1_000)
}

fn both_devices() -> Vec<VirtualDeviceConfig> {
    vec![
        solid("0", LensFacing::Back, 100, 150, BLUE),
        solid("1", LensFacing::Front, 100, 200, RED),
    ]
}

struct Rig {
    service: Arc<VirtualCameraService>,
    permissions: Arc<StaticPermissions>,
    coordinator: DualCameraCoordinator,
    surfaces: RoleTable<PreviewSurface>,
}

impl Rig {
    fn new(devices: Vec<VirtualDeviceConfig>, permissions: StaticPermissions) -> Self {
        let permissions = Arc::new(permissions);
        let service = Arc::new(VirtualCameraService::with_permissions(
            devices,
            permissions.clone(),
        ));
        let coordinator = DualCameraCoordinator::new(service.clone(), permissions.clone());
        Self {
            service,
            permissions,
            coordinator,
            surfaces: RoleTable::from_fn(|_| PreviewSurface::new(100, 200)),
        }
    }

    /// Enumerate, hand out both surfaces, apply callbacks
    fn start(&mut self) {
        self.coordinator.enumerate_devices().unwrap();
        for role in Role::ALL {
            self.coordinator
                .on_surface_ready(role, self.surfaces.get(role).clone());
        }
        self.coordinator.dispatch();
    }
}

#[test]
fn test_enumeration_picks_one_device_per_facing() {
    let mut rig = Rig::new(
        vec![
            solid("0", LensFacing::Back, 8, 8, BLUE),
            solid("1", LensFacing::Front, 8, 8, RED),
            solid("2", LensFacing::Back, 8, 8, BLUE),
            solid("3", LensFacing::External, 8, 8, BLUE),
            solid("4", LensFacing::Front, 8, 8, RED),
        ],
        StaticPermissions::granted(),
    );

    let selected = rig.coordinator.enumerate_devices().unwrap();
    assert_eq!(selected.front, Some(DeviceId::from("1")));
    assert_eq!(selected.back, Some(DeviceId::from("0")));
}

#[test]
fn test_both_roles_stream_into_their_own_surface() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();

    assert!(rig.coordinator.is_streaming(Role::Front));
    assert!(rig.coordinator.is_streaming(Role::Back));

    let front = rig.surfaces.front.latest().unwrap();
    let back = rig.surfaces.back.latest().unwrap();
    assert_eq!((front.width, front.height), (100, 200));
    assert_eq!(front.pixel(0, 0), RED);
    assert_eq!((back.width, back.height), (100, 150));
    assert_eq!(back.pixel(0, 0), BLUE);
}

#[test]
fn test_surface_before_enumeration() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    for role in Role::ALL {
        rig.coordinator
            .on_surface_ready(role, rig.surfaces.get(role).clone());
    }
    assert_eq!(rig.coordinator.state(Role::Front), &SessionState::Closed);

    rig.coordinator.enumerate_devices().unwrap();
    rig.coordinator.dispatch();
    assert!(rig.coordinator.is_streaming(Role::Front));
    assert!(rig.coordinator.is_streaming(Role::Back));
}

#[test]
fn test_streaming_needs_open_and_configure() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.coordinator.enumerate_devices().unwrap();
    rig.coordinator
        .on_surface_ready(Role::Front, rig.surfaces.front.clone());

    // Callbacks are queued, nothing applied yet
    assert_eq!(rig.coordinator.state(Role::Front), &SessionState::Opening);
    assert!(rig.coordinator.latest_frame(Role::Front).is_none());

    rig.coordinator.dispatch();
    assert!(rig.coordinator.is_streaming(Role::Front));
    assert!(!rig.coordinator.is_streaming(Role::Back));
    assert!(rig.coordinator.latest_frame(Role::Back).is_none());
}

#[test]
fn test_capture_composes_front_over_back() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();

    let pair = rig.coordinator.on_capture_requested().unwrap();
    let composite = dual_camera::pipelines::photo::Compositor::default()
        .compose(&pair.front, &pair.back)
        .unwrap();

    assert_eq!((composite.width(), composite.height()), (100, 350));
    for y in [0, 100, 199] {
        assert_eq!(composite.image.get_pixel(50, y).0, RED);
    }
    for y in [200, 300, 349] {
        assert_eq!(composite.image.get_pixel(50, y).0, BLUE);
    }
}

#[test]
fn test_close_is_idempotent() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    assert!(!rig.coordinator.close(Role::Front));

    rig.start();
    assert!(rig.coordinator.close(Role::Front));
    assert_eq!(rig.coordinator.state(Role::Front), &SessionState::Closed);
    assert!(!rig.service.is_open(&DeviceId::from("1")));
    assert!(rig.coordinator.latest_frame(Role::Front).is_none());

    assert!(!rig.coordinator.close(Role::Front));
    assert!(rig.coordinator.is_streaming(Role::Back));
}

#[test]
fn test_missing_front_camera_aborts_capture() {
    let mut rig = Rig::new(
        vec![solid("0", LensFacing::Back, 100, 150, BLUE)],
        StaticPermissions::granted(),
    );
    rig.start();

    assert!(rig.coordinator.is_streaming(Role::Back));
    assert_eq!(rig.coordinator.state(Role::Front), &SessionState::Closed);
    assert_eq!(
        rig.coordinator.role_error(Role::Front),
        Some(CaptureError::DeviceUnavailable(Role::Front))
    );

    let err = rig.coordinator.on_capture_requested().unwrap_err();
    assert_eq!(
        err,
        CaptureError::FrameUnavailable {
            missing: vec![Role::Front]
        }
    );
    assert!(err.is_transient());
}

#[test]
fn test_permission_denied_then_granted() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::new(false, true));
    rig.start();

    for role in Role::ALL {
        assert_eq!(
            rig.coordinator.state(role),
            &SessionState::Error(SessionFailure::PermissionDenied)
        );
        assert_eq!(
            rig.coordinator.role_error(role),
            Some(CaptureError::PermissionDenied(PermissionKind::Camera))
        );
    }
    // One prompt for both roles
    assert_eq!(rig.permissions.request_count(PermissionKind::Camera), 1);
    assert!(!rig.service.is_open(&DeviceId::from("0")));

    // Denial keeps them blocked and does not prompt again
    rig.coordinator
        .on_permission_result(PermissionKind::Camera, false)
        .unwrap();
    rig.coordinator.dispatch();
    assert!(!rig.coordinator.is_streaming(Role::Front));
    assert_eq!(rig.permissions.request_count(PermissionKind::Camera), 1);

    rig.permissions.set(PermissionKind::Camera, true);
    rig.coordinator
        .on_permission_result(PermissionKind::Camera, true)
        .unwrap();
    rig.coordinator.dispatch();

    assert!(rig.coordinator.is_streaming(Role::Front));
    assert!(rig.coordinator.is_streaming(Role::Back));
    assert!(rig.coordinator.on_capture_requested().is_ok());
}

#[test]
fn test_storage_permission_requested_once_per_trigger() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::new(true, false));
    rig.start();

    assert_eq!(
        rig.coordinator.on_capture_requested().unwrap_err(),
        CaptureError::PermissionDenied(PermissionKind::Storage)
    );
    assert_eq!(rig.permissions.request_count(PermissionKind::Storage), 1);

    rig.permissions.set(PermissionKind::Storage, true);
    rig.coordinator
        .on_permission_result(PermissionKind::Storage, true)
        .unwrap();
    assert!(rig.coordinator.on_capture_requested().is_ok());
    assert_eq!(rig.permissions.request_count(PermissionKind::Storage), 1);
}

/// Counts enumeration passes over a virtual platform
struct CountingService {
    inner: VirtualCameraService,
    listed: AtomicUsize,
}

impl CameraService for CountingService {
    fn list_devices(&self) -> BackendResult<Vec<DeviceId>> {
        self.listed.fetch_add(1, Ordering::SeqCst);
        self.inner.list_devices()
    }

    fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics> {
        self.inner.characteristics(id)
    }

    fn open_device(&self, id: &DeviceId, callback: Arc<dyn DeviceStateCallback>) {
        self.inner.open_device(id, callback)
    }
}

#[test]
fn test_storage_grant_reruns_enumeration() {
    let permissions = Arc::new(StaticPermissions::new(true, false));
    let service = Arc::new(CountingService {
        inner: VirtualCameraService::with_permissions(both_devices(), permissions.clone()),
        listed: AtomicUsize::new(0),
    });
    let mut coordinator = DualCameraCoordinator::new(service.clone(), permissions.clone());
    coordinator.enumerate_devices().unwrap();
    for role in Role::ALL {
        coordinator.on_surface_ready(role, PreviewSurface::new(100, 200));
    }
    coordinator.dispatch();
    assert_eq!(service.listed.load(Ordering::SeqCst), 1);

    // Denial changes nothing
    coordinator
        .on_permission_result(PermissionKind::Storage, false)
        .unwrap();
    assert_eq!(service.listed.load(Ordering::SeqCst), 1);

    permissions.set(PermissionKind::Storage, true);
    coordinator
        .on_permission_result(PermissionKind::Storage, true)
        .unwrap();
    coordinator.dispatch();
    assert_eq!(service.listed.load(Ordering::SeqCst), 2);

    // Streaming sessions on unchanged devices are left alone
    assert!(coordinator.is_streaming(Role::Front));
    assert!(coordinator.is_streaming(Role::Back));
    assert!(coordinator.on_capture_requested().is_ok());
}

#[test]
fn test_open_failure_is_isolated() {
    let mut devices = both_devices();
    devices[1].fail_open = Some("sensor fault".to_string());
    let mut rig = Rig::new(devices, StaticPermissions::granted());
    rig.start();

    assert!(matches!(
        rig.coordinator.state(Role::Front),
        SessionState::Error(SessionFailure::OpenFailed(_))
    ));
    assert!(matches!(
        rig.coordinator.role_error(Role::Front),
        Some(CaptureError::OpenFailed {
            role: Role::Front,
            ..
        })
    ));
    assert!(rig.coordinator.is_streaming(Role::Back));
}

#[test]
fn test_configure_failure_releases_device() {
    let mut devices = both_devices();
    devices[0].fail_configure = Some("unsupported size".to_string());
    let mut rig = Rig::new(devices, StaticPermissions::granted());
    rig.start();

    assert_eq!(
        rig.coordinator.state(Role::Back),
        &SessionState::Error(SessionFailure::ConfigureFailed("unsupported size".to_string()))
    );
    assert!(!rig.service.is_open(&DeviceId::from("0")));
    assert!(rig.coordinator.is_streaming(Role::Front));

    // No automatic retry
    rig.coordinator.dispatch();
    assert!(matches!(
        rig.coordinator.state(Role::Back),
        SessionState::Error(_)
    ));
}

#[test]
fn test_disconnect_while_streaming() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();

    assert!(rig.service.disconnect(&DeviceId::from("0")));
    rig.coordinator.dispatch();

    assert_eq!(
        rig.coordinator.state(Role::Back),
        &SessionState::Error(SessionFailure::Disconnected)
    );
    assert_eq!(
        rig.coordinator.role_error(Role::Back),
        Some(CaptureError::DeviceDisconnected(Role::Back))
    );
    assert!(rig.coordinator.is_streaming(Role::Front));
}

#[test]
fn test_surface_destroyed_tears_down_then_releases() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();

    rig.coordinator.on_surface_destroyed(Role::Front);
    assert_eq!(rig.coordinator.state(Role::Front), &SessionState::Closed);
    assert!(rig.surfaces.front.is_released());
    assert!(!rig.service.is_open(&DeviceId::from("1")));

    // A new surface brings the role back
    let replacement = PreviewSurface::new(100, 200);
    rig.coordinator
        .on_surface_ready(Role::Front, replacement.clone());
    rig.coordinator.dispatch();
    assert!(rig.coordinator.is_streaming(Role::Front));
    assert_eq!(replacement.latest().unwrap().pixel(0, 0), RED);
}

#[test]
fn test_replaced_surface_restarts_session() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();

    let replacement = PreviewSurface::new(100, 200);
    rig.coordinator
        .on_surface_ready(Role::Back, replacement.clone());
    assert_eq!(rig.coordinator.state(Role::Back), &SessionState::Opening);

    rig.coordinator.dispatch();
    assert!(rig.coordinator.is_streaming(Role::Back));
    assert!(replacement.latest().is_some());
    assert_eq!(
        rig.coordinator.status().back.frames_presented,
        replacement.frames_presented()
    );
}

#[test]
fn test_explicit_open_after_close() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();
    rig.coordinator.close(Role::Back);

    let surface = PreviewSurface::new(100, 150);
    rig.coordinator
        .open(Role::Back, DeviceId::from("0"), surface.clone());
    rig.coordinator.dispatch();

    assert!(rig.coordinator.is_streaming(Role::Back));
    assert_eq!(surface.latest().unwrap().pixel(0, 0), BLUE);
}

#[test]
fn test_shutdown_closes_everything() {
    let mut rig = Rig::new(both_devices(), StaticPermissions::granted());
    rig.start();

    rig.coordinator.shutdown();
    for role in Role::ALL {
        assert_eq!(rig.coordinator.state(role), &SessionState::Closed);
    }
    assert!(!rig.service.is_open(&DeviceId::from("0")));
    assert!(!rig.service.is_open(&DeviceId::from("1")));
}

// SPDX-License-Identifier: GPL-3.0-only

//! Per-role capture session state machine
//!
//! One `RoleSession` exists per role. It owns its device, its configured
//! session and its event queue; the two instances never share state.
//! Platform callbacks only enqueue events, and `dispatch` applies them on the
//! caller's thread, so transitions never run re-entrantly inside a platform
//! call.

use super::state::{EventRoute, RoutedEvent, SessionEvent, SessionFailure, SessionState};
use crate::backends::camera::{
    CameraService, CaptureRequest, ConfiguredSession, DeviceId, OpenedDevice, PreviewSurface,
};
use crate::role::Role;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RoleSession {
    role: Role,
    state: SessionState,
    device_id: Option<DeviceId>,
    surface: Option<PreviewSurface>,
    device: Option<Box<dyn OpenedDevice>>,
    session: Option<Box<dyn ConfiguredSession>>,
    /// Bumped on every new attempt and every teardown
    generation: u64,
    tx: UnboundedSender<RoutedEvent>,
    rx: UnboundedReceiver<RoutedEvent>,
}

impl RoleSession {
    pub fn new(role: Role) -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self {
            role,
            state: SessionState::Closed,
            device_id: None,
            surface: None,
            device: None,
            session: None,
            generation: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device_id.as_ref()
    }

    pub fn surface(&self) -> Option<&PreviewSurface> {
        self.surface.as_ref()
    }

    /// Start opening `device_id` to stream into `surface`
    ///
    /// Any previous session for this role is closed first.
    pub fn open(&mut self, service: &dyn CameraService, device_id: DeviceId, surface: PreviewSurface) {
        self.close();

        self.generation += 1;
        self.state = SessionState::Opening;
        self.device_id = Some(device_id.clone());
        self.surface = Some(surface);

        info!(role = %self.role, device = %device_id, "Opening camera");
        service.open_device(&device_id, Arc::new(self.route()));
    }

    /// Record a pair that cannot be opened for lack of camera permission
    pub fn block_on_permission(&mut self, device_id: DeviceId, surface: PreviewSurface) {
        self.close();
        self.device_id = Some(device_id);
        self.surface = Some(surface);
        self.enter_error(SessionFailure::PermissionDenied);
    }

    /// Stop streaming and release the device
    ///
    /// Returns false when the session was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed && self.device.is_none() && self.session.is_none() {
            return false;
        }

        self.teardown();
        self.generation += 1;
        self.state = SessionState::Closed;
        self.device_id = None;
        self.surface = None;
        info!(role = %self.role, "Session closed");
        true
    }

    /// Apply all queued platform events; returns how many were handled
    pub fn dispatch(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(routed) = self.rx.try_recv() {
            self.handle(routed);
            handled += 1;
        }
        handled
    }

    fn handle(&mut self, routed: RoutedEvent) {
        let RoutedEvent { generation, event } = routed;
        if generation != self.generation {
            debug!(role = %self.role, ?event, "Discarding event from superseded attempt");
            event.discard();
            return;
        }

        debug!(role = %self.role, state = %self.state, ?event, "Session event");
        match (self.state.clone(), event) {
            (SessionState::Opening, SessionEvent::Opened(device)) => self.on_opened(device),
            (SessionState::Opening, SessionEvent::OpenFailed(err)) => {
                self.enter_error(SessionFailure::from(err))
            }
            (SessionState::Configuring, SessionEvent::Configured(session)) => {
                self.on_configured(session)
            }
            (SessionState::Configuring, SessionEvent::ConfigureFailed(reason)) => {
                self.enter_error(SessionFailure::ConfigureFailed(reason))
            }
            (state, SessionEvent::Disconnected) if state.is_active() => {
                self.enter_error(SessionFailure::Disconnected)
            }
            (state, SessionEvent::OpenFailed(err)) if state.is_active() => {
                // Device error after a successful open
                self.enter_error(SessionFailure::from(err))
            }
            (state, event) => {
                warn!(role = %self.role, state = %state, ?event, "Unexpected session event");
                event.discard();
            }
        }
    }

    fn on_opened(&mut self, mut device: Box<dyn OpenedDevice>) {
        let Some(surface) = self.surface.clone() else {
            device.close();
            self.enter_error(SessionFailure::OpenFailed("no surface bound".into()));
            return;
        };

        info!(role = %self.role, device = %device.id(), "Camera opened, configuring session");
        self.state = SessionState::Configuring;
        let route = Arc::new(self.route());
        device.create_capture_session(vec![surface], route);
        self.device = Some(device);
    }

    fn on_configured(&mut self, mut session: Box<dyn ConfiguredSession>) {
        let Some(surface_id) = self.surface.as_ref().map(PreviewSurface::id) else {
            session.close();
            self.enter_error(SessionFailure::ConfigureFailed("no surface bound".into()));
            return;
        };

        match session.set_repeating_request(CaptureRequest::preview(surface_id)) {
            Ok(()) => {
                self.session = Some(session);
                self.state = SessionState::Streaming;
                info!(role = %self.role, surface = surface_id, "Streaming");
            }
            Err(e) => {
                session.close();
                self.enter_error(SessionFailure::ConfigureFailed(e.to_string()));
            }
        }
    }

    fn enter_error(&mut self, failure: SessionFailure) {
        self.teardown();
        // Late callbacks for this attempt must not revive it
        self.generation += 1;
        warn!(role = %self.role, failure = %failure, "Session failed");
        self.state = SessionState::Error(failure);
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop_repeating();
            session.close();
        }
        if let Some(mut device) = self.device.take() {
            device.close();
        }
    }

    fn route(&self) -> EventRoute {
        EventRoute {
            role: self.role,
            generation: self.generation,
            tx: self.tx.clone(),
        }
    }
}

impl Drop for RoleSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for RoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleSession")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("device_id", &self.device_id)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{
        BackendError, BackendResult, DeviceCharacteristics, DeviceStateCallback,
        SessionStateCallback,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Platform double that holds callbacks until the test fires them
    #[derive(Default)]
    struct Script {
        opens: Mutex<Vec<(DeviceId, Arc<dyn DeviceStateCallback>)>>,
        sessions: Mutex<Vec<(Vec<PreviewSurface>, Arc<dyn SessionStateCallback>)>>,
        repeating: Mutex<Vec<CaptureRequest>>,
        closed_devices: AtomicUsize,
        closed_sessions: AtomicUsize,
        reject_repeating: AtomicBool,
    }

    impl Script {
        fn open_callback(&self, index: usize) -> Arc<dyn DeviceStateCallback> {
            Arc::clone(&self.opens.lock().unwrap()[index].1)
        }

        fn session_callback(&self, index: usize) -> Arc<dyn SessionStateCallback> {
            Arc::clone(&self.sessions.lock().unwrap()[index].1)
        }
    }

    struct FakeService(Arc<Script>);

    impl CameraService for FakeService {
        fn list_devices(&self) -> BackendResult<Vec<DeviceId>> {
            Ok(Vec::new())
        }

        fn characteristics(&self, id: &DeviceId) -> BackendResult<DeviceCharacteristics> {
            Err(BackendError::DeviceNotFound(id.to_string()))
        }

        fn open_device(&self, id: &DeviceId, callback: Arc<dyn DeviceStateCallback>) {
            self.0.opens.lock().unwrap().push((id.clone(), callback));
        }
    }

    struct FakeDevice {
        id: DeviceId,
        script: Arc<Script>,
    }

    impl OpenedDevice for FakeDevice {
        fn id(&self) -> &DeviceId {
            &self.id
        }

        fn create_capture_session(
            &mut self,
            outputs: Vec<PreviewSurface>,
            callback: Arc<dyn SessionStateCallback>,
        ) {
            self.script.sessions.lock().unwrap().push((outputs, callback));
        }

        fn close(&mut self) {
            self.script.closed_devices.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeSession(Arc<Script>);

    impl ConfiguredSession for FakeSession {
        fn set_repeating_request(&mut self, request: CaptureRequest) -> BackendResult<()> {
            if self.0.reject_repeating.load(Ordering::SeqCst) {
                return Err(BackendError::Other("request rejected".into()));
            }
            self.0.repeating.lock().unwrap().push(request);
            Ok(())
        }

        fn stop_repeating(&mut self) {}

        fn close(&mut self) {
            self.0.closed_sessions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn setup() -> (Arc<Script>, FakeService, RoleSession) {
        let script = Arc::new(Script::default());
        let service = FakeService(Arc::clone(&script));
        (script, service, RoleSession::new(Role::Front))
    }

    fn device(script: &Arc<Script>, id: &str) -> Box<dyn OpenedDevice> {
        Box::new(FakeDevice {
            id: DeviceId::from(id),
            script: Arc::clone(script),
        })
    }

    fn drive_to_streaming(
        script: &Arc<Script>,
        service: &FakeService,
        session: &mut RoleSession,
        surface: &PreviewSurface,
    ) {
        session.open(service, DeviceId::from("1"), surface.clone());
        script.open_callback(0).on_opened(device(script, "1"));
        session.dispatch();
        script
            .session_callback(0)
            .on_configured(Box::new(FakeSession(Arc::clone(script))));
        session.dispatch();
    }

    #[test]
    fn test_full_lifecycle_reaches_streaming() {
        let (script, service, mut session) = setup();
        let surface = PreviewSurface::new(64, 48);

        session.open(&service, DeviceId::from("1"), surface.clone());
        assert_eq!(session.state(), &SessionState::Opening);
        assert_eq!(script.opens.lock().unwrap()[0].0, DeviceId::from("1"));

        script.open_callback(0).on_opened(device(&script, "1"));
        // Nothing changes until the queue is dispatched
        assert_eq!(session.state(), &SessionState::Opening);
        assert_eq!(session.dispatch(), 1);
        assert_eq!(session.state(), &SessionState::Configuring);

        {
            let sessions = script.sessions.lock().unwrap();
            assert_eq!(sessions[0].0, vec![surface.clone()]);
        }

        script
            .session_callback(0)
            .on_configured(Box::new(FakeSession(Arc::clone(&script))));
        session.dispatch();
        assert!(session.is_streaming());
        assert_eq!(
            script.repeating.lock().unwrap()[0],
            CaptureRequest::preview(surface.id())
        );
    }

    #[test]
    fn test_dispatch_drains_queue_then_stops() {
        let (script, service, mut session) = setup();
        assert_eq!(session.dispatch(), 0);

        session.open(&service, DeviceId::from("1"), PreviewSurface::new(8, 8));
        session.open(&service, DeviceId::from("1"), PreviewSurface::new(8, 8));
        script.open_callback(0).on_opened(device(&script, "1"));
        script.open_callback(1).on_opened(device(&script, "1"));

        assert_eq!(session.dispatch(), 2);
        assert_eq!(session.dispatch(), 0);
        assert_eq!(session.state(), &SessionState::Configuring);
        // The superseded attempt's device was handed back
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_configure_failure_is_terminal_without_retry() {
        let (script, service, mut session) = setup();
        session.open(&service, DeviceId::from("1"), PreviewSurface::new(64, 48));
        script.open_callback(0).on_opened(device(&script, "1"));
        session.dispatch();

        script
            .session_callback(0)
            .on_configure_failed("unsupported size".into());
        session.dispatch();

        assert_eq!(
            session.state(),
            &SessionState::Error(SessionFailure::ConfigureFailed("unsupported size".into()))
        );
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);
        assert_eq!(script.opens.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_rejected_repeating_request_fails_configure() {
        let (script, service, mut session) = setup();
        script.reject_repeating.store(true, Ordering::SeqCst);
        drive_to_streaming(&script, &service, &mut session, &PreviewSurface::new(8, 8));

        assert!(matches!(
            session.state(),
            SessionState::Error(SessionFailure::ConfigureFailed(_))
        ));
        assert_eq!(script.closed_sessions.load(Ordering::SeqCst), 1);
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_permission_error_on_open() {
        let (script, service, mut session) = setup();
        session.open(&service, DeviceId::from("1"), PreviewSurface::new(8, 8));
        script.open_callback(0).on_error(BackendError::PermissionDenied);
        session.dispatch();

        assert_eq!(
            session.state(),
            &SessionState::Error(SessionFailure::PermissionDenied)
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let (script, service, mut session) = setup();
        assert!(!session.close());

        drive_to_streaming(&script, &service, &mut session, &PreviewSurface::new(8, 8));
        assert!(session.close());
        assert_eq!(session.state(), &SessionState::Closed);
        assert_eq!(script.closed_sessions.load(Ordering::SeqCst), 1);
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);

        assert!(!session.close());
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_open_after_close_is_released() {
        let (script, service, mut session) = setup();
        session.open(&service, DeviceId::from("1"), PreviewSurface::new(8, 8));
        session.close();

        script.open_callback(0).on_opened(device(&script, "1"));
        session.dispatch();

        assert_eq!(session.state(), &SessionState::Closed);
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reopen_ignores_previous_attempt() {
        let (script, service, mut session) = setup();
        session.open(&service, DeviceId::from("1"), PreviewSurface::new(8, 8));
        session.open(&service, DeviceId::from("1"), PreviewSurface::new(8, 8));

        // First attempt's failure arrives late and must not affect the second
        script
            .open_callback(0)
            .on_error(BackendError::Other("busy".into()));
        session.dispatch();
        assert_eq!(session.state(), &SessionState::Opening);

        script.open_callback(1).on_opened(device(&script, "1"));
        session.dispatch();
        assert_eq!(session.state(), &SessionState::Configuring);
    }

    #[test]
    fn test_disconnect_while_streaming() {
        let (script, service, mut session) = setup();
        drive_to_streaming(&script, &service, &mut session, &PreviewSurface::new(8, 8));

        script.open_callback(0).on_disconnected();
        session.dispatch();

        assert_eq!(
            session.state(),
            &SessionState::Error(SessionFailure::Disconnected)
        );
        assert_eq!(script.closed_sessions.load(Ordering::SeqCst), 1);
        assert_eq!(script.closed_devices.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocked_on_permission_opens_nothing() {
        let (script, _service, mut session) = setup();
        session.block_on_permission(DeviceId::from("1"), PreviewSurface::new(8, 8));

        assert_eq!(
            session.state(),
            &SessionState::Error(SessionFailure::PermissionDenied)
        );
        assert!(script.opens.lock().unwrap().is_empty());
        assert_eq!(session.device_id(), Some(&DeviceId::from("1")));
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Session lifecycle states and the events that drive them

use crate::backends::camera::{
    BackendError, ConfiguredSession, DeviceStateCallback, OpenedDevice, SessionStateCallback,
};
use crate::backends::permissions::PermissionKind;
use crate::errors::CaptureError;
use crate::role::Role;
use futures::channel::mpsc::UnboundedSender;
use tracing::debug;

/// Lifecycle of one role's capture session
///
/// ```text
/// Closed ─▶ Opening ─▶ Configuring ─▶ Streaming ─▶ Closed
///              │            │             │
///              └────────────┴─────────────┴──▶ Error
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Configuring,
    Streaming,
    Error(SessionFailure),
}

impl SessionState {
    /// Holds or is acquiring a device
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Opening | SessionState::Configuring | SessionState::Streaming
        )
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        match self {
            SessionState::Error(failure) => Some(failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Error(failure) => write!(f, "error ({})", failure),
        }
    }
}

/// Why a session landed in `Error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    PermissionDenied,
    OpenFailed(String),
    ConfigureFailed(String),
    Disconnected,
}

impl SessionFailure {
    pub fn into_capture_error(self, role: Role) -> CaptureError {
        match self {
            SessionFailure::PermissionDenied => CaptureError::PermissionDenied(PermissionKind::Camera),
            SessionFailure::OpenFailed(reason) => CaptureError::OpenFailed { role, reason },
            SessionFailure::ConfigureFailed(reason) => CaptureError::ConfigureFailed { role, reason },
            SessionFailure::Disconnected => CaptureError::DeviceDisconnected(role),
        }
    }
}

impl From<BackendError> for SessionFailure {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied => SessionFailure::PermissionDenied,
            BackendError::Disconnected(_) => SessionFailure::Disconnected,
            other => SessionFailure::OpenFailed(other.to_string()),
        }
    }
}

impl std::fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFailure::PermissionDenied => write!(f, "permission denied"),
            SessionFailure::OpenFailed(reason) => write!(f, "open failed: {}", reason),
            SessionFailure::ConfigureFailed(reason) => write!(f, "configure failed: {}", reason),
            SessionFailure::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Platform callback translated into a typed event
pub enum SessionEvent {
    Opened(Box<dyn OpenedDevice>),
    OpenFailed(BackendError),
    Configured(Box<dyn ConfiguredSession>),
    ConfigureFailed(String),
    Disconnected,
}

impl SessionEvent {
    /// Release whatever platform object the event carries
    pub(crate) fn discard(self) {
        match self {
            SessionEvent::Opened(mut device) => device.close(),
            SessionEvent::Configured(mut session) => session.close(),
            _ => {}
        }
    }
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Opened(device) => write!(f, "Opened({})", device.id()),
            SessionEvent::OpenFailed(err) => write!(f, "OpenFailed({})", err),
            SessionEvent::Configured(_) => write!(f, "Configured"),
            SessionEvent::ConfigureFailed(reason) => write!(f, "ConfigureFailed({})", reason),
            SessionEvent::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Event tagged with the open attempt it belongs to
#[derive(Debug)]
pub(crate) struct RoutedEvent {
    pub generation: u64,
    pub event: SessionEvent,
}

/// Platform callback that feeds one role's event queue
///
/// Each open attempt gets its own route carrying the attempt's generation,
/// so callbacks from a superseded attempt can be recognised and dropped.
pub(crate) struct EventRoute {
    pub role: Role,
    pub generation: u64,
    pub tx: UnboundedSender<RoutedEvent>,
}

impl EventRoute {
    fn send(&self, event: SessionEvent) {
        let routed = RoutedEvent {
            generation: self.generation,
            event,
        };
        if let Err(e) = self.tx.unbounded_send(routed) {
            // Queue is gone with its session; release what the event holds
            debug!(role = %self.role, "Session queue closed, dropping event");
            e.into_inner().event.discard();
        }
    }
}

impl DeviceStateCallback for EventRoute {
    fn on_opened(&self, device: Box<dyn OpenedDevice>) {
        self.send(SessionEvent::Opened(device));
    }

    fn on_disconnected(&self) {
        self.send(SessionEvent::Disconnected);
    }

    fn on_error(&self, error: BackendError) {
        self.send(SessionEvent::OpenFailed(error));
    }
}

impl SessionStateCallback for EventRoute {
    fn on_configured(&self, session: Box<dyn ConfiguredSession>) {
        self.send(SessionEvent::Configured(session));
    }

    fn on_configure_failed(&self, reason: String) {
        self.send(SessionEvent::ConfigureFailed(reason));
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Preview surfaces
//!
//! A surface is the host-provided render target a capture session streams
//! into. It keeps only the most recently presented frame; readers take an
//! `Arc` snapshot of it without waiting for the producer.

use super::types::CameraFrame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

struct SurfaceInner {
    id: u64,
    width: u32,
    height: u32,
    latest: Mutex<Option<Arc<CameraFrame>>>,
    released: AtomicBool,
    presented: AtomicU64,
}

/// Shared handle to a preview surface
///
/// Cloning is cheap; all clones refer to the same render target.
#[derive(Clone)]
pub struct PreviewSurface {
    inner: Arc<SurfaceInner>,
}

impl PreviewSurface {
    /// Create a surface with the given logical size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                latest: Mutex::new(None),
                released: AtomicBool::new(false),
                presented: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    /// Render a frame, replacing the previous one
    ///
    /// Returns false once the surface has been released; the frame is dropped.
    pub fn present(&self, frame: CameraFrame) -> bool {
        if self.is_released() {
            return false;
        }
        let mut latest = self.inner.latest.lock().unwrap_or_else(PoisonError::into_inner);
        // Re-check under the lock so a concurrent release wins
        if self.is_released() {
            return false;
        }
        *latest = Some(Arc::new(frame));
        self.inner.presented.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Snapshot of the latest rendered frame, if any
    pub fn latest(&self) -> Option<Arc<CameraFrame>> {
        self.inner
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Invalidate the surface and drop its content
    pub fn release(&self) {
        let mut latest = self.inner.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.inner.released.swap(true, Ordering::SeqCst) {
            debug!(surface = self.inner.id, "Surface released");
        }
        *latest = None;
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// Number of frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.inner.presented.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PreviewSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSurface")
            .field("id", &self.inner.id)
            .field("size", &(self.inner.width, self.inner.height))
            .field("released", &self.is_released())
            .finish()
    }
}

impl PartialEq for PreviewSurface {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for PreviewSurface {}

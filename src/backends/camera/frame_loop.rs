// SPDX-License-Identifier: GPL-3.0-only
//! Paced frame producer threads
//!
//! A repeating request keeps a surface fed until it is stopped. The virtual
//! platform runs each repeating request as one of these loops: a thread that
//! calls a tick closure at a fixed interval until told to stop or until the
//! closure asks to stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the tick closure to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Keep producing frames
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a paced loop running in its own thread
///
/// Dropping the controller stops the loop and joins the thread.
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Start a loop that ticks every `interval`
    ///
    /// `init_fn` runs once on the new thread and builds the loop state; if it
    /// fails the thread exits without ticking. The first tick happens one
    /// interval after initialization.
    pub fn start<S, I, F>(name: &str, interval: Duration, init_fn: I, mut tick_fn: F) -> Self
    where
        S: Send + 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis() as u64, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %name_clone, error = %e, "Capture loop initialization failed");
                    return;
                }
            };

            let mut next_tick = Instant::now() + interval;
            loop {
                // Sleep until the next tick; stop() unparks us early
                loop {
                    if stop_signal_clone.load(Ordering::SeqCst) {
                        debug!(name = %name_clone, "Stop signal received");
                        info!(name = %name_clone, "Capture loop thread exiting");
                        return;
                    }
                    let now = Instant::now();
                    if now >= next_tick {
                        break;
                    }
                    thread::park_timeout(next_tick - now);
                }
                next_tick += interval;

                if tick_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }
            }

            info!(name = %name_clone, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = &self.thread_handle {
            handle.thread().unpark();
        }
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing cameras and the role each one is assigned
//! - Taking one composite
//! - Running an interactive preview session

use dual_camera::backends::camera::{self, CameraService, PreviewSurface};
use dual_camera::backends::permissions::StaticPermissions;
use dual_camera::backends::virtual_camera::VirtualCameraService;
use dual_camera::constants::{get_resolution_label, timing, virtual_camera as defaults};
use dual_camera::storage::{self, DirectorySink};
use dual_camera::{CompositePipeline, Config, DualCameraCoordinator, Role, RoleTable, SessionState};
use futures::channel::mpsc::{self, TryRecvError};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// List all configured cameras
pub fn list_devices(config: &Config) -> CliResult {
    let service = VirtualCameraService::new(config.devices.clone());
    let ids = service.list_devices()?;

    if ids.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let roles = camera::enumerate(&service)?;

    println!("Available cameras:");
    println!();
    for id in &ids {
        match service.characteristics(id) {
            Ok(info) => {
                let facing = info
                    .facing
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let label = get_resolution_label(info.width)
                    .map(|l| format!(" ({})", l))
                    .unwrap_or_default();
                let role = Role::ALL
                    .into_iter()
                    .find(|role| roles.get(*role).as_ref() == Some(id))
                    .map(|role| role.as_str())
                    .unwrap_or("-");

                println!("  [{}] {}", id, info.name);
                println!(
                    "      Facing: {}  Preview: {}x{}{}  Role: {}",
                    facing, info.width, info.height, label, role
                );
            }
            Err(e) => println!("  [{}] <unreadable: {}>", id, e),
        }
        println!();
    }

    for role in Role::ALL {
        if roles.get(role).is_none() {
            println!("No {} camera; composites need both roles.", role);
        }
    }

    Ok(())
}

/// Print the effective configuration, optionally writing it out
pub fn show_config(config: &Config, write_to: Option<&Path>) -> CliResult {
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Some(path) = write_to {
        config.save(path)?;
        println!("Config written: {}", path.display());
    }
    Ok(())
}

/// Start both cameras, take one composite, save it
pub fn capture_once(config: &Config, output: Option<PathBuf>, timeout: Option<u64>) -> CliResult {
    let mut host = Host::start(config)?;
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.startup_timeout());

    println!("Starting cameras...");
    if !host.wait_for_streaming(timeout) {
        for role in Role::ALL {
            if let Some(err) = host.coordinator.role_error(role) {
                println!("  {}: {}", role, err);
            }
        }
    }

    // Let both streams settle before the shutter
    std::thread::sleep(config.warmup());
    host.coordinator.dispatch();

    println!("Capturing...");
    let pair = host.coordinator.on_capture_requested()?;

    let output_dir = output.unwrap_or_else(|| config.output_dir());
    let sink = Arc::new(DirectorySink::new(output_dir));
    let pipeline = CompositePipeline::with_config(config);

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(pipeline.process(pair, sink))?;

    host.coordinator.shutdown();
    println!("Composite saved: {}", path.display());
    Ok(())
}

/// Interactive preview session: Enter captures, `q` quits
pub fn run_interactive(config: &Config, output: Option<PathBuf>) -> CliResult {
    let mut host = Host::start(config)?;
    let output_dir = output.unwrap_or_else(|| config.output_dir());
    let sink = Arc::new(DirectorySink::new(output_dir.clone()));
    let pipeline = CompositePipeline::with_config(config);
    let rt = tokio::runtime::Runtime::new()?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let (line_tx, mut line_rx) = mpsc::unbounded::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.unbounded_send(line).is_err() {
                break;
            }
        }
    });

    println!("Enter: capture   s: status   q: quit");
    let mut last_states = host.states();
    print_states(&last_states, None);

    while !stop_flag.load(Ordering::SeqCst) {
        host.coordinator.dispatch();

        let states = host.states();
        if states != last_states {
            print_states(&states, Some(&last_states));
            last_states = states;
        }

        match line_rx.try_recv() {
            Ok(line) => match line.trim() {
                "q" | "quit" => break,
                "s" | "status" => print_status(&host.coordinator),
                "" => match host.coordinator.on_capture_requested() {
                    Ok(pair) => match rt.block_on(pipeline.process(pair, sink.clone())) {
                        Ok(path) => println!("Composite saved: {}", path.display()),
                        Err(e) => println!("Capture failed: {}", e),
                    },
                    Err(e) => println!("Capture failed: {}", e),
                },
                other => println!("Unknown command: {}", other),
            },
            // stdin closed
            Err(TryRecvError::Closed) => break,
            Err(TryRecvError::Empty) => std::thread::sleep(timing::DISPATCH_POLL_INTERVAL),
        }
    }

    host.coordinator.shutdown();
    if let Some(latest) = storage::latest_capture(&output_dir) {
        println!("Latest composite: {}", latest.display());
    }
    Ok(())
}

/// Coordinator wired to the virtual platform with a surface per role
struct Host {
    coordinator: DualCameraCoordinator,
}

impl Host {
    fn start(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        // A terminal host has nobody to prompt; treat both as granted
        let permissions = Arc::new(StaticPermissions::granted());
        let service = Arc::new(VirtualCameraService::with_permissions(
            config.devices.clone(),
            permissions.clone(),
        ));

        let mut coordinator = DualCameraCoordinator::new(service.clone(), permissions);
        let selected = coordinator.enumerate_devices()?;

        for role in Role::ALL {
            let (width, height) = selected
                .get(role)
                .as_ref()
                .and_then(|id| service.characteristics(id).ok())
                .map(|info| (info.width, info.height))
                .unwrap_or((defaults::DEFAULT_WIDTH, defaults::DEFAULT_HEIGHT));
            match selected.get(role) {
                Some(id) => info!(role = %role, device = %id, "Camera assigned"),
                None => warn!(role = %role, "No camera for role"),
            }
            coordinator.on_surface_ready(role, PreviewSurface::new(width, height));
        }

        Ok(Self { coordinator })
    }

    /// Dispatch until both roles stream or one is stuck; false on timeout or failure
    fn wait_for_streaming(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            self.coordinator.dispatch();
            if Role::ALL.iter().all(|r| self.coordinator.is_streaming(*r)) {
                return true;
            }
            let settled = Role::ALL.iter().all(|r| {
                self.coordinator.is_streaming(*r) || self.coordinator.role_error(*r).is_some()
            });
            if settled {
                return false;
            }
            std::thread::sleep(timing::DISPATCH_POLL_INTERVAL);
        }
        warn!(timeout_ms = timeout.as_millis() as u64, "Cameras did not start in time");
        false
    }

    fn states(&self) -> RoleTable<SessionState> {
        RoleTable::from_fn(|role| self.coordinator.state(role).clone())
    }
}

fn print_states(states: &RoleTable<SessionState>, previous: Option<&RoleTable<SessionState>>) {
    for (role, state) in states.iter() {
        if previous.is_some_and(|p| p.get(role) == state) {
            continue;
        }
        println!("{}: {}", role, state);
    }
}

fn print_status(coordinator: &DualCameraCoordinator) {
    for (role, status) in coordinator.status().iter() {
        let device = status
            .device_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{}: device {} | {} | {} frames",
            role, device, status.state, status.frames_presented
        );
    }
}

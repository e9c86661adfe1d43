// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use dual_camera::Config;
use dual_camera::constants::app_info;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "dual-camera")]
#[command(about = "Front and back camera composite capture")]
#[command(version = app_info::version())]
struct Cli {
    /// Config file (default: <config dir>/dual-camera/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras and their roles
    List,

    /// Take one composite photo
    Capture {
        /// Output directory (default: ~/Pictures/DualCamera)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds to wait for both cameras to start
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Run an interactive preview session
    Run {
        /// Output directory (default: ~/Pictures/DualCamera)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=dual_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    tracing::info!(version = app_info::version(), "Starting dual-camera");

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::List => cli::list_devices(&config),
        Commands::Capture { output, timeout } => cli::capture_once(&config, output, timeout),
        Commands::Run { output } => cli::run_interactive(&config, output),
        Commands::Config { write } => {
            let target = if write {
                cli.config.clone().or_else(Config::default_path)
            } else {
                None
            };
            cli::show_config(&config, target.as_deref())
        }
    }
}

// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::LensFacing;
use crate::backends::virtual_camera::{FrameSource, VirtualDeviceConfig};
use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, timing};
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::{EncodingFormat, EncodingQuality, WidthPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Current on-disk config layout
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    /// Where composites are written; `None` means the pictures folder
    pub output_dir: Option<PathBuf>,
    pub photo_format: EncodingFormat,
    /// JPEG quality preset
    pub encoding_quality: EncodingQuality,
    /// Canvas width when front and back widths differ
    pub width_policy: WidthPolicy,
    /// Fill for canvas areas no frame covers
    pub pad_color: [u8; 4],
    /// How long the CLI waits for both roles to stream
    pub startup_timeout_ms: u64,
    /// Delay between streaming and the capture trigger
    pub warmup_ms: u64,
    /// Virtual camera devices
    pub devices: Vec<VirtualDeviceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            output_dir: None,
            photo_format: EncodingFormat::default(),
            encoding_quality: EncodingQuality::default(),
            width_policy: WidthPolicy::default(),
            pad_color: [0, 0, 0, 255],
            startup_timeout_ms: timing::STARTUP_TIMEOUT_MS,
            warmup_ms: timing::WARMUP_MS,
            devices: default_devices(),
        }
    }
}

/// A back camera showing colour bars and a front camera showing a gradient
pub fn default_devices() -> Vec<VirtualDeviceConfig> {
    vec![
        VirtualDeviceConfig::new("0", Some(LensFacing::Back)).with_source(FrameSource::ColorBars),
        VirtualDeviceConfig::new("1", Some(LensFacing::Front)).with_source(FrameSource::Gradient),
    ]
}

impl Config {
    /// `<config dir>/dual-camera/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, or from the default location
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// parsed is an error.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    debug!("No config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), devices = config.devices.len(), "Config loaded");
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    /// Configured output directory or the default pictures folder
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(crate::storage::default_output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "width_policy": "clip", "encoding_quality": "high" }"#)
                .unwrap();
        assert_eq!(config.width_policy, WidthPolicy::Clip);
        assert_eq!(config.encoding_quality, EncodingQuality::High);
        assert_eq!(config.photo_format, EncodingFormat::Jpeg);
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn test_device_source_tagging() {
        let config: Config = serde_json::from_str(
            r#"{ "devices": [
                { "id": "7", "facing": "front", "source": { "kind": "solid", "rgba": [1, 2, 3, 255] } }
            ] }"#,
        )
        .unwrap();
        let device = &config.devices[0];
        assert_eq!(device.id.as_str(), "7");
        assert_eq!(device.facing, Some(LensFacing::Front));
        assert_eq!(device.source, FrameSource::Solid { rgba: [1, 2, 3, 255] });
        assert_eq!(device.width, 640);
    }
}

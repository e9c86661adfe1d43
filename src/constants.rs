// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Folder under the user's pictures directory where composites are saved
pub const DEFAULT_SAVE_FOLDER: &str = "DualCamera";

/// chrono format for composite file names (local time)
pub const FILE_NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "dual-camera";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Resolution label for a preview width, used in device listings
pub fn get_resolution_label(width: u32) -> Option<&'static str> {
    match width {
        w if w >= 3840 => Some("4K"),
        w if w >= 1920 => Some("HD"),
        w if w >= 1280 => Some("720p"),
        w if w >= 640 => Some("SD"),
        _ => None,
    }
}

/// Supported file formats for image frame sources
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// How often the CLI drains session events while waiting
    pub const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Default virtual camera frame interval (~30 fps)
    pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

    /// Default time allowed for both roles to reach streaming
    pub const STARTUP_TIMEOUT_MS: u64 = 5_000;

    /// Default delay between streaming and the capture trigger
    pub const WARMUP_MS: u64 = 100;

    /// Log every Nth frame produced by a virtual camera
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// Virtual camera defaults
pub mod virtual_camera {
    pub const DEFAULT_WIDTH: u32 = 640;
    pub const DEFAULT_HEIGHT: u32 = 480;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

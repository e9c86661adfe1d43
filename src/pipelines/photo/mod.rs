// SPDX-License-Identifier: GPL-3.0-only

//! Async composite capture pipeline
//!
//! ```text
//! FramePair → Compose → Encoding → OutputSink
//!     ↓
//! Preview continues uninterrupted
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Compose**: stack the front frame over the back frame
//! 2. **Encoding**: JPEG or PNG on a blocking task
//! 3. **Persist**: hand the bytes to the sink on a blocking task

pub mod composition;
pub mod encoding;

pub use composition::{CompositeImage, Compositor, WidthPolicy};
pub use encoding::{EncodedImage, EncodingFormat, EncodingQuality, PhotoEncoder};

use crate::config::Config;
use crate::errors::CaptureError;
use crate::session::FramePair;
use crate::storage::{OutputSink, suggested_file_name};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Compose, encode and persist one frame pair
#[derive(Debug, Clone, Default)]
pub struct CompositePipeline {
    compositor: Compositor,
    encoder: PhotoEncoder,
}

impl CompositePipeline {
    /// Pad policy, black fill, maximum quality JPEG
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &Config) -> Self {
        let mut encoder = PhotoEncoder::new();
        encoder.set_format(config.photo_format);
        encoder.set_quality(config.encoding_quality);

        Self {
            compositor: Compositor::new(config.width_policy, config.pad_color),
            encoder,
        }
    }

    /// Run the whole pipeline for `pair`
    ///
    /// Returns the path the sink reported.
    pub async fn process(
        &self,
        pair: FramePair,
        sink: Arc<dyn OutputSink>,
    ) -> Result<PathBuf, CaptureError> {
        let result = self.run(pair, sink).await;
        if let Err(e) = &result {
            error!(error = %e, "Composite capture failed");
        }
        result
    }

    async fn run(&self, pair: FramePair, sink: Arc<dyn OutputSink>) -> Result<PathBuf, CaptureError> {
        let composite = self.compositor.compose(&pair.front, &pair.back)?;
        info!(
            width = composite.width(),
            height = composite.height(),
            "Composite ready"
        );

        let encoded = self.encoder.encode(composite.image).await?;
        let name = suggested_file_name(chrono::Local::now(), encoded.format.extension());

        // I/O-bound
        tokio::task::spawn_blocking(move || sink.write(&encoded.data, &name))
            .await
            .map_err(|e| CaptureError::PersistFailed(format!("Save task error: {}", e)))?
    }
}

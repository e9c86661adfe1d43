// SPDX-License-Identifier: GPL-3.0-only

//! Vertical stacking of a front and a back frame
//!
//! ```text
//! (0, 0)        ┌──────────────┐
//!               │    front     │  H1 rows, unmodified
//! (0, H1)       ├──────────────┤
//!               │     back     │  H2 rows
//!               └──────────────┘
//! ```
//!
//! Frames are never scaled. When the widths differ the [`WidthPolicy`]
//! decides the canvas width.

use crate::backends::camera::CameraFrame;
use crate::errors::CaptureError;
use image::imageops;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How to handle front and back frames of different widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthPolicy {
    /// Canvas is as wide as the wider frame; the rest is filled
    #[default]
    Pad,
    /// Canvas is as wide as the front frame; the back frame is cut or padded
    Clip,
    /// Differing widths are an error
    Reject,
}

/// A stacked composite
#[derive(Debug, Clone)]
pub struct CompositeImage {
    pub image: RgbaImage,
    /// First row of the back band
    pub front_height: u32,
}

impl CompositeImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    policy: WidthPolicy,
    fill: [u8; 4],
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(WidthPolicy::default(), [0, 0, 0, 255])
    }
}

impl Compositor {
    pub fn new(policy: WidthPolicy, fill: [u8; 4]) -> Self {
        Self { policy, fill }
    }

    /// Stack `front` above `back`
    pub fn compose(
        &self,
        front: &CameraFrame,
        back: &CameraFrame,
    ) -> Result<CompositeImage, CaptureError> {
        let width = match self.policy {
            WidthPolicy::Pad => front.width.max(back.width),
            WidthPolicy::Clip => front.width,
            WidthPolicy::Reject if front.width != back.width => {
                return Err(CaptureError::DimensionMismatch {
                    front_width: front.width,
                    back_width: back.width,
                });
            }
            WidthPolicy::Reject => front.width,
        };
        let height = canvas_height(width, front.height, back.height)?;

        debug!(
            width,
            height,
            front_seq = front.sequence,
            back_seq = back.sequence,
            policy = ?self.policy,
            "Composing frame pair"
        );

        let mut canvas = RgbaImage::from_pixel(width, height, Rgba(self.fill));
        imageops::replace(&mut canvas, &front.to_rgba_image(), 0, 0);
        imageops::replace(&mut canvas, &back.to_rgba_image(), 0, i64::from(front.height));

        Ok(CompositeImage {
            image: canvas,
            front_height: front.height,
        })
    }
}

/// Height of the stacked canvas, if a `width`-wide RGBA buffer of it fits
fn canvas_height(width: u32, front_height: u32, back_height: u32) -> Result<u32, CaptureError> {
    let too_large = || CaptureError::CompositeTooLarge {
        width,
        height: u64::from(front_height) + u64::from(back_height),
    };
    let height = front_height.checked_add(back_height).ok_or_else(too_large)?;
    CameraFrame::packed_len(width, height).map_err(|_| too_large())?;
    Ok(height)
}

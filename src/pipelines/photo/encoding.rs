// SPDX-License-Identifier: GPL-3.0-only

//! Async composite encoding
//!
//! This module handles encoding composites to:
//! - JPEG (with quality control, alpha dropped)
//! - PNG (lossless, alpha kept)
//!
//! Encoding runs on a blocking task so the dispatch thread never stalls.

use crate::errors::CaptureError;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }
}

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    High,
    /// No quality reduction
    #[default]
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 100,
        }
    }
}

/// Encoded image data ready for saving
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Photo encoder
#[derive(Debug, Clone, Default)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    quality: EncodingQuality,
}

impl PhotoEncoder {
    /// Create a new encoder with JPEG format and maximum quality
    pub fn new() -> Self {
        Self::default()
    }

    /// Set encoding format
    pub fn set_format(&mut self, format: EncodingFormat) {
        self.format = format;
    }

    /// Set encoding quality (only affects JPEG)
    pub fn set_quality(&mut self, quality: EncodingQuality) {
        self.quality = quality;
    }

    /// Encode a composite asynchronously
    pub async fn encode(&self, image: RgbaImage) -> Result<EncodedImage, CaptureError> {
        let (width, height) = image.dimensions();
        info!(width, height, format = ?self.format, "Starting encoding");

        let format = self.format;
        let quality = self.quality;

        // CPU-bound
        tokio::task::spawn_blocking(move || Self::encode_sync(image, format, quality))
            .await
            .map_err(|e| CaptureError::EncodingFailed(format!("Encoding task error: {}", e)))?
    }

    /// Encode on the current thread
    pub fn encode_sync(
        image: RgbaImage,
        format: EncodingFormat,
        quality: EncodingQuality,
    ) -> Result<EncodedImage, CaptureError> {
        let (width, height) = image.dimensions();
        let data = match format {
            EncodingFormat::Jpeg => Self::encode_jpeg(image, quality)?,
            EncodingFormat::Png => Self::encode_png(image)?,
        };

        debug!(size = data.len(), "Encoding complete");

        Ok(EncodedImage {
            data,
            format,
            width,
            height,
        })
    }

    /// Encode image as JPEG
    fn encode_jpeg(image: RgbaImage, quality: EncodingQuality) -> Result<Vec<u8>, CaptureError> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(image).into_rgb8();

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());

        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CaptureError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        Ok(buffer)
    }

    /// Encode image as PNG
    fn encode_png(image: RgbaImage) -> Result<Vec<u8>, CaptureError> {
        let mut buffer = Vec::new();

        image
            .write_to(
                &mut std::io::Cursor::new(&mut buffer),
                image::ImageFormat::Png,
            )
            .map_err(|e| CaptureError::EncodingFailed(format!("PNG encoding failed: {}", e)))?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_quality_values() {
        assert_eq!(EncodingQuality::Low.jpeg_quality(), 60);
        assert_eq!(EncodingQuality::Medium.jpeg_quality(), 80);
        assert_eq!(EncodingQuality::High.jpeg_quality(), 92);
        assert_eq!(EncodingQuality::Maximum.jpeg_quality(), 100);
        assert_eq!(EncodingQuality::default(), EncodingQuality::Maximum);
    }

    #[test]
    fn test_jpeg_output() {
        let image = RgbaImage::from_pixel(16, 8, image::Rgba([10, 200, 30, 128]));
        let encoded =
            PhotoEncoder::encode_sync(image, EncodingFormat::Jpeg, EncodingQuality::High).unwrap();
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        assert_eq!((encoded.width, encoded.height), (16, 8));
    }

    #[test]
    fn test_png_keeps_pixels() {
        let image = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        let encoded =
            PhotoEncoder::encode_sync(image, EncodingFormat::Png, EncodingQuality::Low).unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 3).0, [1, 2, 3, 255]);
    }

    #[tokio::test]
    async fn test_async_encode() {
        let encoder = PhotoEncoder::new();
        let encoded = encoder
            .encode(RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255])))
            .await
            .unwrap();
        assert_eq!(encoded.format, EncodingFormat::Jpeg);
    }
}

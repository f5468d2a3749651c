//! Surface encoding.
//!
//! Formats are named by MIME type, matching what widget callers pass.
//! JPEG honours the quality setting; PNG and WebP are lossless.

use super::CaptureError;
use chrono::{DateTime, Utc};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossy, no alpha channel.
    #[default]
    #[serde(rename = "image/jpeg")]
    Jpeg,
    /// Lossless, keeps alpha.
    #[serde(rename = "image/png")]
    Png,
    /// Lossless WebP.
    #[serde(rename = "image/webp")]
    WebP,
}

impl ImageFormat {
    /// MIME type, e.g. `image/jpeg`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Conventional file extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }

    /// Maps `0.0..=1.0` onto the JPEG scale `1..=100`.
    pub fn jpeg_quality(quality: f32) -> u8 {
        let quality = if quality.is_finite() { quality } else { 1.0 };
        (quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl FromStr for ImageFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "image/png" | "png" => Ok(ImageFormat::Png),
            "image/webp" | "webp" => Ok(ImageFormat::WebP),
            _ => Err(CaptureError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// An encoded photo. Ownership passes to the caller.
#[derive(Clone)]
pub struct CapturedImage {
    /// Encoded bytes.
    pub data: Vec<u8>,
    /// Encoding of `data`.
    pub format: ImageFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Capture time.
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    /// MIME type of `data`.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// File extension matching `format`.
    pub fn file_extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Timestamped file name such as `IMG_20240101_120000.jpg`.
    pub fn suggested_file_name(&self) -> String {
        format!(
            "IMG_{}.{}",
            self.captured_at.format("%Y%m%d_%H%M%S"),
            self.format.extension()
        )
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Encodes `surface` as `format`.
pub fn encode(
    surface: RgbaImage,
    format: ImageFormat,
    quality: f32,
) -> Result<CapturedImage, CaptureError> {
    let (width, height) = surface.dimensions();
    let data = match format {
        ImageFormat::Jpeg => encode_jpeg(surface, quality)?,
        ImageFormat::Png => encode_lossless(surface, image::ImageFormat::Png)?,
        ImageFormat::WebP => encode_lossless(surface, image::ImageFormat::WebP)?,
    };

    tracing::debug!(size = data.len(), format = %format, "Encoding complete");

    Ok(CapturedImage {
        data,
        format,
        width,
        height,
        captured_at: Utc::now(),
    })
}

fn encode_jpeg(surface: RgbaImage, quality: f32) -> Result<Vec<u8>, CaptureError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(surface).to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut cursor = std::io::Cursor::new(&mut buffer);
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
            &mut cursor,
            ImageFormat::jpeg_quality(quality),
        );
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| CaptureError::Encode(format!("JPEG encoding failed: {e}")))?;
    }

    Ok(buffer)
}

fn encode_lossless(
    surface: RgbaImage,
    format: image::ImageFormat,
) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    surface
        .write_to(&mut std::io::Cursor::new(&mut buffer), format)
        .map_err(|e| CaptureError::Encode(format!("{format:?} encoding failed: {e}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn surface() -> RgbaImage {
        RgbaImage::from_pixel(16, 8, Rgba([200, 100, 50, 255]))
    }

    #[test]
    fn test_parse_mime_types() {
        assert_eq!("image/jpeg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert_eq!("IMAGE/PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("image/webp".parse::<ImageFormat>().unwrap(), ImageFormat::WebP);
        assert!(matches!(
            "image/gif".parse::<ImageFormat>(),
            Err(CaptureError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        assert_eq!(ImageFormat::jpeg_quality(1.0), 100);
        assert_eq!(ImageFormat::jpeg_quality(0.92), 92);
        assert_eq!(ImageFormat::jpeg_quality(0.0), 1);
        assert_eq!(ImageFormat::jpeg_quality(f32::NAN), 100);
    }

    #[test]
    fn test_encode_jpeg_signature() {
        let image = encode(surface(), ImageFormat::Jpeg, 0.8).unwrap();
        assert_eq!(&image.data[..2], &[0xFF, 0xD8]);
        assert_eq!((image.width, image.height), (16, 8));
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let image = encode(surface(), ImageFormat::Png, 1.0).unwrap();
        let decoded = image::load_from_memory(&image.data).unwrap().to_rgba8();
        assert_eq!(decoded, surface());
    }

    #[test]
    fn test_suggested_file_name() {
        let image = encode(surface(), ImageFormat::Png, 1.0).unwrap();
        let name = image.suggested_file_name();
        assert!(name.starts_with("IMG_"));
        assert!(name.ends_with(".png"));
    }
}

//! Frame type representing the latest image of a live stream.

use image::RgbaImage;
use std::time::Instant;

/// A single frame read from a stream.
///
/// Holds RGBA pixels plus the metadata needed to order frames and
/// attribute them to a device.
#[derive(Clone)]
pub struct Frame {
    /// RGBA pixel data.
    image: RgbaImage,
    /// Read timestamp.
    timestamp: Instant,
    /// Monotonic sequence number within the stream.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame from an RGBA image.
    pub fn new(image: RgbaImage, sequence: u64) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Builds a frame from a raw RGBA buffer.
    ///
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(|image| Self::new(image, sequence))
    }

    /// Returns the pixel buffer.
    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Time the frame was read.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Sequence number within the stream.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns true if the frame has no pixels yet.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::from_rgba(vec![0u8; 64 * 48 * 4], 64, 48, 1).unwrap();

        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.sequence(), 1);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_frame_invalid_size() {
        assert!(Frame::from_rgba(vec![0u8; 100], 64, 48, 1).is_none());
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::new(RgbaImage::new(0, 0), 0);
        assert!(frame.is_empty());
    }
}

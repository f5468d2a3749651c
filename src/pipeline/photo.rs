//! Still-photo capture from a player frame.

use super::{
    center_crop, encode, restrict_to_overlay, CapturedImage, CropRect, FrameSize, ImageFormat,
    OverlayRegion,
};
use crate::capture::Frame;
use crate::filter::{apply_filter, FilterKind, OverflowPolicy};
use image::{imageops, RgbaImage};
use thiserror::Error;

/// Why a capture could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// Camera access is unavailable on this platform.
    NotSupported,
    /// The user refused camera access.
    PermissionDenied,
    /// No video input device was enumerated.
    NoDevices,
    /// No live stream with a frame is bound.
    NoStream,
    /// The crop is too small to allocate a drawing surface.
    SurfaceUnavailable,
}

impl std::fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NotReadyReason::NotSupported => "camera access is not supported",
            NotReadyReason::PermissionDenied => "camera permission was denied",
            NotReadyReason::NoDevices => "no camera device is available",
            NotReadyReason::NoStream => "no live stream is bound",
            NotReadyReason::SurfaceUnavailable => "drawing surface is unavailable",
        };
        f.write_str(text)
    }
}

/// Errors that can occur during capture.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("capture not ready: {0}")]
    NotReady(NotReadyReason),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// Parameters for one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    /// Flip horizontally before drawing.
    pub mirror: bool,
    /// Output encoding.
    pub format: ImageFormat,
    /// Encoder quality in `0.0..=1.0`.
    pub quality: f32,
    /// Filter run on the cropped surface.
    pub filter: FilterKind,
    /// How filtered values are stored.
    pub overflow: OverflowPolicy,
    /// Region of the container to keep; `None` keeps the whole view.
    pub overlay: Option<OverlayRegion>,
    /// Size assumed when player or container dimensions are unknown.
    pub fallback_size: FrameSize,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            mirror: false,
            format: ImageFormat::Jpeg,
            quality: 1.0,
            filter: FilterKind::None,
            overflow: OverflowPolicy::Saturate,
            overlay: None,
            fallback_size: FrameSize::new(
                crate::capture::DEFAULT_WIDTH as f64,
                crate::capture::DEFAULT_HEIGHT as f64,
            ),
        }
    }
}

/// Computes the source rectangle for a capture.
pub fn source_rect(
    request: &CaptureRequest,
    player: FrameSize,
    container: Option<FrameSize>,
) -> CropRect {
    let player = player.or(request.fallback_size);
    let container = container
        .unwrap_or(request.fallback_size)
        .or(request.fallback_size);

    let crop = center_crop(player, container);
    match &request.overlay {
        Some(overlay) => restrict_to_overlay(crop, overlay, container),
        None => crop,
    }
}

/// Captures a photo of `player` as displayed in `container`.
///
/// The result always has the container's aspect ratio (or the overlay's,
/// when one is given), whatever the camera's native resolution.
pub fn capture(
    request: &CaptureRequest,
    player: &Frame,
    container: Option<FrameSize>,
) -> Result<CapturedImage, CaptureError> {
    let player_size = FrameSize::new(player.width() as f64, player.height() as f64);
    let crop = source_rect(request, player_size, container);

    let (width, height) = crop.surface_size();
    if width == 0 || height == 0 {
        return Err(CaptureError::NotReady(NotReadyReason::SurfaceUnavailable));
    }

    let mut surface = draw(player.image(), &crop, width, height);
    if request.mirror {
        imageops::flip_horizontal_in_place(&mut surface);
    }

    apply_filter(&mut surface, request.filter, request.overflow);

    let image = encode(surface, request.format, request.quality)?;
    tracing::info!(
        width,
        height,
        mirror = request.mirror,
        filter = ?request.filter,
        format = %request.format,
        bytes = image.data.len(),
        "Photo captured"
    );
    Ok(image)
}

/// Copies `crop` out of `source` onto a fresh surface.
///
/// Parts of the crop outside the source stay transparent.
fn draw(source: &RgbaImage, crop: &CropRect, width: u32, height: u32) -> RgbaImage {
    let mut surface = RgbaImage::new(width, height);

    let left = crop.x.round() as i64;
    let top = crop.y.round() as i64;
    let src_x = left.max(0);
    let src_y = top.max(0);
    if src_x >= source.width() as i64 || src_y >= source.height() as i64 {
        return surface;
    }

    let visible_w = (left + width as i64).min(source.width() as i64) - src_x;
    let visible_h = (top + height as i64).min(source.height() as i64) - src_y;
    if visible_w <= 0 || visible_h <= 0 {
        return surface;
    }

    let region = imageops::crop_imm(
        source,
        src_x as u32,
        src_y as u32,
        visible_w as u32,
        visible_h as u32,
    )
    .to_image();
    imageops::replace(&mut surface, &region, src_x - left, src_y - top);
    surface
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Frame whose red channel encodes the column and green the row.
    fn gradient(width: u32, height: u32) -> Frame {
        let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        Frame::new(image, 1)
    }

    fn png_request() -> CaptureRequest {
        CaptureRequest {
            format: ImageFormat::Png,
            ..Default::default()
        }
    }

    fn decode(image: &CapturedImage) -> RgbaImage {
        image::load_from_memory(&image.data).unwrap().to_rgba8()
    }

    #[test]
    fn test_square_container_centre_crop() {
        let frame = gradient(192, 108);
        let image = capture(&png_request(), &frame, Some(FrameSize::new(30.0, 30.0))).unwrap();

        assert_eq!((image.width, image.height), (108, 108));
        let pixels = decode(&image);
        // sX = (192 - 108) / 2
        assert_eq!(pixels.get_pixel(0, 0), &Rgba([42, 0, 0, 255]));
        assert_eq!(pixels.get_pixel(107, 107), &Rgba([149, 107, 0, 255]));
    }

    #[test]
    fn test_mirror_flips_columns() {
        let frame = gradient(100, 50);
        let request = CaptureRequest {
            mirror: true,
            ..png_request()
        };
        let image = capture(&request, &frame, Some(FrameSize::new(100.0, 50.0))).unwrap();

        let pixels = decode(&image);
        assert_eq!(pixels.get_pixel(0, 0)[0], 99);
        assert_eq!(pixels.get_pixel(99, 0)[0], 0);
    }

    #[test]
    fn test_overlay_restricts_crop() {
        let frame = gradient(200, 100);
        let request = CaptureRequest {
            overlay: Some(OverlayRegion::new(10.0, 5.0, 20.0, 10.0)),
            ..png_request()
        };
        // Container 100x50 shows the full 200x100 frame at scale 2.
        let image = capture(&request, &frame, Some(FrameSize::new(100.0, 50.0))).unwrap();

        assert_eq!((image.width, image.height), (40, 20));
        let pixels = decode(&image);
        assert_eq!(pixels.get_pixel(0, 0), &Rgba([20, 10, 0, 255]));
    }

    #[test]
    fn test_unknown_container_uses_fallback_ratio() {
        let frame = gradient(160, 90);
        let image = capture(&png_request(), &frame, None).unwrap();
        assert_eq!((image.width, image.height), (160, 90));
    }

    #[test]
    fn test_empty_player_uses_fallback_size() {
        let frame = Frame::new(RgbaImage::new(0, 0), 1);
        let request = CaptureRequest {
            fallback_size: FrameSize::new(40.0, 20.0),
            ..png_request()
        };
        let image = capture(&request, &frame, Some(FrameSize::new(20.0, 20.0))).unwrap();

        assert_eq!((image.width, image.height), (20, 20));
        assert_eq!(decode(&image).get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_tiny_overlay_has_no_surface() {
        let frame = gradient(100, 100);
        let request = CaptureRequest {
            overlay: Some(OverlayRegion::new(0.0, 0.0, 0.1, 0.1)),
            ..png_request()
        };
        let result = capture(&request, &frame, Some(FrameSize::new(100.0, 100.0)));
        assert_eq!(
            result.unwrap_err(),
            CaptureError::NotReady(NotReadyReason::SurfaceUnavailable)
        );
    }

    #[test]
    fn test_huge_overlay_limited_to_frame() {
        let frame = gradient(100, 100);
        let request = CaptureRequest {
            overlay: Some(OverlayRegion::new(0.0, 0.0, 1e12, 1e12)),
            ..png_request()
        };
        let image = capture(&request, &frame, Some(FrameSize::new(100.0, 100.0))).unwrap();
        assert_eq!((image.width, image.height), (100, 100));
    }

    #[test]
    fn test_overlay_outside_frame_has_no_surface() {
        let frame = gradient(100, 100);
        let request = CaptureRequest {
            overlay: Some(OverlayRegion::new(200.0, 200.0, 50.0, 50.0)),
            ..png_request()
        };
        let result = capture(&request, &frame, Some(FrameSize::new(100.0, 100.0)));
        assert_eq!(
            result.unwrap_err(),
            CaptureError::NotReady(NotReadyReason::SurfaceUnavailable)
        );
    }

    #[test]
    fn test_sharpen_changes_edges_only_on_flat_frame() {
        let image = RgbaImage::from_pixel(10, 10, Rgba([80, 80, 80, 255]));
        let frame = Frame::new(image, 1);
        let request = CaptureRequest {
            filter: FilterKind::Sharpen,
            ..png_request()
        };
        let captured = capture(&request, &frame, Some(FrameSize::new(10.0, 10.0))).unwrap();

        let pixels = decode(&captured);
        assert_eq!(pixels.get_pixel(5, 5), &Rgba([80, 80, 80, 255]));
        // Corner: 5*80 - 2*80 = 240
        assert_eq!(pixels.get_pixel(0, 0), &Rgba([240, 240, 240, 255]));
    }
}

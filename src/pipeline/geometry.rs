//! Crop geometry for captures.
//!
//! All rectangles are `f64` in the coordinate space of the frame they
//! describe. Crops are computed in player (native frame) space.

use serde::{Deserialize, Serialize};

/// Width and height of a frame or container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl FrameSize {
    /// Creates a size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns true if both sides are positive and finite.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Returns `self` when valid, otherwise `fallback`.
    pub fn or(self, fallback: FrameSize) -> FrameSize {
        if self.is_valid() {
            self
        } else {
            fallback
        }
    }

    /// Width divided by height.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Sub-rectangle of the displayed container the photo is cropped to.
///
/// Produced by the layout collaborator in container pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayRegion {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl OverlayRegion {
    /// Creates a region.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A region without area means "use the full frame".
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Layout facts supplied at capture time by the widget's layout code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    /// Displayed size of the video container, if measured.
    pub container: Option<FrameSize>,
    /// Region to restrict the photo to.
    pub overlay: Option<OverlayRegion>,
}

impl LayoutSnapshot {
    /// Layout with a measured container and no overlay.
    pub fn container(width: f64, height: f64) -> Self {
        Self {
            container: Some(FrameSize::new(width, height)),
            overlay: None,
        }
    }

    /// Adds an overlay region.
    pub fn with_overlay(mut self, overlay: OverlayRegion) -> Self {
        self.overlay = Some(overlay);
        self
    }
}

/// Source rectangle within the player frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl CropRect {
    /// Pixel size of a surface holding this crop.
    ///
    /// Fractional sizes truncate, as assigning them to a drawing surface
    /// would.
    pub fn surface_size(&self) -> (u32, u32) {
        let side = |v: f64| if v.is_finite() && v > 0.0 { v as u32 } else { 0 };
        (side(self.width), side(self.height))
    }
}

/// Centre crop of `player` matching the aspect ratio of `container`.
///
/// A wider player loses columns on both sides; otherwise rows are
/// removed from top and bottom.
pub fn center_crop(player: FrameSize, container: FrameSize) -> CropRect {
    let container_ratio = container.aspect_ratio();

    if player.aspect_ratio() > container_ratio {
        let width = player.height * container_ratio;
        CropRect {
            x: (player.width - width) / 2.0,
            y: 0.0,
            width,
            height: player.height,
        }
    } else {
        let height = player.width / container_ratio;
        CropRect {
            x: 0.0,
            y: (player.height - height) / 2.0,
            width: player.width,
            height,
        }
    }
}

/// Maps an overlay from container space into `crop`, replacing its bounds.
///
/// The container is displayed as exactly `crop`, so the mapping is a
/// linear scale by `crop / container` plus the crop origin. The result
/// is clipped to `crop`; an overlay entirely outside it yields a rect
/// with no area. Empty overlays leave the crop untouched.
pub fn restrict_to_overlay(
    crop: CropRect,
    overlay: &OverlayRegion,
    container: FrameSize,
) -> CropRect {
    if overlay.is_empty() {
        return crop;
    }

    let scale_x = crop.width / container.width;
    let scale_y = crop.height / container.height;

    let left = crop.x + overlay.x * scale_x;
    let top = crop.y + overlay.y * scale_y;
    let right = left + overlay.width * scale_x;
    let bottom = top + overlay.height * scale_y;

    let x = left.max(crop.x);
    let y = top.max(crop.y);
    CropRect {
        x,
        y,
        width: (right.min(crop.x + crop.width) - x).max(0.0),
        height: (bottom.min(crop.y + crop.height) - y).max(0.0),
    }
}

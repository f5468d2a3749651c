//! Capture pipeline: crop, mirror, filter, encode.
//!
//! ```text
//! player frame ─► centre crop ─► overlay crop ─► surface ─► mirror ─► filter ─► encode
//! ```
//!
//! The pipeline only reads frames. It never touches stream state.

mod encode;
mod geometry;
mod photo;

pub use encode::{encode, CapturedImage, ImageFormat};
pub use geometry::{
    center_crop, restrict_to_overlay, CropRect, FrameSize, LayoutSnapshot, OverlayRegion,
};
pub use photo::{capture, source_rect, CaptureError, CaptureRequest, NotReadyReason};

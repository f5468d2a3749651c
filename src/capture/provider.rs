//! Capability provider abstraction.
//!
//! The provider is the only component that talks to camera hardware.
//! Enumeration and acquisition may suspend for an unbounded time (the
//! platform may be waiting on a permission prompt), so both return
//! futures. The futures are `'static` and need not be `Send`: the
//! session runs them as local tasks on a single thread.

use super::{CameraDevice, CapabilityQuery, FacingMode, FocusMode, Frame};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while enumerating or acquiring cameras.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquireError {
    #[error("no camera device accessible, connect a camera or try a different backend")]
    NotSupported,
    #[error("permission denied, grant camera access and retry")]
    PermissionDenied,
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("constraints rejected: {0}")]
    ConstraintRejected(String),
    #[error("camera backend error: {0}")]
    Backend(String),
}

/// Constraints passed to [`CapabilityProvider::acquire_stream`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConstraints {
    /// Preferred orientation.
    pub facing_mode: FacingMode,
    /// Preferred width in pixels.
    pub ideal_width: u32,
    /// Preferred height in pixels.
    pub ideal_height: u32,
    /// When set, only this device may satisfy the request.
    pub exact_device_id: Option<String>,
}

/// Adjustable track settings.
///
/// Every field is optional; `None` leaves the current value untouched
/// when applied and means "not reported" when read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    /// Frame width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Frame height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Frames per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    /// Active focus mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_mode: Option<FocusMode>,
    /// Focus distance in metres, for manual focus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_distance: Option<f64>,
    /// Zoom factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    /// Whether the torch is lit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torch: Option<bool>,
}

impl TrackSettings {
    /// Overlays the fields set in `other` on top of `self`.
    pub fn merge(&mut self, other: &TrackSettings) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(width, height, frame_rate, focus_mode, focus_distance, zoom, torch);
    }
}

/// A live stream bound to exactly one device and one constraint set.
///
/// Streams hold a hardware lock until [`VideoStream::stop`] is called.
pub trait VideoStream {
    /// Identifier of the device backing this stream.
    fn device_id(&self) -> &str;

    /// Constraints the stream was acquired with.
    fn constraints(&self) -> &StreamConstraints;

    /// Capabilities of the underlying track.
    fn capabilities(&self) -> CapabilityQuery;

    /// Latest frame, if one has been produced.
    fn current_frame(&self) -> Option<Frame>;

    /// Current track settings.
    fn settings(&self) -> TrackSettings;

    /// Applies a partial settings update to the track.
    fn apply_settings(&mut self, settings: &TrackSettings) -> Result<(), AcquireError>;

    /// Stops every underlying track and releases the device.
    fn stop(&mut self);

    /// Returns true until [`VideoStream::stop`] has been called.
    fn is_live(&self) -> bool;
}

/// Source of camera devices and streams.
pub trait CapabilityProvider: 'static {
    /// Stream type handed out by this provider.
    type Stream: VideoStream + 'static;

    /// Lists video input devices.
    ///
    /// Labels and capabilities may be missing until permission is granted.
    fn enumerate_video_devices(
        &self,
    ) -> LocalBoxFuture<'static, Result<Vec<CameraDevice>, AcquireError>>;

    /// Requests a stream satisfying the constraints.
    fn acquire_stream(
        &self,
        constraints: StreamConstraints,
    ) -> LocalBoxFuture<'static, Result<Self::Stream, AcquireError>>;

    /// Releases a stream previously returned by `acquire_stream`.
    fn release_stream(&self, mut stream: Self::Stream) {
        stream.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_merge_only_set_fields() {
        let mut current = TrackSettings {
            width: Some(1920),
            height: Some(1080),
            zoom: Some(1.0),
            ..Default::default()
        };
        current.merge(&TrackSettings {
            zoom: Some(2.0),
            torch: Some(true),
            ..Default::default()
        });

        assert_eq!(current.width, Some(1920));
        assert_eq!(current.zoom, Some(2.0));
        assert_eq!(current.torch, Some(true));
    }

    #[test]
    fn test_settings_json_skips_unset() {
        let settings = TrackSettings {
            width: Some(640),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&settings).unwrap(), r#"{"width":640}"#);
    }
}

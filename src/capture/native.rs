//! Hardware capability provider backed by `nokhwa`.
//!
//! Native backends do not report facing or focus modes, so every device
//! enumerates without a capability set and tracks answer
//! [`CapabilityQuery::Unsupported`]. Opening a device blocks the calling
//! thread for the duration of the platform call.

use super::{
    AcquireError, CameraDevice, CapabilityProvider, CapabilityQuery, Frame, StreamConstraints,
    TrackSettings, VideoStream,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use std::cell::{Cell, RefCell};

/// Provider for the platform's native camera API.
#[derive(Debug, Clone, Copy)]
pub struct NativeProvider {
    frame_rate: u32,
}

impl NativeProvider {
    /// Creates a provider requesting 30 fps.
    pub fn new() -> Self {
        Self { frame_rate: 30 }
    }

    /// Overrides the frame rate requested from devices.
    pub fn with_frame_rate(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
        }
    }

    fn index_for(device_id: &str) -> CameraIndex {
        match device_id.parse::<u32>() {
            Ok(n) => CameraIndex::Index(n),
            Err(_) => CameraIndex::String(device_id.to_string()),
        }
    }

    fn query() -> Result<Vec<CameraDevice>, AcquireError> {
        let infos = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| AcquireError::Backend(format!("query devices: {e}")))?;
        Ok(infos
            .iter()
            .map(|info| CameraDevice::new(info.index().to_string()).with_label(info.human_name()))
            .collect())
    }

    fn open(
        constraints: StreamConstraints,
        frame_rate: u32,
    ) -> Result<NativeStream, AcquireError> {
        let device_id = match &constraints.exact_device_id {
            Some(id) => id.clone(),
            None => Self::query()?
                .into_iter()
                .next()
                .map(|d| d.device_id)
                .ok_or(AcquireError::NotSupported)?,
        };

        let format = CameraFormat::new(
            Resolution::new(constraints.ideal_width, constraints.ideal_height),
            FrameFormat::MJPEG,
            frame_rate,
        );
        let request = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(format));

        let mut camera = nokhwa::Camera::new(Self::index_for(&device_id), request)
            .map_err(|e| AcquireError::Backend(format!("create camera {device_id}: {e}")))?;
        camera
            .open_stream()
            .map_err(|e| AcquireError::Backend(format!("open stream {device_id}: {e}")))?;

        let actual = camera.resolution();
        tracing::info!(
            device_id = %device_id,
            width = actual.width(),
            height = actual.height(),
            "Native camera stream opened"
        );

        Ok(NativeStream {
            device_id,
            constraints,
            settings: TrackSettings {
                width: Some(actual.width()),
                height: Some(actual.height()),
                frame_rate: Some(camera.frame_rate() as f64),
                ..Default::default()
            },
            camera: RefCell::new(camera),
            sequence: Cell::new(0),
            live: true,
        })
    }
}

impl Default for NativeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProvider for NativeProvider {
    type Stream = NativeStream;

    fn enumerate_video_devices(
        &self,
    ) -> LocalBoxFuture<'static, Result<Vec<CameraDevice>, AcquireError>> {
        async move { Self::query() }.boxed_local()
    }

    fn acquire_stream(
        &self,
        constraints: StreamConstraints,
    ) -> LocalBoxFuture<'static, Result<NativeStream, AcquireError>> {
        let frame_rate = self.frame_rate;
        async move { Self::open(constraints, frame_rate) }.boxed_local()
    }
}

/// Open `nokhwa` camera stream.
pub struct NativeStream {
    device_id: String,
    constraints: StreamConstraints,
    settings: TrackSettings,
    camera: RefCell<nokhwa::Camera>,
    sequence: Cell<u64>,
    live: bool,
}

impl VideoStream for NativeStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn constraints(&self) -> &StreamConstraints {
        &self.constraints
    }

    fn capabilities(&self) -> CapabilityQuery {
        CapabilityQuery::Unsupported
    }

    fn current_frame(&self) -> Option<Frame> {
        if !self.live {
            return None;
        }
        let mut camera = self.camera.try_borrow_mut().ok()?;
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!(device_id = %self.device_id, error = %e, "Frame read failed");
                return None;
            }
        };
        let decoded = match buffer.decode_image::<RgbAFormat>() {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(device_id = %self.device_id, error = %e, "Frame decode failed");
                return None;
            }
        };
        let (width, height) = (decoded.width(), decoded.height());
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);
        Frame::from_rgba(decoded.into_raw(), width, height, sequence)
    }

    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn apply_settings(&mut self, settings: &TrackSettings) -> Result<(), AcquireError> {
        let camera = self.camera.get_mut();
        if let (Some(width), Some(height)) = (settings.width, settings.height) {
            camera
                .set_resolution(Resolution::new(width, height))
                .map_err(|e| AcquireError::ConstraintRejected(e.to_string()))?;
        }
        if let Some(rate) = settings.frame_rate {
            camera
                .set_frame_rate(rate.round() as u32)
                .map_err(|e| AcquireError::ConstraintRejected(e.to_string()))?;
        }
        self.settings.merge(settings);
        Ok(())
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            if let Err(e) = self.camera.get_mut().stop_stream() {
                tracing::warn!(device_id = %self.device_id, error = %e, "Failed to stop stream");
            }
            tracing::info!(device_id = %self.device_id, "Native camera stream closed");
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

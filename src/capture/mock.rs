//! In-memory capability provider for tests and demos.
//!
//! Generates synthetic frames and keeps counters that make stream
//! ownership observable: how many streams were acquired, released,
//! are live right now, and the highest number ever live at once.

use super::{
    AcquireError, CameraCapabilities, CameraDevice, CapabilityProvider, CapabilityQuery,
    DeviceCapabilities, FacingMode, FocusMode, Frame, StreamConstraints, TrackSettings,
    VideoStream,
};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use image::{Rgba, RgbaImage};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// A device known to the mock, with the track it produces when opened.
#[derive(Debug, Clone)]
pub struct MockDevice {
    /// Entry returned by enumeration.
    pub device: CameraDevice,
    /// Capabilities reported by streams opened on the device.
    pub track: CapabilityQuery,
    /// Frame size produced by its streams.
    pub resolution: (u32, u32),
}

impl MockDevice {
    /// Creates a device whose enumeration entry and track both report
    /// the given facing and focus modes.
    pub fn new(id: &str, facing: FacingMode, focus_modes: &[FocusMode]) -> Self {
        let capabilities = DeviceCapabilities {
            facing_modes: vec![facing],
            focus_modes: focus_modes.to_vec(),
            focus_distance: None,
        };
        Self {
            device: CameraDevice::new(id)
                .with_label(format!("Mock {facing} camera {id}"))
                .with_capabilities(capabilities),
            track: CapabilityQuery::Known(CameraCapabilities {
                facing_modes: vec![facing],
                focus_modes: focus_modes.to_vec(),
                focus_distance: None,
                device_id: Some(id.to_string()),
            }),
            resolution: (1920, 1080),
        }
    }

    /// Creates a device that reports no capabilities at all.
    pub fn opaque(id: &str) -> Self {
        Self {
            device: CameraDevice::new(id),
            track: CapabilityQuery::Unsupported,
            resolution: (1920, 1080),
        }
    }

    /// Sets the frame size of streams opened on the device.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }
}

/// Counters describing stream ownership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCounters {
    /// Device enumerations served.
    pub enumerations: u64,
    /// Streams handed out.
    pub acquisitions: u64,
    /// Streams released through the provider.
    pub releases: u64,
    /// Streams acquired and not yet stopped.
    pub live: usize,
    /// Highest `live` value ever observed.
    pub peak_live: usize,
    /// Streams dropped without being stopped.
    pub leaked: u64,
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    persistent_failure: Option<AcquireError>,
    queued_failures: VecDeque<AcquireError>,
    hold: bool,
    held: Vec<oneshot::Sender<()>>,
    counters: MockCounters,
    next_serial: u64,
}

/// Mock provider with shared, inspectable state.
///
/// Cloning yields a handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    state: Rc<RefCell<MockState>>,
}

impl MockProvider {
    /// Creates a provider with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that enumerates `devices` in order.
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let provider = Self::new();
        provider.state.borrow_mut().devices = devices;
        provider
    }

    /// Plugs in a device.
    pub fn add_device(&self, device: MockDevice) {
        self.state.borrow_mut().devices.push(device);
    }

    /// Unplugs a device. Streams already open on it stay live.
    pub fn remove_device(&self, device_id: &str) {
        self.state
            .borrow_mut()
            .devices
            .retain(|d| d.device.device_id != device_id);
    }

    /// Makes every acquisition fail with `error` until cleared.
    pub fn set_failure(&self, error: Option<AcquireError>) {
        self.state.borrow_mut().persistent_failure = error;
    }

    /// Makes the next acquisition fail with `error`.
    pub fn fail_next(&self, error: AcquireError) {
        self.state.borrow_mut().queued_failures.push_back(error);
    }

    /// While holding, acquisitions stay pending until [`Self::release_held`].
    pub fn set_hold(&self, hold: bool) {
        self.state.borrow_mut().hold = hold;
    }

    /// Lets every pending acquisition complete.
    pub fn release_held(&self) -> usize {
        let held: Vec<_> = self.state.borrow_mut().held.drain(..).collect();
        let count = held.len();
        for tx in held {
            let _ = tx.send(());
        }
        count
    }

    /// Number of acquisitions waiting on the hold gate.
    pub fn pending(&self) -> usize {
        self.state.borrow().held.len()
    }

    /// Snapshot of the ownership counters.
    pub fn counters(&self) -> MockCounters {
        self.state.borrow().counters
    }

    fn open(
        state: &Rc<RefCell<MockState>>,
        constraints: StreamConstraints,
    ) -> Result<MockStream, AcquireError> {
        let mut s = state.borrow_mut();
        if let Some(err) = s.queued_failures.pop_front() {
            return Err(err);
        }
        if let Some(err) = s.persistent_failure.clone() {
            return Err(err);
        }
        if s.devices.is_empty() {
            return Err(AcquireError::NotSupported);
        }

        let device = match &constraints.exact_device_id {
            Some(id) => s
                .devices
                .iter()
                .find(|d| &d.device.device_id == id)
                .cloned()
                .ok_or_else(|| AcquireError::DeviceNotFound(id.clone()))?,
            None => s
                .devices
                .iter()
                .find(|d| d.device.supports_facing_mode(constraints.facing_mode))
                .or_else(|| s.devices.first())
                .cloned()
                .ok_or(AcquireError::NotSupported)?,
        };

        s.next_serial += 1;
        s.counters.acquisitions += 1;
        s.counters.live += 1;
        s.counters.peak_live = s.counters.peak_live.max(s.counters.live);
        let serial = s.next_serial;
        drop(s);

        let (width, height) = device.resolution;
        Ok(MockStream {
            serial,
            device_id: device.device.device_id.clone(),
            constraints,
            track: device.track.clone(),
            resolution: device.resolution,
            settings: TrackSettings {
                width: Some(width),
                height: Some(height),
                frame_rate: Some(30.0),
                ..Default::default()
            },
            frames: Cell::new(0),
            live: true,
            state: Rc::clone(state),
        })
    }
}

impl CapabilityProvider for MockProvider {
    type Stream = MockStream;

    fn enumerate_video_devices(
        &self,
    ) -> LocalBoxFuture<'static, Result<Vec<CameraDevice>, AcquireError>> {
        let state = Rc::clone(&self.state);
        async move {
            let mut s = state.borrow_mut();
            s.counters.enumerations += 1;
            let devices: Vec<CameraDevice> = s.devices.iter().map(|d| d.device.clone()).collect();
            Ok(devices)
        }
        .boxed_local()
    }

    fn acquire_stream(
        &self,
        constraints: StreamConstraints,
    ) -> LocalBoxFuture<'static, Result<MockStream, AcquireError>> {
        let state = Rc::clone(&self.state);
        let gate = {
            let mut s = state.borrow_mut();
            if s.hold {
                let (tx, rx) = oneshot::channel();
                s.held.push(tx);
                Some(rx)
            } else {
                None
            }
        };

        async move {
            if let Some(rx) = gate {
                // A dropped sender still lets the acquisition proceed.
                let _ = rx.await;
            }
            Self::open(&state, constraints)
        }
        .boxed_local()
    }
}

/// Stream produced by [`MockProvider`].
#[derive(Debug)]
pub struct MockStream {
    serial: u64,
    device_id: String,
    constraints: StreamConstraints,
    track: CapabilityQuery,
    resolution: (u32, u32),
    settings: TrackSettings,
    frames: Cell<u64>,
    live: bool,
    state: Rc<RefCell<MockState>>,
}

impl MockStream {
    /// Provider-wide serial number, distinct for every acquisition.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl VideoStream for MockStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn constraints(&self) -> &StreamConstraints {
        &self.constraints
    }

    fn capabilities(&self) -> CapabilityQuery {
        self.track.clone()
    }

    fn current_frame(&self) -> Option<Frame> {
        if !self.live {
            return None;
        }
        let (width, height) = self.resolution;
        let shade = (self.serial % 256) as u8;
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                shade,
                255,
            ])
        });
        let sequence = self.frames.get() + 1;
        self.frames.set(sequence);
        Some(Frame::new(image, sequence))
    }

    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn apply_settings(&mut self, settings: &TrackSettings) -> Result<(), AcquireError> {
        if let (Some(mode), CapabilityQuery::Known(caps)) = (settings.focus_mode, &self.track) {
            if !caps.focus_modes.contains(&mode) {
                return Err(AcquireError::ConstraintRejected(format!(
                    "focus mode {mode:?} not supported by {}",
                    self.device_id
                )));
            }
        }
        self.settings.merge(settings);
        Ok(())
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            let mut s = self.state.borrow_mut();
            s.counters.live -= 1;
            s.counters.releases += 1;
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        if self.live {
            if let Ok(mut s) = self.state.try_borrow_mut() {
                s.counters.leaked += 1;
            }
            tracing::warn!(device_id = %self.device_id, "MockStream dropped while live");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn constraints(facing: FacingMode) -> StreamConstraints {
        StreamConstraints {
            facing_mode: facing,
            ideal_width: 1920,
            ideal_height: 1080,
            exact_device_id: None,
        }
    }

    #[test]
    fn test_acquire_and_release_lifecycle() {
        let provider = MockProvider::with_devices(vec![MockDevice::new(
            "front",
            FacingMode::User,
            &[FocusMode::Continuous],
        )
        .with_resolution(8, 4)]);

        let stream = block_on(provider.acquire_stream(constraints(FacingMode::User))).unwrap();
        assert_eq!(stream.device_id(), "front");
        assert_eq!(provider.counters().live, 1);

        let frame = stream.current_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 4));

        provider.release_stream(stream);
        let counters = provider.counters();
        assert_eq!(counters.live, 0);
        assert_eq!(counters.releases, 1);
        assert_eq!(counters.leaked, 0);
    }

    #[test]
    fn test_exact_device_not_found() {
        let provider = MockProvider::with_devices(vec![MockDevice::opaque("a")]);
        let mut c = constraints(FacingMode::User);
        c.exact_device_id = Some("missing".into());

        let result = block_on(provider.acquire_stream(c));
        assert!(matches!(result, Err(AcquireError::DeviceNotFound(_))));
    }

    #[test]
    fn test_no_devices_not_supported() {
        let provider = MockProvider::new();
        let result = block_on(provider.acquire_stream(constraints(FacingMode::User)));
        assert!(matches!(result, Err(AcquireError::NotSupported)));
    }

    #[test]
    fn test_queued_failure_applies_once() {
        let provider = MockProvider::with_devices(vec![MockDevice::opaque("a")]);
        provider.fail_next(AcquireError::PermissionDenied);

        let first = block_on(provider.acquire_stream(constraints(FacingMode::User)));
        assert_eq!(first.unwrap_err(), AcquireError::PermissionDenied);

        let second = block_on(provider.acquire_stream(constraints(FacingMode::User))).unwrap();
        provider.release_stream(second);
    }

    #[test]
    fn test_rejects_unsupported_focus_mode() {
        let provider = MockProvider::with_devices(vec![MockDevice::new(
            "rear",
            FacingMode::Environment,
            &[FocusMode::SingleShot],
        )]);
        let mut stream =
            block_on(provider.acquire_stream(constraints(FacingMode::Environment))).unwrap();

        let result = stream.apply_settings(&TrackSettings {
            focus_mode: Some(FocusMode::Continuous),
            ..Default::default()
        });
        assert!(matches!(result, Err(AcquireError::ConstraintRejected(_))));
        provider.release_stream(stream);
    }
}

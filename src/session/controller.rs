//! Camera session controller.
//!
//! Owns the stream, the device list and the switch counter, and moves
//! between [`SessionState`]s. External events (facing-mode change,
//! camera switch, stop) only record the requested transition;
//! [`CameraSession::drive`] runs the entry actions, and
//! [`CameraSession::settle`] additionally waits for in-flight
//! acquisitions.
//!
//! Acquisitions run as local tasks (`tokio::task::spawn_local`), so the
//! session must be driven from inside a `tokio::task::LocalSet`.

use super::state::Phase;
use super::token::CancelToken;
use super::{SessionError, SessionState, SessionStats};
use crate::capture::{
    AcquireError, CameraCapabilities, CameraDevice, CapabilityProvider, ConfigError, FacingMode,
    SessionConfig, TrackSettings, VideoStream,
};
use crate::pipeline::{
    self, CaptureError, CaptureRequest, CapturedImage, LayoutSnapshot, NotReadyReason,
    OverlayRegion,
};
use crate::selection::{devices_for_facing_mode, next_device_id, QualityCheck};
use std::rc::Rc;
use tokio::sync::mpsc;

type DevicesCallback = Box<dyn FnMut(&[CameraDevice])>;
type CapabilitiesCallback = Box<dyn FnMut(&CameraCapabilities)>;
type FailureCallback = Box<dyn FnMut(&AcquireError)>;

#[derive(Default)]
struct Observers {
    devices: Vec<DevicesCallback>,
    capabilities: Vec<CapabilitiesCallback>,
    failures: Vec<FailureCallback>,
}

/// What an acquisition task reports back.
enum Acquisition<S> {
    Stream {
        stream: S,
        devices: Result<Vec<CameraDevice>, AcquireError>,
    },
    Failed(AcquireError),
}

struct Outcome<S> {
    generation: u64,
    acquisition: Acquisition<S>,
}

/// A live camera session.
pub struct CameraSession<P: CapabilityProvider> {
    provider: Rc<P>,
    config: SessionConfig,
    phase: Phase<P::Stream>,

    facing_mode: FacingMode,
    /// Device requested for the next acquisition; `None` selects by facing mode.
    device_id: Option<String>,
    devices: Vec<CameraDevice>,
    capabilities: CameraCapabilities,
    switch_attempts: u32,

    not_supported: bool,
    permission_denied: bool,
    last_error: Option<AcquireError>,

    /// Generation of the most recently issued acquisition.
    generation: u64,
    /// Generation still awaiting a result, current or superseded.
    in_flight: Option<u64>,
    token: CancelToken,
    outcomes_tx: mpsc::UnboundedSender<Outcome<P::Stream>>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome<P::Stream>>,

    observers: Observers,
    stats: SessionStats,
    disposed: bool,
}

impl<P: CapabilityProvider> CameraSession<P> {
    /// Creates a session in the `Start` state.
    ///
    /// Nothing is acquired until the session is driven.
    pub fn new(provider: P, config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        tracing::info!(
            facing_mode = %config.facing_mode,
            width = config.width,
            height = config.height,
            "Camera session created"
        );

        Ok(Self {
            provider: Rc::new(provider),
            facing_mode: config.facing_mode,
            device_id: config.device_id.clone(),
            config,
            phase: Phase::Start,
            devices: Vec::new(),
            capabilities: CameraCapabilities::default(),
            switch_attempts: 0,
            not_supported: false,
            permission_denied: false,
            last_error: None,
            generation: 0,
            in_flight: None,
            token: CancelToken::new(),
            outcomes_tx,
            outcomes_rx,
            observers: Observers::default(),
            stats: SessionStats::default(),
            disposed: false,
        })
    }

    /// Provider the session acquires from.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Configuration the session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    /// Requested facing mode.
    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    /// Device requested for the next acquisition.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Most recently enumerated devices.
    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    /// Capabilities of the live stream, empty when none is bound.
    pub fn capabilities(&self) -> &CameraCapabilities {
        &self.capabilities
    }

    /// Live stream, if the session is `Started`.
    pub fn stream(&self) -> Option<&P::Stream> {
        self.phase.stream()
    }

    /// Automatic switches since the last facing-mode change.
    pub fn switch_attempts(&self) -> u32 {
        self.switch_attempts
    }

    /// True after an acquisition failed with `NotSupported`.
    pub fn not_supported(&self) -> bool {
        self.not_supported
    }

    /// True after an acquisition failed with `PermissionDenied`.
    pub fn permission_denied(&self) -> bool {
        self.permission_denied
    }

    /// Error of the most recent failed acquisition, cleared on success.
    pub fn last_error(&self) -> Option<&AcquireError> {
        self.last_error.as_ref()
    }

    /// Running totals.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// True once [`Self::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Registers a callback for device list updates.
    pub fn on_devices_changed(&mut self, callback: impl FnMut(&[CameraDevice]) + 'static) {
        self.observers.devices.push(Box::new(callback));
    }

    /// Registers a callback for capability snapshot updates.
    pub fn on_capabilities_changed(
        &mut self,
        callback: impl FnMut(&CameraCapabilities) + 'static,
    ) {
        self.observers.capabilities.push(Box::new(callback));
    }

    /// Registers a callback for acquisition failures.
    pub fn on_acquisition_failed(&mut self, callback: impl FnMut(&AcquireError) + 'static) {
        self.observers.failures.push(Box::new(callback));
    }

    // ---------------------------------------------------------------
    // External events
    // ---------------------------------------------------------------

    /// Changes the facing mode.
    ///
    /// Clears the device choice and the switch counter. Restarts the
    /// stream unless the session is still in `Start`, where the pending
    /// acquisition will pick up the new mode anyway.
    pub fn set_facing_mode(&mut self, facing_mode: FacingMode) {
        if self.disposed || facing_mode == self.facing_mode {
            return;
        }

        tracing::info!(from = %self.facing_mode, to = %facing_mode, "Facing mode changed");
        self.facing_mode = facing_mode;
        self.device_id = None;
        self.switch_attempts = 0;

        if self.state() != SessionState::Start {
            self.force(SessionState::Restart);
        }
    }

    /// Switches to `device_id`, or to the next candidate for the current
    /// facing mode when `None`.
    ///
    /// Returns the id switched to.
    pub fn switch_camera(&mut self, device_id: Option<&str>) -> Result<String, SessionError> {
        let target = self.switch_to(device_id)?;
        self.stats.manual_switches += 1;
        Ok(target)
    }

    fn switch_to(&mut self, device_id: Option<&str>) -> Result<String, SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }

        let target = match device_id {
            Some(id) => id.to_string(),
            None => self
                .next_candidate()
                .ok_or(SessionError::DeviceSwitchUnavailable)?,
        };

        tracing::info!(device_id = %target, "Switching camera");
        self.device_id = Some(target.clone());
        self.force(SessionState::Restart);
        Ok(target)
    }

    /// Stops the session and releases the stream.
    pub fn stop(&mut self) {
        if self.disposed {
            return;
        }
        tracing::info!("Stop requested");
        self.force(SessionState::Stop);
    }

    /// Clears recorded acquisition failures and tries again.
    pub fn retry(&mut self) {
        if self.disposed {
            return;
        }
        tracing::info!(
            not_supported = self.not_supported,
            permission_denied = self.permission_denied,
            "Retrying acquisition"
        );
        self.not_supported = false;
        self.permission_denied = false;
        self.last_error = None;
        self.force(SessionState::Restart);
    }

    /// Applies a partial settings update to the live stream.
    pub fn apply_settings(&mut self, settings: &TrackSettings) -> Result<(), SessionError> {
        let stream = self.phase.stream_mut().ok_or(SessionError::NotReady)?;
        stream
            .apply_settings(settings)
            .map_err(SessionError::Settings)?;
        tracing::debug!(?settings, "Track settings applied");
        Ok(())
    }

    /// Current track settings of the live stream.
    pub fn settings(&self) -> Result<TrackSettings, SessionError> {
        self.phase
            .stream()
            .map(|s| s.settings())
            .ok_or(SessionError::NotReady)
    }

    /// Current track settings as pretty-printed JSON.
    pub fn settings_json(&self) -> Result<String, SessionError> {
        let settings = self.settings()?;
        serde_json::to_string_pretty(&settings)
            .map_err(|e| SessionError::Serialize(e.to_string()))
    }

    /// Re-enumerates devices after a hot-plug notification.
    ///
    /// Restarts only when the live stream's device disappeared. A pinned
    /// device that is gone is forgotten without restarting, so a stopped
    /// session stays stopped. A failed session with `not_supported` set
    /// restarts once devices show up again.
    pub async fn devices_changed(&mut self) -> Result<(), AcquireError> {
        let devices = self.provider.enumerate_video_devices().await?;
        if self.disposed {
            return Ok(());
        }
        self.set_devices(devices);

        let pinned_gone = self
            .device_id
            .as_deref()
            .is_some_and(|id| !self.has_device(id));
        if pinned_gone {
            if let Some(id) = self.device_id.take() {
                tracing::info!(device_id = %id, "Requested camera disappeared");
            }
        }

        // Only `Started` holds a stream outside of teardown.
        let active = self.phase.stream().map(|s| s.device_id().to_string());
        if let Some(id) = active {
            if !self.has_device(&id) {
                tracing::warn!(device_id = %id, "Active camera disappeared");
                self.force(SessionState::Restart);
                return Ok(());
            }
        }

        if self.not_supported && !self.devices.is_empty() {
            tracing::info!(count = self.devices.len(), "Cameras available again");
            self.not_supported = false;
            if self.state() == SessionState::Starting {
                self.force(SessionState::Restart);
            }
        }
        Ok(())
    }

    fn has_device(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d.device_id == device_id)
    }

    /// Captures a photo from the live stream.
    pub fn take_photo(&mut self, layout: &LayoutSnapshot) -> Result<CapturedImage, CaptureError> {
        let reason = if self.not_supported {
            Some(NotReadyReason::NotSupported)
        } else if self.permission_denied {
            Some(NotReadyReason::PermissionDenied)
        } else if self.devices.is_empty() {
            Some(NotReadyReason::NoDevices)
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CaptureError::NotReady(reason));
        }

        let frame = self
            .phase
            .stream()
            .and_then(|s| s.current_frame())
            .ok_or(CaptureError::NotReady(NotReadyReason::NoStream))?;

        let request = self.capture_request(layout.overlay);
        let image = pipeline::capture(&request, &frame, layout.container)?;
        self.stats.photos += 1;
        Ok(image)
    }

    /// Builds the capture request the session would use right now.
    pub fn capture_request(&self, overlay: Option<OverlayRegion>) -> CaptureRequest {
        let capture = &self.config.capture;
        CaptureRequest {
            mirror: capture.mirror.resolve(self.facing_mode),
            format: capture.format,
            quality: capture.quality,
            filter: capture.filter,
            overflow: capture.overflow,
            overlay,
            fallback_size: capture.fallback_size(),
        }
    }

    /// Tears the session down.
    ///
    /// Any acquisition still in flight releases its stream when it
    /// completes instead of reporting back.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.token.cancel();
        if let Some(stream) = self.phase.take_stream() {
            self.release(stream);
        }

        // Results already queued would otherwise be dropped with the
        // receiver while their streams are still live.
        self.outcomes_rx.close();
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            if let Acquisition::Stream { stream, .. } = outcome.acquisition {
                self.stats.stale_results += 1;
                self.release(stream);
            }
        }
        self.phase = Phase::Stopped;
        tracing::info!(in_flight = self.in_flight.is_some(), "Camera session disposed");
    }

    // ---------------------------------------------------------------
    // State machine
    // ---------------------------------------------------------------

    /// Applies arrived acquisition results and runs entry actions until
    /// the session has to wait.
    pub fn drive(&mut self) {
        if self.disposed {
            return;
        }
        self.poll_outcomes();
        while self.step() {}
    }

    /// Drives the session until no acquisition is in flight.
    ///
    /// Returns the resulting state. A failed acquisition leaves the
    /// session in `Starting` with the failure recorded.
    pub async fn settle(&mut self) -> SessionState {
        loop {
            self.drive();
            if self.disposed || self.in_flight.is_none() {
                return self.state();
            }

            match self.outcomes_rx.recv().await {
                Some(outcome) => self.apply_outcome(outcome),
                None => return self.state(),
            }
        }
    }

    /// Applies every acquisition result that has already arrived.
    pub fn poll_outcomes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.apply_outcome(outcome);
            applied += 1;
        }
        applied
    }

    /// Runs the entry action of the current state.
    ///
    /// Returns true if the state changed.
    fn step(&mut self) -> bool {
        match self.state() {
            SessionState::Start => self.begin_acquisition(),
            SessionState::Starting | SessionState::Stopped => false,
            SessionState::Started => self.adjust_camera(),
            SessionState::Restart => {
                self.teardown();
                self.transition(Phase::Start);
                true
            }
            SessionState::Stop => {
                self.teardown();
                self.transition(Phase::Stopped);
                true
            }
        }
    }

    fn transition(&mut self, next: Phase<P::Stream>) {
        let from = self.state();
        self.phase = next;
        tracing::debug!(%from, to = %self.state(), "Session state transition");
    }

    /// Records an externally forced transition, carrying any stream along
    /// for teardown.
    fn force(&mut self, target: SessionState) {
        let from = self.state();
        let stream = self.phase.take_stream();
        self.phase = match target {
            SessionState::Stop => Phase::Stop { stream },
            _ => Phase::Restart { stream },
        };
        tracing::debug!(%from, to = %self.state(), "Session state forced");
    }

    fn begin_acquisition(&mut self) -> bool {
        if let Some(generation) = self.in_flight {
            // One stream at a time: a superseded acquisition must resolve
            // and be released before the next one is issued.
            tracing::debug!(generation, "Waiting for superseded acquisition");
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        self.in_flight = Some(generation);

        let constraints = self
            .config
            .constraints(self.facing_mode, self.device_id.as_deref());
        tracing::info!(
            generation,
            facing_mode = %constraints.facing_mode,
            device_id = ?constraints.exact_device_id,
            "Acquiring camera stream"
        );

        let provider = Rc::clone(&self.provider);
        let token = self.token.clone();
        let tx = self.outcomes_tx.clone();

        tokio::task::spawn_local(async move {
            let acquisition = match provider.acquire_stream(constraints).await {
                Ok(stream) => {
                    let devices = provider.enumerate_video_devices().await;
                    Acquisition::Stream { stream, devices }
                }
                Err(e) => Acquisition::Failed(e),
            };

            if token.is_cancelled() {
                if let Acquisition::Stream { stream, .. } = acquisition {
                    tracing::debug!(generation, "Session gone, releasing late stream");
                    provider.release_stream(stream);
                }
                return;
            }

            if let Err(mpsc::error::SendError(outcome)) = tx.send(Outcome {
                generation,
                acquisition,
            }) {
                if let Acquisition::Stream { stream, .. } = outcome.acquisition {
                    provider.release_stream(stream);
                }
            }
        });

        self.transition(Phase::Starting);
        true
    }

    fn apply_outcome(&mut self, outcome: Outcome<P::Stream>) {
        if self.in_flight == Some(outcome.generation) {
            self.in_flight = None;
        }

        let current =
            self.state() == SessionState::Starting && outcome.generation == self.generation;
        if !current || self.disposed {
            self.stats.stale_results += 1;
            if let Acquisition::Stream { stream, .. } = outcome.acquisition {
                tracing::warn!(
                    generation = outcome.generation,
                    device_id = %stream.device_id(),
                    "Discarding stale stream"
                );
                self.release(stream);
            }
            return;
        }

        match outcome.acquisition {
            Acquisition::Stream { stream, devices } => {
                self.stats.acquisitions += 1;
                self.not_supported = false;
                self.permission_denied = false;
                self.last_error = None;
                tracing::info!(
                    generation = outcome.generation,
                    device_id = %stream.device_id(),
                    "Camera stream started"
                );

                match devices {
                    Ok(devices) => self.set_devices(devices),
                    Err(e) => tracing::warn!(error = %e, "Device enumeration failed"),
                }
                self.set_capabilities(stream.capabilities().into_capabilities());
                self.transition(Phase::Started {
                    stream,
                    adjusted: false,
                });
            }
            Acquisition::Failed(error) => {
                self.stats.acquisition_failures += 1;
                match &error {
                    AcquireError::NotSupported => self.not_supported = true,
                    AcquireError::PermissionDenied => self.permission_denied = true,
                    AcquireError::DeviceNotFound(id) if self.device_id.as_ref() == Some(id) => {
                        // Fall back to facing-mode selection on the next start.
                        self.device_id = None;
                    }
                    _ => {}
                }
                tracing::warn!(
                    generation = outcome.generation,
                    error = %error,
                    "Camera acquisition failed"
                );
                for callback in &mut self.observers.failures {
                    callback(&error);
                }
                self.last_error = Some(error);
            }
        }
    }

    /// Entry action of `Started`: replace a low-quality camera while
    /// untried candidates remain.
    fn adjust_camera(&mut self) -> bool {
        match &mut self.phase {
            Phase::Started { adjusted, .. } if !*adjusted => *adjusted = true,
            _ => return false,
        }

        let violation = match QualityCheck.check(&self.capabilities, self.facing_mode) {
            Ok(()) => return false,
            Err(violation) => violation,
        };

        let candidates = devices_for_facing_mode(&self.devices, self.facing_mode).len();
        if candidates <= 1 || self.switch_attempts as usize >= candidates {
            tracing::debug!(
                %violation,
                candidates,
                attempts = self.switch_attempts,
                "Keeping camera, no untried candidates"
            );
            return false;
        }

        self.switch_attempts += 1;
        match self.switch_to(None) {
            Ok(device_id) => {
                self.stats.auto_switches += 1;
                tracing::info!(
                    %violation,
                    device_id = %device_id,
                    attempt = self.switch_attempts,
                    "Upgrading camera"
                );
                true
            }
            Err(e) => {
                tracing::debug!(%violation, error = %e, "No camera to upgrade to");
                false
            }
        }
    }

    fn next_candidate(&self) -> Option<String> {
        let current = self
            .phase
            .stream()
            .map(|s| s.device_id().to_string())
            .or_else(|| self.capabilities.device_id.clone())
            .or_else(|| self.device_id.clone())?;
        let candidates = devices_for_facing_mode(&self.devices, self.facing_mode);
        next_device_id(&candidates, &current).map(str::to_string)
    }

    fn teardown(&mut self) {
        if let Some(stream) = self.phase.take_stream() {
            self.release(stream);
        }
        self.set_capabilities(CameraCapabilities::default());
    }

    fn release(&mut self, stream: P::Stream) {
        tracing::debug!(device_id = %stream.device_id(), "Releasing camera stream");
        self.provider.release_stream(stream);
        self.stats.releases += 1;
    }

    fn set_devices(&mut self, devices: Vec<CameraDevice>) {
        if devices == self.devices {
            return;
        }
        tracing::debug!(count = devices.len(), "Device list updated");
        self.devices = devices;
        for callback in &mut self.observers.devices {
            callback(&self.devices);
        }
    }

    fn set_capabilities(&mut self, capabilities: CameraCapabilities) {
        if capabilities == self.capabilities {
            return;
        }
        self.capabilities = capabilities;
        for callback in &mut self.observers.capabilities {
            callback(&self.capabilities);
        }
    }
}

impl<P: CapabilityProvider> Drop for CameraSession<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

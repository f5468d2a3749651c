//! Camera devices, streams and the providers that produce them.
//!
//! A [`CapabilityProvider`] is the session's only route to camera
//! hardware. The in-crate [`MockProvider`] generates synthetic frames;
//! the `camera` feature adds a native provider backed by `nokhwa`.

mod config;
mod device;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod provider;

pub use config::{
    CaptureConfig, ConfigError, FileConfig, MetricsConfig, MirrorPolicy, SessionConfig,
    DEFAULT_HEIGHT, DEFAULT_WIDTH,
};
pub use device::{
    CameraCapabilities, CameraDevice, CapabilityQuery, DeviceCapabilities, FacingMode,
    FocusDistanceRange, FocusMode,
};
pub use frame::Frame;
pub use mock::{MockCounters, MockDevice, MockProvider, MockStream};
#[cfg(feature = "camera")]
pub use native::{NativeProvider, NativeStream};
pub use provider::{
    AcquireError, CapabilityProvider, StreamConstraints, TrackSettings, VideoStream,
};

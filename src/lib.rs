//! Camera Session Library
//!
//! Manages the lifecycle of a camera stream, picks the best available
//! device for a facing mode, and turns the live frame into a cropped,
//! optionally filtered, encoded photo.
//!
//! # Architecture
//!
//! ```text
//! capture (providers, devices, config)
//!     ↓
//! session (state machine) ── selection (candidates, quality)
//!     ↓
//! pipeline (crop → mirror → filter → encode)
//!     ↓
//! metrics (prometheus)
//! ```
//!
//! # Design Principles
//!
//! - **One stream at a time**: a superseded acquisition is released on
//!   arrival, never bound
//! - **Providers are the only hardware boundary**: tests and demos run on
//!   [`MockProvider`]
//! - **Single-threaded**: acquisitions are local tasks, driven from a
//!   `tokio::task::LocalSet`
//!
//! # Example
//!
//! ```no_run
//! use camera_session::{
//!     capture::{FacingMode, FocusMode, MockDevice, MockProvider, SessionConfig},
//!     pipeline::LayoutSnapshot,
//!     session::CameraSession,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MockProvider::with_devices(vec![
//!     MockDevice::new("front", FacingMode::User, &[FocusMode::Continuous]),
//!     MockDevice::new("rear", FacingMode::Environment, &[FocusMode::Continuous]),
//! ]);
//!
//! let mut session = CameraSession::new(provider, SessionConfig::default())?;
//! session.settle().await;
//!
//! session.set_facing_mode(FacingMode::Environment);
//! session.settle().await;
//!
//! let photo = session.take_photo(&LayoutSnapshot::container(300.0, 300.0))?;
//! std::fs::write(photo.suggested_file_name(), &photo.data)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

/// Camera devices, streams, providers and configuration.
pub mod capture;
/// Convolution filters.
pub mod filter;
/// Prometheus metrics for sessions.
pub mod metrics;
/// Photo capture pipeline.
pub mod pipeline;
/// Device selection and quality checks.
pub mod selection;
/// Session state machine.
pub mod session;

// Re-export commonly used types at crate root
pub use capture::{
    AcquireError, CameraCapabilities, CameraDevice, CapabilityProvider, FacingMode, MockProvider,
    SessionConfig,
};
pub use pipeline::{CaptureError, CapturedImage, ImageFormat, LayoutSnapshot};
pub use session::{CameraSession, SessionError, SessionState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

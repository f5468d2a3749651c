//! Prometheus metrics exporter for camera sessions.
//!
//! Exposes session state and running totals in Prometheus format, and
//! optionally over HTTP with the `metrics` feature.
//!
//! # Metrics Exposed
//!
//! ## Session Gauges
//! - `camera_session_state` - Numeric state code (see [`SessionState::code`](crate::session::SessionState::code))
//! - `camera_session_live_streams` - Streams bound to the session
//! - `camera_session_devices` - Devices in the latest enumeration
//!
//! ## Counters
//! - `camera_session_acquisitions_total` - Streams successfully bound
//! - `camera_session_acquisition_failures_total` - Failed acquisitions
//! - `camera_session_auto_switches_total` - Quality-driven camera switches
//! - `camera_session_manual_switches_total` - Caller-requested switches
//! - `camera_session_releases_total` - Streams released
//! - `camera_session_stale_results_total` - Superseded results discarded
//! - `camera_session_photos_total` - Photos captured
//!
//! # Example
//!
//! ```no_run
//! use camera_session::metrics::{MetricsRegistry, MetricsSnapshot};
//! use camera_session::session::SessionState;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! registry.update(&MetricsSnapshot {
//!     state: SessionState::Started,
//!     live_streams: 1,
//!     acquisitions: 1,
//!     ..Default::default()
//! });
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};

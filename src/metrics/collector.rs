//! Metrics collection and registry.

use crate::capture::CapabilityProvider;
use crate::session::{CameraSession, SessionState};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Current session state.
    pub state: SessionState,
    /// Streams currently bound to the session (0 or 1).
    pub live_streams: u64,
    /// Devices in the latest enumeration.
    pub devices: u64,
    /// Streams bound so far.
    pub acquisitions: u64,
    /// Failed acquisitions so far.
    pub acquisition_failures: u64,
    /// Switches made by the quality heuristic.
    pub auto_switches: u64,
    /// Switches requested by the caller.
    pub manual_switches: u64,
    /// Streams released by the session.
    pub releases: u64,
    /// Superseded acquisition results discarded.
    pub stale_results: u64,
    /// Photos captured.
    pub photos: u64,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Start,
            live_streams: 0,
            devices: 0,
            acquisitions: 0,
            acquisition_failures: 0,
            auto_switches: 0,
            manual_switches: 0,
            releases: 0,
            stale_results: 0,
            photos: 0,
        }
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a session.
    pub fn from_session<P: CapabilityProvider>(session: &CameraSession<P>) -> Self {
        let stats = session.stats();
        Self {
            state: session.state(),
            live_streams: u64::from(session.stream().is_some()),
            devices: session.devices().len() as u64,
            acquisitions: stats.acquisitions,
            acquisition_failures: stats.acquisition_failures,
            auto_switches: stats.auto_switches,
            manual_switches: stats.manual_switches,
            releases: stats.releases,
            stale_results: stats.stale_results,
            photos: stats.photos,
        }
    }
}

/// Prometheus metrics registry for camera sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // Session gauges
    state: IntGauge,
    live_streams: IntGauge,
    devices: IntGauge,

    // Acquisition counters
    acquisitions_total: IntCounter,
    acquisition_failures_total: IntCounter,
    auto_switches_total: IntCounter,
    manual_switches_total: IntCounter,
    releases_total: IntCounter,
    stale_results_total: IntCounter,

    photos_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let state = IntGauge::new(
            "camera_session_state",
            "Session state (0=start 1=starting 2=started 3=restart 4=stop 5=stopped)",
        )?;
        let live_streams = IntGauge::new(
            "camera_session_live_streams",
            "Camera streams currently bound to the session",
        )?;
        let devices = IntGauge::new(
            "camera_session_devices",
            "Video input devices in the latest enumeration",
        )?;

        let acquisitions_total = IntCounter::new(
            "camera_session_acquisitions_total",
            "Camera streams successfully bound",
        )?;
        let acquisition_failures_total = IntCounter::new(
            "camera_session_acquisition_failures_total",
            "Camera acquisitions that failed",
        )?;
        let auto_switches_total = IntCounter::new(
            "camera_session_auto_switches_total",
            "Camera switches made by the quality heuristic",
        )?;
        let manual_switches_total = IntCounter::new(
            "camera_session_manual_switches_total",
            "Camera switches requested by the caller",
        )?;
        let releases_total = IntCounter::new(
            "camera_session_releases_total",
            "Camera streams released by the session",
        )?;
        let stale_results_total = IntCounter::new(
            "camera_session_stale_results_total",
            "Acquisition results discarded because they were superseded",
        )?;
        let photos_total =
            IntCounter::new("camera_session_photos_total", "Photos captured")?;

        registry.register(Box::new(state.clone()))?;
        registry.register(Box::new(live_streams.clone()))?;
        registry.register(Box::new(devices.clone()))?;
        registry.register(Box::new(acquisitions_total.clone()))?;
        registry.register(Box::new(acquisition_failures_total.clone()))?;
        registry.register(Box::new(auto_switches_total.clone()))?;
        registry.register(Box::new(manual_switches_total.clone()))?;
        registry.register(Box::new(releases_total.clone()))?;
        registry.register(Box::new(stale_results_total.clone()))?;
        registry.register(Box::new(photos_total.clone()))?;

        Ok(Self {
            registry,
            state,
            live_streams,
            devices,
            acquisitions_total,
            acquisition_failures_total,
            auto_switches_total,
            manual_switches_total,
            releases_total,
            stale_results_total,
            photos_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.state.set(snapshot.state.code());
        self.live_streams.set(snapshot.live_streams as i64);
        self.devices.set(snapshot.devices as i64);

        // Counters only move forward; apply the difference.
        advance(&self.acquisitions_total, snapshot.acquisitions);
        advance(&self.acquisition_failures_total, snapshot.acquisition_failures);
        advance(&self.auto_switches_total, snapshot.auto_switches);
        advance(&self.manual_switches_total, snapshot.manual_switches);
        advance(&self.releases_total, snapshot.releases);
        advance(&self.stale_results_total, snapshot.stale_results);
        advance(&self.photos_total, snapshot.photos);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FacingMode, FocusMode, MockDevice, MockProvider, SessionConfig};
    use tokio::task::LocalSet;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            state: SessionState::Started,
            live_streams: 1,
            devices: 2,
            acquisitions: 3,
            auto_switches: 2,
            photos: 5,
            ..Default::default()
        };
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("camera_session_state 2"));
        assert!(output.contains("camera_session_live_streams 1"));
        assert!(output.contains("camera_session_acquisitions_total 3"));
        assert!(output.contains("camera_session_auto_switches_total 2"));
        assert!(output.contains("camera_session_photos_total 5"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            photos: 4,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            photos: 1,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("camera_session_photos_total 4"));
    }

    #[tokio::test]
    async fn test_snapshot_from_session() {
        LocalSet::new()
            .run_until(async {
                let provider = MockProvider::with_devices(vec![MockDevice::new(
                    "front",
                    FacingMode::User,
                    &[FocusMode::Continuous],
                )]);
                let mut session =
                    CameraSession::new(provider, SessionConfig::default()).unwrap();
                session.settle().await;

                let snapshot = MetricsSnapshot::from_session(&session);
                assert_eq!(snapshot.state, SessionState::Started);
                assert_eq!(snapshot.live_streams, 1);
                assert_eq!(snapshot.devices, 1);
                assert_eq!(snapshot.acquisitions, 1);
            })
            .await;
    }
}

//! Camera device descriptions and track capability snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical camera orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, pointing at the user.
    #[default]
    User,
    /// Rear camera, pointing away from the user.
    Environment,
}

impl FacingMode {
    /// Returns the opposite orientation.
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    /// Lowercase name, as used in config and constraints.
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(FacingMode::User),
            "environment" => Ok(FacingMode::Environment),
            other => Err(format!("unknown facing mode: {other}")),
        }
    }
}

/// Focus modes a track may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    /// No focus control.
    None,
    /// Fixed focus distance set by the caller.
    Manual,
    /// Focuses once on request.
    SingleShot,
    /// Autofocus that tracks the scene.
    Continuous,
}

/// Closed range of supported focus distances, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusDistanceRange {
    /// Nearest focus distance.
    pub min: f64,
    /// Farthest focus distance.
    pub max: f64,
}

/// Capabilities reported for a device at enumeration time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Orientations the device can serve.
    #[serde(default)]
    pub facing_modes: Vec<FacingMode>,
    /// Supported focus modes.
    #[serde(default)]
    pub focus_modes: Vec<FocusMode>,
    /// Focus distance range, when reported.
    #[serde(default)]
    pub focus_distance: Option<FocusDistanceRange>,
}

/// A video input device as returned by enumeration.
///
/// Snapshots go stale after permission grants or hot-plug events and
/// must be re-fetched rather than patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Platform identifier, stable while the device is plugged in.
    pub device_id: String,
    /// Human-readable name; empty before permission is granted.
    #[serde(default)]
    pub label: String,
    /// `None` when the platform does not report capabilities for the device.
    #[serde(default)]
    pub capabilities: Option<DeviceCapabilities>,
}

impl CameraDevice {
    /// Creates a device without label or capabilities.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: String::new(),
            capabilities: None,
        }
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the enumerated capabilities.
    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Returns true if the device may serve the given facing mode.
    ///
    /// Devices without a capability set match every mode.
    pub fn supports_facing_mode(&self, mode: FacingMode) -> bool {
        match &self.capabilities {
            None => true,
            Some(caps) => caps.facing_modes.contains(&mode),
        }
    }
}

/// Snapshot of the active track's capabilities.
///
/// The default value is the empty snapshot, used before the first
/// successful acquisition and after teardown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    /// Orientations the track can serve.
    pub facing_modes: Vec<FacingMode>,
    /// Focus modes the track supports.
    pub focus_modes: Vec<FocusMode>,
    /// Focus distance range, when reported.
    pub focus_distance: Option<FocusDistanceRange>,
    /// Device the track belongs to.
    pub device_id: Option<String>,
}

impl CameraCapabilities {
    /// Returns true if nothing has been reported yet.
    pub fn is_empty(&self) -> bool {
        self.facing_modes.is_empty()
            && self.focus_modes.is_empty()
            && self.focus_distance.is_none()
            && self.device_id.is_none()
    }
}

/// Result of asking a track for its capabilities.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityQuery {
    /// The backend cannot report track capabilities.
    Unsupported,
    /// Capabilities reported by the track.
    Known(CameraCapabilities),
}

impl CapabilityQuery {
    /// Collapses the query into a snapshot, empty when unsupported.
    pub fn into_capabilities(self) -> CameraCapabilities {
        match self {
            CapabilityQuery::Unsupported => CameraCapabilities::default(),
            CapabilityQuery::Known(caps) => caps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_without_capabilities_matches_any_mode() {
        let device = CameraDevice::new("cam-0");
        assert!(device.supports_facing_mode(FacingMode::User));
        assert!(device.supports_facing_mode(FacingMode::Environment));
    }

    #[test]
    fn test_device_with_capabilities_filters_mode() {
        let device = CameraDevice::new("rear").with_capabilities(DeviceCapabilities {
            facing_modes: vec![FacingMode::Environment],
            ..Default::default()
        });
        assert!(!device.supports_facing_mode(FacingMode::User));
        assert!(device.supports_facing_mode(FacingMode::Environment));
    }

    #[test]
    fn test_unsupported_query_is_empty() {
        assert!(CapabilityQuery::Unsupported.into_capabilities().is_empty());
    }

    #[test]
    fn test_focus_mode_serde_names() {
        let json = serde_json::to_string(&FocusMode::SingleShot).unwrap();
        assert_eq!(json, "\"single-shot\"");
        let mode: FacingMode = serde_json::from_str("\"environment\"").unwrap();
        assert_eq!(mode, FacingMode::Environment);
    }
}

//! Session and capture configuration.
//!
//! Every recognized option is listed here with its default. Partial
//! TOML files are accepted; missing keys take the defaults below.

use super::{FacingMode, StreamConstraints};
use crate::filter::{FilterKind, OverflowPolicy};
use crate::pipeline::{FrameSize, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ideal stream width requested from the provider.
pub const DEFAULT_WIDTH: u32 = 1920;
/// Ideal stream height requested from the provider.
pub const DEFAULT_HEIGHT: u32 = 1080;

/// When captured photos are mirrored horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MirrorPolicy {
    /// Mirror only user-facing captures, matching the mirrored preview.
    #[default]
    UserFacing,
    /// Mirror every capture.
    Always,
    /// Never mirror.
    Never,
}

impl MirrorPolicy {
    /// Whether a capture from a `facing_mode` camera is mirrored.
    pub fn resolve(self, facing_mode: FacingMode) -> bool {
        match self {
            MirrorPolicy::UserFacing => facing_mode == FacingMode::User,
            MirrorPolicy::Always => true,
            MirrorPolicy::Never => false,
        }
    }
}

/// Configuration for the capture pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Output encoding.
    pub format: ImageFormat,
    /// Encoder quality in `0.0..=1.0`; ignored by lossless formats.
    pub quality: f32,
    /// Filter applied after cropping.
    pub filter: FilterKind,
    /// When captures are mirrored.
    pub mirror: MirrorPolicy,
    /// How filtered channel values outside `0..=255` are stored.
    pub overflow: OverflowPolicy,
    /// Width assumed when the player or container reports none.
    pub fallback_width: u32,
    /// Height assumed when the player or container reports none.
    pub fallback_height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: 1.0,
            filter: FilterKind::None,
            mirror: MirrorPolicy::UserFacing,
            overflow: OverflowPolicy::Saturate,
            fallback_width: DEFAULT_WIDTH,
            fallback_height: DEFAULT_HEIGHT,
        }
    }
}

impl CaptureConfig {
    /// Fallback dimensions as a [`FrameSize`].
    pub fn fallback_size(&self) -> FrameSize {
        FrameSize::new(self.fallback_width as f64, self.fallback_height as f64)
    }

    /// Validates the capture parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(ConfigError::InvalidQuality(self.quality));
        }
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        Ok(())
    }
}

/// Configuration for a camera session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial facing mode.
    pub facing_mode: FacingMode,
    /// Ideal stream width in pixels.
    pub width: u32,
    /// Ideal stream height in pixels.
    pub height: u32,
    /// Pin the session to one device instead of selecting by facing mode.
    pub device_id: Option<String>,
    /// Capture pipeline options.
    pub capture: CaptureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            device_id: None,
            capture: CaptureConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Creates a new configuration with the specified ideal dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Builds acquisition constraints for the given facing mode and device.
    pub fn constraints(
        &self,
        facing_mode: FacingMode,
        device_id: Option<&str>,
    ) -> StreamConstraints {
        StreamConstraints {
            facing_mode,
            ideal_width: self.width,
            ideal_height: self.height,
            exact_device_id: device_id.map(str::to_string),
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        self.capture.validate()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid quality {0} (must be 0.0-1.0)")]
    InvalidQuality(f32),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Session options (`[session]`).
    #[serde(default)]
    pub session: SessionConfig,
    /// Metrics exporter options (`[metrics]`).
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metrics server port (0 to disable).
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.format, ImageFormat::Jpeg);
        assert_eq!(config.capture.quality, 1.0);
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = SessionConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_quality_out_of_range() {
        let mut config = SessionConfig::default();
        config.capture.quality = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuality(_))
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config = FileConfig::from_toml(
            r#"
            [session]
            facing_mode = "environment"

            [session.capture]
            format = "image/png"
            filter = "sharpen"
            mirror = "never"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.facing_mode, FacingMode::Environment);
        assert_eq!(config.session.width, DEFAULT_WIDTH);
        assert_eq!(config.session.capture.format, ImageFormat::Png);
        assert_eq!(config.session.capture.filter, FilterKind::Sharpen);
        assert_eq!(config.session.capture.mirror, MirrorPolicy::Never);
        assert_eq!(config.metrics.port, 9090);
    }

    #[test]
    fn test_mirror_policy() {
        assert!(MirrorPolicy::UserFacing.resolve(FacingMode::User));
        assert!(!MirrorPolicy::UserFacing.resolve(FacingMode::Environment));
        assert!(MirrorPolicy::Always.resolve(FacingMode::Environment));
        assert!(!MirrorPolicy::Never.resolve(FacingMode::User));
    }

    #[test]
    fn test_constraints_carry_device() {
        let config = SessionConfig::default();
        let constraints = config.constraints(FacingMode::Environment, Some("rear"));
        assert_eq!(constraints.exact_device_id.as_deref(), Some("rear"));
        assert_eq!(constraints.ideal_width, DEFAULT_WIDTH);
    }
}

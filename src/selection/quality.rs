//! Camera quality heuristic.
//!
//! A camera is acceptable when it faces the requested way and offers
//! continuous autofocus. Fixed-focus and single-shot cameras are
//! candidates for automatic replacement.

use crate::capture::{CameraCapabilities, FacingMode, FocusMode};

/// Reasons a camera fails the quality check.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityViolation {
    #[error("camera does not face {requested}")]
    FacingModeMismatch { requested: FacingMode },

    #[error("camera lacks continuous autofocus")]
    NoContinuousFocus,
}

/// Quality check against the active track's capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityCheck;

impl QualityCheck {
    /// Checks `capabilities` for `requested`.
    ///
    /// An empty snapshot passes: nothing has been reported yet.
    pub fn check(
        &self,
        capabilities: &CameraCapabilities,
        requested: FacingMode,
    ) -> Result<(), QualityViolation> {
        if capabilities.is_empty() {
            return Ok(());
        }

        if !capabilities.facing_modes.contains(&requested) {
            return Err(QualityViolation::FacingModeMismatch { requested });
        }

        if !capabilities.focus_modes.contains(&FocusMode::Continuous) {
            return Err(QualityViolation::NoContinuousFocus);
        }

        Ok(())
    }
}

/// Returns true if the active camera needs no replacement.
pub fn is_acceptable(capabilities: &CameraCapabilities, requested: FacingMode) -> bool {
    QualityCheck.check(capabilities, requested).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(facing: &[FacingMode], focus: &[FocusMode]) -> CameraCapabilities {
        CameraCapabilities {
            facing_modes: facing.to_vec(),
            focus_modes: focus.to_vec(),
            focus_distance: None,
            device_id: Some("cam".into()),
        }
    }

    #[test]
    fn test_empty_capabilities_acceptable() {
        assert!(is_acceptable(&CameraCapabilities::default(), FacingMode::User));
    }

    #[test]
    fn test_single_shot_rejected() {
        let c = caps(&[FacingMode::Environment], &[FocusMode::SingleShot]);
        assert_eq!(
            QualityCheck.check(&c, FacingMode::Environment),
            Err(QualityViolation::NoContinuousFocus)
        );
        assert!(!is_acceptable(&c, FacingMode::Environment));
    }

    #[test]
    fn test_facing_mismatch_rejected_even_with_focus() {
        let c = caps(&[FacingMode::User], &[FocusMode::Continuous]);
        assert!(matches!(
            QualityCheck.check(&c, FacingMode::Environment),
            Err(QualityViolation::FacingModeMismatch { .. })
        ));
    }

    #[test]
    fn test_continuous_focus_accepted() {
        let c = caps(
            &[FacingMode::Environment],
            &[FocusMode::SingleShot, FocusMode::Continuous],
        );
        assert!(is_acceptable(&c, FacingMode::Environment));
    }
}

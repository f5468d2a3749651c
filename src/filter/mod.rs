//! Convolution filtering of captured surfaces.
//!
//! Only one non-trivial kernel is modelled (sharpen). The engine itself
//! accepts any square kernel and produces unclamped sums; the
//! [`OverflowPolicy`] decides how those sums are stored back as bytes.

mod convolution;
mod kernel;

pub use convolution::convolve;
pub use kernel::{Kernel, KernelError};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Filters selectable for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Pass the surface through untouched.
    #[default]
    None,
    /// 3x3 sharpen kernel.
    Sharpen,
}

impl FilterKind {
    /// Kernel for this filter, `None` for the pass-through filter.
    pub fn kernel(self) -> Option<Kernel> {
        match self {
            FilterKind::None => None,
            FilterKind::Sharpen => Some(Kernel::sharpen()),
        }
    }
}

impl std::str::FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(FilterKind::None),
            "sharpen" => Ok(FilterKind::Sharpen),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

/// Storage rule for convolved values outside `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Clamp to the nearest representable value.
    #[default]
    Saturate,
    /// Keep the low eight bits, as an unchecked byte store would.
    Wrap,
}

impl OverflowPolicy {
    /// Converts a convolved sum to a stored byte.
    #[inline]
    pub fn store(self, value: f32) -> u8 {
        let rounded = value.round();
        match self {
            OverflowPolicy::Saturate => rounded.clamp(0.0, 255.0) as u8,
            OverflowPolicy::Wrap => (rounded as i64).rem_euclid(256) as u8,
        }
    }
}

/// Runs `kind` over `surface` in place.
///
/// Returns false when the filter is the pass-through and nothing was
/// read back or written.
pub fn apply_filter(surface: &mut RgbaImage, kind: FilterKind, policy: OverflowPolicy) -> bool {
    let Some(kernel) = kind.kernel() else {
        return false;
    };

    let sums = convolve(surface, &kernel);
    for (dst, &sum) in surface.iter_mut().zip(sums.iter()) {
        *dst = policy.store(sum);
    }

    tracing::debug!(
        filter = ?kind,
        width = surface.width(),
        height = surface.height(),
        "Filter applied"
    );
    true
}

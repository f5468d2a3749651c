//! Square convolution kernels.

use thiserror::Error;

/// Errors produced when building a kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("kernel has no weights")]
    Empty,
    #[error("kernel with {0} weights is not square")]
    NotSquare(usize),
}

/// A square weight matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Vec<f32>,
    side: usize,
}

impl Kernel {
    /// Builds a kernel from row-major weights.
    ///
    /// The side length is `round(sqrt(len))`; the weight count must be
    /// exactly the square of that side.
    pub fn new(weights: Vec<f32>) -> Result<Self, KernelError> {
        if weights.is_empty() {
            return Err(KernelError::Empty);
        }
        let side = (weights.len() as f64).sqrt().round() as usize;
        if side * side != weights.len() {
            return Err(KernelError::NotSquare(weights.len()));
        }
        Ok(Self { weights, side })
    }

    /// 3x3 kernel that reproduces its input.
    pub fn identity() -> Self {
        Self {
            weights: vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            side: 3,
        }
    }

    /// 3x3 sharpen kernel.
    pub fn sharpen() -> Self {
        Self {
            weights: vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0],
            side: 3,
        }
    }

    /// Number of rows (and columns).
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Offset from the kernel's centre to its first row/column.
    #[inline]
    pub fn half_side(&self) -> usize {
        self.side / 2
    }

    /// Row-major weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight at `row`, `col`.
    #[inline]
    pub fn weight(&self, row: usize, col: usize) -> f32 {
        self.weights[row * self.side + col]
    }
}

//! Kernel trait definition

use crate::core::SparseVector;

/// Kernel function trait
///
/// Implementations are stateless apart from their hyperparameters, so a
/// single instance may be evaluated concurrently for distinct pairs.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64;

    /// Compute K(x, y) given the squared norms of both arguments.
    ///
    /// Distance-based kernels use the identity `‖x−y‖² = ‖x‖² + ‖y‖² − 2x·y`
    /// to avoid a second merge over the indices.
    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        let _ = (x_norm_sq, y_norm_sq);
        self.compute(x, y)
    }
}

/// `‖x−y‖²` from precomputed squared norms, clamped at zero against rounding
pub(crate) fn squared_distance_from_norms(
    x: &SparseVector,
    y: &SparseVector,
    x_norm_sq: f64,
    y_norm_sq: f64,
) -> f64 {
    (x_norm_sq + y_norm_sq - 2.0 * x.dot(y)).max(0.0)
}

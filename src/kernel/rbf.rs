//! Gaussian (radial basis function) kernel implementation
//!
//! The Gaussian kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) controls the kernel width.

use crate::core::SparseVector;
use crate::kernel::traits::squared_distance_from_norms;
use crate::kernel::Kernel;

/// Gaussian kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// During training the solver caches every example's squared norm and goes
/// through [`Kernel::compute_with_norms`], reducing each evaluation to a
/// single sparse dot product.
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel {
    gamma: f64,
}

impl GaussianKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for GaussianKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (-self.gamma * x.squared_distance(y)).exp()
    }

    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        let squared_distance = squared_distance_from_norms(x, y, x_norm_sq, y_norm_sq);
        (-self.gamma * squared_distance).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_kernel_identical_vectors() {
        let kernel = GaussianKernel::new(1.0);
        let x = SparseVector::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0]);

        assert_relative_eq!(kernel.compute(&x, &x), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_kernel_orthogonal_vectors() {
        let kernel = GaussianKernel::new(1.0);
        let x = SparseVector::new(vec![1, 3], vec![1.0, 1.0]);
        let y = SparseVector::new(vec![2, 4], vec![1.0, 1.0]);

        // ||x - y||² = 4 with no overlap
        assert_relative_eq!(kernel.compute(&x, &y), (-4.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_kernel_with_norms() {
        let kernel = GaussianKernel::new(2.0);
        let x = SparseVector::new(vec![1, 2], vec![3.0, 4.0]);
        let y = SparseVector::new(vec![1, 2], vec![1.0, 2.0]);

        let direct = kernel.compute(&x, &y);
        let with_norms = kernel.compute_with_norms(&x, &y, x.norm_squared(), y.norm_squared());
        assert_relative_eq!(direct, with_norms, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_kernel_decreases_with_distance() {
        let kernel = GaussianKernel::new(1.0);
        let origin = SparseVector::empty();
        let near = SparseVector::new(vec![1], vec![1.0]);
        let far = SparseVector::new(vec![1], vec![2.0]);

        let k_near = kernel.compute(&origin, &near);
        let k_far = kernel.compute(&origin, &far);
        assert!(k_near > k_far);
        assert!(k_far > 0.0);
    }

    #[test]
    fn test_gaussian_kernel_numerical_stability() {
        let kernel = GaussianKernel::new(1e-6);
        let x = SparseVector::new(vec![1], vec![1e6]);
        let y = SparseVector::new(vec![1], vec![-1e6]);

        let result = kernel.compute_with_norms(&x, &y, x.norm_squared(), y.norm_squared());
        assert!(result.is_finite());
        assert!((0.0..=1.0).contains(&result));
    }
}

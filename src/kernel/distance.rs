//! Distance-based kernels
//!
//! | kernel      | K(x, y)              |
//! |-------------|----------------------|
//! | stump       | `coef0 − ‖x−y‖₁`     |
//! | perceptron  | `coef0 − ‖x−y‖₂`     |
//! | laplace     | `exp(−γ‖x−y‖₁)`      |
//! | exponential | `exp(−γ‖x−y‖₂)`      |
//!
//! Stump and perceptron correspond to infinite ensembles of decision stumps
//! and perceptrons; they are conditionally positive definite, which is
//! enough for the equality-constrained dual.

use crate::core::SparseVector;
use crate::kernel::traits::{squared_distance_from_norms, Kernel};

#[derive(Debug, Clone, Copy)]
pub struct StumpKernel {
    pub coef0: f64,
}

impl StumpKernel {
    pub fn new(coef0: f64) -> Self {
        Self { coef0 }
    }
}

impl Kernel for StumpKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        self.coef0 - x.l1_distance(y)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PerceptronKernel {
    pub coef0: f64,
}

impl PerceptronKernel {
    pub fn new(coef0: f64) -> Self {
        Self { coef0 }
    }
}

impl Kernel for PerceptronKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        self.coef0 - x.squared_distance(y).sqrt()
    }

    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        self.coef0 - squared_distance_from_norms(x, y, x_norm_sq, y_norm_sq).sqrt()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LaplaceKernel {
    pub gamma: f64,
}

impl LaplaceKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl Kernel for LaplaceKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (-self.gamma * x.l1_distance(y)).exp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExponentialKernel {
    pub gamma: f64,
}

impl ExponentialKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl Kernel for ExponentialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (-self.gamma * x.squared_distance(y).sqrt()).exp()
    }

    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        let distance = squared_distance_from_norms(x, y, x_norm_sq, y_norm_sq).sqrt();
        (-self.gamma * distance).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pair() -> (SparseVector, SparseVector) {
        // Differences (3, -4) in coordinates 1 and 2
        (
            SparseVector::new(vec![1, 2], vec![4.0, 0.5]),
            SparseVector::new(vec![1, 2], vec![1.0, 4.5]),
        )
    }

    #[test]
    fn test_stump_kernel() {
        let (x, y) = pair();
        let kernel = StumpKernel::new(10.0);
        assert_relative_eq!(kernel.compute(&x, &y), 3.0, epsilon = 1e-12);
        assert_relative_eq!(kernel.compute(&x, &x), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_perceptron_kernel() {
        let (x, y) = pair();
        let kernel = PerceptronKernel::new(1.0);
        assert_relative_eq!(kernel.compute(&x, &y), -4.0, epsilon = 1e-12);
        assert_relative_eq!(
            kernel.compute_with_norms(&x, &y, x.norm_squared(), y.norm_squared()),
            -4.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_laplace_kernel() {
        let (x, y) = pair();
        let kernel = LaplaceKernel::new(0.5);
        assert_relative_eq!(kernel.compute(&x, &y), (-3.5f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_exponential_kernel() {
        let (x, y) = pair();
        let kernel = ExponentialKernel::new(0.2);
        assert_relative_eq!(kernel.compute(&x, &y), (-1.0f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(
            kernel.compute_with_norms(&x, &y, x.norm_squared(), y.norm_squared()),
            (-1.0f64).exp(),
            epsilon = 1e-9
        );
    }
}

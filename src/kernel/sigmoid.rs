//! Sigmoid (hyperbolic tangent) kernel
//!
//! K(x, y) = tanh(γ * <x, y> + coef0)
//!
//! Not positive semi-definite for every choice of γ and coef0; the solver
//! tolerates the resulting non-convex sub-problems by clamping the curvature.

use crate::core::SparseVector;
use crate::kernel::traits::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct SigmoidKernel {
    pub gamma: f64,
    pub coef0: f64,
}

impl SigmoidKernel {
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        (self.gamma * x.dot(y) + self.coef0).tanh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_kernel() {
        let kernel = SigmoidKernel::new(0.5, -1.0);
        let x = SparseVector::new(vec![1, 2], vec![1.0, 2.0]);
        let y = SparseVector::new(vec![1, 2], vec![1.0, 1.0]);

        // tanh(0.5 * 3 - 1)
        assert_relative_eq!(kernel.compute(&x, &y), 0.5f64.tanh(), epsilon = 1e-12);
    }

    #[test]
    fn test_sigmoid_kernel_bounded() {
        let kernel = SigmoidKernel::new(10.0, 5.0);
        let x = SparseVector::new(vec![1], vec![100.0]);

        let value = kernel.compute(&x, &x);
        assert!(value <= 1.0 && value >= -1.0);
    }
}

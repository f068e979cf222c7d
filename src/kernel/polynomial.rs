//! Polynomial kernel: K(x, y) = (γ·<x, y> + coef0)^degree

use crate::core::SparseVector;
use crate::kernel::traits::Kernel;

/// Polynomial kernel with integer degree
#[derive(Debug, Clone, Copy)]
pub struct PolynomialKernel {
    pub degree: i32,
    pub gamma: f64,
    pub coef0: f64,
}

impl PolynomialKernel {
    pub fn new(degree: i32, gamma: f64, coef0: f64) -> Self {
        Self {
            degree,
            gamma,
            coef0,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        powi(self.gamma * x.dot(y) + self.coef0, self.degree)
    }
}

/// Integer power by repeated squaring; negative exponents yield 1
pub(crate) fn powi(base: f64, exponent: i32) -> f64 {
    let mut result = 1.0;
    let mut tmp = base;
    let mut t = exponent;
    while t > 0 {
        if t % 2 == 1 {
            result *= tmp;
        }
        tmp *= tmp;
        t /= 2;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_powi_matches_float_pow() {
        assert_eq!(powi(2.0, 0), 1.0);
        assert_eq!(powi(2.0, 10), 1024.0);
        assert_relative_eq!(powi(1.5, 7), 1.5f64.powi(7), epsilon = 1e-12);
        assert_eq!(powi(-3.0, 3), -27.0);
    }

    #[test]
    fn test_polynomial_kernel() {
        let kernel = PolynomialKernel::new(2, 0.5, 1.0);
        let x = SparseVector::new(vec![1, 2], vec![1.0, 2.0]);
        let y = SparseVector::new(vec![1, 2], vec![3.0, 4.0]);

        // (0.5 * 11 + 1)^2 = 42.25
        assert_relative_eq!(kernel.compute(&x, &y), 42.25, epsilon = 1e-12);
    }

    #[test]
    fn test_degree_one_is_affine() {
        let kernel = PolynomialKernel::new(1, 2.0, -1.0);
        let x = SparseVector::new(vec![3], vec![2.0]);
        let y = SparseVector::new(vec![3], vec![1.5]);

        assert_relative_eq!(kernel.compute(&x, &y), 5.0, epsilon = 1e-12);
    }
}

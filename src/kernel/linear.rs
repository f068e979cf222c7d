//! Linear kernel implementation

use crate::core::SparseVector;
use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
///
/// Computed by a merge over the sorted indices, so the cost is
/// proportional to the combined number of stored entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        x.dot(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_kernel_basic() {
        let kernel = LinearKernel::new();
        let x = SparseVector::new(vec![1, 2], vec![1.0, 2.0]);
        let y = SparseVector::new(vec![1, 2], vec![3.0, 4.0]);

        // 1*3 + 2*4 = 11
        assert_eq!(kernel.compute(&x, &y), 11.0);
    }

    #[test]
    fn test_linear_kernel_missing_indices_are_zero() {
        let kernel = LinearKernel::new();
        let x = SparseVector::new(vec![1, 7], vec![1.0, 5.0]);
        let y = SparseVector::new(vec![2, 7, 9], vec![3.0, 2.0, 1.0]);

        assert_eq!(kernel.compute(&x, &y), 10.0);
        assert_eq!(kernel.compute(&x, &SparseVector::empty()), 0.0);
    }

    #[test]
    fn test_linear_kernel_symmetry() {
        let kernel = LinearKernel::new();
        let x = SparseVector::new(vec![1, 3, 5], vec![1.0, -2.0, 3.0]);
        let y = SparseVector::new(vec![2, 3, 4], vec![4.0, 5.0, 6.0]);

        assert_eq!(kernel.compute(&x, &y), kernel.compute(&y, &x));
    }
}

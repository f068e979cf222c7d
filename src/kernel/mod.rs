//! Kernel functions for SVM

pub mod distance;
pub mod linear;
pub mod polynomial;
pub mod precomputed;
pub mod rbf;
pub mod sigmoid;
pub mod traits;

pub use self::distance::*;
pub use self::linear::*;
pub use self::polynomial::*;
pub use self::precomputed::*;
pub use self::rbf::*;
pub use self::sigmoid::*;
pub use self::traits::*;

use crate::core::{KernelType, Parameters, SparseVector};

/// One of the supported kernels, built once from [`Parameters`]
#[derive(Debug, Clone, Copy)]
pub enum KernelFunction {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
    Gaussian(GaussianKernel),
    Sigmoid(SigmoidKernel),
    Stump(StumpKernel),
    Perceptron(PerceptronKernel),
    Laplace(LaplaceKernel),
    Exponential(ExponentialKernel),
    Precomputed(PrecomputedKernel),
}

impl KernelFunction {
    pub fn from_parameters(params: &Parameters) -> Self {
        match params.kernel_type {
            KernelType::Linear => Self::Linear(LinearKernel::new()),
            KernelType::Polynomial => Self::Polynomial(PolynomialKernel::new(
                params.degree,
                params.gamma,
                params.coef0,
            )),
            KernelType::Gaussian => Self::Gaussian(GaussianKernel::new(params.gamma)),
            KernelType::Sigmoid => Self::Sigmoid(SigmoidKernel::new(params.gamma, params.coef0)),
            KernelType::Stump => Self::Stump(StumpKernel::new(params.coef0)),
            KernelType::Perceptron => Self::Perceptron(PerceptronKernel::new(params.coef0)),
            KernelType::Laplace => Self::Laplace(LaplaceKernel::new(params.gamma)),
            KernelType::Exponential => Self::Exponential(ExponentialKernel::new(params.gamma)),
            KernelType::Precomputed => Self::Precomputed(PrecomputedKernel::new()),
        }
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            Self::Linear(_) => KernelType::Linear,
            Self::Polynomial(_) => KernelType::Polynomial,
            Self::Gaussian(_) => KernelType::Gaussian,
            Self::Sigmoid(_) => KernelType::Sigmoid,
            Self::Stump(_) => KernelType::Stump,
            Self::Perceptron(_) => KernelType::Perceptron,
            Self::Laplace(_) => KernelType::Laplace,
            Self::Exponential(_) => KernelType::Exponential,
            Self::Precomputed(_) => KernelType::Precomputed,
        }
    }

    /// Whether evaluation benefits from cached squared norms
    pub fn uses_norms(&self) -> bool {
        matches!(
            self,
            Self::Gaussian(_) | Self::Perceptron(_) | Self::Exponential(_)
        )
    }

    fn inner(&self) -> &dyn Kernel {
        match self {
            Self::Linear(k) => k,
            Self::Polynomial(k) => k,
            Self::Gaussian(k) => k,
            Self::Sigmoid(k) => k,
            Self::Stump(k) => k,
            Self::Perceptron(k) => k,
            Self::Laplace(k) => k,
            Self::Exponential(k) => k,
            Self::Precomputed(k) => k,
        }
    }
}

impl Kernel for KernelFunction {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        self.inner().compute(x, y)
    }

    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        self.inner().compute_with_norms(x, y, x_norm_sq, y_norm_sq)
    }
}

/// Kernel evaluation over the training examples of one solve.
///
/// Examples are addressed by their current position, which the solver
/// permutes while shrinking; [`KernelMatrix::swap_index`] keeps vectors and
/// cached norms aligned with that permutation.
#[derive(Debug, Clone)]
pub struct KernelMatrix<'a> {
    kernel: KernelFunction,
    vectors: Vec<&'a SparseVector>,
    norms: Vec<f64>,
}

impl<'a> KernelMatrix<'a> {
    pub fn new(vectors: Vec<&'a SparseVector>, kernel: KernelFunction) -> Self {
        let norms = if kernel.uses_norms() {
            vectors.iter().map(|v| v.norm_squared()).collect()
        } else {
            Vec::new()
        };
        Self {
            kernel,
            vectors,
            norms,
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// K(x_i, x_j) by current positions
    #[inline]
    pub fn eval(&self, i: usize, j: usize) -> f64 {
        if self.norms.is_empty() {
            self.kernel.compute(self.vectors[i], self.vectors[j])
        } else {
            self.kernel.compute_with_norms(
                self.vectors[i],
                self.vectors[j],
                self.norms[i],
                self.norms[j],
            )
        }
    }

    pub fn swap_index(&mut self, i: usize, j: usize) {
        self.vectors.swap(i, j);
        if !self.norms.is_empty() {
            self.norms.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_parameters_covers_every_type() {
        for kernel_type in KernelType::ALL {
            let params = Parameters {
                kernel_type,
                gamma: 0.5,
                ..Parameters::default()
            };
            assert_eq!(KernelFunction::from_parameters(&params).kernel_type(), kernel_type);
        }
    }

    #[test]
    fn test_kernel_matrix_with_norms_matches_direct() {
        let a = SparseVector::new(vec![1, 2], vec![1.0, -2.0]);
        let b = SparseVector::new(vec![2, 3], vec![0.5, 3.0]);
        let params = Parameters {
            kernel_type: KernelType::Gaussian,
            gamma: 0.3,
            ..Parameters::default()
        };
        let kernel = KernelFunction::from_parameters(&params);
        let matrix = KernelMatrix::new(vec![&a, &b], kernel);

        assert_relative_eq!(matrix.eval(0, 1), kernel.compute(&a, &b), epsilon = 1e-12);
        assert_relative_eq!(matrix.eval(1, 1), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kernel_matrix_swap() {
        let a = SparseVector::new(vec![1], vec![1.0]);
        let b = SparseVector::new(vec![1], vec![2.0]);
        let c = SparseVector::new(vec![1], vec![3.0]);
        let kernel = KernelFunction::Linear(LinearKernel::new());
        let mut matrix = KernelMatrix::new(vec![&a, &b, &c], kernel);

        assert_eq!(matrix.eval(0, 2), 3.0);
        matrix.swap_index(0, 1);
        assert_eq!(matrix.eval(0, 2), 6.0);
        assert_eq!(matrix.eval(1, 1), 1.0);
    }
}

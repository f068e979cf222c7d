//! Core type definitions for SVM training

use crate::core::{Result, SVMError};

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SparseVector {
    /// Strictly increasing indices of stored elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    ///
    /// # Panics
    /// Panics if the lengths differ or an index appears twice.
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);
        assert!(
            pairs.windows(2).all(|w| w[0].0 < w[1].0),
            "Indices must be unique"
        );

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Build from `(index, value)` pairs
    pub fn from_pairs(pairs: &[(usize, f64)]) -> Self {
        let (indices, values): (Vec<_>, Vec<_>) = pairs.iter().copied().unzip();
        Self::new(indices, values)
    }

    /// Build from a dense slice using 1-based indices, skipping zeros
    pub fn from_dense(dense: &[f64]) -> Self {
        let (indices, values) = dense
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, &v)| (i + 1, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterate over `(index, value)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Largest stored index, 0 for an empty vector
    pub fn max_index(&self) -> usize {
        self.indices.last().copied().unwrap_or(0)
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Compute L2 norm
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sparse dot product by merge-join over the sorted indices
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut result = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.indices.len() && j < other.indices.len() {
            let x_idx = self.indices[i];
            let y_idx = other.indices[j];

            if x_idx == y_idx {
                result += self.values[i] * other.values[j];
                i += 1;
                j += 1;
            } else if x_idx < y_idx {
                i += 1;
            } else {
                j += 1;
            }
        }

        result
    }

    /// Squared Euclidean distance ‖x − y‖²
    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        self.merge_fold(other, |a, b| (a - b) * (a - b))
    }

    /// Manhattan distance ‖x − y‖₁
    pub fn l1_distance(&self, other: &SparseVector) -> f64 {
        self.merge_fold(other, |a, b| (a - b).abs())
    }

    /// Sum `f(x_k, y_k)` over the union of indices, treating gaps as zero
    fn merge_fold(&self, other: &SparseVector, f: impl Fn(f64, f64) -> f64) -> f64 {
        let mut acc = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.indices.len() && j < other.indices.len() {
            let x_idx = self.indices[i];
            let y_idx = other.indices[j];

            if x_idx == y_idx {
                acc += f(self.values[i], other.values[j]);
                i += 1;
                j += 1;
            } else if x_idx < y_idx {
                acc += f(self.values[i], 0.0);
                i += 1;
            } else {
                acc += f(0.0, other.values[j]);
                j += 1;
            }
        }

        acc += self.values[i..].iter().map(|&v| f(v, 0.0)).sum::<f64>();
        acc += other.values[j..].iter().map(|&v| f(0.0, v)).sum::<f64>();
        acc
    }
}

/// A training problem: one label per feature vector.
///
/// Labels hold class ids for classification, targets for regression and are
/// ignored by one-class and domain-description formulations.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Problem {
    labels: Vec<f64>,
    vectors: Vec<SparseVector>,
}

impl Problem {
    /// Create a problem, rejecting mismatched label/vector counts
    pub fn new(labels: Vec<f64>, vectors: Vec<SparseVector>) -> Result<Self> {
        if labels.len() != vectors.len() {
            return Err(SVMError::InvalidDataset(format!(
                "{} labels for {} feature vectors",
                labels.len(),
                vectors.len()
            )));
        }
        Ok(Self { labels, vectors })
    }

    /// Number of examples (`l`)
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn vectors(&self) -> &[SparseVector] {
        &self.vectors
    }

    pub fn label(&self, i: usize) -> f64 {
        self.labels[i]
    }

    pub fn vector(&self, i: usize) -> &SparseVector {
        &self.vectors[i]
    }

    /// Largest feature index used by any example
    pub fn max_index(&self) -> usize {
        self.vectors.iter().map(|v| v.max_index()).max().unwrap_or(0)
    }

    /// Copy the given examples, in order, into a new problem
    pub fn subset(&self, indices: &[usize]) -> Problem {
        Problem {
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            vectors: indices.iter().map(|&i| self.vectors[i].clone()).collect(),
        }
    }
}

/// Outcome of one QP solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveSummary {
    /// Number of pair updates performed
    pub iterations: usize,
    /// False when the iteration cap stopped the solver early
    pub converged: bool,
    /// Final dual objective value
    pub objective: f64,
    /// Bias term of the decision function
    pub rho: f64,
    /// Support vectors, bounded ones included
    pub n_sv: usize,
    /// Support vectors pinned at their upper bound
    pub n_bsv: usize,
}

/// Raw solver output for one binary (or single) sub-problem.
///
/// `alpha` is dense over the sub-problem's examples and already signed
/// (`yᵢαᵢ` for classification, `αᵢ⁺ − αᵢ⁻` for regression). The two index
/// lists partition the examples with nonzero multipliers: `bsv_indices`
/// holds the ones pinned at their upper bound, `sv_indices` the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionFunction {
    pub alpha: Vec<f64>,
    pub rho: f64,
    pub sv_indices: Vec<usize>,
    pub bsv_indices: Vec<usize>,
    pub summary: SolveSummary,
}

impl DecisionFunction {
    /// Total number of support vectors (ordinary + bounded)
    pub fn n_support_vectors(&self) -> usize {
        self.sv_indices.len() + self.bsv_indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_creation() {
        let indices = vec![2, 0, 4];
        let values = vec![2.0, 1.0, 3.0];
        let sv = SparseVector::new(indices, values);

        assert_eq!(sv.indices, vec![0, 2, 4]);
        assert_eq!(sv.values, vec![1.0, 2.0, 3.0]);
        assert_eq!(sv.max_index(), 4);
    }

    #[test]
    fn test_sparse_vector_get() {
        let sv = SparseVector::new(vec![1, 3, 5], vec![1.0, 2.0, 3.0]);

        assert_eq!(sv.get(0), 0.0);
        assert_eq!(sv.get(1), 1.0);
        assert_eq!(sv.get(3), 2.0);
        assert_eq!(sv.get(5), 3.0);
        assert_eq!(sv.get(6), 0.0);
    }

    #[test]
    fn test_sparse_vector_norm() {
        let sv = SparseVector::new(vec![0, 1], vec![3.0, 4.0]);
        assert_eq!(sv.norm_squared(), 25.0);
        assert_eq!(sv.norm(), 5.0);
    }

    #[test]
    fn test_dot_product() {
        let x = SparseVector::new(vec![0, 2, 5], vec![1.0, 3.0, 2.0]);
        let y = SparseVector::new(vec![2, 3, 5], vec![2.0, 1.0, 4.0]);

        // Overlap at 2 and 5: 3*2 + 2*4
        assert_eq!(x.dot(&y), 14.0);
        assert_eq!(SparseVector::empty().dot(&y), 0.0);
    }

    #[test]
    fn test_distances() {
        let x = SparseVector::new(vec![0, 2, 5], vec![1.0, 3.0, 2.0]);
        let y = SparseVector::new(vec![2, 3, 5], vec![2.0, 1.0, 4.0]);

        // 1 + 1 + 1 + 4
        assert_eq!(x.squared_distance(&y), 7.0);
        // 1 + 1 + 1 + 2
        assert_eq!(x.l1_distance(&y), 5.0);
        assert_eq!(x.squared_distance(&x), 0.0);
        assert_eq!(SparseVector::empty().l1_distance(&x), 6.0);
    }

    #[test]
    fn test_from_dense_skips_zeros() {
        let sv = SparseVector::from_dense(&[0.5, 0.0, -1.0]);
        assert_eq!(sv.indices, vec![1, 3]);
        assert_eq!(sv.values, vec![0.5, -1.0]);
    }

    #[test]
    #[should_panic(expected = "Indices and values must have same length")]
    fn test_sparse_vector_length_mismatch() {
        SparseVector::new(vec![0, 1], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "Indices must be unique")]
    fn test_sparse_vector_duplicate_index() {
        SparseVector::new(vec![1, 1], vec![1.0, 2.0]);
    }

    #[test]
    fn test_problem_length_mismatch() {
        let result = Problem::new(vec![1.0, -1.0], vec![SparseVector::empty()]);
        assert!(matches!(result, Err(SVMError::InvalidDataset(_))));
    }

    #[test]
    fn test_problem_subset() {
        let problem = Problem::new(
            vec![1.0, 2.0, 3.0],
            vec![
                SparseVector::from_dense(&[1.0]),
                SparseVector::from_dense(&[2.0]),
                SparseVector::from_dense(&[0.0, 3.0]),
            ],
        )
        .unwrap();

        let sub = problem.subset(&[2, 0]);
        assert_eq!(sub.labels(), &[3.0, 1.0]);
        assert_eq!(sub.vector(0).get(2), 3.0);
        assert_eq!(problem.max_index(), 2);
    }
}

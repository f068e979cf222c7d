//! High-level API for training and using support vector models
//!
//! The [`SVM`] builder collects [`Parameters`] and a progress sink; the
//! free functions mirror the classic libsvm entry points over explicit
//! problems and models.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use svmqp::api::SVM;
//! use svmqp::core::KernelType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = SVM::new()
//!     .with_kernel(KernelType::Gaussian)
//!     .with_c(10.0)
//!     .with_probability(true)
//!     .train_from_file("data.libsvm")?;
//!
//! svmqp::persistence::save_model("data.model", &model)?;
//! # Ok(())
//! # }
//! ```

use crate::core::{
    Dataset, KernelType, LogSink, Parameters, Problem, ProgressSink, Result, SVMError,
    SparseVector, SvmType, WorkingSetStrategy,
};
use crate::data::LibSVMDataset;
use crate::model::Model;
use crate::multiclass;
use std::path::Path;
use std::sync::Arc;

/// Builder over [`Parameters`] with an injectable progress sink
#[derive(Clone)]
pub struct SVM {
    params: Parameters,
    sink: Arc<dyn ProgressSink>,
}

impl SVM {
    /// C-SVC with a Gaussian kernel and libsvm defaults, reporting through
    /// the `log` facade
    pub fn new() -> Self {
        Self::with_parameters(Parameters::default())
    }

    /// Start from an existing parameter set, e.g. one loaded from JSON
    pub fn with_parameters(params: Parameters) -> Self {
        Self {
            params,
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_svm_type(mut self, svm_type: SvmType) -> Self {
        self.params.svm_type = svm_type;
        self
    }

    pub fn with_kernel(mut self, kernel_type: KernelType) -> Self {
        self.params.kernel_type = kernel_type;
        self
    }

    pub fn with_degree(mut self, degree: i32) -> Self {
        self.params.degree = degree;
        self
    }

    /// Kernel width; 0 picks `1 / max_feature_index` at training time
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.params.gamma = gamma;
        self
    }

    pub fn with_coef0(mut self, coef0: f64) -> Self {
        self.params.coef0 = coef0;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.params.c = c;
        self
    }

    pub fn with_nu(mut self, nu: f64) -> Self {
        self.params.nu = nu;
        self
    }

    /// Tube width of ε-SVR
    pub fn with_p(mut self, p: f64) -> Self {
        self.params.p = p;
        self
    }

    /// Stopping tolerance
    pub fn with_epsilon(mut self, eps: f64) -> Self {
        self.params.eps = eps;
        self
    }

    /// Kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.params.cache_size = cache_size;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.params.shrinking = shrinking;
        self
    }

    pub fn with_probability(mut self, probability: bool) -> Self {
        self.params.probability = probability;
        self
    }

    /// Multiply C by `weight` for examples labelled `label`
    pub fn with_weight(mut self, label: i32, weight: f64) -> Self {
        self.params.weights.push((label, weight));
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.params.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_working_set(mut self, working_set: WorkingSetStrategy) -> Self {
        self.params.working_set = working_set;
        self
    }

    /// Seed of the calibration fold shuffle
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    /// Receive training progress and warnings through `sink`
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Train on a dataset
    pub fn train<D: Dataset>(&self, dataset: &D) -> Result<Model> {
        Model::train(&dataset.to_problem(), &self.params, self.sink.as_ref())
    }

    /// Train from a LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Model> {
        let dataset = LibSVMDataset::from_file(path)?;
        Model::train(dataset.problem(), &self.params, self.sink.as_ref())
    }

    /// Predictions for every example of `dataset`, each from a model
    /// trained without its fold
    pub fn cross_validate<D: Dataset>(&self, dataset: &D, nr_fold: usize) -> Result<Vec<f64>> {
        multiclass::cross_validate(
            &dataset.to_problem(),
            &self.params,
            nr_fold,
            self.sink.as_ref(),
        )
    }
}

impl Default for SVM {
    fn default() -> Self {
        Self::new()
    }
}

/// Train a model on `problem`, reporting through the `log` facade
pub fn train(problem: &Problem, params: &Parameters) -> Result<Model> {
    Model::train(problem, params, &LogSink)
}

/// N-fold cross-validated predictions, in example order
pub fn cross_validate(problem: &Problem, params: &Parameters, nr_fold: usize) -> Result<Vec<f64>> {
    multiclass::cross_validate(problem, params, nr_fold, &LogSink)
}

pub fn predict_values(model: &Model, x: &SparseVector) -> Vec<f64> {
    model.predict_values(x)
}

pub fn predict(model: &Model, x: &SparseVector) -> f64 {
    model.predict(x)
}

/// Predicted label with per-class probabilities in `model.labels()` order
pub fn predict_probability(model: &Model, x: &SparseVector) -> Result<(f64, Vec<f64>)> {
    model.predict_probability(x)
}

/// First rule `params` violate for `problem`, if any
pub fn check_parameter(problem: &Problem, params: &Parameters) -> Option<String> {
    params.check(problem).err().map(|e| match e {
        SVMError::InvalidParameter(message) | SVMError::InvalidDataset(message) => message,
        other => other.to_string(),
    })
}

/// Release a model. Loaded models share their support vectors and only
/// free them with the last handle.
pub fn destroy_model(model: Model) {
    model.destroy();
}

/// Release a parameter set and its class weights
pub fn destroy_parameters(params: Parameters) {
    log::debug!("releasing parameters with {} class weights", params.weights.len());
}

/// Prediction quality against known targets
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    pub total: usize,
    pub correct: usize,
    pub mean_squared_error: f64,
    pub squared_correlation: f64,
}

impl EvaluationMetrics {
    /// Compare `predictions` with `targets` pairwise
    pub fn from_predictions(predictions: &[f64], targets: &[f64]) -> Self {
        let total = predictions.len().min(targets.len());
        let (mut correct, mut error) = (0, 0.0);
        let (mut sum_p, mut sum_t, mut sum_pp, mut sum_tt, mut sum_pt) = (0.0, 0.0, 0.0, 0.0, 0.0);

        for (&p, &t) in predictions.iter().zip(targets) {
            if p == t {
                correct += 1;
            }
            error += (p - t) * (p - t);
            sum_p += p;
            sum_t += t;
            sum_pp += p * p;
            sum_tt += t * t;
            sum_pt += p * t;
        }

        let n = total as f64;
        let squared_correlation = {
            let numerator = n * sum_pt - sum_p * sum_t;
            let denominator = (n * sum_pp - sum_p * sum_p) * (n * sum_tt - sum_t * sum_t);
            if denominator > 0.0 {
                numerator * numerator / denominator
            } else {
                0.0
            }
        };

        Self {
            total,
            correct,
            mean_squared_error: if total == 0 { 0.0 } else { error / n },
            squared_correlation,
        }
    }

    /// Fraction of exact matches
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SilentSink;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn line_problem() -> Problem {
        Problem::new(
            vec![1.0, -1.0, 1.0, -1.0],
            vec![
                SparseVector::from_dense(&[2.0]),
                SparseVector::from_dense(&[-2.0]),
                SparseVector::from_dense(&[1.5]),
                SparseVector::from_dense(&[-1.5]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_svm_builder_pattern() {
        let svm = SVM::new()
            .with_svm_type(SvmType::NuSvc)
            .with_kernel(KernelType::Polynomial)
            .with_degree(2)
            .with_c(2.0)
            .with_nu(0.3)
            .with_epsilon(0.01)
            .with_weight(1, 3.0)
            .with_max_iterations(5000)
            .with_working_set(WorkingSetStrategy::FirstOrder);

        let params = svm.params();
        assert_eq!(params.svm_type, SvmType::NuSvc);
        assert_eq!(params.kernel_type, KernelType::Polynomial);
        assert_eq!(params.degree, 2);
        assert_eq!(params.c, 2.0);
        assert_eq!(params.nu, 0.3);
        assert_eq!(params.eps, 0.01);
        assert_eq!(params.weights, vec![(1, 3.0)]);
        assert_eq!(params.max_iterations, Some(5000));
        assert_eq!(params.working_set, WorkingSetStrategy::FirstOrder);
    }

    #[test]
    fn test_builder_training() {
        let model = SVM::new()
            .with_kernel(KernelType::Linear)
            .with_sink(Arc::new(SilentSink))
            .train(&line_problem())
            .expect("Training should succeed");

        assert_eq!(model.predict(&SparseVector::from_dense(&[1.0])), 1.0);
        assert_eq!(model.predict(&SparseVector::from_dense(&[-0.7])), -1.0);
        assert!(model.total_sv() > 0);
    }

    #[test]
    fn test_train_from_file() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:2.0").expect("Failed to write");
        writeln!(temp_file, "-1 1:-2.0").expect("Failed to write");
        writeln!(temp_file, "+1 1:1.5").expect("Failed to write");
        writeln!(temp_file, "-1 1:-1.5").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let model = SVM::new()
            .with_kernel(KernelType::Linear)
            .with_sink(Arc::new(SilentSink))
            .train_from_file(temp_file.path())
            .expect("Training should succeed");
        assert_eq!(model.labels(), &[1, -1]);
    }

    #[test]
    fn test_check_parameter_messages() {
        let problem = line_problem();
        assert_eq!(check_parameter(&problem, &Parameters::default()), None);

        let params = Parameters {
            c: -1.0,
            ..Parameters::default()
        };
        assert_eq!(check_parameter(&problem, &params), Some("C <= 0".to_string()));
    }

    #[test]
    fn test_train_rejects_invalid_parameters() {
        let params = Parameters {
            nu: 1.5,
            ..Parameters::new(SvmType::NuSvc, KernelType::Linear)
        };
        let err = train(&line_problem(), &params).unwrap_err();
        assert!(err.is_parameter_error());
    }

    #[test]
    fn test_free_functions_agree_with_model() {
        let problem = line_problem();
        let params = Parameters::new(SvmType::CSvc, KernelType::Linear);
        let model = train(&problem, &params).unwrap();
        let x = SparseVector::from_dense(&[0.8]);

        assert_eq!(predict_values(&model, &x), model.predict_values(&x));
        assert_eq!(predict(&model, &x), 1.0);
        assert!(matches!(
            predict_probability(&model, &x),
            Err(SVMError::ProbabilityUnavailable(_))
        ));

        destroy_model(model);
        destroy_parameters(params);
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics::from_predictions(&[1.0, -1.0, 1.0, 1.0], &[1.0, -1.0, -1.0, 1.0]);
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.correct, 3);
        assert_eq!(metrics.accuracy(), 0.75);
        assert_relative_eq!(metrics.mean_squared_error, 1.0);

        let exact = EvaluationMetrics::from_predictions(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert_relative_eq!(exact.squared_correlation, 1.0, epsilon = 1e-12);
        assert_eq!(EvaluationMetrics::from_predictions(&[], &[]).accuracy(), 0.0);
    }
}

//! Core traits for SVM training

use crate::core::{Problem, SparseVector};

/// Dataset abstraction over labelled sparse examples
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (largest feature index)
    fn dim(&self) -> usize;

    /// Label of sample `i`
    ///
    /// # Panics
    /// Panics if index >= len()
    fn label(&self, i: usize) -> f64;

    /// Feature vector of sample `i`
    ///
    /// # Panics
    /// Panics if index >= len()
    fn vector(&self, i: usize) -> &SparseVector;

    /// Get all labels as a vector
    fn get_labels(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the dataset into a training problem
    fn to_problem(&self) -> Problem {
        let vectors = (0..self.len()).map(|i| self.vector(i).clone()).collect();
        // Lengths match by construction
        Problem::new(self.get_labels(), vectors).unwrap_or_default()
    }
}

impl Dataset for Problem {
    fn len(&self) -> usize {
        Problem::len(self)
    }

    fn dim(&self) -> usize {
        self.max_index()
    }

    fn label(&self, i: usize) -> f64 {
        Problem::label(self, i)
    }

    fn vector(&self, i: usize) -> &SparseVector {
        Problem::vector(self, i)
    }

    fn get_labels(&self) -> Vec<f64> {
        self.labels().to_vec()
    }

    fn to_problem(&self) -> Problem {
        self.clone()
    }
}

/// Receiver for user-facing training progress.
///
/// Solver internals log through `log::debug!`; messages a caller would want
/// to see (iteration counts, objective values, convergence and calibration
/// warnings) go through the sink configured on the [`SVM`](crate::api::SVM)
/// builder.
pub trait ProgressSink: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);
}

/// Forwards progress to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Discards all progress output
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}

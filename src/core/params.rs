//! Training parameters and the closed sets of formulations and kernels

use crate::core::{Problem, Result, SVMError};
use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

/// SVM formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvmType {
    /// C-support vector classification
    CSvc,
    /// C-SVC with squared (L2) slack penalty
    CSvcL2,
    /// ν-support vector classification
    NuSvc,
    /// One-class SVM (distribution support estimation)
    OneClass,
    /// ε-support vector regression
    EpsilonSvr,
    /// ν-support vector regression
    NuSvr,
    /// Support vector domain description
    Svdd,
    /// SVDD with squared (L2) slack penalty
    SvddL2,
}

impl SvmType {
    pub const ALL: [SvmType; 8] = [
        SvmType::CSvc,
        SvmType::CSvcL2,
        SvmType::NuSvc,
        SvmType::OneClass,
        SvmType::EpsilonSvr,
        SvmType::NuSvr,
        SvmType::Svdd,
        SvmType::SvddL2,
    ];

    /// Name used in model files
    pub fn name(self) -> &'static str {
        match self {
            SvmType::CSvc => "c_svc",
            SvmType::CSvcL2 => "c_svc_l2",
            SvmType::NuSvc => "nu_svc",
            SvmType::OneClass => "one_class",
            SvmType::EpsilonSvr => "epsilon_svr",
            SvmType::NuSvr => "nu_svr",
            SvmType::Svdd => "svdd",
            SvmType::SvddL2 => "svdd_l2",
        }
    }

    /// Classification types go through the one-vs-one orchestrator
    pub fn is_classification(self) -> bool {
        matches!(self, SvmType::CSvc | SvmType::CSvcL2 | SvmType::NuSvc)
    }

    pub fn is_regression(self) -> bool {
        matches!(self, SvmType::EpsilonSvr | SvmType::NuSvr)
    }

    /// One-class and domain-description types ignore labels
    pub fn is_novelty_detection(self) -> bool {
        matches!(self, SvmType::OneClass | SvmType::Svdd | SvmType::SvddL2)
    }

    pub fn is_domain_description(self) -> bool {
        matches!(self, SvmType::Svdd | SvmType::SvddL2)
    }

    /// Types whose slack penalty is squared rather than boxed
    pub fn is_l2_penalized(self) -> bool {
        matches!(self, SvmType::CSvcL2 | SvmType::SvddL2)
    }

    pub(crate) fn uses_c(self) -> bool {
        matches!(
            self,
            SvmType::CSvc
                | SvmType::CSvcL2
                | SvmType::EpsilonSvr
                | SvmType::NuSvr
                | SvmType::Svdd
                | SvmType::SvddL2
        )
    }

    pub(crate) fn uses_nu(self) -> bool {
        matches!(self, SvmType::NuSvc | SvmType::OneClass | SvmType::NuSvr)
    }
}

impl fmt::Display for SvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SvmType {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        SvmType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| SVMError::InvalidParameter(format!("unknown svm type: {s}")))
    }
}

/// Kernel function family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelType {
    /// `x·y`
    Linear,
    /// `(γ·x·y + coef0)^degree`
    Polynomial,
    /// `exp(−γ‖x−y‖²)`
    Gaussian,
    /// `tanh(γ·x·y + coef0)`
    Sigmoid,
    /// `coef0 − ‖x−y‖₁`
    Stump,
    /// `coef0 − ‖x−y‖₂`
    Perceptron,
    /// `exp(−γ‖x−y‖₁)`
    Laplace,
    /// `exp(−γ‖x−y‖₂)`
    Exponential,
    /// Values looked up in a caller-supplied kernel matrix
    Precomputed,
}

impl KernelType {
    pub const ALL: [KernelType; 9] = [
        KernelType::Linear,
        KernelType::Polynomial,
        KernelType::Gaussian,
        KernelType::Sigmoid,
        KernelType::Stump,
        KernelType::Perceptron,
        KernelType::Laplace,
        KernelType::Exponential,
        KernelType::Precomputed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KernelType::Linear => "linear",
            KernelType::Polynomial => "polynomial",
            KernelType::Gaussian => "gaussian",
            KernelType::Sigmoid => "sigmoid",
            KernelType::Stump => "stump",
            KernelType::Perceptron => "perceptron",
            KernelType::Laplace => "laplace",
            KernelType::Exponential => "exponential",
            KernelType::Precomputed => "precomputed",
        }
    }

    pub(crate) fn uses_gamma(self) -> bool {
        matches!(
            self,
            KernelType::Polynomial
                | KernelType::Gaussian
                | KernelType::Sigmoid
                | KernelType::Laplace
                | KernelType::Exponential
        )
    }

    pub(crate) fn uses_coef0(self) -> bool {
        matches!(
            self,
            KernelType::Polynomial
                | KernelType::Sigmoid
                | KernelType::Stump
                | KernelType::Perceptron
        )
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelType {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        let canonical = match s {
            "poly" => "polynomial",
            "rbf" => "gaussian",
            "perc" => "perceptron",
            "expo" => "exponential",
            other => other,
        };
        KernelType::ALL
            .iter()
            .copied()
            .find(|k| k.name() == canonical)
            .ok_or_else(|| SVMError::InvalidParameter(format!("unknown kernel type: {s}")))
    }
}

/// Working set selection rule for the decomposition solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingSetStrategy {
    /// Maximal violating pair: the steepest feasible pair by gradient alone
    FirstOrder,
    /// Maximal violating `i`, then the `j` with the largest second-order gain
    #[default]
    SecondOrder,
}

/// Parameters of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub svm_type: SvmType,
    pub kernel_type: KernelType,
    /// Polynomial degree
    pub degree: i32,
    /// Kernel width; 0 means `1 / max_feature_index` at training time
    pub gamma: f64,
    pub coef0: f64,
    /// Kernel cache budget in bytes
    pub cache_size: usize,
    /// Stopping tolerance on the KKT violation gap
    pub eps: f64,
    pub c: f64,
    /// Per-class multipliers of C: `(class label, weight)`
    pub weights: Vec<(i32, f64)>,
    pub nu: f64,
    /// Width of the ε-insensitive tube for ε-SVR
    pub p: f64,
    pub shrinking: bool,
    pub probability: bool,
    /// Overrides the default iteration cap `max(10_000_000, 100·l)`
    pub max_iterations: Option<usize>,
    pub working_set: WorkingSetStrategy,
    /// Seed for the shuffle behind probability calibration folds
    pub seed: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel_type: KernelType::Gaussian,
            degree: 3,
            gamma: 0.0,
            coef0: 0.0,
            cache_size: 100 * 1024 * 1024,
            eps: 0.001,
            c: 1.0,
            weights: Vec::new(),
            nu: 0.5,
            p: 0.1,
            shrinking: true,
            probability: false,
            max_iterations: None,
            working_set: WorkingSetStrategy::SecondOrder,
            seed: 1,
        }
    }
}

impl Parameters {
    /// Parameters for the given formulation and kernel, libsvm defaults otherwise
    pub fn new(svm_type: SvmType, kernel_type: KernelType) -> Self {
        Self {
            svm_type,
            kernel_type,
            ..Self::default()
        }
    }

    /// Weight applied to C for `label`, 1 when none is configured
    pub fn weight_for(&self, label: i32) -> f64 {
        self.weights
            .iter()
            .rev()
            .find(|(l, _)| *l == label)
            .map_or(1.0, |&(_, w)| w)
    }

    /// Resolve `gamma = 0` to `1 / max_feature_index`
    pub(crate) fn with_resolved_gamma(&self, max_index: usize) -> Parameters {
        let mut resolved = self.clone();
        if resolved.gamma == 0.0 && max_index > 0 {
            resolved.gamma = 1.0 / max_index as f64;
        }
        resolved
    }

    /// Validate these parameters against `problem` before any solve.
    ///
    /// Returns the first violated rule as [`SVMError::InvalidParameter`], or
    /// a dataset error for an empty or mislabelled problem.
    pub fn check(&self, problem: &Problem) -> Result<()> {
        let invalid = |msg: &str| Err(SVMError::InvalidParameter(msg.to_string()));

        if problem.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if self.kernel_type.uses_gamma() && !(self.gamma >= 0.0) {
            return invalid("gamma < 0");
        }
        if self.kernel_type == KernelType::Polynomial && self.degree < 0 {
            return invalid("degree of polynomial kernel < 0");
        }
        if !(self.eps > 0.0) {
            return invalid("eps <= 0");
        }
        if self.svm_type.uses_c() && !(self.c > 0.0) {
            return invalid("C <= 0");
        }
        if self.svm_type.uses_nu() && !(self.nu > 0.0 && self.nu <= 1.0) {
            return invalid("nu <= 0 or nu > 1");
        }
        if self.svm_type == SvmType::EpsilonSvr && !(self.p >= 0.0) {
            return invalid("p < 0");
        }
        if self.probability && self.svm_type.is_novelty_detection() {
            return invalid("probability output not supported for one-class or domain description");
        }
        if self.max_iterations == Some(0) {
            return invalid("max_iterations must be positive");
        }
        if let Some(&(label, _)) = self.weights.iter().find(|(_, w)| !(*w >= 0.0)) {
            return Err(SVMError::InvalidParameter(format!(
                "weight for class {} < 0",
                label
            )));
        }

        if self.svm_type.is_classification() {
            if let Some(label) = problem.labels().iter().find(|y| y.fract() != 0.0) {
                return Err(SVMError::InvalidDataset(format!(
                    "class label {} is not an integer",
                    label
                )));
            }
        } else if problem.labels().iter().any(|y| !y.is_finite()) {
            return Err(SVMError::InvalidDataset("non-finite target value".to_string()));
        }

        if self.svm_type == SvmType::NuSvc {
            self.check_nu_feasibility(problem)?;
        }
        Ok(())
    }

    /// ν-SVC needs `ν·(n₁ + n₂)/2 ≤ min(n₁, n₂)` for every pair of classes
    fn check_nu_feasibility(&self, problem: &Problem) -> Result<()> {
        let mut counts: Vec<(i64, usize)> = Vec::new();
        let mut position: HashMap<i64, usize> = HashMap::new();
        for &y in problem.labels() {
            let label = y as i64;
            match position.get(&label) {
                Some(&k) => counts[k].1 += 1,
                None => {
                    position.insert(label, counts.len());
                    counts.push((label, 1));
                }
            }
        }

        for (i, &(_, n1)) in counts.iter().enumerate() {
            for &(_, n2) in &counts[i + 1..] {
                if self.nu * (n1 + n2) as f64 / 2.0 > n1.min(n2) as f64 {
                    return Err(SVMError::InvalidParameter(
                        "specified nu is infeasible".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Load parameters from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Write parameters to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))
    }
}

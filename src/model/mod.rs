//! Trained model: assembly from decision functions and prediction
//!
//! Support vectors of all pairwise decision functions are merged into one
//! list. `sv_coef` has `nr_class − 1` rows over that list: for the pair
//! `(i, j)`, coefficients of class `i`'s vectors sit in row `j − 1` and
//! those of class `j`'s vectors in row `i`. Non-classification models have
//! a single row.

use crate::core::{
    Parameters, Problem, ProgressSink, Result, SVMError, SolveSummary, SparseVector, SvmType,
};
use crate::kernel::{Kernel, KernelFunction};
use crate::multiclass::{self, ClassGroups, PairwiseModel};
use crate::optimizer::Trainer;
use crate::probability;
use std::sync::Arc;

/// Storage of a model's support vectors.
///
/// Trained models own theirs; loaded models may share one allocation with
/// other handles. Dropping either releases only what this model holds.
#[derive(Debug, Clone)]
pub enum SupportVectorStore {
    Owned(Vec<SparseVector>),
    Shared(Arc<[SparseVector]>),
}

impl SupportVectorStore {
    pub fn as_slice(&self) -> &[SparseVector] {
        match self {
            SupportVectorStore::Owned(vectors) => vectors,
            SupportVectorStore::Shared(vectors) => vectors,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, SupportVectorStore::Owned(_))
    }
}

impl Default for SupportVectorStore {
    fn default() -> Self {
        SupportVectorStore::Owned(Vec::new())
    }
}

/// A trained SVM
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) params: Parameters,
    pub(crate) nr_class: usize,
    pub(crate) support_vectors: SupportVectorStore,
    pub(crate) sv_coef: Vec<Vec<f64>>,
    pub(crate) rho: Vec<f64>,
    /// Pairwise sigmoid `A`, or the Laplace scale for regression
    pub(crate) prob_a: Vec<f64>,
    pub(crate) prob_b: Vec<f64>,
    pub(crate) labels: Vec<i32>,
    /// Support vectors per class, in `labels` order
    pub(crate) n_sv: Vec<usize>,
    /// Training-set index of each support vector
    pub(crate) sv_indices: Vec<usize>,
    /// Training-set indices bounded in at least one decision function
    pub(crate) bsv_indices: Vec<usize>,
    pub(crate) summaries: Vec<SolveSummary>,
}

impl Model {
    /// Validate `params` against `problem` and train
    pub fn train(problem: &Problem, params: &Parameters, sink: &dyn ProgressSink) -> Result<Model> {
        params.check(problem)?;
        let params = params.with_resolved_gamma(problem.max_index());
        Model::fit(problem, &params, sink)
    }

    /// Train with parameters that are already validated and resolved
    pub(crate) fn fit(problem: &Problem, params: &Parameters, sink: &dyn ProgressSink) -> Result<Model> {
        if problem.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        let trainer = Trainer::new(params, sink);
        if params.svm_type.is_classification() {
            Ok(Model::fit_classifier(&trainer, problem))
        } else {
            Ok(Model::fit_single(&trainer, problem))
        }
    }

    fn fit_single(trainer: &Trainer<'_, '_>, problem: &Problem) -> Model {
        let params = trainer.params();
        let mut prob_a = Vec::new();
        if params.probability && params.svm_type.is_regression() {
            prob_a.push(probability::svr_probability(trainer, problem));
        }

        let decision = trainer.train_single(problem);
        let (indices, coef): (Vec<usize>, Vec<f64>) = decision
            .alpha
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a != 0.0)
            .map(|(i, &a)| (i, a))
            .unzip();

        Model {
            params: params.clone(),
            nr_class: 2,
            support_vectors: SupportVectorStore::Owned(
                indices.iter().map(|&i| problem.vector(i).clone()).collect(),
            ),
            sv_coef: vec![coef],
            rho: vec![decision.rho],
            prob_a,
            prob_b: Vec::new(),
            labels: Vec::new(),
            n_sv: Vec::new(),
            sv_indices: indices,
            bsv_indices: decision.bsv_indices.clone(),
            summaries: vec![decision.summary],
        }
    }

    fn fit_classifier(trainer: &Trainer<'_, '_>, problem: &Problem) -> Model {
        let params = trainer.params();
        let groups = ClassGroups::from_labels(problem.labels());
        let nr_class = groups.nr_class();
        if nr_class == 1 {
            trainer
                .sink()
                .warn("training data in only one class; every prediction is that class");
        }

        let costs = multiclass::weighted_costs(params, &groups, trainer.sink());
        let pairs = multiclass::train_pairs(trainer, problem, &groups, &costs);
        Model::assemble(params, problem, &groups, &pairs)
    }

    /// Merge pairwise decision functions over one deduplicated SV list
    fn assemble(
        params: &Parameters,
        problem: &Problem,
        groups: &ClassGroups,
        pairs: &[PairwiseModel],
    ) -> Model {
        let nr_class = groups.nr_class();
        let l = problem.len();

        // Grouped positions with a nonzero coefficient in any pair
        let mut nonzero = vec![false; l];
        let mut bounded = vec![false; l];
        for pair in pairs {
            let (i, j) = pair.classes;
            let positions = (groups.starts[i]..groups.starts[i] + groups.counts[i])
                .chain(groups.starts[j]..groups.starts[j] + groups.counts[j]);
            for (k, position) in positions.enumerate() {
                if pair.decision.alpha[k] != 0.0 {
                    nonzero[position] = true;
                }
            }
            for &k in &pair.decision.bsv_indices {
                let position = if k < groups.counts[i] {
                    groups.starts[i] + k
                } else {
                    groups.starts[j] + k - groups.counts[i]
                };
                bounded[position] = true;
            }
        }

        let n_sv: Vec<usize> = (0..nr_class)
            .map(|c| {
                nonzero[groups.starts[c]..groups.starts[c] + groups.counts[c]]
                    .iter()
                    .filter(|&&nz| nz)
                    .count()
            })
            .collect();
        let mut nz_start = vec![0; nr_class];
        for c in 1..nr_class {
            nz_start[c] = nz_start[c - 1] + n_sv[c - 1];
        }
        let total_sv: usize = n_sv.iter().sum();

        let sv_positions: Vec<usize> = (0..l).filter(|&p| nonzero[p]).collect();
        let support_vectors = sv_positions
            .iter()
            .map(|&p| problem.vector(groups.perm[p]).clone())
            .collect();
        let sv_indices = sv_positions.iter().map(|&p| groups.perm[p]).collect();
        let mut bsv_indices: Vec<usize> = (0..l)
            .filter(|&p| bounded[p])
            .map(|p| groups.perm[p])
            .collect();
        bsv_indices.sort_unstable();

        let mut sv_coef = vec![vec![0.0; total_sv]; nr_class.saturating_sub(1)];
        let mut rho = Vec::with_capacity(pairs.len());
        let mut prob_a = Vec::new();
        let mut prob_b = Vec::new();
        let mut summaries = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let (i, j) = pair.classes;
            let alpha = &pair.decision.alpha;

            let mut q = nz_start[i];
            for k in 0..groups.counts[i] {
                if nonzero[groups.starts[i] + k] {
                    sv_coef[j - 1][q] = alpha[k];
                    q += 1;
                }
            }
            let mut q = nz_start[j];
            for k in 0..groups.counts[j] {
                if nonzero[groups.starts[j] + k] {
                    sv_coef[i][q] = alpha[groups.counts[i] + k];
                    q += 1;
                }
            }

            rho.push(pair.decision.rho);
            summaries.push(pair.decision.summary);
            if let Some(sigmoid) = pair.sigmoid {
                prob_a.push(sigmoid.a);
                prob_b.push(sigmoid.b);
            }
        }

        log::debug!("assembled {} classes with {} support vectors", nr_class, total_sv);

        Model {
            params: params.clone(),
            nr_class,
            support_vectors: SupportVectorStore::Owned(support_vectors),
            sv_coef,
            rho,
            prob_a,
            prob_b,
            labels: groups.labels.clone(),
            n_sv,
            sv_indices,
            bsv_indices,
            summaries,
        }
    }

    fn kernel(&self) -> KernelFunction {
        KernelFunction::from_parameters(&self.params)
    }

    /// Decision values of `x`: one per class pair for classification, a
    /// single value otherwise.
    ///
    /// Kernel values against the support vectors are computed once and
    /// shared by all pairs.
    pub fn predict_values(&self, x: &SparseVector) -> Vec<f64> {
        let kernel = self.kernel();
        let svs = self.support_vectors.as_slice();

        if !self.params.svm_type.is_classification() {
            let coef = self.sv_coef.first().map(Vec::as_slice).unwrap_or(&[]);
            let sum: f64 = coef
                .iter()
                .zip(svs)
                .map(|(c, sv)| c * kernel.compute(x, sv))
                .sum();
            let rho = self.rho.first().copied().unwrap_or(0.0);
            let value = if self.params.svm_type.is_domain_description() {
                2.0 * sum - kernel.compute(x, x) - rho
            } else {
                sum - rho
            };
            return vec![value];
        }

        let kvalue: Vec<f64> = svs.iter().map(|sv| kernel.compute(x, sv)).collect();
        let mut start = vec![0; self.nr_class];
        for c in 1..self.nr_class {
            start[c] = start[c - 1] + self.n_sv[c - 1];
        }

        let mut values = Vec::with_capacity(self.rho.len());
        let mut p = 0;
        for i in 0..self.nr_class {
            for j in i + 1..self.nr_class {
                let (si, sj) = (start[i], start[j]);
                let (ci, cj) = (self.n_sv[i], self.n_sv[j]);
                let coef1 = &self.sv_coef[j - 1];
                let coef2 = &self.sv_coef[i];

                let mut sum: f64 = (si..si + ci).map(|k| coef1[k] * kvalue[k]).sum();
                sum += (sj..sj + cj).map(|k| coef2[k] * kvalue[k]).sum::<f64>();
                values.push(sum - self.rho[p]);
                p += 1;
            }
        }
        values
    }

    /// Predicted class label, regression value, or `±1` for one-class and
    /// domain description (`+1` inside)
    pub fn predict(&self, x: &SparseVector) -> f64 {
        let values = self.predict_values(x);
        match self.params.svm_type {
            SvmType::EpsilonSvr | SvmType::NuSvr => values[0],
            SvmType::OneClass => {
                if values[0] > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            SvmType::Svdd | SvmType::SvddL2 => {
                if values[0] >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            SvmType::CSvc | SvmType::CSvcL2 | SvmType::NuSvc => {
                if self.nr_class == 1 {
                    return f64::from(self.labels[0]);
                }
                f64::from(self.labels[multiclass::vote(&values, self.nr_class)])
            }
        }
    }

    /// Predicted label and per-class probabilities, in `labels()` order.
    ///
    /// Only classification models trained with probability estimates
    /// support this; regression models expose their noise scale through
    /// [`Model::svr_probability`] instead.
    pub fn predict_probability(&self, x: &SparseVector) -> Result<(f64, Vec<f64>)> {
        if !self.params.svm_type.is_classification() {
            return Err(SVMError::ProbabilityUnavailable(format!(
                "{} models do not produce class probabilities",
                self.params.svm_type
            )));
        }
        if self.nr_class == 1 {
            return Ok((f64::from(self.labels[0]), vec![1.0]));
        }
        if self.prob_a.len() != self.rho.len() || self.prob_b.len() != self.rho.len() {
            return Err(SVMError::ProbabilityUnavailable(
                "model was trained without probability estimates".to_string(),
            ));
        }

        let k = self.nr_class;
        let values = self.predict_values(x);
        let mut pairwise = vec![vec![0.0; k]; k];
        let mut p = 0;
        for i in 0..k {
            for j in i + 1..k {
                let r = probability::clamp_pairwise(probability::sigmoid_predict(
                    values[p],
                    self.prob_a[p],
                    self.prob_b[p],
                ));
                pairwise[i][j] = r;
                pairwise[j][i] = 1.0 - r;
                p += 1;
            }
        }

        let estimates = if k == 2 {
            vec![pairwise[0][1], pairwise[1][0]]
        } else {
            probability::multiclass_probability(&pairwise)
        };

        let mut best = 0;
        for (c, &v) in estimates.iter().enumerate() {
            if v > estimates[best] {
                best = c;
            }
        }
        Ok((f64::from(self.labels[best]), estimates))
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn svm_type(&self) -> SvmType {
        self.params.svm_type
    }

    /// Number of classes; 2 for regression, one-class and domain description
    pub fn nr_class(&self) -> usize {
        self.nr_class
    }

    /// Class labels in decision-value order; empty for non-classification
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Support vectors per class, in `labels()` order
    pub fn class_support_counts(&self) -> &[usize] {
        &self.n_sv
    }

    pub fn support_vectors(&self) -> &[SparseVector] {
        self.support_vectors.as_slice()
    }

    pub fn support_vector_store(&self) -> &SupportVectorStore {
        &self.support_vectors
    }

    pub fn total_sv(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn sv_coef(&self) -> &[Vec<f64>] {
        &self.sv_coef
    }

    pub fn rho(&self) -> &[f64] {
        &self.rho
    }

    /// Training-set index of each support vector; empty for loaded models
    pub fn sv_indices(&self) -> &[usize] {
        &self.sv_indices
    }

    /// Training-set indices of bounded support vectors
    pub fn bsv_indices(&self) -> &[usize] {
        &self.bsv_indices
    }

    /// Solver statistics per decision function; empty for loaded models
    pub fn summaries(&self) -> &[SolveSummary] {
        &self.summaries
    }

    pub fn has_probability(&self) -> bool {
        match self.params.svm_type {
            t if t.is_classification() => !self.prob_a.is_empty() && !self.prob_b.is_empty(),
            t if t.is_regression() => !self.prob_a.is_empty(),
            _ => false,
        }
    }

    /// Laplace scale `σ` of a regression model trained with probability
    /// estimates
    pub fn svr_probability(&self) -> Option<f64> {
        if self.params.svm_type.is_regression() {
            self.prob_a.first().copied()
        } else {
            None
        }
    }

    /// Release the model. Shared support vectors are only released once no
    /// other handle holds them.
    pub fn destroy(self) {
        match &self.support_vectors {
            SupportVectorStore::Owned(vectors) => {
                log::debug!("releasing {} owned support vectors", vectors.len())
            }
            SupportVectorStore::Shared(vectors) => log::debug!(
                "dropping shared support vectors ({} other handles)",
                Arc::strong_count(vectors) - 1
            ),
        }
    }
}

//! One-vs-one orchestration
//!
//! A K-class problem becomes K(K−1)/2 binary sub-problems, one per pair of
//! classes, each trained on that pair's examples only. Prediction evaluates
//! every pair and lets each cast one vote.

use crate::core::{DecisionFunction, Parameters, Problem, ProgressSink, Result, SVMError};
use crate::formulation::SubProblem;
use crate::model::Model;
use crate::optimizer::Trainer;
use crate::probability::{self, Sigmoid};
use std::ops::Range;

/// Examples regrouped by class.
///
/// Classes are numbered in order of first appearance, except that a
/// two-class problem labelled `-1` then `+1` is flipped so `+1` comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassGroups {
    pub labels: Vec<i32>,
    pub counts: Vec<usize>,
    pub starts: Vec<usize>,
    /// Original example indices, grouped by class
    pub perm: Vec<usize>,
}

impl ClassGroups {
    pub fn from_labels(labels: &[f64]) -> Self {
        let mut classes: Vec<i32> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut class_of = Vec::with_capacity(labels.len());

        for &y in labels {
            let label = y as i32;
            let k = match classes.iter().position(|&c| c == label) {
                Some(k) => k,
                None => {
                    classes.push(label);
                    counts.push(0);
                    classes.len() - 1
                }
            };
            counts[k] += 1;
            class_of.push(k);
        }

        if classes.len() == 2 && classes[0] == -1 && classes[1] == 1 {
            classes.swap(0, 1);
            counts.swap(0, 1);
            for k in &mut class_of {
                *k = 1 - *k;
            }
        }

        let mut starts = Vec::with_capacity(classes.len());
        let mut offset = 0;
        for &n in &counts {
            starts.push(offset);
            offset += n;
        }

        let mut next = starts.clone();
        let mut perm = vec![0; labels.len()];
        for (i, &k) in class_of.iter().enumerate() {
            perm[next[k]] = i;
            next[k] += 1;
        }

        Self {
            labels: classes,
            counts,
            starts,
            perm,
        }
    }

    pub fn nr_class(&self) -> usize {
        self.labels.len()
    }

    /// Original indices of the examples of class `k`
    pub fn members(&self, k: usize) -> &[usize] {
        &self.perm[self.starts[k]..self.starts[k] + self.counts[k]]
    }

    /// Class index pairs `(i, j)`, `i < j`, in training order
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> {
        let k = self.nr_class();
        (0..k).flat_map(move |i| (i + 1..k).map(move |j| (i, j)))
    }
}

/// Output of one pairwise solve
#[derive(Debug, Clone)]
pub struct PairwiseModel {
    pub classes: (usize, usize),
    /// Coefficients over the members of class `i` followed by class `j`
    pub decision: DecisionFunction,
    pub sigmoid: Option<Sigmoid>,
}

/// Per-class C after applying the configured weights.
///
/// Weights naming a class that does not occur are reported and ignored.
pub fn weighted_costs(params: &Parameters, groups: &ClassGroups, sink: &dyn ProgressSink) -> Vec<f64> {
    for &(label, _) in &params.weights {
        if !groups.labels.contains(&label) {
            sink.warn(&format!(
                "class label {} specified in weight is not found",
                label
            ));
        }
    }
    groups
        .labels
        .iter()
        .map(|&label| params.c * params.weight_for(label))
        .collect()
}

/// Train every pair of classes; class `i` is the positive side of `(i, j)`
pub fn train_pairs(
    trainer: &Trainer<'_, '_>,
    problem: &Problem,
    groups: &ClassGroups,
    costs: &[f64],
) -> Vec<PairwiseModel> {
    let params = trainer.params();
    groups
        .pairs()
        .enumerate()
        .map(|(index, (i, j))| {
            let members: Vec<usize> = groups.members(i).iter().chain(groups.members(j)).copied().collect();
            let targets = members
                .iter()
                .enumerate()
                .map(|(k, _)| if k < groups.counts[i] { 1.0 } else { -1.0 })
                .collect();
            let sub = SubProblem::new(members.iter().map(|&m| problem.vector(m)).collect(), targets);
            log::debug!(
                "training pair ({}, {}) on {} examples",
                groups.labels[i],
                groups.labels[j],
                sub.len()
            );

            let sigmoid = params.probability.then(|| {
                let seed = params.seed.wrapping_add(index as u64);
                probability::binary_svc_probability(trainer, &sub, costs[i], costs[j], seed)
            });
            let decision = trainer.train_one(sub, costs[i], costs[j]);

            PairwiseModel {
                classes: (i, j),
                decision,
                sigmoid,
            }
        })
        .collect()
}

/// Winning class index of a one-vs-one vote.
///
/// `decision_values` are in [`ClassGroups::pairs`] order; a positive value
/// votes for the first class of the pair. Ties go to the lowest index.
pub fn vote(decision_values: &[f64], nr_class: usize) -> usize {
    let mut votes = vec![0usize; nr_class];
    let pairs = (0..nr_class).flat_map(|i| (i + 1..nr_class).map(move |j| (i, j)));
    for ((i, j), &value) in pairs.zip(decision_values) {
        if value > 0.0 {
            votes[i] += 1;
        } else {
            votes[j] += 1;
        }
    }

    let mut winner = 0;
    for (k, &count) in votes.iter().enumerate() {
        if count > votes[winner] {
            winner = k;
        }
    }
    winner
}

/// Contiguous folds over `0..l`; the first `l % nr_fold` folds get one
/// extra example
pub fn fold_ranges(l: usize, nr_fold: usize) -> Vec<Range<usize>> {
    let base = l / nr_fold;
    let extra = l % nr_fold;
    let mut ranges = Vec::with_capacity(nr_fold);
    let mut start = 0;
    for k in 0..nr_fold {
        let size = base + usize::from(k < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// N-fold cross-validation: every example is predicted by a model trained
/// without its fold. Output is in original example order.
pub fn cross_validate(
    problem: &Problem,
    params: &Parameters,
    nr_fold: usize,
    sink: &dyn ProgressSink,
) -> Result<Vec<f64>> {
    params.check(problem)?;
    let l = problem.len();
    if nr_fold < 2 {
        return Err(SVMError::InvalidParameter(
            "number of folds must be at least 2".to_string(),
        ));
    }
    if l < 2 {
        return Err(SVMError::InvalidDataset(
            "cross-validation needs at least 2 examples".to_string(),
        ));
    }
    let nr_fold = if nr_fold > l {
        sink.warn(&format!(
            "{} folds requested for {} examples; using leave-one-out",
            nr_fold, l
        ));
        l
    } else {
        nr_fold
    };

    let params = params.with_resolved_gamma(problem.max_index());
    let use_probability = params.probability && params.svm_type.is_classification();
    let mut predictions = vec![0.0; l];

    for (fold, held_out) in fold_ranges(l, nr_fold).into_iter().enumerate() {
        let training: Vec<usize> = (0..l).filter(|i| !held_out.contains(i)).collect();
        log::debug!("fold {}: {} training, {} held out", fold, training.len(), held_out.len());

        let model = Model::fit(&problem.subset(&training), &params, sink)?;
        for i in held_out {
            predictions[i] = if use_probability {
                model.predict_probability(problem.vector(i))?.0
            } else {
                model.predict(problem.vector(i))
            };
        }
    }
    Ok(predictions)
}

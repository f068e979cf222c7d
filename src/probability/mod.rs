//! Probability calibration
//!
//! Classification: a Platt sigmoid `P(y = 1 | f) = 1 / (1 + exp(A·f + B))`
//! per pair, fitted on decision values from an internal 5-fold
//! cross-validation, then pairwise coupling into class probabilities.
//! Regression: the scale of a Laplace noise model fitted on
//! cross-validated residuals.
//!
//! Calibration never fails a training run; a fit that goes wrong falls back
//! to a default and is reported through the sink.

use crate::core::{Problem, ProgressSink, SparseVector};
use crate::formulation::SubProblem;
use crate::multiclass::fold_ranges;
use crate::optimizer::Trainer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Folds of the internal cross-validation
const CALIBRATION_FOLDS: usize = 5;

/// Pairwise probabilities are kept inside `[MIN_PROB, 1 − MIN_PROB]`
const MIN_PROB: f64 = 1e-7;

/// Sigmoid parameters of one pairwise classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sigmoid {
    pub a: f64,
    pub b: f64,
}

impl Sigmoid {
    /// Probability of the positive class for decision value `f`
    pub fn predict(&self, f: f64) -> f64 {
        sigmoid_predict(f, self.a, self.b)
    }
}

/// How a sigmoid fit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Converged,
    /// Line search or iteration cap stopped the fit; the last iterate is kept
    Stalled,
    /// The fit produced non-finite values; the prior-only sigmoid is used
    Failed,
}

/// Fit `A` and `B` by Newton's method with backtracking (Lin, Lin & Weng),
/// using Platt's smoothed targets. `labels` are `±1`.
pub fn sigmoid_train(dec_values: &[f64], labels: &[f64]) -> (Sigmoid, CalibrationOutcome) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let prior = Sigmoid {
        a: 0.0,
        b: ((prior0 + 1.0) / (prior1 + 1.0)).ln(),
    };
    let objective = |a: f64, b: f64| -> f64 {
        dec_values
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    t * f_apb + (-f_apb).exp().ln_1p()
                } else {
                    (t - 1.0) * f_apb + f_apb.exp().ln_1p()
                }
            })
            .sum()
    };

    let (mut a, mut b) = (prior.a, prior.b);
    let mut fval = objective(a, b);
    let mut outcome = CalibrationOutcome::Stalled;

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &t) in dec_values.iter().zip(&targets) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            outcome = CalibrationOutcome::Converged;
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        let mut accepted = false;
        while step >= MIN_STEP {
            let (new_a, new_b) = (a + step * da, b + step * db);
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                accepted = true;
                break;
            }
            step /= 2.0;
        }
        if !accepted {
            log::debug!("line search fails in two-class probability estimates");
            break;
        }
    }

    if !(a.is_finite() && b.is_finite()) {
        return (prior, CalibrationOutcome::Failed);
    }
    (Sigmoid { a, b }, outcome)
}

/// `1 / (1 + exp(A·f + B))`, evaluated without overflow
pub fn sigmoid_predict(dec_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = dec_value * a + b;
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Clamp a pairwise probability away from 0 and 1
pub fn clamp_pairwise(p: f64) -> f64 {
    p.clamp(MIN_PROB, 1.0 - MIN_PROB)
}

/// Couple pairwise probabilities `r[i][j] ≈ P(y = i | y ∈ {i, j})` into a
/// class distribution (Wu, Lin & Weng, method 2).
///
/// The fixed point is iterated at most `max(100, k)` times; the result is
/// clamped to be non-negative and renormalised either way.
pub fn multiclass_probability(r: &[Vec<f64>]) -> Vec<f64> {
    let k = r.len();
    if k == 0 {
        return Vec::new();
    }
    let max_iter = k.max(100);
    let eps = 0.005 / k as f64;

    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        for j in 0..k {
            if j == t {
                continue;
            }
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0; k];
    let mut converged = false;
    for _ in 0..max_iter {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            p_qp += p[t] * qp[t];
        }
        let max_error = qp
            .iter()
            .map(|&v| (v - p_qp).abs())
            .fold(0.0, f64::max);
        if max_error < eps {
            converged = true;
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
    }
    if !converged {
        log::debug!("exceeds max_iter in multiclass probability coupling");
    }

    for v in &mut p {
        *v = v.max(0.0);
    }
    let total: f64 = p.iter().sum();
    if total > 0.0 && total.is_finite() {
        p.iter_mut().for_each(|v| *v /= total);
    } else {
        p.fill(1.0 / k as f64);
    }
    p
}

/// Shuffled example order split into calibration folds
fn shuffled_folds(l: usize, seed: u64) -> (Vec<usize>, Vec<std::ops::Range<usize>>) {
    let mut order: Vec<usize> = (0..l).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let nr_fold = CALIBRATION_FOLDS.min(l.max(1));
    (order, fold_ranges(l, nr_fold))
}

/// Fit the sigmoid of one pairwise classifier from cross-validated
/// decision values.
///
/// Folds whose training part holds a single class predict `±1` for it (and
/// 0 when empty) instead of training.
pub fn binary_svc_probability(
    trainer: &Trainer<'_, '_>,
    sub: &SubProblem<'_>,
    cp: f64,
    cn: f64,
    seed: u64,
) -> Sigmoid {
    let l = sub.len();
    let (order, folds) = shuffled_folds(l, seed);
    let mut dec_values = vec![0.0; l];

    for held_out in folds {
        let training: Vec<usize> = order[..held_out.start]
            .iter()
            .chain(&order[held_out.end..])
            .copied()
            .collect();
        let positives = training.iter().filter(|&&i| sub.targets[i] > 0.0).count();
        let negatives = training.len() - positives;

        let held: Vec<usize> = order[held_out].to_vec();
        if positives == 0 || negatives == 0 {
            let constant = match (positives, negatives) {
                (0, 0) => 0.0,
                (_, 0) => 1.0,
                _ => -1.0,
            };
            for &i in &held {
                dec_values[i] = constant;
            }
            continue;
        }

        let vectors: Vec<&SparseVector> = training.iter().map(|&i| sub.vectors[i]).collect();
        let targets = training.iter().map(|&i| sub.targets[i]).collect();
        let fold_sub = SubProblem::new(vectors.clone(), targets);
        let decision = trainer.train_one(fold_sub, cp, cn);
        for &i in &held {
            dec_values[i] = trainer.decision_value(&vectors, &decision, sub.vectors[i]);
        }
    }

    let (sigmoid, outcome) = sigmoid_train(&dec_values, &sub.targets);
    match outcome {
        CalibrationOutcome::Converged => {}
        CalibrationOutcome::Stalled => trainer
            .sink()
            .warn("two-class probability fit stopped before converging"),
        CalibrationOutcome::Failed => trainer
            .sink()
            .warn("two-class probability fit failed; using the class prior"),
    }
    sigmoid
}

/// Scale `σ` of the Laplace noise model `e^{−|z|/σ} / 2σ` for regression,
/// from 5-fold cross-validated residuals. Residuals beyond `5·std` are
/// dropped before the final mean.
pub fn svr_probability(trainer: &Trainer<'_, '_>, problem: &Problem) -> f64 {
    let l = problem.len();
    let (order, folds) = shuffled_folds(l, trainer.params().seed);
    let mut residuals = vec![0.0; l];

    for held_out in folds {
        let training: Vec<usize> = order[..held_out.start]
            .iter()
            .chain(&order[held_out.end..])
            .copied()
            .collect();
        let vectors: Vec<&SparseVector> = training.iter().map(|&i| problem.vector(i)).collect();
        let targets = training.iter().map(|&i| problem.label(i)).collect();
        let decision = trainer.train_one(
            SubProblem::new(vectors.clone(), targets),
            trainer.params().c,
            trainer.params().c,
        );
        for &i in &order[held_out] {
            let predicted = trainer.decision_value(&vectors, &decision, problem.vector(i));
            residuals[i] = problem.label(i) - predicted;
        }
    }

    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / l as f64;
    let std = (2.0 * mae * mae).sqrt();
    let kept: Vec<f64> = residuals
        .iter()
        .map(|r| r.abs())
        .filter(|&r| r <= 5.0 * std)
        .collect();
    let sigma = if kept.is_empty() {
        mae
    } else {
        kept.iter().sum::<f64>() / kept.len() as f64
    };

    trainer.sink().info(&format!(
        "Prob. model for test data: target value = predicted value + z, \
         z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma = {:.6}",
        sigma
    ));
    sigma
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KernelType, Parameters, SilentSink, SvmType};
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_predict_is_stable() {
        assert_relative_eq!(sigmoid_predict(0.0, 1.0, 0.0), 0.5);
        assert!(sigmoid_predict(1e4, 1.0, 0.0) >= 0.0);
        assert!(sigmoid_predict(-1e4, 1.0, 0.0) <= 1.0);
        // Negative A makes large decision values likely positive
        assert!(sigmoid_predict(3.0, -2.0, 0.0) > 0.99);
    }

    #[test]
    fn test_sigmoid_train_separates_classes() {
        let dec_values = [-2.0, -1.5, -1.0, -0.2, 0.3, 1.0, 1.5, 2.0];
        let labels = [-1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0];
        let (sigmoid, outcome) = sigmoid_train(&dec_values, &labels);

        assert_eq!(outcome, CalibrationOutcome::Converged);
        assert!(sigmoid.a < 0.0);
        assert!(sigmoid.predict(2.0) > 0.7);
        assert!(sigmoid.predict(-2.0) < 0.3);
    }

    #[test]
    fn test_sigmoid_train_uninformative_values_give_prior() {
        let dec_values = [0.0; 6];
        let labels = [1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
        let (sigmoid, _) = sigmoid_train(&dec_values, &labels);

        // Mean of the smoothed targets, 3/4 and 1/6
        let p = sigmoid.predict(0.0);
        assert!(p > 0.2 && p < 0.5);
    }

    #[test]
    fn test_multiclass_probability_is_distribution() {
        let r = vec![
            vec![0.0, 0.7, 0.8],
            vec![0.3, 0.0, 0.6],
            vec![0.2, 0.4, 0.0],
        ];
        let p = multiclass_probability(&r);

        assert_eq!(p.len(), 3);
        assert!(p.iter().all(|&v| v >= 0.0));
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn test_multiclass_probability_symmetric_case_is_uniform() {
        let r = vec![vec![0.0, 0.5], vec![0.5, 0.0]];
        let p = multiclass_probability(&r);
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(p[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_clamp_pairwise() {
        assert_eq!(clamp_pairwise(0.0), MIN_PROB);
        assert_eq!(clamp_pairwise(1.0), 1.0 - MIN_PROB);
        assert_eq!(clamp_pairwise(0.3), 0.3);
    }

    #[test]
    fn test_binary_probability_orders_classes() {
        let points: Vec<SparseVector> = (0..20)
            .map(|k| {
                let side = if k < 10 { 1.0 } else { -1.0 };
                SparseVector::from_dense(&[side * (1.0 + (k % 10) as f64 * 0.1)])
            })
            .collect();
        let targets: Vec<f64> = (0..20).map(|k| if k < 10 { 1.0 } else { -1.0 }).collect();
        let sub = SubProblem::new(points.iter().collect(), targets);

        let params = Parameters::new(SvmType::CSvc, KernelType::Linear);
        let trainer = Trainer::new(&params, &SilentSink);
        let sigmoid = binary_svc_probability(&trainer, &sub, 1.0, 1.0, 7);

        assert!(sigmoid.predict(1.0) > 0.5);
        assert!(sigmoid.predict(-1.0) < 0.5);
    }

    #[test]
    fn test_svr_probability_tracks_noise_scale() {
        let vectors: Vec<SparseVector> = (0..40)
            .map(|k| SparseVector::from_dense(&[k as f64 / 10.0]))
            .collect();
        // Alternating ±0.5 noise around a line
        let labels = (0..40)
            .map(|k| 2.0 * k as f64 / 10.0 + if k % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let problem = Problem::new(labels, vectors).unwrap();

        let params = Parameters {
            p: 0.1,
            ..Parameters::new(SvmType::EpsilonSvr, KernelType::Linear)
        };
        let trainer = Trainer::new(&params, &SilentSink);
        let sigma = svr_probability(&trainer, &problem);

        assert!(sigma > 0.2 && sigma < 1.0, "sigma = {}", sigma);
    }
}

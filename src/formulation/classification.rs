//! Binary classification formulations: C-SVC (boxed or squared slack) and ν-SVC

use crate::core::{DecisionFunction, ProgressSink, SvmType};
use crate::formulation::{assemble, report, Formulation, SlackPenalty, SolveContext, SubProblem};
use crate::solver::{KernelQ, QMatrix, Solution, SolverVariant};

fn signs_of(targets: &[f64]) -> Vec<i8> {
    targets.iter().map(|&y| if y > 0.0 { 1 } else { -1 }).collect()
}

/// C-SVC on one pair of classes.
///
/// `cp` bounds the positive examples and `cn` the negative ones, which is
/// how per-class weights reach the solver. With squared slack the bounds
/// move into the diagonal as `1 / (2C)`.
pub struct CSvc<'a> {
    sub: SubProblem<'a>,
    signs: Vec<i8>,
    cp: f64,
    cn: f64,
    penalty: SlackPenalty,
}

impl<'a> CSvc<'a> {
    pub fn new(sub: SubProblem<'a>, cp: f64, cn: f64, penalty: SlackPenalty) -> Self {
        let signs = signs_of(&sub.targets);
        Self {
            sub,
            signs,
            cp,
            cn,
            penalty,
        }
    }

    fn c_of(&self, i: usize) -> f64 {
        if self.signs[i] > 0 {
            self.cp
        } else {
            self.cn
        }
    }
}

impl<'a> Formulation<'a> for CSvc<'a> {
    fn svm_type(&self) -> SvmType {
        match self.penalty {
            SlackPenalty::Linear => SvmType::CSvc,
            SlackPenalty::Squared => SvmType::CSvcL2,
        }
    }

    fn variant(&self) -> SolverVariant {
        SolverVariant::Standard
    }

    fn size(&self) -> usize {
        self.sub.len()
    }

    fn signs(&self) -> Vec<i8> {
        self.signs.clone()
    }

    fn upper_bound(&self, i: usize) -> f64 {
        self.penalty.upper_bound(self.c_of(i))
    }

    fn equality_target(&self) -> f64 {
        0.0
    }

    fn initial_point(&self) -> Vec<f64> {
        vec![0.0; self.size()]
    }

    fn linear_term(&self) -> Vec<f64> {
        vec![-1.0; self.size()]
    }

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a> {
        let shift = (0..self.size())
            .map(|i| self.penalty.diag_shift(self.c_of(i), 2.0))
            .collect();
        Box::new(KernelQ::new(
            self.sub.kernel_matrix(ctx.kernel),
            self.signs.clone(),
            shift,
            ctx.cache_bytes,
        ))
    }

    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction {
        let raw = &solution.alpha;
        if self.penalty == SlackPenalty::Linear && self.cp == self.cn && !raw.is_empty() {
            let sum: f64 = raw.iter().sum();
            sink.info(&format!("nu = {:.6}", sum / (self.cp * raw.len() as f64)));
        }

        let alpha = raw
            .iter()
            .zip(&self.signs)
            .map(|(a, &y)| a * f64::from(y))
            .collect();
        let decision = assemble(alpha, solution.rho, solution.objective, &solution, |i| {
            self.penalty.is_bounded(raw[i], self.c_of(i))
        });
        report(sink, &decision);
        decision
    }
}

/// ν-SVC on one pair of classes.
///
/// Solved with unit box and the ν solver, then rescaled by `1/r` so the
/// decision function has the same form as C-SVC with `C = 1/r`.
pub struct NuSvc<'a> {
    sub: SubProblem<'a>,
    signs: Vec<i8>,
    nu: f64,
}

impl<'a> NuSvc<'a> {
    pub fn new(sub: SubProblem<'a>, nu: f64) -> Self {
        let signs = signs_of(&sub.targets);
        Self { sub, signs, nu }
    }
}

impl<'a> Formulation<'a> for NuSvc<'a> {
    fn svm_type(&self) -> SvmType {
        SvmType::NuSvc
    }

    fn variant(&self) -> SolverVariant {
        SolverVariant::Nu
    }

    fn size(&self) -> usize {
        self.sub.len()
    }

    fn signs(&self) -> Vec<i8> {
        self.signs.clone()
    }

    fn upper_bound(&self, _i: usize) -> f64 {
        1.0
    }

    fn equality_target(&self) -> f64 {
        0.0
    }

    /// Each class starts with `ν·l/2` of mass, packed into its first examples
    fn initial_point(&self) -> Vec<f64> {
        let half = self.nu * self.size() as f64 / 2.0;
        let mut remaining = [half, half];
        self.signs
            .iter()
            .map(|&y| {
                let side = usize::from(y < 0);
                let a = remaining[side].min(1.0);
                remaining[side] -= a;
                a
            })
            .collect()
    }

    fn linear_term(&self) -> Vec<f64> {
        vec![0.0; self.size()]
    }

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a> {
        Box::new(KernelQ::new(
            self.sub.kernel_matrix(ctx.kernel),
            self.signs.clone(),
            vec![0.0; self.size()],
            ctx.cache_bytes,
        ))
    }

    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction {
        let r = solution.r;
        sink.info(&format!("C = {:.6}", 1.0 / r));

        let raw = &solution.alpha;
        let alpha = raw
            .iter()
            .zip(&self.signs)
            .map(|(a, &y)| a * f64::from(y) / r)
            .collect();
        let decision = assemble(
            alpha,
            solution.rho / r,
            solution.objective / (r * r),
            &solution,
            |i| raw[i] >= 1.0,
        );
        report(sink, &decision);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SparseVector;
    use crate::formulation::solve;
    use crate::formulation::test_support::{balance, context};
    use crate::kernel::{GaussianKernel, KernelFunction, LinearKernel};
    use approx::assert_relative_eq;

    fn separable() -> Vec<SparseVector> {
        vec![
            SparseVector::from_dense(&[2.0, 2.0]),
            SparseVector::from_dense(&[1.0, 1.0]),
            SparseVector::from_dense(&[-1.0, -1.0]),
            SparseVector::from_dense(&[-2.0, -2.0]),
        ]
    }

    fn overlapping() -> (Vec<SparseVector>, Vec<f64>) {
        let mut points = Vec::new();
        let mut targets = Vec::new();
        for k in 0..30 {
            let t = k as f64 / 10.0;
            let y = if k % 3 == 0 { -1.0 } else { 1.0 };
            points.push(SparseVector::from_dense(&[t, (t * 3.0).sin() + 0.2 * y]));
            targets.push(y);
        }
        (points, targets)
    }

    #[test]
    fn test_c_svc_separable_support_vectors() {
        let points = separable();
        let sub = SubProblem::new(points.iter().collect(), vec![1.0, 1.0, -1.0, -1.0]);
        let formulation = CSvc::new(sub, 1.0, 1.0, SlackPenalty::Linear);

        let ctx = context(KernelFunction::Linear(LinearKernel::new()), 1e-3);
        let decision = solve(&formulation, &ctx);

        assert_eq!(decision.sv_indices, vec![1, 2]);
        assert!(decision.bsv_indices.is_empty());
        assert_relative_eq!(decision.alpha[1], 0.25, epsilon = 1e-3);
        assert_relative_eq!(decision.alpha[2], -0.25, epsilon = 1e-3);
    }

    #[test]
    fn test_c_svc_weighted_bounds() {
        let (points, targets) = overlapping();
        let sub = SubProblem::new(points.iter().collect(), targets.clone());
        let formulation = CSvc::new(sub, 0.5, 2.0, SlackPenalty::Linear);

        let ctx = context(KernelFunction::Gaussian(GaussianKernel::new(0.5)), 1e-3);
        let decision = solve(&formulation, &ctx);

        for (i, &a) in decision.alpha.iter().enumerate() {
            let bound = if targets[i] > 0.0 { 0.5 } else { 2.0 };
            assert!(a.abs() <= bound + 1e-12);
            assert!(a * targets[i] >= 0.0);
        }
        let sum: f64 = decision.alpha.iter().sum();
        assert!(sum.abs() < 1e-6);
    }

    #[test]
    fn test_c_svc_l2_has_no_box() {
        let (points, targets) = overlapping();
        let sub = SubProblem::new(points.iter().collect(), targets);
        let formulation = CSvc::new(sub, 0.1, 0.1, SlackPenalty::Squared);

        assert!(formulation.upper_bound(0).is_infinite());
        assert_eq!(formulation.svm_type(), SvmType::CSvcL2);

        let ctx = context(KernelFunction::Gaussian(GaussianKernel::new(0.5)), 1e-3);
        let decision = solve(&formulation, &ctx);
        assert!(decision.summary.converged);
        assert!(decision.n_support_vectors() > 0);
        for &i in &decision.bsv_indices {
            assert!(decision.alpha[i].abs() >= 0.2);
        }
    }

    #[test]
    fn test_nu_svc_initial_point_is_feasible() {
        let (points, targets) = overlapping();
        let sub = SubProblem::new(points.iter().collect(), targets);
        let formulation = NuSvc::new(sub, 0.4);

        let alpha = formulation.initial_point();
        assert!(alpha.iter().all(|&a| (0.0..=1.0).contains(&a)));
        assert_relative_eq!(alpha.iter().sum::<f64>(), 0.4 * 30.0, epsilon = 1e-12);
        assert_relative_eq!(balance(&formulation, &alpha), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nu_svc_solution_is_rescaled() {
        let (points, targets) = overlapping();
        let sub = SubProblem::new(points.iter().collect(), targets);
        let formulation = NuSvc::new(sub, 0.4);

        let ctx = context(KernelFunction::Gaussian(GaussianKernel::new(0.5)), 1e-4);
        let decision = solve(&formulation, &ctx);

        let sum: f64 = decision.alpha.iter().sum();
        assert!(sum.abs() < 1e-6);
        // At least a ν fraction of examples are support vectors
        assert!(decision.n_support_vectors() as f64 >= 0.4 * 30.0 - 1e-9);
    }
}

//! Mapping of each SVM type onto the shared QP solver
//!
//! A [`Formulation`] fixes the box, the linear term, the starting point and
//! how the raw solution becomes a [`DecisionFunction`]. One is chosen per
//! sub-problem by [`for_type`]; the solver loop itself never branches on
//! the SVM type.

pub mod classification;
pub mod one_class;
pub mod regression;
pub mod svdd;

pub use self::classification::{CSvc, NuSvc};
pub use self::one_class::OneClass;
pub use self::regression::{EpsilonSvr, NuSvr};
pub use self::svdd::Svdd;

use crate::core::{DecisionFunction, Parameters, ProgressSink, SolveSummary, SparseVector, SvmType};
use crate::kernel::{KernelFunction, KernelMatrix};
use crate::solver::{QMatrix, QpProblem, SMOSolver, Solution, SolverVariant};

/// The examples of one solve: borrowed vectors plus their targets
/// (`±1` for binary classification, real values for regression, ignored
/// otherwise)
#[derive(Debug, Clone)]
pub struct SubProblem<'a> {
    pub vectors: Vec<&'a SparseVector>,
    pub targets: Vec<f64>,
}

impl<'a> SubProblem<'a> {
    pub fn new(vectors: Vec<&'a SparseVector>, targets: Vec<f64>) -> Self {
        debug_assert_eq!(vectors.len(), targets.len());
        Self { vectors, targets }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub(crate) fn kernel_matrix(&self, kernel: KernelFunction) -> KernelMatrix<'a> {
        KernelMatrix::new(self.vectors.clone(), kernel)
    }
}

/// How slack enters the primal objective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlackPenalty {
    /// `C Σξ`: multipliers are boxed by `C`
    Linear,
    /// `C Σξ²`: no upper box, `Q` gains a diagonal term instead
    Squared,
}

impl SlackPenalty {
    pub fn for_type(svm_type: SvmType) -> Self {
        if svm_type.is_l2_penalized() {
            SlackPenalty::Squared
        } else {
            SlackPenalty::Linear
        }
    }

    pub fn upper_bound(self, c: f64) -> f64 {
        match self {
            SlackPenalty::Linear => c,
            SlackPenalty::Squared => f64::INFINITY,
        }
    }

    /// Diagonal added to `Q_ii`; `scale` is 2 for classification and 4 for
    /// domain description
    pub fn diag_shift(self, c: f64, scale: f64) -> f64 {
        match self {
            SlackPenalty::Linear => 0.0,
            SlackPenalty::Squared => 1.0 / (scale * c),
        }
    }

    /// A boxed multiplier is bounded at `C`; a squared-slack one when its
    /// slack `α / 2C` reaches 1
    pub fn is_bounded(self, alpha: f64, c: f64) -> bool {
        match self {
            SlackPenalty::Linear => alpha >= c,
            SlackPenalty::Squared => alpha / (2.0 * c) >= 1.0,
        }
    }
}

/// Shared settings for every sub-problem of one training run
#[derive(Clone, Copy)]
pub struct SolveContext<'s> {
    pub kernel: KernelFunction,
    pub cache_bytes: usize,
    pub solver: SMOSolver,
    pub sink: &'s dyn ProgressSink,
}

/// One SVM type expressed as a dual QP for the shared solver
pub trait Formulation<'a> {
    fn svm_type(&self) -> SvmType;

    fn variant(&self) -> SolverVariant;

    /// Number of solver variables (`2l` for regression)
    fn size(&self) -> usize;

    /// Label signs of the solver variables
    fn signs(&self) -> Vec<i8>;

    /// Box bound of variable `i`
    fn upper_bound(&self, i: usize) -> f64;

    /// `Σ yᵢαᵢ` the solution must preserve
    fn equality_target(&self) -> f64;

    /// A feasible starting point with `Σ yᵢαᵢ` equal to the target
    fn initial_point(&self) -> Vec<f64>;

    fn linear_term(&self) -> Vec<f64>;

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a>;

    /// Convert the raw solution into a decision function, reporting
    /// type-specific statistics through the sink
    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction;

    /// Solution that needs no iteration, if the problem admits one
    fn closed_form(&self, _sink: &dyn ProgressSink) -> Option<DecisionFunction> {
        None
    }
}

/// Pick the formulation for `svm_type`.
///
/// `cp` and `cn` are the upper bounds for positive and negative examples of
/// a classification pair; other types take their bound from `params`.
pub fn for_type<'a>(
    svm_type: SvmType,
    sub: SubProblem<'a>,
    params: &Parameters,
    cp: f64,
    cn: f64,
) -> Box<dyn Formulation<'a> + 'a> {
    match svm_type {
        SvmType::CSvc | SvmType::CSvcL2 => {
            Box::new(CSvc::new(sub, cp, cn, SlackPenalty::for_type(svm_type)))
        }
        SvmType::NuSvc => Box::new(NuSvc::new(sub, params.nu)),
        SvmType::OneClass => Box::new(OneClass::new(sub, params.nu)),
        SvmType::EpsilonSvr => Box::new(EpsilonSvr::new(sub, params.p, params.c)),
        SvmType::NuSvr => Box::new(NuSvr::new(sub, params.nu, params.c)),
        SvmType::Svdd | SvmType::SvddL2 => Box::new(Svdd::new(
            sub,
            KernelFunction::from_parameters(params),
            params.c,
            SlackPenalty::for_type(svm_type),
        )),
    }
}

/// Solve one formulation end to end
pub fn solve<'a>(formulation: &dyn Formulation<'a>, ctx: &SolveContext<'_>) -> DecisionFunction {
    if let Some(decision) = formulation.closed_form(ctx.sink) {
        return decision;
    }

    let n = formulation.size();
    let signs = formulation.signs();
    let alpha = formulation.initial_point();
    debug_assert!({
        let balance: f64 = alpha
            .iter()
            .zip(&signs)
            .map(|(a, &s)| a * f64::from(s))
            .sum();
        (balance - formulation.equality_target()).abs() <= 1e-8 * (1.0 + balance.abs())
    });

    let problem = QpProblem {
        q: formulation.q_matrix(ctx),
        p: formulation.linear_term(),
        signs,
        upper_bounds: (0..n).map(|i| formulation.upper_bound(i)).collect(),
        alpha,
    };
    let solution = ctx.solver.solve(formulation.variant(), problem, ctx.sink);
    if !solution.converged {
        log::debug!(
            "{} solve stopped after {} iterations without converging",
            formulation.svm_type(),
            solution.iterations
        );
    }
    formulation.finish(solution, ctx.sink)
}

/// Build a decision function from signed coefficients and a per-example
/// boundedness test
pub(crate) fn assemble(
    alpha: Vec<f64>,
    rho: f64,
    objective: f64,
    solution: &Solution,
    is_bounded: impl Fn(usize) -> bool,
) -> DecisionFunction {
    let mut sv_indices = Vec::new();
    let mut bsv_indices = Vec::new();
    for (i, &a) in alpha.iter().enumerate() {
        if a == 0.0 {
            continue;
        }
        if is_bounded(i) {
            bsv_indices.push(i);
        } else {
            sv_indices.push(i);
        }
    }

    let summary = SolveSummary {
        iterations: solution.iterations,
        converged: solution.converged,
        objective,
        rho,
        n_sv: sv_indices.len() + bsv_indices.len(),
        n_bsv: bsv_indices.len(),
    };

    DecisionFunction {
        alpha,
        rho,
        sv_indices,
        bsv_indices,
        summary,
    }
}

pub(crate) fn report(sink: &dyn ProgressSink, decision: &DecisionFunction) {
    sink.info(&format!(
        "obj = {:.6}, rho = {:.6}",
        decision.summary.objective, decision.rho
    ));
    sink.info(&format!(
        "nSV = {}, nBSV = {}",
        decision.summary.n_sv, decision.summary.n_bsv
    ));
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::SilentSink;
    use crate::solver::SolverConfig;

    pub fn context(kernel: KernelFunction, eps: f64) -> SolveContext<'static> {
        SolveContext {
            kernel,
            cache_bytes: 1 << 20,
            solver: SMOSolver::new(SolverConfig {
                eps,
                ..SolverConfig::default()
            }),
            sink: &SilentSink,
        }
    }

    /// Signed sum `Σ sᵢαᵢ` of a feasible point
    pub fn balance(formulation: &dyn Formulation<'_>, alpha: &[f64]) -> f64 {
        alpha
            .iter()
            .zip(formulation.signs())
            .map(|(a, s)| a * f64::from(s))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_penalty_bounds() {
        assert_eq!(SlackPenalty::Linear.upper_bound(2.0), 2.0);
        assert!(SlackPenalty::Squared.upper_bound(2.0).is_infinite());
        assert_eq!(SlackPenalty::Linear.diag_shift(2.0, 2.0), 0.0);
        assert_eq!(SlackPenalty::Squared.diag_shift(2.0, 2.0), 0.25);
        assert_eq!(SlackPenalty::Squared.diag_shift(2.0, 4.0), 0.125);
    }

    #[test]
    fn test_slack_penalty_bounded_rule() {
        assert!(SlackPenalty::Linear.is_bounded(1.0, 1.0));
        assert!(!SlackPenalty::Linear.is_bounded(0.5, 1.0));
        assert!(SlackPenalty::Squared.is_bounded(2.0, 1.0));
        assert!(!SlackPenalty::Squared.is_bounded(1.0, 1.0));
    }

    #[test]
    fn test_for_type_selects_matching_formulation() {
        let x = SparseVector::from_dense(&[1.0]);
        let y = SparseVector::from_dense(&[-1.0]);
        let params = Parameters::default();
        for svm_type in SvmType::ALL {
            let sub = SubProblem::new(vec![&x, &y], vec![1.0, -1.0]);
            let formulation = for_type(svm_type, sub, &params, 1.0, 1.0);
            assert_eq!(formulation.svm_type(), svm_type);
            let expected = if svm_type.is_regression() { 4 } else { 2 };
            assert_eq!(formulation.size(), expected);
        }
    }

    #[test]
    fn test_assemble_partitions_support_vectors() {
        let solution = Solution {
            alpha: vec![],
            rho: 0.5,
            r: 0.0,
            objective: -1.0,
            iterations: 7,
            converged: true,
        };
        let decision = assemble(vec![0.0, 0.3, -1.0, 1.0], 0.5, -1.0, &solution, |i| i >= 2);

        assert_eq!(decision.sv_indices, vec![1]);
        assert_eq!(decision.bsv_indices, vec![2, 3]);
        assert_eq!(decision.summary.n_sv, 3);
        assert_eq!(decision.summary.n_bsv, 2);
        assert_eq!(decision.summary.iterations, 7);
    }
}

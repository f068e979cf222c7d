//! One-class SVM (Schölkopf et al.)
//!
//! `min ½αᵀKα  s.t.  0 ≤ αᵢ ≤ 1,  Σαᵢ = ν·l`. The decision value is
//! `Σαᵢ K(xᵢ, x) − ρ`, positive on the estimated support of the data.

use crate::core::{DecisionFunction, ProgressSink, SvmType};
use crate::formulation::{assemble, report, Formulation, SolveContext, SubProblem};
use crate::solver::{KernelQ, QMatrix, Solution, SolverVariant};

pub struct OneClass<'a> {
    sub: SubProblem<'a>,
    nu: f64,
}

impl<'a> OneClass<'a> {
    pub fn new(sub: SubProblem<'a>, nu: f64) -> Self {
        Self { sub, nu }
    }
}

impl<'a> Formulation<'a> for OneClass<'a> {
    fn svm_type(&self) -> SvmType {
        SvmType::OneClass
    }

    fn variant(&self) -> SolverVariant {
        SolverVariant::Standard
    }

    fn size(&self) -> usize {
        self.sub.len()
    }

    fn signs(&self) -> Vec<i8> {
        vec![1; self.size()]
    }

    fn upper_bound(&self, _i: usize) -> f64 {
        1.0
    }

    fn equality_target(&self) -> f64 {
        self.nu * self.size() as f64
    }

    /// The first `⌊ν·l⌋` multipliers at 1 and the fractional rest on the next
    fn initial_point(&self) -> Vec<f64> {
        let l = self.size();
        let total = self.equality_target();
        let n = (total as usize).min(l);
        let mut alpha = vec![0.0; l];
        alpha[..n].fill(1.0);
        if n < l {
            alpha[n] = total - n as f64;
        }
        alpha
    }

    fn linear_term(&self) -> Vec<f64> {
        vec![0.0; self.size()]
    }

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a> {
        let l = self.size();
        Box::new(KernelQ::new(
            self.sub.kernel_matrix(ctx.kernel),
            vec![1; l],
            vec![0.0; l],
            ctx.cache_bytes,
        ))
    }

    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction {
        let alpha = solution.alpha.clone();
        let decision = assemble(alpha, solution.rho, solution.objective, &solution, |i| {
            solution.alpha[i] >= 1.0
        });
        report(sink, &decision);
        decision
    }
}

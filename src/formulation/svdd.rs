//! Support vector domain description (Tax & Duin)
//!
//! Finds the smallest sphere `‖φ(x) − a‖² ≤ R²` around the data, with
//! slack penalized by `C Σξ` or `C Σξ²`. The dual
//!
//! ```text
//! min αᵀKα − Σαᵢ Kᵢᵢ   s.t.  Σαᵢ = 1,  0 ≤ αᵢ ≤ C
//! ```
//!
//! is halved to fit the solver (`Q = K`, `pᵢ = −½Kᵢᵢ`), so the solver's ρ
//! is half the model's. The model decision value is
//! `2Σαᵢ K(xᵢ, x) − K(x, x) − ρ = R² − ‖φ(x) − a‖²`, non-negative inside
//! the sphere.

use crate::core::{DecisionFunction, ProgressSink, SolveSummary, SvmType};
use crate::formulation::{
    assemble, report, Formulation, SlackPenalty, SolveContext, SubProblem,
};
use crate::kernel::KernelFunction;
use crate::solver::{KernelQ, QMatrix, Solution, SolverVariant};

pub struct Svdd<'a> {
    sub: SubProblem<'a>,
    kernel: KernelFunction,
    c: f64,
    penalty: SlackPenalty,
    /// `K(xᵢ, xᵢ)`
    diagonal: Vec<f64>,
}

impl<'a> Svdd<'a> {
    pub fn new(sub: SubProblem<'a>, kernel: KernelFunction, c: f64, penalty: SlackPenalty) -> Self {
        let matrix = sub.kernel_matrix(kernel);
        let diagonal = (0..matrix.len()).map(|i| matrix.eval(i, i)).collect();
        Self {
            sub,
            kernel,
            c,
            penalty,
            diagonal,
        }
    }

    fn shift(&self) -> f64 {
        self.penalty.diag_shift(self.c, 4.0)
    }

    fn log_radius(&self, sink: &dyn ProgressSink, squared_radius: f64) {
        sink.info(&format!("R^2 = {:.6}", squared_radius));
        if squared_radius < 0.0 {
            sink.warn("R^2 < 0");
        }
    }
}

impl<'a> Formulation<'a> for Svdd<'a> {
    fn svm_type(&self) -> SvmType {
        match self.penalty {
            SlackPenalty::Linear => SvmType::Svdd,
            SlackPenalty::Squared => SvmType::SvddL2,
        }
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
        self.penalty.upper_bound(self.c)
    }

    fn equality_target(&self) -> f64 {
        1.0
    }

    /// Unit mass spread greedily, at most `C` per multiplier
    fn initial_point(&self) -> Vec<f64> {
        let bound = self.upper_bound(0);
        let mut remaining = 1.0f64;
        (0..self.size())
            .map(|_| {
                let a = remaining.min(bound);
                remaining -= a;
                a
            })
            .collect()
    }

    fn linear_term(&self) -> Vec<f64> {
        self.diagonal.iter().map(|&k| -0.5 * k).collect()
    }

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a> {
        let l = self.size();
        Box::new(KernelQ::new(
            self.sub.kernel_matrix(ctx.kernel),
            vec![1; l],
            vec![self.shift(); l],
            ctx.cache_bytes,
        ))
    }

    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction {
        let alpha = solution.alpha.clone();

        // αᵀKα from the solver objective ½αᵀ(K + sI)α − ½Σαᵢ Kᵢᵢ
        let linear: f64 = alpha.iter().zip(&self.diagonal).map(|(a, k)| a * k).sum();
        let ridge: f64 = alpha.iter().map(|a| a * a).sum::<f64>() * self.shift();
        let quadratic = 2.0 * solution.objective + linear - ridge;

        let rho = 2.0 * solution.rho;
        self.log_radius(sink, quadratic - rho);

        let decision = assemble(alpha, rho, solution.objective, &solution, |i| {
            self.penalty.is_bounded(solution.alpha[i], self.c)
        });
        report(sink, &decision);
        decision
    }

    /// With `C·l ≤ 1` no point of the box carries unit mass, so every
    /// example is a bounded support vector. The multipliers are set to `1/l`
    /// so the center is the centroid of the data, and the sphere collapses
    /// onto it (`R² = 0`).
    fn closed_form(&self, sink: &dyn ProgressSink) -> Option<DecisionFunction> {
        let l = self.size();
        if l == 0 || self.penalty != SlackPenalty::Linear || self.c * l as f64 > 1.0 {
            return None;
        }
        sink.warn(&format!(
            "C*l = {:.6} <= 1, every example is a bounded support vector",
            self.c * l as f64
        ));

        let weight = 1.0 / l as f64;
        let matrix = self.sub.kernel_matrix(self.kernel);
        let total: f64 = (0..l)
            .flat_map(|i| (0..l).map(move |j| (i, j)))
            .map(|(i, j)| matrix.eval(i, j))
            .sum();
        let quadratic = weight * weight * total;
        let objective = 0.5 * quadratic - 0.5 * weight * self.diagonal.iter().sum::<f64>();
        let rho = quadratic;
        self.log_radius(sink, 0.0);

        let decision = DecisionFunction {
            alpha: vec![weight; l],
            rho,
            sv_indices: Vec::new(),
            bsv_indices: (0..l).collect(),
            summary: SolveSummary {
                iterations: 0,
                converged: true,
                objective,
                rho,
                n_sv: l,
                n_bsv: l,
            },
        };
        report(sink, &decision);
        Some(decision)
    }
}

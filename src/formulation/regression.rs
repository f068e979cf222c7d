//! Support vector regression: ε-SVR and ν-SVR
//!
//! Both double the examples into `α⁺` (variables `0..l`) and `α⁻`
//! (variables `l..2l`) sharing one kernel row; the model coefficient of
//! example `i` is `α⁺ᵢ − α⁻ᵢ`.

use crate::core::{DecisionFunction, ProgressSink, SvmType};
use crate::formulation::{assemble, report, Formulation, SolveContext, SubProblem};
use crate::solver::{QMatrix, Solution, SolverVariant, SvrQ};

fn doubled_signs(l: usize) -> Vec<i8> {
    let mut signs = vec![1i8; 2 * l];
    signs[l..].fill(-1);
    signs
}

/// Fold `α⁺ − α⁻` back onto the examples; an example is bounded when
/// either half sits at `C`
fn fold(solution: &Solution, c: f64) -> (Vec<f64>, Vec<bool>) {
    let l = solution.alpha.len() / 2;
    let (plus, minus) = solution.alpha.split_at(l);
    let alpha = plus.iter().zip(minus).map(|(p, m)| p - m).collect();
    let bounded = plus
        .iter()
        .zip(minus)
        .map(|(&p, &m)| p >= c || m >= c)
        .collect();
    (alpha, bounded)
}

/// ε-insensitive regression with tube width `p`
pub struct EpsilonSvr<'a> {
    sub: SubProblem<'a>,
    p: f64,
    c: f64,
}

impl<'a> EpsilonSvr<'a> {
    pub fn new(sub: SubProblem<'a>, p: f64, c: f64) -> Self {
        Self { sub, p, c }
    }
}

impl<'a> Formulation<'a> for EpsilonSvr<'a> {
    fn svm_type(&self) -> SvmType {
        SvmType::EpsilonSvr
    }

    fn variant(&self) -> SolverVariant {
        SolverVariant::Standard
    }

    fn size(&self) -> usize {
        2 * self.sub.len()
    }

    fn signs(&self) -> Vec<i8> {
        doubled_signs(self.sub.len())
    }

    fn upper_bound(&self, _i: usize) -> f64 {
        self.c
    }

    fn equality_target(&self) -> f64 {
        0.0
    }

    fn initial_point(&self) -> Vec<f64> {
        vec![0.0; self.size()]
    }

    fn linear_term(&self) -> Vec<f64> {
        let plus = self.sub.targets.iter().map(|&y| self.p - y);
        let minus = self.sub.targets.iter().map(|&y| self.p + y);
        plus.chain(minus).collect()
    }

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a> {
        Box::new(SvrQ::new(
            self.sub.kernel_matrix(ctx.kernel),
            ctx.cache_bytes,
        ))
    }

    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction {
        let (alpha, bounded) = fold(&solution, self.c);
        if !alpha.is_empty() {
            let sum: f64 = alpha.iter().map(|a: &f64| a.abs()).sum();
            sink.info(&format!(
                "nu = {:.6}",
                sum / (self.c * alpha.len() as f64)
            ));
        }
        let decision = assemble(alpha, solution.rho, solution.objective, &solution, |i| {
            bounded[i]
        });
        report(sink, &decision);
        decision
    }
}

/// ν-SVR: the tube width is optimized, with ν bounding the fraction of
/// examples outside it
pub struct NuSvr<'a> {
    sub: SubProblem<'a>,
    nu: f64,
    c: f64,
}

impl<'a> NuSvr<'a> {
    pub fn new(sub: SubProblem<'a>, nu: f64, c: f64) -> Self {
        Self { sub, nu, c }
    }
}

impl<'a> Formulation<'a> for NuSvr<'a> {
    fn svm_type(&self) -> SvmType {
        SvmType::NuSvr
    }

    fn variant(&self) -> SolverVariant {
        SolverVariant::Nu
    }

    fn size(&self) -> usize {
        2 * self.sub.len()
    }

    fn signs(&self) -> Vec<i8> {
        doubled_signs(self.sub.len())
    }

    fn upper_bound(&self, _i: usize) -> f64 {
        self.c
    }

    fn equality_target(&self) -> f64 {
        0.0
    }

    /// `C·ν·l/2` of mass on each half, paired example by example
    fn initial_point(&self) -> Vec<f64> {
        let l = self.sub.len();
        let mut remaining = self.c * self.nu * l as f64 / 2.0;
        let mut alpha = vec![0.0; 2 * l];
        for i in 0..l {
            let a = remaining.min(self.c);
            alpha[i] = a;
            alpha[i + l] = a;
            remaining -= a;
        }
        alpha
    }

    fn linear_term(&self) -> Vec<f64> {
        let plus = self.sub.targets.iter().map(|&y| -y);
        let minus = self.sub.targets.iter().copied();
        plus.chain(minus).collect()
    }

    fn q_matrix(&self, ctx: &SolveContext<'_>) -> Box<dyn QMatrix + 'a> {
        Box::new(SvrQ::new(
            self.sub.kernel_matrix(ctx.kernel),
            ctx.cache_bytes,
        ))
    }

    fn finish(&self, solution: Solution, sink: &dyn ProgressSink) -> DecisionFunction {
        sink.info(&format!("epsilon = {:.6}", -solution.r));
        let (alpha, bounded) = fold(&solution, self.c);
        let decision = assemble(alpha, solution.rho, solution.objective, &solution, |i| {
            bounded[i]
        });
        report(sink, &decision);
        decision
    }
}

//! Training driver
//!
//! A [`Trainer`] binds one resolved parameter set to its kernel and solver
//! and turns sub-problems into decision functions. The multi-class
//! orchestrator, the probability calibrator and cross-validation all train
//! through it, so every solve of one run sees the same settings.

use crate::core::{DecisionFunction, Parameters, Problem, ProgressSink, SparseVector};
use crate::formulation::{self, SolveContext, SubProblem};
use crate::kernel::{Kernel, KernelFunction};
use crate::solver::{SMOSolver, SolverConfig};

/// Trains decision functions for one parameter set
#[derive(Clone, Copy)]
pub struct Trainer<'p, 's> {
    params: &'p Parameters,
    kernel: KernelFunction,
    solver: SMOSolver,
    sink: &'s dyn ProgressSink,
}

impl<'p, 's> Trainer<'p, 's> {
    /// `params` must already have `gamma` resolved; the kernel is built
    /// from them as given.
    pub fn new(params: &'p Parameters, sink: &'s dyn ProgressSink) -> Self {
        let solver = SMOSolver::new(SolverConfig {
            eps: params.eps,
            shrinking: params.shrinking,
            working_set: params.working_set,
            max_iterations: params.max_iterations,
        });
        Self {
            params,
            kernel: KernelFunction::from_parameters(params),
            solver,
            sink,
        }
    }

    pub fn params(&self) -> &'p Parameters {
        self.params
    }

    pub fn kernel(&self) -> KernelFunction {
        self.kernel
    }

    pub fn sink(&self) -> &'s dyn ProgressSink {
        self.sink
    }

    fn context(&self) -> SolveContext<'s> {
        SolveContext {
            kernel: self.kernel,
            cache_bytes: self.params.cache_size,
            solver: self.solver,
            sink: self.sink,
        }
    }

    /// Solve one sub-problem of the configured type.
    ///
    /// `cp` and `cn` bound the positive and negative examples of a
    /// classification pair and are ignored by the other types.
    pub fn train_one(&self, sub: SubProblem<'_>, cp: f64, cn: f64) -> DecisionFunction {
        let formulation = formulation::for_type(self.params.svm_type, sub, self.params, cp, cn);
        formulation::solve(formulation.as_ref(), &self.context())
    }

    /// Solve the whole problem as one sub-problem, targets taken from its
    /// labels
    pub fn train_single(&self, problem: &Problem) -> DecisionFunction {
        let sub = SubProblem::new(problem.vectors().iter().collect(), problem.labels().to_vec());
        self.train_one(sub, self.params.c, self.params.c)
    }

    /// `Σ αᵢ K(xᵢ, x) − ρ` of a decision function over the examples it was
    /// trained on
    pub fn decision_value(
        &self,
        vectors: &[&SparseVector],
        decision: &DecisionFunction,
        x: &SparseVector,
    ) -> f64 {
        let sum: f64 = decision
            .alpha
            .iter()
            .zip(vectors)
            .filter(|&(&a, _)| a != 0.0)
            .map(|(a, v)| a * self.kernel.compute(v, x))
            .sum();
        sum - decision.rho
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KernelType, SilentSink, SvmType};
    use approx::assert_relative_eq;

    fn separable() -> Problem {
        Problem::new(
            vec![1.0, 1.0, -1.0, -1.0],
            vec![
                SparseVector::from_dense(&[2.0, 2.0]),
                SparseVector::from_dense(&[1.0, 1.0]),
                SparseVector::from_dense(&[-1.0, -1.0]),
                SparseVector::from_dense(&[-2.0, -2.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_trainer_builds_solver_from_parameters() {
        let params = Parameters {
            eps: 1e-5,
            shrinking: false,
            max_iterations: Some(42),
            ..Parameters::new(SvmType::CSvc, KernelType::Linear)
        };
        let trainer = Trainer::new(&params, &SilentSink);

        assert_eq!(trainer.kernel().kernel_type(), KernelType::Linear);
        assert_eq!(trainer.solver.config().eps, 1e-5);
        assert!(!trainer.solver.config().shrinking);
        assert_eq!(trainer.solver.config().max_iterations, Some(42));
    }

    #[test]
    fn test_train_single_separates_points() {
        let problem = separable();
        let params = Parameters {
            eps: 1e-6,
            ..Parameters::new(SvmType::CSvc, KernelType::Linear)
        };
        let trainer = Trainer::new(&params, &SilentSink);
        let decision = trainer.train_single(&problem);

        // Only the two inner points carry weight
        assert_eq!(decision.alpha[0], 0.0);
        assert_eq!(decision.alpha[3], 0.0);
        assert_relative_eq!(decision.alpha[1], 0.25, epsilon = 1e-4);
        assert_relative_eq!(decision.alpha[2], -0.25, epsilon = 1e-4);

        let vectors: Vec<&SparseVector> = problem.vectors().iter().collect();
        for i in 0..problem.len() {
            let value = trainer.decision_value(&vectors, &decision, problem.vector(i));
            assert_eq!(value > 0.0, problem.label(i) > 0.0);
        }
        let midpoint = SparseVector::from_dense(&[0.1, 0.0]);
        assert!(trainer.decision_value(&vectors, &decision, &midpoint) > 0.0);
    }
}

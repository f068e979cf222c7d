//! QP decomposition solver

pub mod qmatrix;
pub mod shrinking;
pub mod smo;

pub use self::qmatrix::{KernelQ, QMatrix, SvrQ};
pub use self::shrinking::ShrinkingStrategy;
pub use self::smo::{QpProblem, SMOSolver, Solution, SolverConfig, SolverVariant};

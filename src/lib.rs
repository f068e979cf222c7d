//! Support vector machines and support vector domain description
//!
//! Classification (C-SVC, L2 C-SVC, ν-SVC), regression (ε-SVR, ν-SVR),
//! one-class estimation and domain description (SVDD, L2 SVDD), all solved
//! by one SMO-type decomposition solver with a kernel cache and shrinking.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod formulation;
pub mod kernel;
pub mod model;
pub mod multiclass;
pub mod optimizer;
pub mod persistence;
pub mod probability;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, SVM};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::error::*;
pub use crate::core::params::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::LibSVMDataset;
pub use crate::kernel::{Kernel, KernelFunction};
pub use crate::model::{Model, SupportVectorStore};
pub use crate::persistence::{load_model, save_model};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

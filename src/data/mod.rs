//! Data loading
//!
//! Reads examples in the LibSVM text format into a [`Problem`](crate::core::Problem).

pub mod libsvm;

pub use self::libsvm::LibSVMDataset;
pub(crate) use self::libsvm::parse_features;

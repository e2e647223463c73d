pub mod evaluator;
pub mod features;
pub mod symmetry;
#[cfg(feature = "torch")]
pub mod tch_evaluator;

// Re-export key components for convenience
pub use evaluator::{Evaluation, Evaluator, EvaluatorError, UniformEvaluator};
pub use features::{BoardTensor, FeatureSet};
pub use symmetry::Symmetry;
#[cfg(feature = "torch")]
pub use tch_evaluator::TchEvaluator;

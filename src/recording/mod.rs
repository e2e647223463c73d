//! Game recording: SGF export and CSV training examples.
//!
//! # Components
//!
//! - `sgf`: SGF record of a finished game, with optional per-move comments
//! - `training`: CSV output of (features, pi, outcome) examples for training

pub mod sgf;
pub mod training;

pub use sgf::{make_sgf, SgfInfo};
pub use training::{load_examples, LoadExamplesError, TrainingExample, TrainingExampleWriter};

//! # Go MCTS Engine
//!
//! Monte Carlo Tree Search for the game of Go, guided by a policy/value network.
//!
//! ## Features
//!
//! - **Search**: arena tree with PUCT selection, virtual-loss batching and negamax backup
//! - **Evaluation**: pluggable batch evaluator, symmetry-randomized queries
//! - **Play**: self-play and time-managed competitive players, resignation
//! - **Recording**: SGF export and CSV training examples
//!
//! ## Usage
//!
//! ```rust,no_run
//! use go_mcts::{GoBoard, MctsConfig, MctsPlayer, PlayerInterface, UniformEvaluator};
//!
//! let mut player = MctsPlayer::new(GoBoard::new(9, 7.5), UniformEvaluator, MctsConfig::default())?;
//! let fmove = player.suggest_move()?;
//! player.play_move(fmove)?;
//! # Ok::<(), go_mcts::GoMctsError>(())
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Board state contract, reference board and coordinates
pub mod game;

/// Monte Carlo Tree Search engine
pub mod mcts;

/// Evaluator seam, feature encoding and board symmetries
pub mod neural;

/// Player state and the command-layer interfaces
pub mod player;

/// SGF and training-data output
pub mod recording;

/// Training-data augmentation
pub mod data;

/// Logger setup shared by the binaries
pub mod logging;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use game::{Color, GoBoard, IllegalMove, IllegalReason, PlayerMove, Position};
pub use mcts::{ConfigError, MctsConfig, SearchBudget, SearchController, SearchTree};
pub use neural::{BoardTensor, Evaluation, Evaluator, EvaluatorError, FeatureSet, UniformEvaluator};
pub use player::{CompetitivePlayer, MctsPlayer, MctsPlayerInterface, PlayerInterface};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the Go MCTS library
#[derive(Debug, thiserror::Error)]
pub enum GoMctsError {
    #[error("Illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Training data error: {0}")]
    TrainingData(#[from] recording::LoadExamplesError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, GoMctsError>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

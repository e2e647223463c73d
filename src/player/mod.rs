//! Players: per-game state on top of the search controller.

pub mod competitive;
pub mod interface;
pub mod mcts_player;

pub use competitive::CompetitivePlayer;
pub use interface::{MctsPlayerInterface, PlayerInterface};
pub use mcts_player::{GameResult, MctsPlayer, PlayedPosition};

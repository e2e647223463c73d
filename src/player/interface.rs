//! Capabilities the command layer (GTP, self-play drivers) needs from a player.

use crate::game::position::{Color, Position};
use crate::mcts::node::{MctsNode, NodeId};
use crate::Result;

pub trait PlayerInterface {
    type Board: Position;

    fn get_position(&self) -> &Self::Board;

    /// "B+R", "W+3.5", "DRAW"; empty until a result is set.
    fn get_result_string(&self) -> &str;

    /// Starts a new game from `position`, or from the initial position when `None`.
    fn initialize_game(&mut self, position: Option<Self::Board>);

    fn suggest_move(&mut self) -> Result<usize>;

    /// Plays `fmove` from the current position; per-move records are rolled back on error.
    fn play_move(&mut self, fmove: usize) -> Result<()>;

    fn should_resign(&self) -> bool;

    fn to_sgf(&self, use_comments: bool) -> String;

    fn set_result(&mut self, winner: Color, was_resign: bool);
}

pub trait MctsPlayerInterface: PlayerInterface {
    fn get_root(&self) -> &MctsNode<Self::Board>;

    /// One batched search round; `None` uses the configured batch size.
    fn tree_search(&mut self, parallel_readouts: Option<usize>) -> Result<Vec<NodeId>>;

    fn get_num_readouts(&self) -> u32;

    fn set_num_readouts(&mut self, readouts: u32);
}

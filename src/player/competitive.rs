//! Time-managed player for rated play.
//!
//! Plays deterministically from the first move and spends
//! [`time_recommendation`](crate::mcts::time_budget::time_recommendation) seconds per move.

use crate::game::position::{Color, Position};
use crate::mcts::config::{ConfigError, MctsConfig};
use crate::mcts::node::{MctsNode, NodeId};
use crate::mcts::search::SearchBudget;
use crate::mcts::time_budget::time_recommendation;
use crate::neural::evaluator::Evaluator;
use crate::player::interface::{MctsPlayerInterface, PlayerInterface};
use crate::player::mcts_player::MctsPlayer;
use crate::Result;

pub struct CompetitivePlayer<P, E> {
    inner: MctsPlayer<P, E>,
    seconds_per_move: f64,
    time_limit: f64,
    decay_factor: f64,
}

impl<P: Position, E: Evaluator> CompetitivePlayer<P, E> {
    pub fn new(position: P, evaluator: E, config: MctsConfig) -> std::result::Result<Self, ConfigError> {
        let config = MctsConfig {
            two_player_mode: true,
            timed: true,
            ..config
        };
        let (seconds_per_move, time_limit, decay_factor) =
            (config.seconds_per_move, config.time_limit, config.decay_factor);
        Ok(Self {
            inner: MctsPlayer::new(position, evaluator, config)?,
            seconds_per_move,
            time_limit,
            decay_factor,
        })
    }

    pub fn inner(&self) -> &MctsPlayer<P, E> {
        &self.inner
    }

    /// Seconds allotted to the move about to be searched.
    pub fn move_time(&self) -> f64 {
        time_recommendation(
            self.inner.get_position().move_number(),
            self.seconds_per_move,
            self.time_limit,
            self.decay_factor,
        )
    }

    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }
}

impl<P: Position, E: Evaluator> PlayerInterface for CompetitivePlayer<P, E> {
    type Board = P;

    fn get_position(&self) -> &P {
        self.inner.get_position()
    }

    fn get_result_string(&self) -> &str {
        self.inner.get_result_string()
    }

    fn initialize_game(&mut self, position: Option<P>) {
        self.inner.initialize_game(position);
    }

    fn suggest_move(&mut self) -> Result<usize> {
        let seconds = self.move_time();
        log::debug!("thinking for {:.2}s", seconds);
        self.inner.suggest_move_with(SearchBudget::Seconds(seconds))
    }

    fn play_move(&mut self, fmove: usize) -> Result<()> {
        self.inner.play_move(fmove)
    }

    fn should_resign(&self) -> bool {
        self.inner.should_resign()
    }

    fn to_sgf(&self, use_comments: bool) -> String {
        self.inner.to_sgf(use_comments)
    }

    fn set_result(&mut self, winner: Color, was_resign: bool) {
        self.inner.set_result(winner, was_resign);
    }
}

impl<P: Position, E: Evaluator> MctsPlayerInterface for CompetitivePlayer<P, E> {
    fn get_root(&self) -> &MctsNode<P> {
        self.inner.get_root()
    }

    fn tree_search(&mut self, parallel_readouts: Option<usize>) -> Result<Vec<NodeId>> {
        self.inner.tree_search(parallel_readouts)
    }

    fn get_num_readouts(&self) -> u32 {
        self.inner.get_num_readouts()
    }

    fn set_num_readouts(&mut self, readouts: u32) {
        self.inner.set_num_readouts(readouts);
    }
}

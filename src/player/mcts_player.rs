//! Search-backed player holding the per-game records.

use crate::game::position::{Color, Position};
use crate::mcts::config::{ConfigError, MctsConfig};
use crate::mcts::node::{MctsNode, NodeId};
use crate::mcts::search::{SearchBudget, SearchController};
use crate::neural::evaluator::Evaluator;
use crate::player::interface::{MctsPlayerInterface, PlayerInterface};
use crate::recording::sgf::{make_sgf, SgfInfo};
use crate::Result;

/// Recorded outcome of a finished game.
///
/// Scored games take their winner from the final score; `None` is a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameResult {
    pub winner: Option<Color>,
    pub was_resign: bool,
}

impl GameResult {
    /// +1 for a Black win, -1 for a White win, 0 for a draw.
    pub fn black_outcome(&self) -> f32 {
        self.winner.map_or(0.0, Color::sign)
    }
}

/// Position reached during the game with the search policy recorded there.
#[derive(Debug, Clone)]
pub struct PlayedPosition<P> {
    pub position: P,
    pub pi: Vec<f32>,
    /// +1 if the player to move at `position` won, -1 if they lost, 0 for a draw.
    pub outcome: f32,
}

pub struct MctsPlayer<P, E> {
    search: SearchController<P, E>,
    initial: P,
    comments: Vec<String>,
    searches_pi: Vec<Vec<f32>>,
    result: Option<GameResult>,
    result_string: String,
}

impl<P: Position, E: Evaluator> MctsPlayer<P, E> {
    pub fn new(position: P, evaluator: E, config: MctsConfig) -> std::result::Result<Self, ConfigError> {
        let search = SearchController::new(position.clone(), evaluator, config)?;
        Ok(Self {
            search,
            initial: position,
            comments: Vec::new(),
            searches_pi: Vec::new(),
            result: None,
            result_string: String::new(),
        })
    }

    pub fn search(&self) -> &SearchController<P, E> {
        &self.search
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn searches_pi(&self) -> &[Vec<f32>] {
        &self.searches_pi
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    /// Result set, or the root position is finished.
    pub fn is_done(&self) -> bool {
        self.result.is_some() || self.search.is_done()
    }

    pub fn suggest_move_with(&mut self, budget: SearchBudget) -> Result<usize> {
        let fmove = self.search.suggest_move_with(budget)?;
        log::debug!(
            "suggesting {} (value {:+.3}, {} nodes)",
            fmove,
            self.search.root_value(),
            self.search.tree().len()
        );
        Ok(fmove)
    }

    /// Replays the game from its initial position pairing each position with its
    /// recorded search policy and the final outcome.
    pub fn extract_data(&self) -> Result<Vec<PlayedPosition<P>>> {
        let Some(result) = self.result else {
            return Ok(Vec::new());
        };
        let black_outcome = result.black_outcome();

        let skip = self.initial.recent_moves().len();
        let moves = &self.get_position().recent_moves()[skip..];
        let mut position = self.initial.clone();
        let mut data = Vec::with_capacity(self.searches_pi.len());
        for (played, pi) in moves.iter().zip(&self.searches_pi) {
            let next = position.apply_move(played.fmove)?;
            let outcome = black_outcome * position.to_play().sign();
            data.push(PlayedPosition {
                position,
                pi: pi.clone(),
                outcome,
            });
            position = next;
        }
        Ok(data)
    }
}

impl<P: Position, E: Evaluator> PlayerInterface for MctsPlayer<P, E> {
    type Board = P;

    fn get_position(&self) -> &P {
        self.search.position()
    }

    fn get_result_string(&self) -> &str {
        &self.result_string
    }

    fn initialize_game(&mut self, position: Option<P>) {
        if let Some(position) = position {
            self.initial = position;
        }
        self.search.reset(self.initial.clone());
        self.comments.clear();
        self.searches_pi.clear();
        self.result = None;
        self.result_string.clear();
    }

    fn suggest_move(&mut self) -> Result<usize> {
        let budget = self.search.default_budget();
        self.suggest_move_with(budget)
    }

    fn play_move(&mut self, fmove: usize) -> Result<()> {
        let two_player = self.search.config().two_player_mode;
        let tree = self.search.tree();
        let root = tree.root();
        if !two_player {
            let squash = tree.position(root).move_number() < self.search.temperature_cutoff();
            self.searches_pi.push(tree.children_as_pi(root, squash));
        }
        self.comments.push(tree.describe(root));

        if let Err(e) = self.search.advance(fmove) {
            if !two_player {
                self.searches_pi.pop();
            }
            self.comments.pop();
            return Err(e.into());
        }
        Ok(())
    }

    fn should_resign(&self) -> bool {
        self.search.should_resign()
    }

    fn to_sgf(&self, use_comments: bool) -> String {
        let position = self.get_position();
        let skip = self.initial.recent_moves().len();
        let info = SgfInfo {
            board_size: position.board_size(),
            komi: position.komi(),
            result: &self.result_string,
            black_name: crate::NAME,
            white_name: crate::NAME,
        };
        let comments = use_comments.then_some(self.comments.as_slice());
        make_sgf(&info, &position.recent_moves()[skip..], comments)
    }

    fn set_result(&mut self, winner: Color, was_resign: bool) {
        let (recorded, result_string) = if was_resign {
            (Some(winner), format!("{}+R", winner.letter()))
        } else {
            let score = self.get_position().score();
            if score > 0.0 {
                (Some(Color::Black), format!("B+{:.1}", score))
            } else if score < 0.0 {
                (Some(Color::White), format!("W+{:.1}", -score))
            } else {
                (None, "DRAW".to_string())
            }
        };
        if !was_resign && recorded.is_some_and(|w| w != winner) {
            log::warn!(
                "⚠️ {} reported as winner but the score gives {}",
                winner,
                result_string
            );
        }
        self.result = Some(GameResult {
            winner: recorded,
            was_resign,
        });
        self.result_string = result_string;
        log::info!("🏁 Game over: {}", self.result_string);
    }
}

impl<P: Position, E: Evaluator> MctsPlayerInterface for MctsPlayer<P, E> {
    fn get_root(&self) -> &MctsNode<P> {
        self.search.tree().node(self.search.root())
    }

    fn tree_search(&mut self, parallel_readouts: Option<usize>) -> Result<Vec<NodeId>> {
        let batch = parallel_readouts.unwrap_or(self.search.config().parallel_readouts);
        self.search.tree_search(batch)
    }

    fn get_num_readouts(&self) -> u32 {
        self.search.num_readouts()
    }

    fn set_num_readouts(&mut self, readouts: u32) {
        self.search.set_num_readouts(readouts);
    }
}

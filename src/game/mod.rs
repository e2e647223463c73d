//! Go game layer: the position contract, a reference board and coordinate helpers.

pub mod board;
pub mod coords;
pub mod position;

pub use board::{GoBoard, DEFAULT_KOMI};
pub use position::{Color, IllegalMove, IllegalReason, PlayerMove, Position};

/// Scriptable position for unit tests: a fixed legal mask, no stones.
#[cfg(test)]
pub(crate) mod test_support {
    use super::position::{Color, IllegalMove, IllegalReason, PlayerMove, Position};

    #[derive(Debug, Clone)]
    pub struct ToyPosition {
        pub size: usize,
        pub legal: Vec<bool>,
        pub to_play: Color,
        pub move_number: u32,
        pub final_score: f32,
        pub history: Vec<PlayerMove>,
    }

    impl ToyPosition {
        /// All moves legal.
        pub fn new(size: usize) -> Self {
            Self::with_legal(size, vec![true; size * size + 1])
        }

        pub fn with_legal(size: usize, legal: Vec<bool>) -> Self {
            assert_eq!(legal.len(), size * size + 1);
            Self {
                size,
                legal,
                to_play: Color::Black,
                move_number: 0,
                final_score: 0.0,
                history: Vec::new(),
            }
        }
    }

    impl Position for ToyPosition {
        fn board_size(&self) -> usize {
            self.size
        }

        fn to_play(&self) -> Color {
            self.to_play
        }

        fn move_number(&self) -> u32 {
            self.move_number
        }

        fn legal_moves(&self) -> Vec<bool> {
            self.legal.clone()
        }

        fn apply_move(&self, fmove: usize) -> Result<Self, IllegalMove> {
            if !self.legal.get(fmove).copied().unwrap_or(false) {
                return Err(IllegalMove {
                    fmove,
                    reason: IllegalReason::Forbidden,
                });
            }
            let mut next = self.clone();
            next.history.push(PlayerMove {
                color: self.to_play,
                fmove,
            });
            next.to_play = self.to_play.opponent();
            next.move_number += 1;
            Ok(next)
        }

        fn is_game_over(&self) -> bool {
            let pass = self.squares();
            self.history.len() >= 2
                && self.history[self.history.len() - 2..]
                    .iter()
                    .all(|m| m.fmove == pass)
        }

        fn score(&self) -> f32 {
            self.final_score
        }

        fn komi(&self) -> f32 {
            0.0
        }

        fn recent_moves(&self) -> &[PlayerMove] {
            &self.history
        }

        fn stone_at(&self, _point: usize) -> Option<Color> {
            None
        }

        fn liberties_at(&self, _point: usize) -> usize {
            0
        }

        fn capture_count(&self, _point: usize) -> usize {
            0
        }
    }
}

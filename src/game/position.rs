//! The board-state contract consumed by the search engine.
//!
//! The tree never looks inside a position beyond this trait: it asks for the legal-move
//! mask, applies flat move indices, and reads terminal state and score. Feature encoding
//! additionally queries stones, liberties and capture counts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stone / player color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// +1 for Black, -1 for White.
    pub fn sign(self) -> f32 {
        match self {
            Color::Black => 1.0,
            Color::White => -1.0,
        }
    }

    /// Single-letter SGF / result notation.
    pub fn letter(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}

/// A move as it was played, kept in the position history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMove {
    pub color: Color,
    /// Flat index; `squares` means pass.
    pub fmove: usize,
}

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalReason {
    OutOfRange,
    Occupied,
    Suicide,
    Ko,
    Forbidden,
}

impl std::fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IllegalReason::OutOfRange => "out of range",
            IllegalReason::Occupied => "point occupied",
            IllegalReason::Suicide => "suicide",
            IllegalReason::Ko => "ko recapture",
            IllegalReason::Forbidden => "forbidden by position",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal move {fmove}: {reason}")]
pub struct IllegalMove {
    pub fmove: usize,
    pub reason: IllegalReason,
}

/// Immutable-per-move board state.
///
/// Flat move indices run over `0..squares` with `squares` reserved for pass, so
/// `legal_moves().len() == squares + 1`.
pub trait Position: Clone + Send + Sync {
    /// Side length of the (square) board.
    fn board_size(&self) -> usize;

    fn to_play(&self) -> Color;

    /// Number of moves played so far, passes included.
    fn move_number(&self) -> u32;

    /// Legal-move mask of length `squares + 1`.
    fn legal_moves(&self) -> Vec<bool>;

    fn apply_move(&self, fmove: usize) -> Result<Self, IllegalMove>;

    fn is_game_over(&self) -> bool;

    /// Final (or current) score, positive when Black is ahead.
    fn score(&self) -> f32;

    fn komi(&self) -> f32;

    fn recent_moves(&self) -> &[PlayerMove];

    fn stone_at(&self, point: usize) -> Option<Color>;

    /// Liberties of the group occupying `point` (0 when empty).
    fn liberties_at(&self, point: usize) -> usize;

    /// Stones the player to move would capture by playing at `point`.
    fn capture_count(&self, point: usize) -> usize;

    fn squares(&self) -> usize {
        self.board_size() * self.board_size()
    }

    fn pass_move(&self) -> usize {
        self.squares()
    }
}

//! Board encodings fed to the evaluator.
//!
//! Every encoding is a `planes × size × size` block of `f32` in row-major (NCHW without
//! the batch axis) order, relative to the player to move.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::position::{Color, Position};
use crate::mcts::config::ConfigError;

/// Dense `planes × size × size` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardTensor {
    pub planes: usize,
    pub size: usize,
    pub data: Vec<f32>,
}

impl BoardTensor {
    pub fn zeros(planes: usize, size: usize) -> Self {
        Self {
            planes,
            size,
            data: vec![0.0; planes * size * size],
        }
    }

    #[inline]
    fn index(&self, plane: usize, row: usize, col: usize) -> usize {
        (plane * self.size + row) * self.size + col
    }

    pub fn get(&self, plane: usize, row: usize, col: usize) -> f32 {
        self.data[self.index(plane, row, col)]
    }

    pub fn set(&mut self, plane: usize, row: usize, col: usize, value: f32) {
        let idx = self.index(plane, row, col);
        self.data[idx] = value;
    }

    pub fn plane(&self, plane: usize) -> &[f32] {
        let area = self.size * self.size;
        &self.data[plane * area..(plane + 1) * area]
    }

    fn fill_plane(&mut self, plane: usize, value: f32) {
        let area = self.size * self.size;
        self.data[plane * area..(plane + 1) * area].fill(value);
    }
}

/// Which plane stack to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSet {
    /// Own stones, opponent stones, side-to-move plane.
    Minimal,
    /// Adds one-hot liberty counts (1, 2, 3, 4+) and would-capture counts (1, 2, 3+).
    Extended,
}

const EXTENDED_LIBERTY_PLANES: usize = 4;
const EXTENDED_CAPTURE_PLANES: usize = 3;

impl FeatureSet {
    pub fn planes(self) -> usize {
        match self {
            FeatureSet::Minimal => 3,
            FeatureSet::Extended => 2 + EXTENDED_LIBERTY_PLANES + EXTENDED_CAPTURE_PLANES + 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureSet::Minimal => "minimal",
            FeatureSet::Extended => "extended",
        }
    }

    pub fn encode<P: Position>(self, position: &P) -> BoardTensor {
        match self {
            FeatureSet::Minimal => encode_minimal(position),
            FeatureSet::Extended => encode_extended(position),
        }
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(FeatureSet::Minimal),
            "extended" => Ok(FeatureSet::Extended),
            other => Err(ConfigError::UnknownFeatureSet(other.to_string())),
        }
    }
}

fn stone_planes<P: Position>(position: &P, tensor: &mut BoardTensor) {
    let size = position.board_size();
    let me = position.to_play();
    for point in 0..position.squares() {
        let plane = match position.stone_at(point) {
            Some(c) if c == me => 0,
            Some(_) => 1,
            None => continue,
        };
        tensor.set(plane, point / size, point % size, 1.0);
    }
}

fn encode_minimal<P: Position>(position: &P) -> BoardTensor {
    let mut tensor = BoardTensor::zeros(FeatureSet::Minimal.planes(), position.board_size());
    stone_planes(position, &mut tensor);
    if position.to_play() == Color::Black {
        tensor.fill_plane(2, 1.0);
    }
    tensor
}

fn encode_extended<P: Position>(position: &P) -> BoardTensor {
    let size = position.board_size();
    let planes = FeatureSet::Extended.planes();
    let mut tensor = BoardTensor::zeros(planes, size);
    stone_planes(position, &mut tensor);

    let liberty_base = 2;
    let capture_base = liberty_base + EXTENDED_LIBERTY_PLANES;
    for point in 0..position.squares() {
        let (row, col) = (point / size, point % size);
        if position.stone_at(point).is_some() {
            let libs = position.liberties_at(point);
            if libs > 0 {
                let offset = libs.min(EXTENDED_LIBERTY_PLANES) - 1;
                tensor.set(liberty_base + offset, row, col, 1.0);
            }
        } else {
            let captures = position.capture_count(point);
            if captures > 0 {
                let offset = captures.min(EXTENDED_CAPTURE_PLANES) - 1;
                tensor.set(capture_base + offset, row, col, 1.0);
            }
        }
    }

    if position.to_play() == Color::Black {
        tensor.fill_plane(planes - 1, 1.0);
    }
    tensor
}

//! Dihedral symmetries of the square board.
//!
//! Each symmetry is described by where an output cell reads from: `out[i][j] = in[src(i, j)]`.
//! Rotations are counter-clockwise.

use rand::prelude::*;

use crate::neural::features::BoardTensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symmetry {
    Identity,
    Rot90,
    Rot180,
    Rot270,
    /// Transpose.
    Flip,
    /// Upside-down mirror.
    FlipRot90,
    /// Anti-transpose.
    FlipRot180,
    /// Left-right mirror.
    FlipRot270,
}

impl Symmetry {
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::Rot90,
        Symmetry::Rot180,
        Symmetry::Rot270,
        Symmetry::Flip,
        Symmetry::FlipRot90,
        Symmetry::FlipRot180,
        Symmetry::FlipRot270,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn inverse(self) -> Self {
        match self {
            Symmetry::Rot90 => Symmetry::Rot270,
            Symmetry::Rot270 => Symmetry::Rot90,
            other => other,
        }
    }

    #[inline]
    fn source(self, i: usize, j: usize, n: usize) -> (usize, usize) {
        let last = n - 1;
        match self {
            Symmetry::Identity => (i, j),
            Symmetry::Rot90 => (j, last - i),
            Symmetry::Rot180 => (last - i, last - j),
            Symmetry::Rot270 => (last - j, i),
            Symmetry::Flip => (j, i),
            Symmetry::FlipRot90 => (last - i, j),
            Symmetry::FlipRot180 => (last - j, last - i),
            Symmetry::FlipRot270 => (i, last - j),
        }
    }

    fn transform_grid(self, grid: &[f32], n: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let (si, sj) = self.source(i, j, n);
                out.push(grid[si * n + sj]);
            }
        }
        out
    }
}

pub fn apply_to_features(sym: Symmetry, tensor: &BoardTensor) -> BoardTensor {
    if sym == Symmetry::Identity {
        return tensor.clone();
    }
    let n = tensor.size;
    let mut data = Vec::with_capacity(tensor.data.len());
    for plane in 0..tensor.planes {
        data.extend(sym.transform_grid(tensor.plane(plane), n));
    }
    BoardTensor {
        planes: tensor.planes,
        size: n,
        data,
    }
}

/// Transforms the board part of a policy; the trailing pass entry is copied as-is.
pub fn apply_to_policy(sym: Symmetry, pi: &[f32], size: usize) -> Vec<f32> {
    let squares = size * size;
    debug_assert_eq!(pi.len(), squares + 1);
    let mut out = sym.transform_grid(&pi[..squares], size);
    out.push(pi[squares]);
    out
}

/// Draws one symmetry per item and applies it. Keep the returned symmetries for
/// [`invert_batch`].
pub fn randomize_batch<R: Rng + ?Sized>(
    rng: &mut R,
    tensors: &[BoardTensor],
) -> (Vec<Symmetry>, Vec<BoardTensor>) {
    let syms: Vec<Symmetry> = tensors.iter().map(|_| Symmetry::random(rng)).collect();
    let transformed = syms
        .iter()
        .zip(tensors)
        .map(|(&s, t)| apply_to_features(s, t))
        .collect();
    (syms, transformed)
}

/// Undoes [`randomize_batch`] on the evaluator's policies.
pub fn invert_batch(syms: &[Symmetry], policies: &[Vec<f32>], size: usize) -> Vec<Vec<f32>> {
    syms.iter()
        .zip(policies)
        .map(|(s, pi)| apply_to_policy(s.inverse(), pi, size))
        .collect()
}

//! Data Augmentation for Go training examples
//!
//! The square board has 8 dihedral symmetries; features and the board part of the
//! policy target are transformed together, the pass probability and outcome are not.

use rand::prelude::*;

use crate::neural::features::BoardTensor;
use crate::neural::symmetry::{apply_to_features, apply_to_policy, Symmetry};

/// Apply one symmetry to a (features, pi) example
pub fn transform_example(
    features: &BoardTensor,
    pi: &[f32],
    sym: Symmetry,
) -> (BoardTensor, Vec<f32>) {
    (
        apply_to_features(sym, features),
        apply_to_policy(sym, pi, features.size),
    )
}

/// Augment a single training example with a random symmetry
pub fn augment_example<R: Rng + ?Sized>(
    rng: &mut R,
    features: &BoardTensor,
    pi: &[f32],
) -> (Symmetry, BoardTensor, Vec<f32>) {
    let sym = Symmetry::random(rng);
    let (f, p) = transform_example(features, pi, sym);
    (sym, f, p)
}

/// All 8 images of an example, identity first
pub fn all_symmetries(features: &BoardTensor, pi: &[f32]) -> Vec<(BoardTensor, Vec<f32>)> {
    Symmetry::ALL
        .iter()
        .map(|&sym| transform_example(features, pi, sym))
        .collect()
}

//! Evaluator seam between the search and the policy/value network.
//!
//! The search only talks to [`Evaluator`]; tests and bootstrapping use
//! [`UniformEvaluator`], real play uses the TorchScript backend behind the `torch` feature.

use thiserror::Error;

use crate::neural::features::BoardTensor;

/// Network output for one board encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Length `squares + 1`, pass last.
    pub move_probs: Vec<f32>,
    /// In `[-1, 1]`, from the perspective of the player to move.
    pub value: f32,
}

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluator returned {got} results for a batch of {expected}")]
    BatchSize { expected: usize, got: usize },

    #[error("policy of item {index} has length {got}, expected {expected}")]
    PolicyLength {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("value of item {index} is outside [-1, 1]: {value}")]
    InvalidValue { index: usize, value: f32 },

    #[error("inference backend failed: {0}")]
    Backend(String),
}

/// Batch policy/value inference.
///
/// Implementations must be deterministic for identical input; symmetry randomization
/// is applied by the caller.
pub trait Evaluator: Send + Sync {
    fn evaluate_batch(&self, batch: &[BoardTensor]) -> Result<Vec<Evaluation>, EvaluatorError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate_batch(&self, batch: &[BoardTensor]) -> Result<Vec<Evaluation>, EvaluatorError> {
        (**self).evaluate_batch(batch)
    }
}

/// Checks a whole batch before any of it is used: count, policy lengths, values in `[-1, 1]`.
pub fn validate_batch(
    batch: &[BoardTensor],
    results: &[Evaluation],
) -> Result<(), EvaluatorError> {
    if results.len() != batch.len() {
        return Err(EvaluatorError::BatchSize {
            expected: batch.len(),
            got: results.len(),
        });
    }
    for (index, (input, output)) in batch.iter().zip(results).enumerate() {
        let expected = input.size * input.size + 1;
        if output.move_probs.len() != expected {
            return Err(EvaluatorError::PolicyLength {
                index,
                expected,
                got: output.move_probs.len(),
            });
        }
        if !(-1.0..=1.0).contains(&output.value) {
            return Err(EvaluatorError::InvalidValue {
                index,
                value: output.value,
            });
        }
    }
    Ok(())
}

/// Flat priors and a neutral value. Lets the search run without a network.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl Evaluator for UniformEvaluator {
    fn evaluate_batch(&self, batch: &[BoardTensor]) -> Result<Vec<Evaluation>, EvaluatorError> {
        Ok(batch
            .iter()
            .map(|tensor| {
                let actions = tensor.size * tensor.size + 1;
                Evaluation {
                    move_probs: vec![1.0 / actions as f32; actions],
                    value: 0.0,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_evaluator_shapes() {
        let batch = vec![BoardTensor::zeros(3, 5), BoardTensor::zeros(3, 5)];
        let out = UniformEvaluator.evaluate_batch(&batch).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].move_probs.len(), 26);
        let sum: f32 = out[0].move_probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(validate_batch(&batch, &out).is_ok());
    }

    #[test]
    fn test_validate_batch_rejects_short_results() {
        let batch = vec![BoardTensor::zeros(3, 5), BoardTensor::zeros(3, 5)];
        let mut out = UniformEvaluator.evaluate_batch(&batch).unwrap();
        out.pop();
        assert!(matches!(
            validate_batch(&batch, &out),
            Err(EvaluatorError::BatchSize {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_validate_batch_rejects_bad_policy_and_value() {
        let batch = vec![BoardTensor::zeros(3, 3)];
        let short = vec![Evaluation {
            move_probs: vec![0.1; 9],
            value: 0.0,
        }];
        assert!(matches!(
            validate_batch(&batch, &short),
            Err(EvaluatorError::PolicyLength { index: 0, .. })
        ));

        let nan = vec![Evaluation {
            move_probs: vec![0.1; 10],
            value: f32::NAN,
        }];
        assert!(matches!(
            validate_batch(&batch, &nan),
            Err(EvaluatorError::InvalidValue { index: 0, .. })
        ));
    }

    #[test]
    fn test_validate_batch_rejects_out_of_range_value() {
        let batch = vec![BoardTensor::zeros(3, 3), BoardTensor::zeros(3, 3)];
        let mut out = UniformEvaluator.evaluate_batch(&batch).unwrap();
        out[1].value = 7.0;
        assert!(matches!(
            validate_batch(&batch, &out),
            Err(EvaluatorError::InvalidValue { index: 1, value }) if value == 7.0
        ));

        out[1].value = -1.0;
        assert!(validate_batch(&batch, &out).is_ok());
        out[1].value = -1.0001;
        assert!(validate_batch(&batch, &out).is_err());
    }
}

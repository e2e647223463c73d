//! Integration tests for the search controller through the public API

use assert_matches::assert_matches;

use go_mcts::{
    BoardTensor, Evaluation, Evaluator, EvaluatorError, GoBoard, GoMctsError, MctsConfig,
    Position, SearchBudget, SearchController, UniformEvaluator,
};

/// Uniform priors; Black to move is always losing.
struct BlackLosesEvaluator;

impl Evaluator for BlackLosesEvaluator {
    fn evaluate_batch(&self, batch: &[BoardTensor]) -> Result<Vec<Evaluation>, EvaluatorError> {
        Ok(batch
            .iter()
            .map(|t| {
                let actions = t.size * t.size + 1;
                let black_to_move = t.plane(2).iter().all(|&v| v == 1.0);
                Evaluation {
                    move_probs: vec![1.0 / actions as f32; actions],
                    value: if black_to_move { -1.0 } else { 1.0 },
                }
            })
            .collect())
    }
}

struct BrokenEvaluator;

impl Evaluator for BrokenEvaluator {
    fn evaluate_batch(&self, _batch: &[BoardTensor]) -> Result<Vec<Evaluation>, EvaluatorError> {
        Err(EvaluatorError::Backend("device lost".to_string()))
    }
}

fn config() -> MctsConfig {
    MctsConfig {
        num_readouts: 64,
        parallel_readouts: 8,
        seed: Some(17),
        ..Default::default()
    }
}

#[test]
fn test_readout_budget_adds_root_visits() {
    let mut search = SearchController::new(GoBoard::new(9, 7.5), UniformEvaluator, config()).unwrap();
    search.suggest_move_with(SearchBudget::Readouts(64)).unwrap();
    let root = search.root();
    assert!(search.tree().n(root) >= 64);
    assert_eq!(search.tree().virtual_losses(root), 0);
}

#[test]
fn test_suggested_move_is_legal() {
    let mut search = SearchController::new(GoBoard::new(7, 7.5), UniformEvaluator, config()).unwrap();
    let fmove = search.suggest_move().unwrap();
    assert!(search.position().legal_moves()[fmove]);
}

#[test]
fn test_losing_side_wants_to_resign() {
    let mut search = SearchController::new(GoBoard::new(5, 7.5), BlackLosesEvaluator, config()).unwrap();
    search.suggest_move().unwrap();
    assert!(search.root_value() < -0.9);
    assert!(search.should_resign());
}

#[test]
fn test_evaluator_failure_leaves_tree_clean() {
    let mut search = SearchController::new(GoBoard::new(5, 7.5), BrokenEvaluator, config()).unwrap();
    let err = search.tree_search(4).unwrap_err();
    assert_matches!(err, GoMctsError::Evaluator(EvaluatorError::Backend(_)));
    let root = search.root();
    assert_eq!(search.tree().n(root), 0);
    assert_eq!(search.tree().virtual_losses(root), 0);
}

#[test]
fn test_advance_keeps_searched_subtree() {
    let mut search = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, config()).unwrap();
    let fmove = search.suggest_move().unwrap();
    let child = search.tree().node(search.root()).children[&fmove];
    let visits = search.tree().n(child);

    search.advance(fmove).unwrap();
    assert_eq!(search.position().move_number(), 1);
    assert_eq!(search.tree().n(search.root()), visits);
}

#[test]
fn test_invalid_config_is_rejected() {
    let cfg = MctsConfig {
        resign_threshold: 0.5,
        ..config()
    };
    let result = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, cfg);
    assert!(result.is_err());

    let cfg = MctsConfig {
        feature_set: "pixels".to_string(),
        ..config()
    };
    let result = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, cfg);
    assert!(result.is_err());
}

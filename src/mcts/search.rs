//! Batched search rounds, move selection and resignation.
//!
//! One round selects up to `batch_size` leaves with virtual loss, encodes them in
//! parallel, evaluates them in a single symmetry-randomized evaluator call and backs the
//! results up. Finished positions met during selection are backed up immediately.

use std::time::{Duration, Instant};

use rand::prelude::*;
use rayon::prelude::*;

use crate::game::position::{IllegalMove, Position};
use crate::mcts::config::{ConfigError, MctsConfig};
use crate::mcts::node::NodeId;
use crate::mcts::tree::SearchTree;
use crate::neural::evaluator::{validate_batch, Evaluator};
use crate::neural::features::{BoardTensor, FeatureSet};
use crate::neural::symmetry::{invert_batch, randomize_batch};
use crate::Result;

/// How much search to spend on one move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchBudget {
    /// Root visits to add.
    Readouts(u32),
    /// Wall-clock seconds, checked between rounds.
    Seconds(f64),
}

pub struct SearchController<P, E> {
    config: MctsConfig,
    features: FeatureSet,
    evaluator: E,
    tree: SearchTree<P>,
    rng: StdRng,
    root_noised: bool,
}

impl<P: Position, E: Evaluator> SearchController<P, E> {
    pub fn new(position: P, evaluator: E, config: MctsConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let features = config.features()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random::<u64>());
        log::debug!(
            "search controller: c_puct={} batch={} features={} seed={}",
            config.c_puct,
            config.parallel_readouts,
            features,
            seed
        );
        Ok(Self {
            tree: SearchTree::new(position, config.c_puct),
            config,
            features,
            evaluator,
            rng: StdRng::seed_from_u64(seed),
            root_noised: false,
        })
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn tree(&self) -> &SearchTree<P> {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn position(&self) -> &P {
        self.tree.position(self.tree.root())
    }

    pub fn num_readouts(&self) -> u32 {
        self.config.num_readouts
    }

    pub fn set_num_readouts(&mut self, readouts: u32) {
        self.config.num_readouts = readouts;
    }

    /// Drops the tree and starts over from `position`.
    pub fn reset(&mut self, position: P) {
        self.tree = SearchTree::new(position, self.config.c_puct);
        self.root_noised = false;
    }

    /// Re-roots on a played move. The tree is left untouched on error.
    pub fn advance(&mut self, fmove: usize) -> std::result::Result<(), IllegalMove> {
        self.tree.reroot(fmove)?;
        self.root_noised = false;
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.tree.is_done(self.tree.root())
    }

    /// Root value for the player to move.
    pub fn root_value(&self) -> f32 {
        self.tree.q_perspective(self.tree.root())
    }

    pub fn should_resign(&self) -> bool {
        self.root_value() < self.config.resign_threshold
    }

    /// Move number from which play is deterministic.
    pub fn temperature_cutoff(&self) -> u32 {
        if self.config.two_player_mode {
            0
        } else {
            let squares = self.position().squares() as u32;
            (squares / 12) / 2 * 2
        }
    }

    /// Budget from the config.
    pub fn default_budget(&self) -> SearchBudget {
        if self.config.timed {
            SearchBudget::Seconds(self.config.seconds_per_move)
        } else {
            SearchBudget::Readouts(self.config.num_readouts)
        }
    }

    /// One batched round; returns the leaves sent to the evaluator.
    pub fn tree_search(&mut self, batch_size: usize) -> Result<Vec<NodeId>> {
        let root = self.tree.root();
        let mut leaves: Vec<NodeId> = Vec::with_capacity(batch_size);
        let mut selections = 0;
        while leaves.len() < batch_size && selections < 2 * batch_size {
            selections += 1;
            let leaf = match self.tree.select_leaf(root) {
                Ok(leaf) => leaf,
                Err(e) => {
                    self.revert_batch(&leaves, root);
                    return Err(e.into());
                }
            };
            // Finished games, and expanded nodes without a legal move, need no network.
            if self.tree.is_done(leaf) || self.tree.node(leaf).is_expanded {
                let value = self.terminal_value(leaf);
                self.tree.backup_value(leaf, value, root);
                continue;
            }
            self.tree.add_virtual_loss(leaf, root);
            leaves.push(leaf);
        }
        if leaves.len() < batch_size {
            log::debug!(
                "batch starved: {} of {} leaves after {} selections",
                leaves.len(),
                batch_size,
                selections
            );
        }
        if leaves.is_empty() {
            return Ok(leaves);
        }

        let tree = &self.tree;
        let features = self.features;
        let encoded: Vec<BoardTensor> = leaves
            .par_iter()
            .map(|&leaf| features.encode(tree.position(leaf)))
            .collect();
        let (symmetries, inputs) = randomize_batch(&mut self.rng, &encoded);

        let evaluations = match self
            .evaluator
            .evaluate_batch(&inputs)
            .and_then(|out| validate_batch(&inputs, &out).map(|_| out))
        {
            Ok(out) => out,
            Err(e) => {
                log::warn!("⚠️ Evaluator failed on a batch of {}: {}", leaves.len(), e);
                self.revert_batch(&leaves, root);
                return Err(e.into());
            }
        };

        let size = self.tree.position(root).board_size();
        let (policies, values): (Vec<Vec<f32>>, Vec<f32>) = evaluations
            .into_iter()
            .map(|e| (e.move_probs, e.value))
            .unzip();
        let policies = invert_batch(&symmetries, &policies, size);

        for ((&leaf, probs), value) in leaves.iter().zip(&policies).zip(values) {
            self.tree.revert_virtual_loss(leaf, root);
            // Evaluator values are for the player to move at the leaf.
            self.tree.incorporate_results(leaf, probs, -value, root);
        }
        log::trace!("round: {} leaves, root N={}", leaves.len(), self.tree.n(root));
        Ok(leaves)
    }

    /// Searches within `budget`, then picks a move.
    pub fn suggest_move_with(&mut self, budget: SearchBudget) -> Result<usize> {
        let start = Instant::now();
        let root = self.tree.root();
        let initial = self.tree.n(root);
        let batch = self.config.parallel_readouts;

        self.maybe_inject_noise();
        match budget {
            SearchBudget::Seconds(seconds) => {
                let deadline = Duration::from_secs_f64(seconds.max(0.0));
                while start.elapsed() < deadline {
                    self.tree_search(batch)?;
                    self.maybe_inject_noise();
                }
            }
            SearchBudget::Readouts(readouts) => {
                let target = initial.saturating_add(readouts);
                while self.tree.n(root) < target {
                    self.tree_search(batch)?;
                    self.maybe_inject_noise();
                }
            }
        }
        log::debug!(
            "{} readouts in {:.2}s, root value {:+.3}",
            self.tree.n(root) - initial,
            start.elapsed().as_secs_f64(),
            self.root_value()
        );
        Ok(self.pick_move())
    }

    pub fn suggest_move(&mut self) -> Result<usize> {
        let budget = self.default_budget();
        self.suggest_move_with(budget)
    }

    /// Most visited move past the temperature cutoff, otherwise a sample from the
    /// squashed visit distribution that never draws the pass move.
    pub fn pick_move(&mut self) -> usize {
        let root = self.tree.root();
        let position = self.tree.position(root);
        if position.move_number() >= self.temperature_cutoff() {
            return self.tree.best_child(root);
        }

        let squares = position.squares();
        let node = self.tree.node(root);
        let board_visits: u32 = node.child_n[..squares]
            .iter()
            .zip(&node.legal)
            .filter(|(_, &ok)| ok)
            .map(|(&n, _)| n)
            .sum();
        if board_visits == 0 {
            log::debug!("no board visits to sample from, playing the most visited move");
            return self.tree.best_child(root);
        }

        let pi = self.tree.children_as_pi(root, true);
        let cdf: Vec<f32> = pi
            .iter()
            .scan(0.0f32, |acc, &p| {
                *acc += p;
                Some(*acc)
            })
            .collect();
        // Normalizing by the last board point excludes pass from sampling.
        let target = self.rng.random::<f32>() * cdf[squares - 1];
        match cdf[..squares].iter().position(|&c| c > target) {
            Some(fmove) => fmove,
            None => self.tree.best_child(root),
        }
    }

    fn maybe_inject_noise(&mut self) {
        if !self.config.inject_noise || self.root_noised {
            return;
        }
        let root = self.tree.root();
        if !self.tree.node(root).is_expanded {
            return;
        }
        self.tree
            .inject_noise(root, &mut self.rng, self.config.dirichlet_alpha, self.config.noise_mix);
        self.root_noised = true;
    }

    /// Game result in the node convention: +1 when the player who moved into `leaf` wins.
    fn terminal_value(&self, leaf: NodeId) -> f32 {
        let position = self.tree.position(leaf);
        let score = position.score();
        let winner = if score > 0.0 {
            1.0
        } else if score < 0.0 {
            -1.0
        } else {
            0.0
        };
        winner * position.to_play().opponent().sign()
    }

    fn revert_batch(&mut self, leaves: &[NodeId], root: NodeId) {
        for &leaf in leaves {
            self.tree.revert_virtual_loss(leaf, root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::ToyPosition;
    use crate::game::GoBoard;
    use crate::neural::evaluator::{Evaluation, EvaluatorError, UniformEvaluator};
    use crate::GoMctsError;

    /// Uniform priors and a constant value.
    struct ConstantEvaluator(f32);

    impl Evaluator for ConstantEvaluator {
        fn evaluate_batch(
            &self,
            batch: &[BoardTensor],
        ) -> std::result::Result<Vec<Evaluation>, EvaluatorError> {
            Ok(batch
                .iter()
                .map(|t| {
                    let actions = t.size * t.size + 1;
                    Evaluation {
                        move_probs: vec![1.0 / actions as f32; actions],
                        value: self.0,
                    }
                })
                .collect())
        }
    }

    struct FailingEvaluator;

    impl Evaluator for FailingEvaluator {
        fn evaluate_batch(
            &self,
            _batch: &[BoardTensor],
        ) -> std::result::Result<Vec<Evaluation>, EvaluatorError> {
            Err(EvaluatorError::Backend("device lost".to_string()))
        }
    }

    fn seeded() -> MctsConfig {
        MctsConfig {
            seed: Some(42),
            ..Default::default()
        }
    }

    fn three_move_position() -> ToyPosition {
        ToyPosition::with_legal(2, vec![true, true, false, false, true])
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = MctsConfig {
            resign_threshold: 0.5,
            ..Default::default()
        };
        assert!(SearchController::new(ToyPosition::new(2), UniformEvaluator, cfg).is_err());
    }

    #[test]
    fn test_first_round_expands_root() {
        let mut search = SearchController::new(ToyPosition::new(2), UniformEvaluator, seeded()).unwrap();
        let leaves = search.tree_search(4).unwrap();
        assert!(!leaves.is_empty());
        assert!(leaves.iter().all(|&l| l == search.root()));
        assert!(search.tree().node(search.root()).is_expanded);
        assert_eq!(search.tree().n(search.root()), 1);
        assert_eq!(search.tree().virtual_losses(search.root()), 0);
    }

    #[test]
    fn test_single_leaf_round_from_expanded_root() {
        // Evaluator reports -0.5 for the player to move at the leaf, i.e. +0.5 for the
        // player who moved into it.
        let mut search =
            SearchController::new(three_move_position(), ConstantEvaluator(-0.5), seeded()).unwrap();
        let root = search.root();
        search.tree.expand(root, &[0.2; 5]);

        let leaves = search.tree_search(1).unwrap();
        assert_eq!(leaves.len(), 1);
        let leaf = leaves[0];
        assert_eq!(search.tree().node(leaf).parent, Some(root));
        assert_eq!(search.tree().n(root), 1);
        assert_eq!(search.tree().w(root), -0.5);
        assert_eq!(search.tree().n(leaf), 1);
        assert_eq!(search.tree().w(leaf), 0.5);
    }

    #[test]
    fn test_evaluator_failure_reverts_virtual_loss() {
        let mut search = SearchController::new(three_move_position(), FailingEvaluator, seeded()).unwrap();
        let root = search.root();
        search.tree.expand(root, &[0.2; 5]);

        let err = search.tree_search(3).unwrap_err();
        assert!(matches!(err, GoMctsError::Evaluator(_)));
        assert_eq!(search.tree().virtual_losses(root), 0);
        assert!(search.tree().node(root).child_vl.iter().all(|&vl| vl == 0));
        assert_eq!(search.tree().n(root), 0);
        for &child in search.tree().node(root).children.values() {
            assert!(!search.tree().node(child).is_expanded);
        }
    }

    #[test]
    fn test_out_of_range_value_fails_whole_batch() {
        let mut search = SearchController::new(GoBoard::new(5, 7.5), ConstantEvaluator(7.0), seeded()).unwrap();
        let root = search.root();

        let err = search.tree_search(1).unwrap_err();
        assert!(matches!(
            err,
            GoMctsError::Evaluator(EvaluatorError::InvalidValue { value, .. }) if value == 7.0
        ));
        assert_eq!(search.tree().n(root), 0);
        assert_eq!(search.tree().w(root), 0.0);
        assert_eq!(search.tree().virtual_losses(root), 0);
        assert!(!search.tree().node(root).is_expanded);
        assert_eq!(search.root_value(), 0.0);
    }

    #[test]
    fn test_terminal_leaf_backs_up_game_result() {
        // Black passes, White passes: game over with Black ahead.
        let mut pos = ToyPosition::new(2);
        pos.final_score = 3.0;
        let over = pos.apply_move(4).unwrap().apply_move(4).unwrap();
        let mut search = SearchController::new(over, UniformEvaluator, seeded()).unwrap();
        let leaves = search.tree_search(2).unwrap();
        assert!(leaves.is_empty());
        let root = search.root();
        assert_eq!(search.tree().n(root), 4);
        // White moved last and lost.
        assert_eq!(search.tree().w(root), -4.0);
        // Black to move at the root is winning.
        assert_eq!(search.root_value(), 1.0);
    }

    #[test]
    fn test_readout_budget_grows_root_visits() {
        let cfg = MctsConfig {
            num_readouts: 40,
            parallel_readouts: 4,
            ..seeded()
        };
        let mut search = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, cfg).unwrap();
        let fmove = search.suggest_move().unwrap();
        assert!(search.tree().n(search.root()) >= 40);
        assert!(search.position().legal_moves()[fmove]);
        assert!(search.tree().node(search.root()).child_vl.iter().all(|&vl| vl == 0));
    }

    #[test]
    fn test_timed_budget_returns() {
        let cfg = MctsConfig {
            timed: true,
            seconds_per_move: 0.05,
            ..seeded()
        };
        let mut search = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, cfg).unwrap();
        let fmove = search.suggest_move().unwrap();
        assert!(fmove <= 25);
        assert!(search.tree().n(search.root()) > 0);
    }

    #[test]
    fn test_pick_move_past_threshold_is_most_visited() {
        let cfg = MctsConfig {
            two_player_mode: true,
            ..seeded()
        };
        let mut search = SearchController::new(ToyPosition::new(2), UniformEvaluator, cfg).unwrap();
        let root = search.root();
        search.tree.expand(root, &[0.2; 5]);
        search.tree.node_mut(root).child_n = vec![5, 2, 9, 0, 0];
        assert_eq!(search.temperature_cutoff(), 0);
        assert_eq!(search.pick_move(), 2);
    }

    #[test]
    fn test_pick_move_sampling_never_passes() {
        let mut search = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, seeded()).unwrap();
        assert_eq!(search.temperature_cutoff(), 2);
        let root = search.root();
        search.tree.expand(root, &[1.0 / 26.0; 26]);
        {
            let node = search.tree.node_mut(root);
            node.child_n[3] = 10;
            node.child_n[7] = 30;
            node.child_n[25] = 1000;
        }
        for _ in 0..50 {
            let m = search.pick_move();
            assert!(m == 3 || m == 7, "sampled {}", m);
        }
    }

    #[test]
    fn test_pick_move_without_board_visits_falls_back() {
        let mut search = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, seeded()).unwrap();
        let root = search.root();
        search.tree.expand(root, &[1.0 / 26.0; 26]);
        search.tree.node_mut(root).child_n[25] = 3;
        assert_eq!(search.pick_move(), 25);
    }

    #[test]
    fn test_should_resign_threshold() {
        let mut search = SearchController::new(ToyPosition::new(2), UniformEvaluator, seeded()).unwrap();
        let root = search.root();
        // Root W is kept for the player who moved into it; the player to move sees -W/N.
        search.tree.backup_value(root, 0.95, root);
        assert!((search.root_value() + 0.95).abs() < 1e-6);
        assert!(search.should_resign());

        let mut search = SearchController::new(ToyPosition::new(2), UniformEvaluator, seeded()).unwrap();
        search.tree.backup_value(root, 0.5, root);
        assert!(!search.should_resign());
    }

    #[test]
    fn test_noise_injected_once_per_root() {
        let cfg = MctsConfig {
            inject_noise: true,
            num_readouts: 16,
            ..seeded()
        };
        let mut search = SearchController::new(GoBoard::new(5, 7.5), UniformEvaluator, cfg).unwrap();
        search.suggest_move().unwrap();
        assert!(search.root_noised);
        let priors = search.tree().node(search.root()).child_p.clone();
        assert!(priors.iter().any(|&p| (p - 1.0 / 26.0).abs() > 1e-4));
        search.maybe_inject_noise();
        assert_eq!(search.tree().node(search.root()).child_p, priors);

        let fmove = search.pick_move();
        search.advance(fmove).unwrap();
        assert!(!search.root_noised);
    }

    #[test]
    fn test_advance_rejects_illegal_move() {
        let mut search =
            SearchController::new(three_move_position(), UniformEvaluator, seeded()).unwrap();
        let before = search.tree().len();
        assert!(search.advance(3).is_err());
        assert_eq!(search.tree().len(), before);
        assert!(search.advance(4).is_ok());
        assert_eq!(search.position().move_number(), 1);
    }
}

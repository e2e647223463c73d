//! Search tree node and per-edge statistics.

use std::collections::BTreeMap;

use crate::game::position::Position;

/// Stable handle into the [`SearchTree`](crate::mcts::tree::SearchTree) arena.
pub type NodeId = usize;

/// One position in the tree.
///
/// Edge statistics live on the parent: a node's own N/W are the parent's
/// `child_n[fmove]` / `child_w[fmove]`, the root keeps its pair in the tree.
#[derive(Debug, Clone)]
pub struct MctsNode<P> {
    pub position: P,
    /// Move that produced this node; `None` for the root.
    pub fmove: Option<usize>,
    pub parent: Option<NodeId>,
    /// Children created so far, by move index.
    pub children: BTreeMap<usize, NodeId>,
    /// Legal-move mask of `position`, pass last.
    pub legal: Vec<bool>,
    pub is_expanded: bool,

    // Stats per move index.
    pub child_n: Vec<u32>,
    pub child_w: Vec<f32>,
    pub child_p: Vec<f32>,
    /// In-flight virtual losses.
    pub child_vl: Vec<u32>,
}

impl<P: Position> MctsNode<P> {
    pub fn new(position: P, fmove: Option<usize>, parent: Option<NodeId>) -> Self {
        let legal = position.legal_moves();
        let actions = legal.len();
        Self {
            position,
            fmove,
            parent,
            children: BTreeMap::new(),
            legal,
            is_expanded: false,
            child_n: vec![0; actions],
            child_w: vec![0.0; actions],
            child_p: vec![0.0; actions],
            child_vl: vec![0; actions],
        }
    }

    pub fn num_actions(&self) -> usize {
        self.legal.len()
    }

    /// Mean value of an edge including virtual losses; 0 when unvisited.
    pub fn child_q(&self, fmove: usize) -> f32 {
        let n = self.child_n[fmove] + self.child_vl[fmove];
        if n == 0 {
            0.0
        } else {
            (self.child_w[fmove] - self.child_vl[fmove] as f32) / n as f32
        }
    }

    pub fn legal_count(&self) -> usize {
        self.legal.iter().filter(|&&ok| ok).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::ToyPosition;

    #[test]
    fn test_new_node_sizes_stats_from_legal_mask() {
        let node = MctsNode::new(ToyPosition::new(3), None, None);
        assert_eq!(node.num_actions(), 10);
        assert_eq!(node.child_n.len(), 10);
        assert!(!node.is_expanded);
        assert_eq!(node.legal_count(), 10);
    }

    #[test]
    fn test_child_q_counts_virtual_loss() {
        let mut node = MctsNode::new(ToyPosition::new(2), None, None);
        assert_eq!(node.child_q(0), 0.0);
        node.child_n[0] = 1;
        node.child_w[0] = 1.0;
        assert_eq!(node.child_q(0), 1.0);
        node.child_vl[0] = 1;
        assert_eq!(node.child_q(0), 0.0);
        node.child_vl[1] = 1;
        assert_eq!(node.child_q(1), -1.0);
    }
}

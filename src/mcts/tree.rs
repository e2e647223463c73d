//! Arena-backed search tree: selection, expansion, backup and virtual loss.
//!
//! Values follow a negamax convention. The W of a node accumulates results from the
//! perspective of the player who made the move into it, so every parent simply maximizes
//! `Q + U` over its children and a backed-up value flips sign at each step up.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;

use rand::prelude::*;
use rand_distr::{Distribution, Gamma};

use crate::game::coords::to_gtp;
use crate::game::position::{IllegalMove, IllegalReason, Position};
use crate::mcts::node::{MctsNode, NodeId};

/// Exponent applied to visit counts for the softened sampling distribution.
pub const SQUASH_EXPONENT: f32 = 0.98;

/// Masked prior mass below this is treated as zero.
const MIN_PRIOR_MASS: f32 = 1e-8;

const DESCRIBE_TOP_CHILDREN: usize = 8;

pub struct SearchTree<P> {
    nodes: Vec<MctsNode<P>>,
    root: NodeId,
    c_puct: f32,
    // Root statistics (no parent edge to hold them).
    root_n: u32,
    root_w: f32,
    root_vl: u32,
}

impl<P: Position> SearchTree<P> {
    pub fn new(position: P, c_puct: f32) -> Self {
        Self {
            nodes: vec![MctsNode::new(position, None, None)],
            root: 0,
            c_puct,
            root_n: 0,
            root_w: 0.0,
            root_vl: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &MctsNode<P> {
        &self.nodes[id]
    }

    pub fn position(&self, id: NodeId) -> &P {
        &self.nodes[id].position
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn c_puct(&self) -> f32 {
        self.c_puct
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut MctsNode<P> {
        &mut self.nodes[id]
    }

    // ---------------------------------------------------------------------------------
    // Node statistics, read through the parent edge
    // ---------------------------------------------------------------------------------

    pub fn n(&self, id: NodeId) -> u32 {
        match self.edge(id) {
            Some((parent, fmove)) => self.nodes[parent].child_n[fmove],
            None => self.root_n,
        }
    }

    pub fn w(&self, id: NodeId) -> f32 {
        match self.edge(id) {
            Some((parent, fmove)) => self.nodes[parent].child_w[fmove],
            None => self.root_w,
        }
    }

    /// In-flight virtual losses on this node.
    pub fn virtual_losses(&self, id: NodeId) -> u32 {
        match self.edge(id) {
            Some((parent, fmove)) => self.nodes[parent].child_vl[fmove],
            None => self.root_vl,
        }
    }

    /// Mean value from the perspective of the player who moved into `id`.
    pub fn q(&self, id: NodeId) -> f32 {
        let n = self.n(id);
        if n == 0 {
            0.0
        } else {
            self.w(id) / n as f32
        }
    }

    /// Mean value from the perspective of the player to move at the root.
    pub fn q_perspective(&self, id: NodeId) -> f32 {
        if self.depth(id) % 2 == 1 {
            self.q(id)
        } else {
            -self.q(id)
        }
    }

    fn edge(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let node = &self.nodes[id];
        match (node.parent, node.fmove) {
            (Some(parent), Some(fmove)) => Some((parent, fmove)),
            _ => None,
        }
    }

    fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    fn bump(&mut self, id: NodeId, n: i32, w: f32, vl: i32) {
        let (slot_n, slot_w, slot_vl) = match self.edge(id) {
            Some((parent, fmove)) => {
                let p = &mut self.nodes[parent];
                (&mut p.child_n[fmove], &mut p.child_w[fmove], &mut p.child_vl[fmove])
            }
            None => (&mut self.root_n, &mut self.root_w, &mut self.root_vl),
        };
        *slot_n = slot_n.saturating_add_signed(n);
        *slot_w += w;
        *slot_vl = slot_vl.saturating_add_signed(vl);
    }

    /// Walks from `id` to `up_to` inclusive (or to the root if `up_to` is not an ancestor).
    fn path(&self, id: NodeId, up_to: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while current != up_to {
            match self.nodes[current].parent {
                Some(parent) => {
                    path.push(parent);
                    current = parent;
                }
                None => break,
            }
        }
        path
    }

    // ---------------------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------------------

    /// Exploration bonus per move, virtual losses included.
    pub fn child_u(&self, id: NodeId) -> Vec<f32> {
        let node = &self.nodes[id];
        let parent_n = (self.n(id) + self.virtual_losses(id)).max(1) as f32;
        let scale = self.c_puct * parent_n.sqrt();
        (0..node.num_actions())
            .map(|a| scale * node.child_p[a] / (1.0 + (node.child_n[a] + node.child_vl[a]) as f32))
            .collect()
    }

    /// `Q + U` per move; illegal moves score `-inf`.
    pub fn child_action_score(&self, id: NodeId) -> Vec<f32> {
        let node = &self.nodes[id];
        self.child_u(id)
            .into_iter()
            .enumerate()
            .map(|(a, u)| {
                if node.legal[a] {
                    node.child_q(a) + u
                } else {
                    f32::NEG_INFINITY
                }
            })
            .collect()
    }

    /// Child for `fmove`, created on first visit.
    pub fn maybe_add_child(&mut self, id: NodeId, fmove: usize) -> Result<NodeId, IllegalMove> {
        if let Some(&child) = self.nodes[id].children.get(&fmove) {
            return Ok(child);
        }
        let position = self.nodes[id].position.apply_move(fmove)?;
        let child = self.nodes.len();
        self.nodes.push(MctsNode::new(position, Some(fmove), Some(id)));
        self.nodes[id].children.insert(fmove, child);
        Ok(child)
    }

    /// Descends from `from` by maximum action score until an unexpanded or finished node.
    ///
    /// An expanded node without any legal move is returned as well.
    pub fn select_leaf(&mut self, from: NodeId) -> Result<NodeId, IllegalMove> {
        let mut current = from;
        loop {
            if !self.nodes[current].is_expanded || self.is_done(current) {
                return Ok(current);
            }
            let scores = self.child_action_score(current);
            let mut best: Option<(usize, f32)> = None;
            for (a, &s) in scores.iter().enumerate() {
                if s == f32::NEG_INFINITY {
                    continue;
                }
                if best.map_or(true, |(_, bs)| s > bs) {
                    best = Some((a, s));
                }
            }
            let Some((fmove, _)) = best else {
                return Ok(current);
            };
            current = self.maybe_add_child(current, fmove)?;
        }
    }

    // ---------------------------------------------------------------------------------
    // Expansion and backup
    // ---------------------------------------------------------------------------------

    /// Stores masked, renormalized priors and marks the node expanded.
    pub fn expand(&mut self, id: NodeId, move_probs: &[f32]) {
        let node = &mut self.nodes[id];
        let mut priors: Vec<f32> = node
            .legal
            .iter()
            .enumerate()
            .map(|(a, &ok)| {
                let p = move_probs.get(a).copied().unwrap_or(0.0);
                if ok && p.is_finite() {
                    p.max(0.0)
                } else {
                    0.0
                }
            })
            .collect();
        let total: f32 = priors.iter().sum();
        if total > MIN_PRIOR_MASS {
            priors.iter_mut().for_each(|p| *p /= total);
        } else {
            let legal = node.legal_count();
            if legal > 0 {
                log::trace!("degenerate priors, falling back to uniform over {} moves", legal);
                let uniform = 1.0 / legal as f32;
                for (p, &ok) in priors.iter_mut().zip(&node.legal) {
                    *p = if ok { uniform } else { 0.0 };
                }
            }
        }
        node.child_p = priors;
        node.is_expanded = true;
    }

    /// Expands a freshly evaluated leaf and backs up its value.
    ///
    /// A node that is already expanded was reached twice in one batch; its result is
    /// dropped. Callers revert the leaf's virtual loss before calling this.
    pub fn incorporate_results(&mut self, id: NodeId, move_probs: &[f32], value: f32, up_to: NodeId) {
        if self.nodes[id].is_expanded {
            return;
        }
        self.expand(id, move_probs);
        self.backup_value(id, value, up_to);
    }

    /// N += 1 and W += value on every node from `id` to `up_to`, negating per step up.
    pub fn backup_value(&mut self, id: NodeId, value: f32, up_to: NodeId) {
        let mut v = value;
        for node in self.path(id, up_to) {
            self.bump(node, 1, v, 0);
            v = -v;
        }
    }

    pub fn add_virtual_loss(&mut self, id: NodeId, up_to: NodeId) {
        for node in self.path(id, up_to) {
            self.bump(node, 0, 0.0, 1);
        }
    }

    pub fn revert_virtual_loss(&mut self, id: NodeId, up_to: NodeId) {
        for node in self.path(id, up_to) {
            self.bump(node, 0, 0.0, -1);
        }
    }

    /// Mixes Dirichlet noise into the priors of legal moves.
    pub fn inject_noise<R: Rng + ?Sized>(&mut self, id: NodeId, rng: &mut R, alpha: f32, mix: f32) {
        let gamma = match Gamma::new(alpha as f64, 1.0) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("⚠️ Skipping root noise, bad dirichlet alpha {}: {}", alpha, e);
                return;
            }
        };
        let node = &mut self.nodes[id];
        let mut eta = vec![0.0f64; node.num_actions()];
        let mut sum = 0.0f64;
        for (a, &ok) in node.legal.iter().enumerate() {
            if ok {
                let x = gamma.sample(rng);
                eta[a] = x;
                sum += x;
            }
        }
        if !(sum.is_finite() && sum > 0.0) {
            return;
        }
        for (a, &ok) in node.legal.iter().enumerate() {
            if ok {
                let noise = (eta[a] / sum) as f32;
                node.child_p[a] = (1.0 - mix) * node.child_p[a] + mix * noise;
            }
        }
    }

    // ---------------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------------

    /// Game over, or the move count reached twice the number of points.
    pub fn is_done(&self, id: NodeId) -> bool {
        let position = &self.nodes[id].position;
        position.is_game_over() || position.move_number() as usize >= 2 * position.squares()
    }

    /// Most visited legal move, ties broken by action score then by lowest index.
    pub fn best_child(&self, id: NodeId) -> usize {
        let node = &self.nodes[id];
        let scores = self.child_action_score(id);
        let mut best: Option<usize> = None;
        for a in 0..node.num_actions() {
            if !node.legal[a] {
                continue;
            }
            best = match best {
                None => Some(a),
                Some(b) => {
                    let better = node.child_n[a] > node.child_n[b]
                        || (node.child_n[a] == node.child_n[b] && scores[a] > scores[b]);
                    Some(if better { a } else { b })
                }
            };
        }
        best.unwrap_or(node.num_actions() - 1)
    }

    /// Visit distribution over legal moves, optionally softened.
    pub fn children_as_pi(&self, id: NodeId, squash: bool) -> Vec<f32> {
        let node = &self.nodes[id];
        let mut pi: Vec<f32> = node
            .child_n
            .iter()
            .zip(&node.legal)
            .map(|(&n, &ok)| {
                if !ok {
                    0.0
                } else if squash {
                    (n as f32).powf(SQUASH_EXPONENT)
                } else {
                    n as f32
                }
            })
            .collect();
        let total: f32 = pi.iter().sum();
        if total > 0.0 {
            pi.iter_mut().for_each(|p| *p /= total);
        } else {
            let legal = node.legal_count().max(1) as f32;
            for (p, &ok) in pi.iter_mut().zip(&node.legal) {
                *p = if ok { 1.0 / legal } else { 0.0 };
            }
        }
        pi
    }

    /// Moves along the most visited existing children.
    pub fn most_visited_path(&self, id: NodeId) -> Vec<usize> {
        let mut moves = Vec::new();
        let mut current = id;
        loop {
            let node = &self.nodes[current];
            let next = node
                .children
                .iter()
                .filter(|(&fmove, _)| node.child_n[fmove] > 0)
                .max_by_key(|(&fmove, _)| node.child_n[fmove]);
            match next {
                Some((&fmove, &child)) => {
                    moves.push(fmove);
                    current = child;
                }
                None => return moves,
            }
        }
    }

    /// Diagnostics: value, top children and the principal variation.
    pub fn describe(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        let size = node.position.board_size();
        let scores = self.child_action_score(id);
        let u = self.child_u(id);

        let mut order: Vec<usize> = (0..node.num_actions()).filter(|&a| node.legal[a]).collect();
        order.sort_by(|&a, &b| {
            node.child_n[b]
                .cmp(&node.child_n[a])
                .then(scores[b].total_cmp(&scores[a]))
        });

        let mut out = String::new();
        let _ = writeln!(out, "{:.4}", self.q_perspective(id));
        let _ = writeln!(out, " move : action     Q      U      P      N");
        for &a in order.iter().take(DESCRIBE_TOP_CHILDREN) {
            let _ = writeln!(
                out,
                "{:>5} : {:+.3} {:+.3} {:.4} {:.4} {:>6}",
                to_gtp(a, size),
                scores[a],
                node.child_q(a),
                u[a],
                node.child_p[a],
                node.child_n[a],
            );
        }
        let path: Vec<String> = self
            .most_visited_path(id)
            .into_iter()
            .map(|m| to_gtp(m, size))
            .collect();
        let _ = write!(out, "Most visited path: {}", path.join(" "));
        out
    }

    // ---------------------------------------------------------------------------------
    // Re-rooting
    // ---------------------------------------------------------------------------------

    /// Makes the child for `fmove` the new root and drops every other subtree.
    pub fn reroot(&mut self, fmove: usize) -> Result<(), IllegalMove> {
        let root = self.root;
        if !self.nodes[root].legal.get(fmove).copied().unwrap_or(false) {
            return Err(match self.nodes[root].position.apply_move(fmove) {
                Err(e) => e,
                Ok(_) => IllegalMove {
                    fmove,
                    reason: IllegalReason::Forbidden,
                },
            });
        }
        let child = self.maybe_add_child(root, fmove)?;

        self.root_n = self.nodes[root].child_n[fmove];
        self.root_w = self.nodes[root].child_w[fmove];
        self.root_vl = 0;
        self.compact(child);
        Ok(())
    }

    /// Keeps only the subtree of `keep`, which becomes node 0.
    fn compact(&mut self, keep: NodeId) {
        let mut order = Vec::new();
        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::from([keep]);
        while let Some(id) = queue.pop_front() {
            remap.insert(id, order.len());
            order.push(id);
            queue.extend(self.nodes[id].children.values().copied());
        }

        let mut slots: Vec<Option<MctsNode<P>>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut nodes = Vec::with_capacity(order.len());
        for old in order {
            if let Some(mut node) = slots[old].take() {
                node.parent = node.parent.and_then(|p| remap.get(&p).copied());
                node.children = node
                    .children
                    .iter()
                    .filter_map(|(&m, c)| remap.get(c).map(|&nc| (m, nc)))
                    .collect::<BTreeMap<_, _>>();
                nodes.push(node);
            }
        }
        if let Some(root) = nodes.first_mut() {
            root.parent = None;
            root.fmove = None;
        }
        self.nodes = nodes;
        self.root = 0;
    }
}

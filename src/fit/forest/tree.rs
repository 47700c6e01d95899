//! CART regression trees grown on squared-error reduction.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::N_FEATURES;
use crate::domain::ModelRow;

/// A node in a flattened regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict(&self, x: &[f64; N_FEATURES]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Grow one tree on `sample` (row indices, repeats allowed).
///
/// Returns the tree and the squared-error reduction credited to each feature.
pub(super) fn grow_tree(
    rows: &[ModelRow],
    sample: Vec<usize>,
    mtry: usize,
    min_node_size: usize,
    rng: StdRng,
) -> (RegressionTree, [f64; N_FEATURES]) {
    let mut builder = TreeBuilder {
        rows,
        mtry,
        min_node_size,
        rng,
        nodes: Vec::new(),
        importance: [0.0; N_FEATURES],
    };
    builder.build(sample);
    (RegressionTree { nodes: builder.nodes }, builder.importance)
}

struct TreeBuilder<'a> {
    rows: &'a [ModelRow],
    mtry: usize,
    min_node_size: usize,
    rng: StdRng,
    nodes: Vec<Node>,
    importance: [f64; N_FEATURES],
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `sample` and return its node index.
    fn build(&mut self, sample: Vec<usize>) -> usize {
        let idx = self.nodes.len();
        let mean = sample.iter().map(|&i| self.rows[i].target).sum::<f64>() / sample.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if sample.len() < self.min_node_size {
            return idx;
        }
        let Some(split) = self.best_split(&sample) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.rows[i].features[split.feature] <= split.threshold);
        if left.is_empty() || right.is_empty() {
            return idx;
        }

        self.importance[split.feature] += split.gain;
        let left = self.build(left);
        let right = self.build(right);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, sample: &[usize]) -> Option<BestSplit> {
        let n = sample.len() as f64;
        let total: f64 = sample.iter().map(|&i| self.rows[i].target).sum();
        let parent = total * total / n;

        let candidates = rand::seq::index::sample(&mut self.rng, N_FEATURES, self.mtry).into_vec();
        let mut best: Option<BestSplit> = None;

        for feature in candidates {
            let mut pairs: Vec<(f64, f64)> = sample
                .iter()
                .map(|&i| (self.rows[i].features[feature], self.rows[i].target))
                .collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 1..pairs.len() {
                left_sum += pairs[k - 1].1;
                if pairs[k - 1].0 == pairs[k].0 {
                    continue;
                }
                let nl = k as f64;
                let nr = n - nl;
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / nl + right_sum * right_sum / nr - parent;
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (pairs[k - 1].0 + pairs[k].0) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

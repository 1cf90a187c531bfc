//! Decision tree implementation.
//!
//! A [`Tree`] stores its nodes in a flat arena (index 0 is the root) and
//! keeps a second table from stable leaf ids to arena indices. When leaf
//! `l` is split, the left child keeps id `l` and the right child receives
//! the next free id, so ids stay dense in `0..num_leaves`.
//!
//! Trees route rows on raw feature values. A feature index beyond the end
//! of a row reads as NaN.

use crate::core::error::{LightGBMError, Result};
use crate::core::types::{DataSize, FeatureIndex, LeafIndex, NodeIndex, Score};
use crate::tree::node::{NodeSplit, SplitCondition, TreeNode};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Training statistics of a new leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafStats {
    pub output: Score,
    pub data_count: DataSize,
    pub sum_hessians: f64,
}

/// Decision tree structure representing a single tree in the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    /// Arena index of every leaf, by leaf id
    leaf_nodes: Vec<NodeIndex>,
    /// Product of all shrinkage factors applied so far
    shrinkage: f64,
    max_depth: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree with a single zero-valued root leaf.
    pub fn new() -> Self {
        Self::constant(0.0, 0)
    }

    /// Creates a single-leaf tree predicting `value` for every row.
    pub fn constant(value: Score, data_count: DataSize) -> Self {
        Tree {
            nodes: vec![TreeNode::new_leaf(0, value, data_count, 0.0, 0, None)],
            leaf_nodes: vec![0],
            shrinkage: 1.0,
            max_depth: 0,
        }
    }

    /// Initialise the root statistics before growth starts.
    pub fn set_root_stats(&mut self, stats: LeafStats) {
        let root = TreeNode::new_leaf(0, stats.output, stats.data_count, stats.sum_hessians, 0, None);
        self.nodes = vec![root];
        self.leaf_nodes = vec![0];
        self.max_depth = 0;
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_nodes.len()
    }

    /// Maximum depth of any leaf.
    pub fn depth(&self) -> usize {
        self.max_depth
    }

    pub fn shrinkage(&self) -> f64 {
        self.shrinkage
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Arena index of a leaf id.
    pub fn leaf_node(&self, leaf: LeafIndex) -> NodeIndex {
        self.leaf_nodes[leaf]
    }

    pub fn leaf_output(&self, leaf: LeafIndex) -> Score {
        self.nodes[self.leaf_nodes[leaf]].value()
    }

    pub fn set_leaf_output(&mut self, leaf: LeafIndex, output: Score) {
        let node = self.leaf_nodes[leaf];
        self.nodes[node].set_value(output);
    }

    pub fn leaf_depth(&self, leaf: LeafIndex) -> usize {
        self.nodes[self.leaf_nodes[leaf]].depth()
    }

    pub fn leaf_count(&self, leaf: LeafIndex) -> DataSize {
        self.nodes[self.leaf_nodes[leaf]].data_count()
    }

    /// Splits of all internal nodes, in creation order.
    pub fn splits(&self) -> impl Iterator<Item = &NodeSplit> {
        self.nodes.iter().filter_map(|n| n.split())
    }

    pub fn is_single_leaf(&self) -> bool {
        self.leaf_nodes.len() == 1
    }

    /// Split leaf `leaf` and return the id of the new right leaf.
    pub fn split(
        &mut self,
        leaf: LeafIndex,
        feature: FeatureIndex,
        condition: SplitCondition,
        gain: f64,
        left: LeafStats,
        right: LeafStats,
    ) -> Result<LeafIndex> {
        let node_index = *self.leaf_nodes.get(leaf).ok_or_else(|| {
            LightGBMError::tree_construction(format!("Leaf {} does not exist", leaf))
        })?;
        let child_depth = self.nodes[node_index].depth() + 1;
        let right_leaf = self.leaf_nodes.len();

        let left_index = self.nodes.len();
        let right_index = left_index + 1;
        self.nodes.push(TreeNode::new_leaf(
            leaf,
            left.output,
            left.data_count,
            left.sum_hessians,
            child_depth,
            Some(node_index),
        ));
        self.nodes.push(TreeNode::new_leaf(
            right_leaf,
            right.output,
            right.data_count,
            right.sum_hessians,
            child_depth,
            Some(node_index),
        ));

        self.nodes[node_index].set_split(NodeSplit {
            feature,
            condition,
            gain,
            left: left_index,
            right: right_index,
        });
        self.leaf_nodes[leaf] = left_index;
        self.leaf_nodes.push(right_index);
        self.max_depth = self.max_depth.max(child_depth);

        Ok(right_leaf)
    }

    /// Multiply every node value by `rate`.
    pub fn shrink(&mut self, rate: f64) {
        for node in &mut self.nodes {
            node.set_value(node.value() * rate);
        }
        self.shrinkage *= rate;
    }

    /// Add `bias` to every node value.
    pub fn add_bias(&mut self, bias: f64) {
        for node in &mut self.nodes {
            node.set_value(node.value() + bias);
        }
    }

    /// Leaf reached by a row whose feature values are given by `value`.
    #[inline]
    pub fn leaf_for<F: Fn(FeatureIndex) -> f64>(&self, value: F) -> LeafIndex {
        let mut node = &self.nodes[0];
        while let Some(split) = node.split() {
            let next = if split.condition.goes_left(value(split.feature)) {
                split.left
            } else {
                split.right
            };
            node = &self.nodes[next];
        }
        node.leaf_index()
    }

    /// Leaf id reached by a raw feature row.
    pub fn predict_leaf_index(&self, row: &ArrayView1<'_, f32>) -> LeafIndex {
        self.leaf_for(|f| row_value(row, f))
    }

    /// Output for a raw feature row.
    pub fn predict(&self, row: &ArrayView1<'_, f32>) -> Score {
        self.leaf_output(self.predict_leaf_index(row))
    }

    /// Count-weighted mean leaf output.
    pub fn expected_value(&self) -> f64 {
        let total = self.nodes[0].data_count() as f64;
        if self.is_single_leaf() || total <= 0.0 {
            return self.leaf_output(0);
        }
        self.leaf_nodes
            .iter()
            .map(|&n| {
                let node = &self.nodes[n];
                node.data_count() as f64 / total * node.value()
            })
            .sum()
    }

    /// Add TreeSHAP feature contributions of one row to `phi`.
    ///
    /// `phi` has one slot per feature plus a final slot that receives the
    /// tree's expected value. The contributions of a tree sum to its
    /// prediction for the row.
    pub fn predict_contrib(&self, row: &ArrayView1<'_, f32>, phi: &mut [f64]) {
        let bias_slot = phi.len() - 1;
        phi[bias_slot] += self.expected_value();
        if self.is_single_leaf() {
            return;
        }

        let depth = self.max_depth + 1;
        let mut path = vec![PathElement::default(); (depth + 1) * (depth + 2) / 2 + depth + 1];
        self.tree_shap(row, phi, 0, 0, &mut path, 0, 1.0, 1.0, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn tree_shap(
        &self,
        row: &ArrayView1<'_, f32>,
        phi: &mut [f64],
        node_index: NodeIndex,
        mut unique_depth: usize,
        path: &mut [PathElement],
        parent_start: usize,
        parent_zero_fraction: f64,
        parent_one_fraction: f64,
        parent_feature: Option<FeatureIndex>,
    ) {
        let start = parent_start + unique_depth;
        if unique_depth > 0 {
            path.copy_within(parent_start..parent_start + unique_depth, start);
        }
        extend_path(
            &mut path[start..],
            unique_depth,
            parent_zero_fraction,
            parent_one_fraction,
            parent_feature,
        );

        let node = &self.nodes[node_index];
        let Some(split) = node.split() else {
            for i in 1..=unique_depth {
                let w = unwound_path_sum(&path[start..], unique_depth, i);
                let el = path[start + i];
                if let Some(feature) = el.feature {
                    phi[feature] += w * (el.one_fraction - el.zero_fraction) * node.value();
                }
            }
            return;
        };

        let (hot, cold) = if split.condition.goes_left(row_value(row, split.feature)) {
            (split.left, split.right)
        } else {
            (split.right, split.left)
        };
        let w = node.data_count() as f64;
        let hot_zero_fraction = self.nodes[hot].data_count() as f64 / w;
        let cold_zero_fraction = self.nodes[cold].data_count() as f64 / w;
        let mut incoming_zero_fraction = 1.0;
        let mut incoming_one_fraction = 1.0;

        // undo an earlier split on the same feature so it can be redone here
        if let Some(path_index) =
            (0..=unique_depth).find(|&i| path[start + i].feature == Some(split.feature))
        {
            incoming_zero_fraction = path[start + path_index].zero_fraction;
            incoming_one_fraction = path[start + path_index].one_fraction;
            unwind_path(&mut path[start..], unique_depth, path_index);
            unique_depth -= 1;
        }

        self.tree_shap(
            row,
            phi,
            hot,
            unique_depth + 1,
            path,
            start,
            hot_zero_fraction * incoming_zero_fraction,
            incoming_one_fraction,
            Some(split.feature),
        );
        self.tree_shap(
            row,
            phi,
            cold,
            unique_depth + 1,
            path,
            start,
            cold_zero_fraction * incoming_zero_fraction,
            0.0,
            Some(split.feature),
        );
    }

    /// Check arena consistency.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() || self.nodes[0].parent().is_some() {
            return Err(LightGBMError::serialization("Tree has no valid root"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(split) = node.split() {
                for child in [split.left, split.right] {
                    if child >= self.nodes.len() || self.nodes[child].parent() != Some(i) {
                        return Err(LightGBMError::serialization(format!(
                            "Node {} has an invalid child {}",
                            i, child
                        )));
                    }
                }
            }
        }
        for (leaf, &n) in self.leaf_nodes.iter().enumerate() {
            match self.nodes.get(n) {
                Some(node) if node.is_leaf() && node.leaf_index() == leaf => {}
                _ => {
                    return Err(LightGBMError::serialization(format!(
                        "Leaf {} does not map to a leaf node",
                        leaf
                    )))
                }
            }
        }
        if self.nodes.len() != 2 * self.leaf_nodes.len() - 1 {
            return Err(LightGBMError::serialization(
                "Node and leaf counts are inconsistent",
            ));
        }
        Ok(())
    }
}

#[inline]
fn row_value(row: &ArrayView1<'_, f32>, feature: FeatureIndex) -> f64 {
    row.get(feature).map_or(f64::NAN, |&v| v as f64)
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tree(nodes={}, leaves={}, depth={}, shrinkage={})",
            self.num_nodes(),
            self.num_leaves(),
            self.depth(),
            self.shrinkage()
        )
    }
}

/// One element of the TreeSHAP feature path.
#[derive(Debug, Clone, Copy, Default)]
struct PathElement {
    feature: Option<FeatureIndex>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

fn extend_path(
    path: &mut [PathElement],
    unique_depth: usize,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<FeatureIndex>,
) {
    path[unique_depth] = PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if unique_depth == 0 { 1.0 } else { 0.0 },
    };
    let d = unique_depth as f64;
    for i in (0..unique_depth).rev() {
        let fi = i as f64;
        path[i + 1].pweight += one_fraction * path[i].pweight * (fi + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - fi) / (d + 1.0);
    }
}

fn unwind_path(path: &mut [PathElement], unique_depth: usize, path_index: usize) {
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let mut next_one_portion = path[unique_depth].pweight;
    let d = unique_depth as f64;

    for i in (0..unique_depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (d - fi) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - fi));
        }
    }

    for i in path_index..unique_depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
}

fn unwound_path_sum(path: &[PathElement], unique_depth: usize, path_index: usize) -> f64 {
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let mut next_one_portion = path[unique_depth].pweight;
    let mut total = 0.0;
    let d = unique_depth as f64;

    for i in (0..unique_depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * ((d - fi) / (d + 1.0));
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((d - fi) / (d + 1.0));
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MissingType;
    use crate::tree::node::CategoryBitset;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn numerical(threshold: f64) -> SplitCondition {
        SplitCondition::Numerical {
            threshold,
            default_left: true,
            missing_type: MissingType::NaN,
        }
    }

    fn stats(output: f64, count: DataSize) -> LeafStats {
        LeafStats {
            output,
            data_count: count,
            sum_hessians: count as f64,
        }
    }

    /// x0 <= 2.5 ? (x1 <= 0.5 ? 1 : 2) : -1
    fn two_level_tree() -> Tree {
        let mut tree = Tree::new();
        tree.set_root_stats(stats(0.0, 10));
        let right = tree
            .split(0, 0, numerical(2.5), 5.0, stats(1.5, 6), stats(-1.0, 4))
            .unwrap();
        assert_eq!(right, 1);
        let right2 = tree
            .split(0, 1, numerical(0.5), 2.0, stats(1.0, 3), stats(2.0, 3))
            .unwrap();
        assert_eq!(right2, 2);
        tree
    }

    #[test]
    fn test_new_tree() {
        let tree = Tree::new();
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.depth(), 0);
        assert!(tree.is_single_leaf());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_predict_and_leaf_ids() {
        let tree = two_level_tree();
        assert_eq!(tree.num_leaves(), 3);
        assert_eq!(tree.depth(), 2);
        assert!(tree.validate().is_ok());

        let row = array![1.0f32, 0.0];
        assert_eq!(tree.predict_leaf_index(&row.view()), 0);
        assert_eq!(tree.predict(&row.view()), 1.0);

        let row = array![1.0f32, 1.0];
        assert_eq!(tree.predict_leaf_index(&row.view()), 2);
        assert_eq!(tree.predict(&row.view()), 2.0);

        let row = array![3.0f32, 0.0];
        assert_eq!(tree.predict_leaf_index(&row.view()), 1);

        // missing follows default_left, absent columns read as NaN
        let row = array![f32::NAN];
        assert_eq!(tree.predict_leaf_index(&row.view()), 0);
    }

    #[test]
    fn test_shrink_and_bias() {
        let mut tree = two_level_tree();
        tree.shrink(0.1);
        tree.add_bias(0.5);
        assert_relative_eq!(tree.leaf_output(1), -0.1 + 0.5);
        assert_relative_eq!(tree.shrinkage(), 0.1);
    }

    #[test]
    fn test_categorical_split() {
        let mut tree = Tree::new();
        tree.set_root_stats(stats(0.0, 4));
        let cond = SplitCondition::Categorical {
            categories: CategoryBitset::from_values(&[1, 3]),
        };
        tree.split(0, 0, cond, 1.0, stats(1.0, 2), stats(-1.0, 2)).unwrap();
        assert_eq!(tree.predict(&array![3.0f32].view()), 1.0);
        assert_eq!(tree.predict(&array![2.0f32].view()), -1.0);
        assert_eq!(tree.predict(&array![f32::NAN].view()), -1.0);
    }

    #[test]
    fn test_contributions_sum_to_prediction() {
        let tree = two_level_tree();
        for row in [
            array![1.0f32, 0.0],
            array![1.0f32, 1.0],
            array![4.0f32, 1.0],
        ] {
            let mut phi = vec![0.0; 3];
            tree.predict_contrib(&row.view(), &mut phi);
            let total: f64 = phi.iter().sum();
            assert_relative_eq!(total, tree.predict(&row.view()), epsilon = 1e-10);
        }
        assert_relative_eq!(tree.expected_value(), 0.3 * 1.0 + 0.3 * 2.0 + 0.4 * -1.0);
    }

    #[test]
    fn test_contributions_with_repeated_feature() {
        let mut tree = Tree::new();
        tree.set_root_stats(stats(0.0, 8));
        tree.split(0, 0, numerical(5.0), 1.0, stats(0.0, 4), stats(3.0, 4))
            .unwrap();
        tree.split(0, 0, numerical(2.0), 1.0, stats(-2.0, 2), stats(1.0, 2))
            .unwrap();
        let row = array![1.0f32];
        let mut phi = vec![0.0; 2];
        tree.predict_contrib(&row.view(), &mut phi);
        assert_relative_eq!(phi[0] + phi[1], -2.0, epsilon = 1e-10);
        assert_relative_eq!(phi[1], tree.expected_value(), epsilon = 1e-12);
    }

    #[test]
    fn test_serde_round_trip_is_exact() {
        let mut tree = two_level_tree();
        tree.shrink(0.123456789);
        let json = serde_json::to_string(&tree).unwrap();
        let back: Tree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, back);
    }
}

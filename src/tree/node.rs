//! Tree node implementation.
//!
//! Nodes live in a flat arena owned by [`crate::tree::Tree`]. Every node
//! carries the statistics of the rows that reached it during training; an
//! internal node additionally carries its [`NodeSplit`].

use crate::core::types::{DataSize, FeatureIndex, LeafIndex, MissingType, NodeIndex, Score};
use serde::{Deserialize, Serialize};

/// Set of non-negative category values, stored as 32-bit words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBitset {
    words: Vec<u32>,
}

impl CategoryBitset {
    /// Build a bitset from category values; negative values are ignored.
    pub fn from_values(values: &[i32]) -> Self {
        let mut bitset = CategoryBitset::default();
        for &v in values {
            if v >= 0 {
                bitset.insert(v as u32);
            }
        }
        bitset
    }

    pub fn insert(&mut self, value: u32) {
        let word = (value / 32) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (value % 32);
    }

    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        if value < 0 {
            return false;
        }
        let value = value as u32;
        self.words
            .get((value / 32) as usize)
            .map_or(false, |w| (w >> (value % 32)) & 1 == 1)
    }

    /// Member values in ascending order.
    pub fn values(&self) -> Vec<i32> {
        let mut values = Vec::new();
        for (i, &word) in self.words.iter().enumerate() {
            for bit in 0..32 {
                if (word >> bit) & 1 == 1 {
                    values.push((i * 32 + bit) as i32);
                }
            }
        }
        values
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

/// Decision rule of an internal node, expressed on raw feature values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SplitCondition {
    /// `value <= threshold` goes left; NaN follows `default_left` when the
    /// feature had missing values at training time and is read as zero
    /// otherwise.
    Numerical {
        #[serde(with = "crate::io::serialization::float_repr")]
        threshold: f64,
        default_left: bool,
        missing_type: MissingType,
    },
    /// Members of the set go left; NaN, negative and unknown categories go
    /// right.
    Categorical { categories: CategoryBitset },
}

impl SplitCondition {
    /// Whether a raw feature value is routed to the left child.
    #[inline]
    pub fn goes_left(&self, value: f64) -> bool {
        match self {
            SplitCondition::Numerical {
                threshold,
                default_left,
                missing_type,
            } => {
                if value.is_nan() {
                    match missing_type {
                        MissingType::NaN => *default_left,
                        MissingType::None => 0.0 <= *threshold,
                    }
                } else {
                    value <= *threshold
                }
            }
            SplitCondition::Categorical { categories } => {
                if value.is_nan() || value < 0.0 {
                    false
                } else {
                    categories.contains(value as i32)
                }
            }
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, SplitCondition::Categorical { .. })
    }
}

/// Split stored on an internal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSplit {
    pub feature: FeatureIndex,
    pub condition: SplitCondition,
    pub gain: f64,
    pub left: NodeIndex,
    pub right: NodeIndex,
}

/// Tree node; a leaf when it has no split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    parent: Option<NodeIndex>,
    depth: usize,
    /// Rows that reached the node during training
    data_count: DataSize,
    sum_hessians: f64,
    /// Leaf output, or the output the node had before it was split
    value: Score,
    /// Stable leaf id while the node is a leaf
    leaf_index: LeafIndex,
    split: Option<NodeSplit>,
}

impl TreeNode {
    /// Creates a new leaf node.
    pub fn new_leaf(
        leaf_index: LeafIndex,
        value: Score,
        data_count: DataSize,
        sum_hessians: f64,
        depth: usize,
        parent: Option<NodeIndex>,
    ) -> Self {
        TreeNode {
            parent,
            depth,
            data_count,
            sum_hessians,
            value,
            leaf_index,
            split: None,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }

    pub fn split(&self) -> Option<&NodeSplit> {
        self.split.as_ref()
    }

    pub(crate) fn set_split(&mut self, split: NodeSplit) {
        self.split = Some(split);
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn data_count(&self) -> DataSize {
        self.data_count
    }

    pub fn sum_hessians(&self) -> f64 {
        self.sum_hessians
    }

    /// Output of a leaf, or the internal value of a split node.
    #[inline]
    pub fn value(&self) -> Score {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: Score) {
        self.value = value;
    }

    pub fn leaf_index(&self) -> LeafIndex {
        self.leaf_index
    }
}

//! Row-to-leaf assignment during tree growth.
//!
//! All rows of the current tree live in one index buffer; every leaf owns a
//! contiguous segment of it. Splitting a leaf reorders its segment in place
//! so that left rows come first, preserving their relative order, and hands
//! the tail to the new right leaf.

use crate::core::error::{LightGBMError, Result};
use crate::core::types::{DataSize, LeafIndex};
use rayon::prelude::*;

/// Segments above this size evaluate the split rule in parallel.
const PARALLEL_PARTITION_MIN_ROWS: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct DataPartition {
    indices: Vec<DataSize>,
    leaf_begin: Vec<usize>,
    leaf_count: Vec<usize>,
}

impl DataPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put every used row into leaf 0. `used_rows` must be sorted; `None`
    /// means all `num_data` rows.
    pub fn init(&mut self, num_data: usize, used_rows: Option<&[DataSize]>) {
        self.indices.clear();
        match used_rows {
            Some(rows) => self.indices.extend_from_slice(rows),
            None => self.indices.extend(0..num_data as DataSize),
        }
        self.leaf_begin.clear();
        self.leaf_count.clear();
        self.leaf_begin.push(0);
        self.leaf_count.push(self.indices.len());
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_begin.len()
    }

    /// Rows currently in `leaf`, in partition order.
    pub fn leaf_rows(&self, leaf: LeafIndex) -> &[DataSize] {
        let begin = self.leaf_begin[leaf];
        &self.indices[begin..begin + self.leaf_count[leaf]]
    }

    pub fn leaf_count(&self, leaf: LeafIndex) -> usize {
        self.leaf_count[leaf]
    }

    /// Number of rows taking part in the current tree.
    pub fn num_used_rows(&self) -> usize {
        self.indices.len()
    }

    /// Split `leaf`: rows for which `goes_left` holds stay in `leaf`, the
    /// rest move to a new leaf whose id is returned.
    pub fn split<F>(&mut self, leaf: LeafIndex, goes_left: F) -> Result<LeafIndex>
    where
        F: Fn(DataSize) -> bool + Sync,
    {
        if leaf >= self.leaf_begin.len() {
            return Err(LightGBMError::tree_construction(format!(
                "Cannot split unknown leaf {}",
                leaf
            )));
        }
        let begin = self.leaf_begin[leaf];
        let count = self.leaf_count[leaf];
        let segment = &mut self.indices[begin..begin + count];

        let decisions: Vec<bool> = if count >= PARALLEL_PARTITION_MIN_ROWS {
            segment.par_iter().map(|&row| goes_left(row)).collect()
        } else {
            segment.iter().map(|&row| goes_left(row)).collect()
        };

        let mut right = Vec::with_capacity(count);
        let mut left_count = 0;
        for i in 0..count {
            let row = segment[i];
            if decisions[i] {
                segment[left_count] = row;
                left_count += 1;
            } else {
                right.push(row);
            }
        }
        segment[left_count..].copy_from_slice(&right);

        let right_leaf = self.leaf_begin.len();
        self.leaf_count[leaf] = left_count;
        self.leaf_begin.push(begin + left_count);
        self.leaf_count.push(count - left_count);
        Ok(right_leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_stable() {
        let mut partition = DataPartition::new();
        partition.init(8, None);
        let right = partition.split(0, |row| row % 2 == 0).unwrap();
        assert_eq!(right, 1);
        assert_eq!(partition.leaf_rows(0), &[0, 2, 4, 6]);
        assert_eq!(partition.leaf_rows(1), &[1, 3, 5, 7]);

        let right = partition.split(1, |row| row < 4).unwrap();
        assert_eq!(right, 2);
        assert_eq!(partition.leaf_rows(1), &[1, 3]);
        assert_eq!(partition.leaf_rows(2), &[5, 7]);
        assert_eq!(partition.leaf_rows(0), &[0, 2, 4, 6]);
    }

    #[test]
    fn test_subset_init() {
        let mut partition = DataPartition::new();
        partition.init(10, Some(&[1, 4, 9]));
        assert_eq!(partition.num_used_rows(), 3);
        assert_eq!(partition.leaf_rows(0), &[1, 4, 9]);
    }

    #[test]
    fn test_unknown_leaf_errors() {
        let mut partition = DataPartition::new();
        partition.init(3, None);
        assert!(partition.split(5, |_| true).is_err());
    }

    #[test]
    fn test_large_segment_parallel_path() {
        let mut partition = DataPartition::new();
        let n = PARALLEL_PARTITION_MIN_ROWS * 2;
        partition.init(n, None);
        partition.split(0, |row| row >= (n / 2) as DataSize).unwrap();
        assert_eq!(partition.leaf_count(0), n / 2);
        assert_eq!(partition.leaf_rows(1)[0], 0);
        assert!(partition.leaf_rows(0).windows(2).all(|w| w[0] < w[1]));
    }
}

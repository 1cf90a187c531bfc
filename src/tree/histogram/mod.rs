//! Gradient histograms.
//!
//! A histogram holds, for every bin of a feature, the sum of gradients, the
//! sum of hessians and the number of rows that fell into it. Histograms are
//! transient: the tree learner builds them per leaf and drops them once the
//! leaf is split or finalised.
//!
//! The histogram of the larger child of a split can be derived as
//! `parent - smaller child`, which avoids a second pass over its rows.

pub mod builder;

pub use builder::HistogramBuilder;

use crate::core::types::{BinIndex, DataSize, Hist};

/// Accumulated statistics of one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinEntry {
    pub sum_gradients: Hist,
    pub sum_hessians: Hist,
    pub count: DataSize,
}

impl BinEntry {
    #[inline]
    pub fn add(&mut self, gradient: Hist, hessian: Hist) {
        self.sum_gradients += gradient;
        self.sum_hessians += hessian;
        self.count += 1;
    }

    #[inline]
    pub fn accumulate(&mut self, other: &BinEntry) {
        self.sum_gradients += other.sum_gradients;
        self.sum_hessians += other.sum_hessians;
        self.count += other.count;
    }

    #[inline]
    pub fn subtract(&self, other: &BinEntry) -> BinEntry {
        BinEntry {
            sum_gradients: self.sum_gradients - other.sum_gradients,
            sum_hessians: self.sum_hessians - other.sum_hessians,
            count: self.count.saturating_sub(other.count),
        }
    }
}

/// Per-bin statistics of one feature within one leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureHistogram {
    bins: Vec<BinEntry>,
}

impl FeatureHistogram {
    pub fn new(num_bins: usize) -> Self {
        FeatureHistogram {
            bins: vec![BinEntry::default(); num_bins],
        }
    }

    pub fn bins(&self) -> &[BinEntry] {
        &self.bins
    }

    #[inline]
    pub fn bin(&self, bin: BinIndex) -> &BinEntry {
        &self.bins[bin as usize]
    }

    pub(crate) fn bins_mut(&mut self) -> &mut [BinEntry] {
        &mut self.bins
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Whether the histogram was built (skipped features stay empty).
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum over all bins.
    pub fn total(&self) -> BinEntry {
        let mut total = BinEntry::default();
        for entry in &self.bins {
            total.accumulate(entry);
        }
        total
    }

    /// `self - other`, bin by bin.
    pub fn subtract(&self, other: &FeatureHistogram) -> FeatureHistogram {
        if other.is_empty() {
            return self.clone();
        }
        FeatureHistogram {
            bins: self
                .bins
                .iter()
                .zip(&other.bins)
                .map(|(a, b)| a.subtract(b))
                .collect(),
        }
    }
}

/// Histograms of every feature for one leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafHistogram {
    features: Vec<FeatureHistogram>,
}

impl LeafHistogram {
    pub fn from_features(features: Vec<FeatureHistogram>) -> Self {
        LeafHistogram { features }
    }

    pub fn feature(&self, feature: usize) -> &FeatureHistogram {
        &self.features[feature]
    }

    pub fn features(&self) -> &[FeatureHistogram] {
        &self.features
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Histogram of a sibling leaf: `parent - self`.
    pub fn sibling_of(&self, parent: &LeafHistogram) -> LeafHistogram {
        LeafHistogram {
            features: parent
                .features
                .iter()
                .zip(&self.features)
                .map(|(p, c)| if p.is_empty() { FeatureHistogram::default() } else { p.subtract(c) })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_entry_arithmetic() {
        let mut a = BinEntry::default();
        a.add(1.0, 2.0);
        a.add(0.5, 1.0);
        let mut b = BinEntry::default();
        b.add(1.0, 2.0);
        let diff = a.subtract(&b);
        assert_eq!(diff.count, 1);
        assert_eq!(diff.sum_gradients, 0.5);
        assert_eq!(diff.sum_hessians, 1.0);
    }

    #[test]
    fn test_sibling_subtraction() {
        let mut parent = FeatureHistogram::new(2);
        parent.bins_mut()[0].add(1.0, 1.0);
        parent.bins_mut()[1].add(2.0, 1.0);
        parent.bins_mut()[1].add(3.0, 1.0);
        let mut child = FeatureHistogram::new(2);
        child.bins_mut()[1].add(2.0, 1.0);

        let parent = LeafHistogram::from_features(vec![parent, FeatureHistogram::default()]);
        let child = LeafHistogram::from_features(vec![child, FeatureHistogram::default()]);
        let sibling = child.sibling_of(&parent);
        assert_eq!(sibling.feature(0).bin(0).count, 1);
        assert_eq!(sibling.feature(0).bin(1).sum_gradients, 3.0);
        assert!(sibling.feature(1).is_empty());
        assert_eq!(sibling.feature(0).total().count, 2);
    }
}

//! Streaming weighted-median bookkeeping.
//!
//! [`WeightedMedianCalculator`] maintains a multiset of `(value, weight)`
//! samples ordered by value and answers weighted-median queries in O(1).
//! Insertions and removals keep the median index up to date incrementally,
//! so a split sweep that moves one sample at a time pays amortized constant
//! median-maintenance work per move.
//!
//! # Median convention
//!
//! The *lower* weighted median: the smallest value whose cumulative weight
//! reaches half of the total weight. For unit weights over `[1, 2, 3, 100]`
//! the median is `2`.

use std::collections::TryReserveError;

/// Ordered weighted multiset with an incrementally maintained median.
///
/// The representation is a value-sorted `Vec` of `(value, weight)` pairs
/// plus a prefix cursor: `k` leading items whose cumulative weight
/// `sum_w_0_k` is the smallest prefix weight reaching `total_weight / 2`.
/// `median()` is then just the last item of that prefix.
#[derive(Debug, Clone, Default)]
pub struct WeightedMedianCalculator {
    items: Vec<(f64, f64)>,
    total_weight: f64,
    k: usize,
    sum_w_0_k: f64,
}

impl WeightedMedianCalculator {
    /// Create an empty calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no samples are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total weight of all stored samples.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Reserve room for `additional` more samples.
    ///
    /// Reserving up front keeps later `push` calls allocation-free, which is
    /// what lets a criterion promise non-allocating boundary updates.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.items.try_reserve(additional)
    }

    /// Remove all samples.
    pub fn reset(&mut self) {
        self.items.clear();
        self.total_weight = 0.0;
        self.k = 0;
        self.sum_w_0_k = 0.0;
    }

    /// Insert a sample.
    pub fn push(&mut self, value: f64, weight: f64) {
        let idx = self.items.partition_point(|&(v, _)| v < value);
        self.items.insert(idx, (value, weight));
        self.total_weight += weight;
        if idx < self.k {
            self.k += 1;
            self.sum_w_0_k += weight;
        }
        self.update_median_cursor();
    }

    /// Remove a previously pushed sample.
    ///
    /// Looks for an exact `(value, weight)` pair among the items equal to
    /// `value`; removing a sample that was never pushed is a usage error.
    pub fn remove(&mut self, value: f64, weight: f64) {
        let first = self.items.partition_point(|&(v, _)| v < value);
        let mut idx = first;
        while idx < self.items.len() && self.items[idx].0 == value && self.items[idx].1 != weight {
            idx += 1;
        }
        let found = idx < self.items.len() && self.items[idx].0 == value;
        debug_assert!(found, "remove({value}, {weight}): no such sample");
        if !found {
            // Tolerate a weight mismatch by dropping the first equal value.
            idx = first;
        }
        let (_, w) = self.items.remove(idx);
        self.total_weight -= w;
        if idx < self.k {
            self.k -= 1;
            self.sum_w_0_k -= w;
        }
        self.update_median_cursor();
    }

    /// Remove and return the smallest sample.
    pub fn pop(&mut self) -> Option<(f64, f64)> {
        if self.items.is_empty() {
            return None;
        }
        let (value, weight) = self.items.remove(0);
        self.total_weight -= weight;
        if self.k > 0 {
            self.k -= 1;
            self.sum_w_0_k -= weight;
        }
        self.update_median_cursor();
        Some((value, weight))
    }

    /// The lower weighted median of the stored samples.
    ///
    /// Must not be called on an empty calculator.
    #[inline]
    pub fn median(&self) -> f64 {
        debug_assert!(!self.items.is_empty(), "median of an empty multiset");
        self.items[self.k - 1].0
    }

    /// Restore the prefix invariant after a structural change:
    /// `sum_w_0_k >= total_weight / 2` and removing the last prefix item
    /// would break that.
    fn update_median_cursor(&mut self) {
        if self.items.is_empty() {
            self.k = 0;
            self.sum_w_0_k = 0.0;
            return;
        }
        let half = self.total_weight / 2.0;
        while self.k < self.items.len() && self.sum_w_0_k < half {
            self.sum_w_0_k += self.items[self.k].1;
            self.k += 1;
        }
        while self.k > 1 && self.sum_w_0_k - self.items[self.k - 1].1 >= half {
            self.k -= 1;
            self.sum_w_0_k -= self.items[self.k].1;
        }
        if self.k == 0 {
            // Degenerate all-zero weights; keep the cursor on the first item.
            self.k = 1;
            self.sum_w_0_k = self.items[0].1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

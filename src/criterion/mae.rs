//! Mean-absolute-error criterion.
//!
//! Absolute error has no cheap sufficient statistic: the minimizing leaf
//! prediction is the weighted median, and it moves every time a sample
//! crosses the boundary. Instead of per-output sums this criterion keeps a
//! pair of [`WeightedMedianCalculator`]s per output, one for each child,
//! and migrates samples between them as the boundary advances.
//!
//! Missing values are not supported: the trailing-block bookkeeping has no
//! median counterpart, and [`init_missing`](Criterion::init_missing) reports
//! a usage error for any nonzero count.

use ndarray::ArrayView2;

use crate::constraints::{MonotonicBounds, MonotonicConstraint};
use crate::median::WeightedMedianCalculator;

use super::{Criterion, CriterionError, NodeCursor, NodeSamples, NOT_BOUND};

/// Criterion minimizing weighted mean absolute deviation from the median.
pub struct MaeCriterion<'a> {
    samples: Option<NodeSamples<'a>>,
    cursor: NodeCursor,
    n_outputs: usize,
    left: Vec<WeightedMedianCalculator>,
    right: Vec<WeightedMedianCalculator>,
    node_medians: Vec<f64>,
}

impl<'a> MaeCriterion<'a> {
    /// Create a criterion for `n_outputs` targets over at most `n_samples`
    /// samples.
    pub fn new(n_outputs: usize, n_samples: usize) -> Result<Self, CriterionError> {
        assert!(n_outputs > 0, "n_outputs must be positive");
        let side = || -> Result<Vec<WeightedMedianCalculator>, CriterionError> {
            let mut calculators = Vec::new();
            calculators
                .try_reserve_exact(n_outputs)
                .map_err(|_| CriterionError::Allocation {
                    bytes: n_outputs * std::mem::size_of::<WeightedMedianCalculator>(),
                })?;
            for _ in 0..n_outputs {
                let mut calc = WeightedMedianCalculator::new();
                calc.try_reserve(n_samples).map_err(|_| CriterionError::Allocation {
                    bytes: n_samples * std::mem::size_of::<(f64, f64)>(),
                })?;
                calculators.push(calc);
            }
            Ok(calculators)
        };

        Ok(Self {
            samples: None,
            cursor: NodeCursor::default(),
            n_outputs,
            left: side()?,
            right: side()?,
            node_medians: vec![0.0; n_outputs],
        })
    }

    /// Cached per-output node medians, valid after `init`.
    pub fn node_medians(&self) -> &[f64] {
        &self.node_medians
    }

    /// Weighted absolute deviation of one child from per-output centers,
    /// normalized by the child weight and output count.
    fn absolute_deviation(
        &self,
        range: std::ops::Range<usize>,
        center_of: impl Fn(usize) -> f64,
        weight_sum: f64,
    ) -> f64 {
        let samples = self.samples.as_ref().expect(NOT_BOUND);
        let mut deviation = 0.0;
        for p in range {
            let w = samples.weight_at(p);
            for k in 0..self.n_outputs {
                deviation += w * (samples.target(p, k) - center_of(k)).abs();
            }
        }
        deviation / (weight_sum * self.n_outputs as f64)
    }
}

impl<'a> Criterion<'a> for MaeCriterion<'a> {
    fn init(
        &mut self,
        y: ArrayView2<'a, f64>,
        sample_weight: Option<&'a [f64]>,
        weighted_n_samples: f64,
        sample_indices: &'a [u32],
        start: usize,
        end: usize,
    ) -> Result<(), CriterionError> {
        debug_assert!(start <= end && end <= sample_indices.len());
        debug_assert_eq!(y.ncols(), self.n_outputs);

        let samples = NodeSamples::new(y, sample_weight, sample_indices);
        self.cursor.rebind(start, end, weighted_n_samples);

        let n_node = end - start;
        for k in 0..self.n_outputs {
            self.left[k].reset();
            self.right[k].reset();
            // Either side may end up holding the whole node.
            self.left[k]
                .try_reserve(n_node)
                .map_err(|_| CriterionError::Allocation {
                    bytes: n_node * std::mem::size_of::<(f64, f64)>(),
                })?;
            self.right[k]
                .try_reserve(n_node)
                .map_err(|_| CriterionError::Allocation {
                    bytes: n_node * std::mem::size_of::<(f64, f64)>(),
                })?;
        }

        let mut weighted_n_node_samples = 0.0;
        for p in start..end {
            let w = samples.weight_at(p);
            for k in 0..self.n_outputs {
                self.right[k].push(samples.target(p, k), w);
            }
            weighted_n_node_samples += w;
        }
        for k in 0..self.n_outputs {
            self.node_medians[k] = self.right[k].median();
        }

        self.cursor.weighted_n_node_samples = weighted_n_node_samples;
        self.samples = Some(samples);
        self.reset();
        Ok(())
    }

    fn init_missing(&mut self, n_missing: usize) -> Result<(), CriterionError> {
        if n_missing > 0 {
            return Err(CriterionError::MissingNotSupported { criterion: "MAE" });
        }
        self.cursor.n_missing = 0;
        self.cursor.weighted_n_missing = 0.0;
        Ok(())
    }

    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool) {
        self.cursor.missing_go_to_left = missing_go_to_left;
    }

    fn reset(&mut self) {
        self.cursor.pos = self.cursor.start;
        self.cursor.weighted_n_left = 0.0;
        self.cursor.weighted_n_right = self.cursor.weighted_n_node_samples;
        for k in 0..self.n_outputs {
            while let Some((value, weight)) = self.left[k].pop() {
                self.right[k].push(value, weight);
            }
        }
    }

    fn reverse_reset(&mut self) {
        self.cursor.pos = self.cursor.end;
        self.cursor.weighted_n_left = self.cursor.weighted_n_node_samples;
        self.cursor.weighted_n_right = 0.0;
        for k in 0..self.n_outputs {
            while let Some((value, weight)) = self.right[k].pop() {
                self.left[k].push(value, weight);
            }
        }
    }

    fn update(&mut self, new_pos: usize) {
        debug_assert!(new_pos <= self.cursor.end);

        let forward = self.cursor.update_is_forward(new_pos);
        if !forward {
            self.reverse_reset();
        }

        let n_outputs = self.n_outputs;
        let Self {
            samples,
            cursor,
            left,
            right,
            ..
        } = self;
        let samples = samples.as_ref().expect(NOT_BOUND);

        if forward {
            for p in cursor.pos..new_pos {
                let w = samples.weight_at(p);
                for k in 0..n_outputs {
                    let value = samples.target(p, k);
                    right[k].remove(value, w);
                    left[k].push(value, w);
                }
                cursor.weighted_n_left += w;
            }
        } else {
            for p in (new_pos..cursor.end).rev() {
                let w = samples.weight_at(p);
                for k in 0..n_outputs {
                    let value = samples.target(p, k);
                    left[k].remove(value, w);
                    right[k].push(value, w);
                }
                cursor.weighted_n_left -= w;
            }
        }

        cursor.weighted_n_right = cursor.weighted_n_node_samples - cursor.weighted_n_left;
        cursor.pos = new_pos;
    }

    fn node_impurity(&self) -> f64 {
        self.absolute_deviation(
            self.cursor.start..self.cursor.end,
            |k| self.node_medians[k],
            self.cursor.weighted_n_node_samples,
        )
    }

    fn children_impurity(&self) -> (f64, f64) {
        debug_assert!(self.cursor.weighted_n_left > 0.0 && self.cursor.weighted_n_right > 0.0);
        (
            self.absolute_deviation(
                self.cursor.start..self.cursor.pos,
                |k| self.left[k].median(),
                self.cursor.weighted_n_left,
            ),
            self.absolute_deviation(
                self.cursor.pos..self.cursor.end,
                |k| self.right[k].median(),
                self.cursor.weighted_n_right,
            ),
        )
    }

    /// Write the cached per-output node medians.
    fn node_value(&self, dest: &mut [f64]) {
        debug_assert!(dest.len() >= self.n_outputs);
        dest[..self.n_outputs].copy_from_slice(&self.node_medians);
    }

    fn clip_node_value(&self, dest: &mut [f64], lower: f64, upper: f64) {
        dest[0] = MonotonicBounds::new(lower, upper).clamp(dest[0]);
    }

    fn middle_value(&self) -> f64 {
        (self.left[0].median() + self.right[0].median()) / 2.0
    }

    fn check_monotonicity(
        &self,
        constraint: MonotonicConstraint,
        lower_bound: f64,
        upper_bound: f64,
    ) -> bool {
        let value_left = self.left[0].median();
        let value_right = self.right[0].median();
        constraint.holds(
            value_left,
            value_right,
            &MonotonicBounds::new(lower_bound, upper_bound),
        )
    }

    fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    fn n_node_samples(&self) -> usize {
        self.cursor.n_node_samples()
    }

    fn pos(&self) -> usize {
        self.cursor.pos
    }

    fn node_value_len(&self) -> usize {
        self.n_outputs
    }

    fn weighted_n_samples(&self) -> f64 {
        self.cursor.weighted_n_samples
    }

    fn weighted_n_node_samples(&self) -> f64 {
        self.cursor.weighted_n_node_samples
    }

    fn weighted_n_left(&self) -> f64 {
        self.cursor.weighted_n_left
    }

    fn weighted_n_right(&self) -> f64 {
        self.cursor.weighted_n_right
    }

    fn weighted_n_missing(&self) -> f64 {
        self.cursor.weighted_n_missing
    }
}

// ============================================================================
// Tests
// ============================================================================

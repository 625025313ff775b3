//! Classification criteria over per-class weighted count histograms.
//!
//! The histogram is stored flat as `n_outputs × max_n_classes` with a fixed
//! row stride; iteration always stops at the true class count of each
//! output, so padded slots stay zero and never enter an impurity.

use ndarray::ArrayView2;

use crate::constraints::{MonotonicBounds, MonotonicConstraint};

use super::{
    move_sums, try_zeroed, Criterion, CriterionError, NodeCursor, NodeSamples, NOT_BOUND,
};

// ============================================================================
// Impurity strategies
// ============================================================================

/// Impurity of a single output's class-count row.
///
/// Implementations see the weighted class counts of one output (already
/// truncated to that output's real class count) and the weight they sum to.
pub trait ClassImpurity {
    fn output_impurity(&self, class_sums: &[f64], total_weight: f64) -> f64;
}

/// Gini index: `1 − Σ_c (count_c / W)²`.
///
/// Fast to evaluate (no logarithms); the default split criterion in
/// CART-style trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gini;

impl ClassImpurity for Gini {
    #[inline]
    fn output_impurity(&self, class_sums: &[f64], total_weight: f64) -> f64 {
        let mut sq_count = 0.0;
        for &count in class_sums {
            sq_count += count * count;
        }
        1.0 - sq_count / (total_weight * total_weight)
    }
}

/// Shannon entropy: `−Σ_c p_c · ln(p_c)`, with empty classes contributing 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entropy;

impl ClassImpurity for Entropy {
    #[inline]
    fn output_impurity(&self, class_sums: &[f64], total_weight: f64) -> f64 {
        let mut entropy = 0.0;
        for &count in class_sums {
            if count > 0.0 {
                let p = count / total_weight;
                entropy -= p * p.ln();
            }
        }
        entropy
    }
}

// ============================================================================
// ClassificationCriterion
// ============================================================================

/// Criterion over per-output, per-class weighted count histograms.
///
/// Target values are class indices stored as floats; `y[i, k]` must be an
/// integer in `[0, n_classes[k])`.
pub struct ClassificationCriterion<'a, I: ClassImpurity> {
    samples: Option<NodeSamples<'a>>,
    cursor: NodeCursor,
    n_outputs: usize,
    n_classes: Vec<usize>,
    max_n_classes: usize,
    sum_total: Vec<f64>,
    sum_left: Vec<f64>,
    sum_right: Vec<f64>,
    sum_missing: Vec<f64>,
    impurity: I,
}

/// Gini-index classification criterion.
pub type GiniCriterion<'a> = ClassificationCriterion<'a, Gini>;

/// Entropy (information gain) classification criterion.
pub type EntropyCriterion<'a> = ClassificationCriterion<'a, Entropy>;

impl<'a, I: ClassImpurity + Default> ClassificationCriterion<'a, I> {
    /// Create a criterion for outputs with the given class counts.
    ///
    /// # Panics
    ///
    /// Panics if `n_classes` is empty or contains a zero.
    pub fn new(n_classes: Vec<usize>) -> Result<Self, CriterionError> {
        assert!(!n_classes.is_empty(), "n_classes must not be empty");
        assert!(
            n_classes.iter().all(|&c| c > 0),
            "every output needs at least one class"
        );

        let n_outputs = n_classes.len();
        let max_n_classes = n_classes.iter().copied().max().unwrap_or(0);
        let len = n_outputs * max_n_classes;

        Ok(Self {
            samples: None,
            cursor: NodeCursor::default(),
            n_outputs,
            n_classes,
            max_n_classes,
            sum_total: try_zeroed(len)?,
            sum_left: try_zeroed(len)?,
            sum_right: try_zeroed(len)?,
            sum_missing: try_zeroed(len)?,
            impurity: I::default(),
        })
    }
}

impl<'a, I: ClassImpurity> ClassificationCriterion<'a, I> {
    /// Per-output class counts.
    pub fn n_classes(&self) -> &[usize] {
        &self.n_classes
    }

    /// Row stride of the flat histograms (and of `node_value` output).
    pub fn value_stride(&self) -> usize {
        self.max_n_classes
    }

    /// Node-total histogram, flat `n_outputs × value_stride`.
    pub fn sum_total(&self) -> &[f64] {
        &self.sum_total
    }

    /// Left-child histogram at the current boundary.
    pub fn sum_left(&self) -> &[f64] {
        &self.sum_left
    }

    /// Right-child histogram at the current boundary.
    pub fn sum_right(&self) -> &[f64] {
        &self.sum_right
    }

    /// Missing-block histogram.
    pub fn sum_missing(&self) -> &[f64] {
        &self.sum_missing
    }

    /// Average an impurity strategy over the outputs of one histogram.
    fn histogram_impurity(&self, sums: &[f64], total_weight: f64) -> f64 {
        let mut impurity = 0.0;
        for k in 0..self.n_outputs {
            let row = &sums[k * self.max_n_classes..][..self.n_classes[k]];
            impurity += self.impurity.output_impurity(row, total_weight);
        }
        impurity / self.n_outputs as f64
    }
}

impl<'a, I: ClassImpurity> Criterion<'a> for ClassificationCriterion<'a, I> {
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
        self.sum_total.fill(0.0);
        self.sum_missing.fill(0.0);

        let stride = self.max_n_classes;
        let mut weighted_n_node_samples = 0.0;
        for p in start..end {
            let w = samples.weight_at(p);
            for k in 0..self.n_outputs {
                let class = samples.target(p, k) as usize;
                debug_assert!(class < self.n_classes[k]);
                self.sum_total[k * stride + class] += w;
            }
            weighted_n_node_samples += w;
        }

        self.cursor.weighted_n_node_samples = weighted_n_node_samples;
        self.samples = Some(samples);
        self.reset();
        Ok(())
    }

    fn init_missing(&mut self, n_missing: usize) -> Result<(), CriterionError> {
        debug_assert!(n_missing <= self.cursor.n_node_samples());
        self.cursor.n_missing = n_missing;
        self.cursor.weighted_n_missing = 0.0;
        self.sum_missing.fill(0.0);
        if n_missing == 0 {
            return Ok(());
        }

        let stride = self.max_n_classes;
        let n_outputs = self.n_outputs;
        let Self {
            samples,
            cursor,
            sum_missing,
            ..
        } = self;
        let samples = samples.as_ref().expect(NOT_BOUND);
        for p in cursor.end - n_missing..cursor.end {
            let w = samples.weight_at(p);
            for k in 0..n_outputs {
                let class = samples.target(p, k) as usize;
                sum_missing[k * stride + class] += w;
            }
            cursor.weighted_n_missing += w;
        }
        Ok(())
    }

    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool) {
        self.cursor.missing_go_to_left = missing_go_to_left;
    }

    fn reset(&mut self) {
        self.cursor.pos = self.cursor.start;
        let (w_left, w_right) = move_sums(
            &mut self.sum_left,
            &mut self.sum_right,
            &self.sum_total,
            &self.sum_missing,
            self.cursor.weighted_n_node_samples,
            self.cursor.weighted_n_missing,
            self.cursor.missing_go_to_left,
        );
        self.cursor.weighted_n_left = w_left;
        self.cursor.weighted_n_right = w_right;
    }

    fn reverse_reset(&mut self) {
        self.cursor.pos = self.cursor.end;
        let (w_right, w_left) = move_sums(
            &mut self.sum_right,
            &mut self.sum_left,
            &self.sum_total,
            &self.sum_missing,
            self.cursor.weighted_n_node_samples,
            self.cursor.weighted_n_missing,
            !self.cursor.missing_go_to_left,
        );
        self.cursor.weighted_n_left = w_left;
        self.cursor.weighted_n_right = w_right;
    }

    fn update(&mut self, new_pos: usize) {
        let end_non_missing = self.cursor.end_non_missing();
        debug_assert!(new_pos <= end_non_missing);

        let forward = self.cursor.update_is_forward(new_pos);
        if !forward {
            self.reverse_reset();
        }

        let stride = self.max_n_classes;
        let n_outputs = self.n_outputs;
        let Self {
            samples,
            cursor,
            sum_left,
            sum_right,
            sum_total,
            ..
        } = self;
        let samples = samples.as_ref().expect(NOT_BOUND);

        if forward {
            for p in cursor.pos..new_pos {
                let w = samples.weight_at(p);
                for k in 0..n_outputs {
                    let class = samples.target(p, k) as usize;
                    sum_left[k * stride + class] += w;
                }
                cursor.weighted_n_left += w;
            }
        } else {
            for p in (new_pos..end_non_missing).rev() {
                let w = samples.weight_at(p);
                for k in 0..n_outputs {
                    let class = samples.target(p, k) as usize;
                    sum_left[k * stride + class] -= w;
                }
                cursor.weighted_n_left -= w;
            }
        }

        for ((right, &total), &left) in sum_right.iter_mut().zip(&*sum_total).zip(&*sum_left) {
            *right = total - left;
        }
        cursor.weighted_n_right = cursor.weighted_n_node_samples - cursor.weighted_n_left;
        cursor.pos = new_pos;
    }

    fn node_impurity(&self) -> f64 {
        self.histogram_impurity(&self.sum_total, self.cursor.weighted_n_node_samples)
    }

    fn children_impurity(&self) -> (f64, f64) {
        debug_assert!(self.cursor.weighted_n_left > 0.0 && self.cursor.weighted_n_right > 0.0);
        (
            self.histogram_impurity(&self.sum_left, self.cursor.weighted_n_left),
            self.histogram_impurity(&self.sum_right, self.cursor.weighted_n_right),
        )
    }

    /// Write the per-class weighted proportions, one stride per output.
    fn node_value(&self, dest: &mut [f64]) {
        debug_assert!(dest.len() >= self.node_value_len());
        let weight = self.cursor.weighted_n_node_samples;
        for k in 0..self.n_outputs {
            for c in 0..self.n_classes[k] {
                let idx = k * self.max_n_classes + c;
                dest[idx] = self.sum_total[idx] / weight;
            }
        }
    }

    /// Clamp the class-0 proportion and re-project its complement.
    ///
    /// Only meaningful for a single binary output; other shapes are a usage
    /// error.
    fn clip_node_value(&self, dest: &mut [f64], lower: f64, upper: f64) {
        debug_assert!(
            self.n_outputs == 1 && self.n_classes[0] == 2,
            "clip_node_value requires a single binary output"
        );
        dest[0] = MonotonicBounds::new(lower, upper).clamp(dest[0]);
        dest[1] = 1.0 - dest[0];
    }

    fn middle_value(&self) -> f64 {
        debug_assert!(self.cursor.weighted_n_left > 0.0 && self.cursor.weighted_n_right > 0.0);
        (self.sum_left[0] / self.cursor.weighted_n_left
            + self.sum_right[0] / self.cursor.weighted_n_right)
            / 2.0
    }

    fn check_monotonicity(
        &self,
        constraint: MonotonicConstraint,
        lower_bound: f64,
        upper_bound: f64,
    ) -> bool {
        debug_assert!(self.cursor.weighted_n_left > 0.0 && self.cursor.weighted_n_right > 0.0);
        // Output-0 child value is the class-0 proportion.
        let value_left = self.sum_left[0] / self.cursor.weighted_n_left;
        let value_right = self.sum_right[0] / self.cursor.weighted_n_right;
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
        self.n_outputs * self.max_n_classes
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

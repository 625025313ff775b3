//! Huber loss criterion.
//!
//! Quadratic near the child mean, linear beyond `delta`, so large residuals
//! cannot dominate a split decision the way they do under squared error.
//!
//! Child impurities rescan their sample range on every call because the
//! piecewise loss has no sufficient statistic beyond the mean. A
//! running-moments approximation would trade that scan for drift near the
//! `|residual| = delta` seam; the exact form is kept here and callers
//! evaluate children once per chosen split.

use super::regression::{RegressionContext, RegressionCriterion, RegressionImpurity};
use super::ChildSide;

/// Huber impurity with threshold `delta`.
///
/// For residual `e = y − mean`: `0.5·e²` when `|e| ≤ delta`, else
/// `delta·(|e| − 0.5·delta)`; weighted, summed over outputs and samples,
/// normalized by `W · n_outputs`.
#[derive(Debug, Clone, Copy)]
pub struct Huber {
    delta: f64,
}

impl Huber {
    /// Create a Huber strategy with the given quadratic/linear threshold.
    ///
    /// # Panics
    ///
    /// Panics if `delta` is not strictly positive.
    pub fn new(delta: f64) -> Self {
        assert!(delta > 0.0, "Huber delta must be positive, got {}", delta);
        Self { delta }
    }

    /// The quadratic/linear threshold.
    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Loss of one residual.
    #[inline]
    fn residual_loss(&self, residual: f64) -> f64 {
        let abs = residual.abs();
        if abs <= self.delta {
            0.5 * residual * residual
        } else {
            self.delta * (abs - 0.5 * self.delta)
        }
    }

    /// Per-sample loss contribution `w · Σ_k loss(y_k − μ_k)`.
    #[inline]
    fn sample_loss(
        &self,
        w: f64,
        row: ndarray::ArrayView1<'_, f64>,
        y_sums: &[f64],
        weight_sum: f64,
    ) -> f64 {
        let mut term = 0.0;
        for (k, &y_ik) in row.iter().enumerate() {
            term += self.residual_loss(y_ik - y_sums[k] / weight_sum);
        }
        w * term
    }
}

impl Default for Huber {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RegressionImpurity for Huber {
    fn node_impurity(&self, ctx: &RegressionContext<'_>) -> f64 {
        let y_sums = ctx.sum_total();
        let weight_sum = ctx.weighted_n_node_samples();
        let mut loss = 0.0;
        ctx.for_each_node_sample(|w, row| {
            loss += self.sample_loss(w, row, y_sums, weight_sum);
        });
        loss / (weight_sum * ctx.n_outputs() as f64)
    }

    fn children_impurity(&self, ctx: &RegressionContext<'_>) -> (f64, f64) {
        let impurity_of = |side: ChildSide, y_sums: &[f64], weight_sum: f64| -> f64 {
            let mut loss = 0.0;
            ctx.for_each_child_sample(side, |w, row| {
                loss += self.sample_loss(w, row, y_sums, weight_sum);
            });
            loss / (weight_sum * ctx.n_outputs() as f64)
        };
        (
            impurity_of(ChildSide::Left, ctx.sum_left(), ctx.weighted_n_left()),
            impurity_of(ChildSide::Right, ctx.sum_right(), ctx.weighted_n_right()),
        )
    }

    // Proxy stays the default weighted-children form; there is no cheaper
    // closed form for the piecewise loss.
}

/// Huber-loss regression criterion.
pub type HuberCriterion<'a> = RegressionCriterion<'a, Huber>;

impl<'a> HuberCriterion<'a> {
    /// Create a Huber criterion with an explicit `delta`.
    pub fn with_delta(
        n_outputs: usize,
        n_samples: usize,
        delta: f64,
    ) -> Result<Self, super::CriterionError> {
        Self::with_kind(n_outputs, n_samples, Huber::new(delta))
    }
}

// ============================================================================
// Tests
// ============================================================================

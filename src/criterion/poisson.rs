//! Poisson deviance criterion.
//!
//! Requires non-negative targets. A child whose weighted target sum is not
//! strictly positive has an undefined deviance; such boundaries are reported
//! as unsplittable (`-inf` proxy, `+inf` child impurity) rather than as
//! errors, and the caller skips them.

use super::regression::{RegressionContext, RegressionCriterion, RegressionImpurity};
use super::ChildSide;

/// `x · ln(y)` with the `x = 0` limit taken as 0, even when `y = 0`.
#[inline]
pub(crate) fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

/// Half Poisson deviance impurity.
///
/// For a sample set with weighted mean `μ_k` per output, the impurity is
/// `Σ_k Σ_i w_i · xlogy(y_ik, y_ik / μ_k) / (W · n_outputs)`. The linear
/// deviance terms `μ − y` sum to zero around the mean and are omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poisson;

impl Poisson {
    /// Per-sample deviance contribution `w · Σ_k xlogy(y_k, y_k / μ_k)`.
    #[inline]
    fn sample_deviance(
        w: f64,
        row: ndarray::ArrayView1<'_, f64>,
        y_sums: &[f64],
        weight_sum: f64,
    ) -> f64 {
        let mut term = 0.0;
        for (k, &y_ik) in row.iter().enumerate() {
            debug_assert!(y_ik >= 0.0, "Poisson criterion requires y >= 0");
            let y_mean = y_sums[k] / weight_sum;
            term += xlogy(y_ik, y_ik / y_mean);
        }
        w * term
    }

    #[inline]
    fn has_empty_output(ctx: &RegressionContext<'_>, y_sums: &[f64]) -> bool {
        y_sums.iter().any(|&sum| sum <= ctx.epsilon())
    }
}

impl RegressionImpurity for Poisson {
    /// The deviance formula is total here: an output whose weighted sum is
    /// zero holds only `y = 0` samples, and each contributes `xlogy(0, _) = 0`.
    fn node_impurity(&self, ctx: &RegressionContext<'_>) -> f64 {
        let y_sums = ctx.sum_total();
        let weight_sum = ctx.weighted_n_node_samples();
        let mut loss = 0.0;
        ctx.for_each_node_sample(|w, row| {
            loss += Self::sample_deviance(w, row, y_sums, weight_sum);
        });
        loss / (weight_sum * ctx.n_outputs() as f64)
    }

    fn children_impurity(&self, ctx: &RegressionContext<'_>) -> (f64, f64) {
        let impurity_of = |side: ChildSide, y_sums: &[f64], weight_sum: f64| -> f64 {
            if Self::has_empty_output(ctx, y_sums) {
                return f64::INFINITY;
            }
            let mut loss = 0.0;
            ctx.for_each_child_sample(side, |w, row| {
                loss += Self::sample_deviance(w, row, y_sums, weight_sum);
            });
            loss / (weight_sum * ctx.n_outputs() as f64)
        };
        (
            impurity_of(ChildSide::Left, ctx.sum_left(), ctx.weighted_n_left()),
            impurity_of(ChildSide::Right, ctx.sum_right(), ctx.weighted_n_right()),
        )
    }

    /// `Σ_k sum_left_k · ln(mean_left_k) + sum_right_k · ln(mean_right_k)`,
    /// or `-inf` when either side has an output with no mass.
    fn proxy_impurity_improvement(&self, ctx: &RegressionContext<'_>) -> f64 {
        let mut proxy = 0.0;
        for k in 0..ctx.n_outputs() {
            let sum_left = ctx.sum_left()[k];
            let sum_right = ctx.sum_right()[k];
            if sum_left <= ctx.epsilon() || sum_right <= ctx.epsilon() {
                return f64::NEG_INFINITY;
            }
            let y_mean_left = sum_left / ctx.weighted_n_left();
            let y_mean_right = sum_right / ctx.weighted_n_right();
            proxy += sum_left * y_mean_left.ln() + sum_right * y_mean_right.ln();
        }
        proxy
    }
}

/// Half-Poisson-deviance regression criterion.
pub type PoissonCriterion<'a> = RegressionCriterion<'a, Poisson>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::Criterion;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn bind<'a>(criterion: &mut PoissonCriterion<'a>, y: &'a Array2<f64>, indices: &'a [u32]) {
        criterion
            .init(y.view(), None, indices.len() as f64, indices, 0, indices.len())
            .unwrap();
    }

    #[test]
    fn xlogy_limits() {
        assert_eq!(xlogy(0.0, 0.0), 0.0);
        assert_eq!(xlogy(0.0, 5.0), 0.0);
        assert_relative_eq!(xlogy(2.0, std::f64::consts::E), 2.0);
    }

    #[test]
    fn constant_targets_have_zero_deviance() {
        let y = array![[3.0], [3.0], [3.0]];
        let indices = [0u32, 1, 2];
        let mut criterion = PoissonCriterion::new(1, 3).unwrap();
        bind(&mut criterion, &y, &indices);
        assert_relative_eq!(criterion.node_impurity(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn all_zero_targets_are_a_pure_node() {
        // Zero mass means every sample is zero, and xlogy(0, _) = 0.
        let y = array![[0.0], [0.0], [0.0]];
        let indices = [0u32, 1, 2];
        let mut criterion = PoissonCriterion::new(1, 3).unwrap();
        bind(&mut criterion, &y, &indices);
        assert_eq!(criterion.node_impurity(), 0.0);
    }

    #[test]
    fn node_impurity_matches_direct_formula() {
        let y = array![[1.0], [2.0], [3.0], [6.0]];
        let indices = [0u32, 1, 2, 3];
        let mut criterion = PoissonCriterion::new(1, 4).unwrap();
        bind(&mut criterion, &y, &indices);

        let mean = 3.0;
        let expected: f64 = [1.0f64, 2.0, 3.0, 6.0]
            .iter()
            .map(|&v| v * (v / mean).ln())
            .sum::<f64>()
            / 4.0;
        assert_relative_eq!(criterion.node_impurity(), expected, max_relative = 1e-12);
    }

    #[test]
    fn zero_sum_side_forbids_the_split() {
        let y = array![[0.0], [0.0], [3.0], [3.0]];
        let indices = [0u32, 1, 2, 3];
        let mut criterion = PoissonCriterion::new(1, 4).unwrap();
        bind(&mut criterion, &y, &indices);

        criterion.update(2);
        assert_eq!(criterion.context().sum_left(), &[0.0]);
        assert_eq!(criterion.proxy_impurity_improvement(), f64::NEG_INFINITY);
        let (left, right) = criterion.children_impurity();
        assert_eq!(left, f64::INFINITY);
        assert!(right.is_finite());
    }

    #[test]
    fn positive_split_is_allowed_and_ranked() {
        let y = array![[1.0], [1.0], [9.0], [9.0]];
        let indices = [0u32, 1, 2, 3];
        let mut criterion = PoissonCriterion::new(1, 4).unwrap();
        bind(&mut criterion, &y, &indices);
        let parent = criterion.node_impurity();

        let mut best = (f64::NEG_INFINITY, 0);
        for pos in 1..4 {
            criterion.update(pos);
            let proxy = criterion.proxy_impurity_improvement();
            assert!(proxy.is_finite());
            if proxy > best.0 {
                best = (proxy, pos);
            }
        }
        assert_eq!(best.1, 2);

        criterion.update(2);
        let (left, right) = criterion.children_impurity();
        assert_relative_eq!(left, 0.0, epsilon = 1e-15);
        assert_relative_eq!(right, 0.0, epsilon = 1e-15);
        assert!(criterion.impurity_improvement(parent, left, right) > 0.0);
    }

    #[test]
    fn children_deviance_splits_cleanly() {
        let y = array![[1.0], [2.0], [4.0], [8.0]];
        let indices = [0u32, 1, 2, 3];
        let mut criterion = PoissonCriterion::new(1, 4).unwrap();
        bind(&mut criterion, &y, &indices);
        criterion.update(2);

        let (left, right) = criterion.children_impurity();
        let left_expected = (1.0f64 * (1.0f64 / 1.5).ln() + 2.0 * (2.0f64 / 1.5).ln()) / 2.0;
        let right_expected = (4.0f64 * (4.0f64 / 6.0).ln() + 8.0 * (8.0f64 / 6.0).ln()) / 2.0;
        assert_relative_eq!(left, left_expected, max_relative = 1e-12);
        assert_relative_eq!(right, right_expected, max_relative = 1e-12);
    }

    #[test]
    fn update_backward_keeps_sums_positive() {
        let y = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let indices = [0u32, 1, 2, 3, 4, 5];
        let mut criterion = PoissonCriterion::new(1, 6).unwrap();
        bind(&mut criterion, &y, &indices);

        // Jump near the end; internally walks back from the right.
        criterion.update(5);
        assert_relative_eq!(criterion.context().sum_left()[0], 15.0, max_relative = 1e-12);
        assert!(criterion.proxy_impurity_improvement().is_finite());
    }
}

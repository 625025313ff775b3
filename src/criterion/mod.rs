//! Split impurity criteria.
//!
//! A [`Criterion`] owns the sufficient statistics that make impurity cheap to
//! re-evaluate while a splitter sweeps a boundary across a node's samples.
//! The caller drives it through a fixed lifecycle:
//!
//! 1. [`init`](Criterion::init) binds the node's sample slice and rebuilds
//!    the node totals.
//! 2. [`init_missing`](Criterion::init_missing) declares how many trailing
//!    samples carry a missing value for the current feature, and
//!    [`set_missing_go_to_left`](Criterion::set_missing_go_to_left) picks the
//!    side that block is assigned to.
//! 3. [`reset`](Criterion::reset) places the boundary at the start, then
//!    [`update`](Criterion::update) moves it monotonically right. Each move
//!    touches only the samples between the old and new boundary (or steps in
//!    from the far end when that is closer), so a full sweep is O(n) overall.
//! 4. [`proxy_impurity_improvement`](Criterion::proxy_impurity_improvement)
//!    ranks candidate boundaries cheaply;
//!    [`impurity_improvement`](Criterion::impurity_improvement) produces the
//!    exact reported score once the best candidate is chosen.
//!
//! Concrete criteria come in two families: classification over per-class
//! weighted histograms ([`GiniCriterion`], [`EntropyCriterion`]) and
//! regression over per-output weighted sums ([`MseCriterion`],
//! [`FriedmanMseCriterion`], [`PoissonCriterion`], [`HuberCriterion`]),
//! plus [`MaeCriterion`], which tracks a streaming weighted median per
//! output instead of sums.
//!
//! Instances are `Send` but not shareable: a criterion is single-threaded by
//! design, and callers that split nodes in parallel own one instance per
//! worker.
//!
//! [`GiniCriterion`]: classification::GiniCriterion
//! [`EntropyCriterion`]: classification::EntropyCriterion
//! [`MseCriterion`]: regression::MseCriterion
//! [`FriedmanMseCriterion`]: regression::FriedmanMseCriterion
//! [`PoissonCriterion`]: poisson::PoissonCriterion
//! [`HuberCriterion`]: huber::HuberCriterion
//! [`MaeCriterion`]: mae::MaeCriterion

use ndarray::{ArrayView1, ArrayView2};

use crate::constraints::MonotonicConstraint;

pub mod classification;
pub mod huber;
pub mod mae;
pub mod poisson;
pub mod regression;

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by criterion lifecycle operations.
///
/// Everything else (impurity queries, boundary moves on well-formed state)
/// is total; ordering and range preconditions are debug assertions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CriterionError {
    /// The criterion cannot represent missing values.
    #[error("missing values are not supported by the {criterion} criterion")]
    MissingNotSupported { criterion: &'static str },

    /// Buffer growth failed; the instance is unchanged and reusable.
    #[error("failed to allocate criterion buffers ({bytes} bytes requested)")]
    Allocation { bytes: usize },
}

/// Allocate a zeroed f64 buffer, surfacing allocation failure.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<f64>, CriterionError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| CriterionError::Allocation {
        bytes: len * std::mem::size_of::<f64>(),
    })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

// ============================================================================
// ChildSide
// ============================================================================

/// Which child of the current boundary a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSide {
    Left,
    Right,
}

// ============================================================================
// Bound node inputs
// ============================================================================

/// The borrowed inputs of one node visit.
///
/// Rebound on every `init`; never mutated. Positions `p` index into
/// `indices`, which in turn selects rows of `y` and entries of the weight
/// vector. An absent weight vector means unit weights.
#[derive(Debug, Clone)]
pub(crate) struct NodeSamples<'a> {
    y: ArrayView2<'a, f64>,
    sample_weight: Option<&'a [f64]>,
    indices: &'a [u32],
}

impl<'a> NodeSamples<'a> {
    pub(crate) fn new(
        y: ArrayView2<'a, f64>,
        sample_weight: Option<&'a [f64]>,
        indices: &'a [u32],
    ) -> Self {
        debug_assert!(sample_weight.map_or(true, |w| w.len() == y.nrows()));
        Self {
            y,
            sample_weight,
            indices,
        }
    }

    /// Row of `y` for position `p`.
    #[inline]
    pub(crate) fn row(&self, p: usize) -> ArrayView1<'_, f64> {
        self.y.row(self.indices[p] as usize)
    }

    /// Target value of output `k` for position `p`.
    #[inline]
    pub(crate) fn target(&self, p: usize, k: usize) -> f64 {
        self.y[[self.indices[p] as usize, k]]
    }

    /// Sample weight for position `p` (1.0 when no weight vector is bound).
    #[inline]
    pub(crate) fn weight_at(&self, p: usize) -> f64 {
        match self.sample_weight {
            Some(w) => w[self.indices[p] as usize],
            None => 1.0,
        }
    }
}

// ============================================================================
// Running boundary state
// ============================================================================

/// Owned cursor and weight accounting, shared by every criterion family.
///
/// Invariant after any public call: `start <= pos <= end - n_missing` and
/// `weighted_n_left + weighted_n_right == weighted_n_node_samples`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NodeCursor {
    pub start: usize,
    pub end: usize,
    pub pos: usize,
    pub n_missing: usize,
    pub missing_go_to_left: bool,
    pub weighted_n_samples: f64,
    pub weighted_n_node_samples: f64,
    pub weighted_n_left: f64,
    pub weighted_n_right: f64,
    pub weighted_n_missing: f64,
}

impl NodeCursor {
    /// Point the cursor at a fresh node range.
    ///
    /// Clears missing-value state but keeps `missing_go_to_left`: the policy
    /// bit belongs to the caller and is rewritten per candidate evaluation.
    pub fn rebind(&mut self, start: usize, end: usize, weighted_n_samples: f64) {
        self.start = start;
        self.end = end;
        self.pos = start;
        self.n_missing = 0;
        self.weighted_n_samples = weighted_n_samples;
        self.weighted_n_node_samples = 0.0;
        self.weighted_n_left = 0.0;
        self.weighted_n_right = 0.0;
        self.weighted_n_missing = 0.0;
    }

    /// First position of the trailing missing block.
    #[inline]
    pub fn end_non_missing(&self) -> usize {
        self.end - self.n_missing
    }

    #[inline]
    pub fn n_node_samples(&self) -> usize {
        self.end - self.start
    }

    /// True when stepping forward from `pos` is no more work than stepping
    /// backward from the end of the non-missing range. A target behind the
    /// cursor (only reachable after an explicit `reverse_reset`) always goes
    /// backward.
    #[inline]
    pub fn update_is_forward(&self, new_pos: usize) -> bool {
        new_pos >= self.pos && new_pos - self.pos <= self.end_non_missing() - new_pos
    }
}

// ============================================================================
// Shared boundary placement
// ============================================================================

/// Distribute node totals between the two children at a boundary extreme.
///
/// Writes `dest` and `other` so that `dest + other == total`, with the
/// missing block landing in `dest` iff `put_missing_in_dest`. Returns the
/// `(dest, other)` weight pair. Both families use this for `reset` (dest =
/// left) and `reverse_reset` (dest = right, flag inverted).
pub(crate) fn move_sums(
    dest: &mut [f64],
    other: &mut [f64],
    total: &[f64],
    missing: &[f64],
    weighted_n_node_samples: f64,
    weighted_n_missing: f64,
    put_missing_in_dest: bool,
) -> (f64, f64) {
    debug_assert_eq!(dest.len(), other.len());
    debug_assert_eq!(dest.len(), total.len());
    debug_assert_eq!(dest.len(), missing.len());
    if put_missing_in_dest {
        dest.copy_from_slice(missing);
        for ((o, &t), &m) in other.iter_mut().zip(total).zip(missing) {
            *o = t - m;
        }
        (
            weighted_n_missing,
            weighted_n_node_samples - weighted_n_missing,
        )
    } else {
        dest.fill(0.0);
        other.copy_from_slice(total);
        (0.0, weighted_n_node_samples)
    }
}

pub(crate) const NOT_BOUND: &str = "Criterion::init must be called before use";

// ============================================================================
// Criterion
// ============================================================================

/// Incrementally updatable impurity statistics for one tree node.
///
/// All borrowed inputs live for `'a`; an instance is constructed once per
/// fit and rebound to many nodes via [`init`](Self::init).
///
/// Between two `init` calls the caller must keep `update` positions
/// non-decreasing and within `[pos, end - n_missing]`; violations are
/// debug-checked only. Query methods are pure functions of current state and
/// may be interleaved freely.
pub trait Criterion<'a> {
    /// Bind a node's sample slice and rebuild the node totals.
    ///
    /// The node's samples are `sample_indices[start..end]`;
    /// `weighted_n_samples` is the total weight of the whole training set
    /// and only enters the final improvement normalization. Ends with an
    /// implicit [`reset`](Self::reset).
    #[allow(clippy::too_many_arguments)]
    fn init(
        &mut self,
        y: ArrayView2<'a, f64>,
        sample_weight: Option<&'a [f64]>,
        weighted_n_samples: f64,
        sample_indices: &'a [u32],
        start: usize,
        end: usize,
    ) -> Result<(), CriterionError>;

    /// Declare the trailing `n_missing` samples of the node range as missing
    /// for the current feature and accumulate their totals.
    fn init_missing(&mut self, n_missing: usize) -> Result<(), CriterionError>;

    /// Choose the side the missing block is assigned to. Takes effect at the
    /// next [`reset`](Self::reset).
    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool);

    /// Place the boundary at `start`: left holds only the missing block (if
    /// assigned there), right holds everything else.
    fn reset(&mut self);

    /// Place the boundary at `end`: the mirror image of [`reset`](Self::reset).
    fn reverse_reset(&mut self);

    /// Advance the boundary to `new_pos`, updating child statistics from
    /// whichever end is nearer.
    fn update(&mut self, new_pos: usize);

    /// Impurity of the full node range.
    fn node_impurity(&self) -> f64;

    /// Impurities of the left and right children at the current boundary.
    fn children_impurity(&self) -> (f64, f64);

    /// Write the leaf prediction for this node into `dest`
    /// (length [`node_value_len`](Self::node_value_len)).
    fn node_value(&self, dest: &mut [f64]);

    /// Clamp a stored leaf prediction into `[lower, upper]`.
    fn clip_node_value(&self, dest: &mut [f64], lower: f64, upper: f64);

    /// Midpoint of the two child predictions for output 0.
    fn middle_value(&self) -> f64;

    /// Check the monotonicity constraint against the output-0 child values
    /// at the current boundary.
    fn check_monotonicity(
        &self,
        constraint: MonotonicConstraint,
        lower_bound: f64,
        upper_bound: f64,
    ) -> bool;

    /// Number of target outputs.
    fn n_outputs(&self) -> usize;

    /// Number of samples in the bound node range.
    fn n_node_samples(&self) -> usize;

    /// Current boundary position.
    fn pos(&self) -> usize;

    /// Required length of the `node_value` destination buffer.
    fn node_value_len(&self) -> usize;

    fn weighted_n_samples(&self) -> f64;
    fn weighted_n_node_samples(&self) -> f64;
    fn weighted_n_left(&self) -> f64;
    fn weighted_n_right(&self) -> f64;
    fn weighted_n_missing(&self) -> f64;

    /// A monotone stand-in for [`impurity_improvement`](Self::impurity_improvement),
    /// cheap enough to evaluate at every candidate boundary.
    ///
    /// Larger is better. The default weighs the child impurities; concrete
    /// criteria override it to skip divisions and logs.
    fn proxy_impurity_improvement(&self) -> f64 {
        let (impurity_left, impurity_right) = self.children_impurity();
        -self.weighted_n_right() * impurity_right - self.weighted_n_left() * impurity_left
    }

    /// The exact impurity decrease of the current boundary, normalized by
    /// the node's share of the total training weight.
    fn impurity_improvement(
        &self,
        impurity_parent: f64,
        impurity_left: f64,
        impurity_right: f64,
    ) -> f64 {
        let weighted_n_node = self.weighted_n_node_samples();
        (weighted_n_node / self.weighted_n_samples())
            * (impurity_parent
                - (self.weighted_n_right() / weighted_n_node) * impurity_right
                - (self.weighted_n_left() / weighted_n_node) * impurity_left)
    }
}

// ============================================================================
// Tests
// ============================================================================

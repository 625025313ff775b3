//! treesplit-criteria: impurity criteria for decision-tree induction.
//!
//! The inner loop of tree induction asks one question over and over: if the
//! split boundary moves by one more sample, what do the child impurities
//! become? Answering that from scratch is quadratic in node size. A
//! [`Criterion`] instead maintains running sufficient statistics (per-class
//! weighted histograms for classification, per-output weighted sums or
//! streaming medians for regression) so that each boundary move costs
//! amortized constant work.
//!
//! # Key Types
//!
//! - [`Criterion`] - The contract a split finder drives
//! - [`GiniCriterion`] / [`EntropyCriterion`] - Classification
//! - [`MseCriterion`] / [`FriedmanMseCriterion`] - Least-squares regression
//! - [`PoissonCriterion`] / [`HuberCriterion`] / [`MaeCriterion`] - Deviance,
//!   robust, and absolute-error regression
//! - [`CriterionParams`] - Serializable construction parameters + factory
//! - [`MonotonicConstraint`] - Monotonicity checks on candidate splits
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use treesplit_criteria::{Criterion, GiniCriterion};
//!
//! let y = array![[0.0], [0.0], [1.0], [1.0]];
//! let indices: Vec<u32> = vec![0, 1, 2, 3];
//!
//! let mut criterion = GiniCriterion::new(vec![2]).unwrap();
//! criterion.init(y.view(), None, 4.0, &indices, 0, 4).unwrap();
//! assert_eq!(criterion.node_impurity(), 0.5);
//!
//! // Move the boundary between the two classes: both children go pure.
//! criterion.update(2);
//! let (left, right) = criterion.children_impurity();
//! assert_eq!((left, right), (0.0, 0.0));
//! assert_eq!(criterion.impurity_improvement(0.5, left, right), 0.5);
//! ```
//!
//! # Weighted samples and missing values
//!
//! Every statistic is weighted; a missing weight vector means unit weights.
//! Samples whose current feature value is missing sit at the tail of the
//! node range: [`Criterion::init_missing`] accounts for them and
//! [`Criterion::set_missing_go_to_left`] assigns the whole block to one
//! child per candidate evaluation.

// Re-export approx traits for users who want to compare impurities
pub use approx;

pub mod constraints;
pub mod criterion;
pub mod median;
pub mod params;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use constraints::{MonotonicBounds, MonotonicConstraint};

pub use criterion::classification::{
    ClassImpurity, ClassificationCriterion, Entropy, EntropyCriterion, Gini, GiniCriterion,
};
pub use criterion::huber::{Huber, HuberCriterion};
pub use criterion::mae::MaeCriterion;
pub use criterion::poisson::{Poisson, PoissonCriterion};
pub use criterion::regression::{
    FriedmanMse, FriedmanMseCriterion, Mse, MseCriterion, RegressionContext, RegressionCriterion,
    RegressionImpurity,
};
pub use criterion::{ChildSide, Criterion, CriterionError};

pub use median::WeightedMedianCalculator;
pub use params::CriterionParams;

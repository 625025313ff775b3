//! Serializable criterion construction parameters.
//!
//! A criterion's cross-session identity is exactly its construction
//! parameters; node-visit state is transient and never persisted.
//! [`CriterionParams`] captures those parameters as plain data so a model
//! format can store which criterion a tree was grown with and rebuild an
//! equivalent instance after loading.

use serde::{Deserialize, Serialize};

use crate::criterion::classification::{EntropyCriterion, GiniCriterion};
use crate::criterion::huber::HuberCriterion;
use crate::criterion::mae::MaeCriterion;
use crate::criterion::poisson::PoissonCriterion;
use crate::criterion::regression::{FriedmanMseCriterion, MseCriterion};
use crate::criterion::{Criterion, CriterionError};

fn default_delta() -> f64 {
    1.0
}

/// Construction parameters for every built-in criterion.
///
/// # Example
///
/// ```
/// use treesplit_criteria::{Criterion, CriterionParams};
///
/// let params = CriterionParams::Huber {
///     n_outputs: 1,
///     n_samples: 100,
///     delta: 2.0,
/// };
/// let json = serde_json::to_string(&params).unwrap();
/// let restored: CriterionParams = serde_json::from_str(&json).unwrap();
/// assert_eq!(params, restored);
///
/// let criterion = restored.build().unwrap();
/// assert_eq!(criterion.n_outputs(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "criterion", rename_all = "snake_case")]
pub enum CriterionParams {
    /// Gini-index classification.
    Gini { n_classes: Vec<usize> },
    /// Entropy classification.
    Entropy { n_classes: Vec<usize> },
    /// Mean squared error regression.
    Mse { n_outputs: usize, n_samples: usize },
    /// MSE with Friedman's improvement score.
    FriedmanMse { n_outputs: usize, n_samples: usize },
    /// Half Poisson deviance regression.
    Poisson { n_outputs: usize, n_samples: usize },
    /// Huber-loss regression.
    Huber {
        n_outputs: usize,
        n_samples: usize,
        #[serde(default = "default_delta")]
        delta: f64,
    },
    /// Mean absolute error regression.
    Mae { n_outputs: usize, n_samples: usize },
}

impl CriterionParams {
    /// Stable identifier of the criterion kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gini { .. } => "gini",
            Self::Entropy { .. } => "entropy",
            Self::Mse { .. } => "mse",
            Self::FriedmanMse { .. } => "friedman_mse",
            Self::Poisson { .. } => "poisson",
            Self::Huber { .. } => "huber",
            Self::Mae { .. } => "mae",
        }
    }

    /// True for the classification family.
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::Gini { .. } | Self::Entropy { .. })
    }

    /// Number of target outputs this criterion expects.
    pub fn n_outputs(&self) -> usize {
        match self {
            Self::Gini { n_classes } | Self::Entropy { n_classes } => n_classes.len(),
            Self::Mse { n_outputs, .. }
            | Self::FriedmanMse { n_outputs, .. }
            | Self::Poisson { n_outputs, .. }
            | Self::Huber { n_outputs, .. }
            | Self::Mae { n_outputs, .. } => *n_outputs,
        }
    }

    /// Build a fresh criterion with these parameters.
    pub fn build<'a>(&self) -> Result<Box<dyn Criterion<'a> + 'a>, CriterionError> {
        Ok(match self {
            Self::Gini { n_classes } => Box::new(GiniCriterion::new(n_classes.clone())?),
            Self::Entropy { n_classes } => Box::new(EntropyCriterion::new(n_classes.clone())?),
            Self::Mse {
                n_outputs,
                n_samples,
            } => Box::new(MseCriterion::new(*n_outputs, *n_samples)?),
            Self::FriedmanMse {
                n_outputs,
                n_samples,
            } => Box::new(FriedmanMseCriterion::new(*n_outputs, *n_samples)?),
            Self::Poisson {
                n_outputs,
                n_samples,
            } => Box::new(PoissonCriterion::new(*n_outputs, *n_samples)?),
            Self::Huber {
                n_outputs,
                n_samples,
                delta,
            } => Box::new(HuberCriterion::with_delta(*n_outputs, *n_samples, *delta)?),
            Self::Mae {
                n_outputs,
                n_samples,
            } => Box::new(MaeCriterion::new(*n_outputs, *n_samples)?),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

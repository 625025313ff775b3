//! Shared fixtures for criterion integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use ndarray::{array, Array2};
use treesplit_criteria::{Criterion, CriterionParams};

/// Bind a criterion to the full index range of `y`, deriving the total
/// weight from the weight vector (or the sample count).
pub fn bind_full<'a, C: Criterion<'a> + ?Sized>(
    criterion: &mut C,
    y: &'a Array2<f64>,
    weights: Option<&'a [f64]>,
    indices: &'a [u32],
) {
    let weighted_n_samples = match weights {
        Some(w) => w.iter().sum(),
        None => indices.len() as f64,
    };
    criterion
        .init(y.view(), weights, weighted_n_samples, indices, 0, indices.len())
        .unwrap();
}

/// Identity index vector `[0, 1, .., n)`.
pub fn ascending_indices(n: usize) -> Vec<u32> {
    (0..n as u32).collect()
}

/// A target column usable by every criterion family: small non-negative
/// integers, so it reads as 3 classes, as counts, and as plain values.
pub fn shared_targets() -> Array2<f64> {
    array![
        [1.0],
        [0.0],
        [2.0],
        [1.0],
        [1.0],
        [2.0],
        [0.0],
        [2.0],
        [1.0],
        [0.0],
    ]
}

/// Non-uniform weights for [`shared_targets`].
pub fn shared_weights() -> Vec<f64> {
    vec![1.0, 2.0, 0.5, 1.0, 1.5, 1.0, 0.25, 2.0, 1.0, 0.75]
}

/// One parameter set per built-in criterion, sized for [`shared_targets`].
pub fn all_params() -> Vec<CriterionParams> {
    vec![
        CriterionParams::Gini {
            n_classes: vec![3],
        },
        CriterionParams::Entropy {
            n_classes: vec![3],
        },
        CriterionParams::Mse {
            n_outputs: 1,
            n_samples: 10,
        },
        CriterionParams::FriedmanMse {
            n_outputs: 1,
            n_samples: 10,
        },
        CriterionParams::Poisson {
            n_outputs: 1,
            n_samples: 10,
        },
        CriterionParams::Huber {
            n_outputs: 1,
            n_samples: 10,
            delta: 1.0,
        },
        CriterionParams::Mae {
            n_outputs: 1,
            n_samples: 10,
        },
    ]
}

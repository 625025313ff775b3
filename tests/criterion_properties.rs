//! Contract properties every criterion must satisfy.

mod common;

use approx::assert_relative_eq;
use common::{all_params, ascending_indices, bind_full, shared_targets, shared_weights};
use ndarray::array;
use rstest::rstest;
use treesplit_criteria::{
    Criterion, CriterionParams, GiniCriterion, MaeCriterion, MonotonicConstraint, MseCriterion,
};

fn each_criterion_case() -> Vec<CriterionParams> {
    all_params()
}

#[test]
fn weight_balance_holds_through_a_sweep() {
    let y = shared_targets();
    let weights = shared_weights();
    let indices = ascending_indices(y.nrows());

    for params in each_criterion_case() {
        let mut criterion = params.build().unwrap();
        bind_full(criterion.as_mut(), &y, Some(&weights), &indices);

        assert_relative_eq!(
            criterion.weighted_n_left() + criterion.weighted_n_right(),
            criterion.weighted_n_node_samples(),
            max_relative = 1e-12
        );
        for pos in 1..y.nrows() {
            criterion.update(pos);
            assert_relative_eq!(
                criterion.weighted_n_left() + criterion.weighted_n_right(),
                criterion.weighted_n_node_samples(),
                max_relative = 1e-12
            );
        }
    }
}

#[test]
fn sum_conservation_through_a_sweep() {
    let y = shared_targets();
    let weights = shared_weights();
    let indices = ascending_indices(y.nrows());

    let mut gini = GiniCriterion::new(vec![3]).unwrap();
    bind_full(&mut gini, &y, Some(&weights), &indices);
    let mut mse = MseCriterion::new(1, y.nrows()).unwrap();
    bind_full(&mut mse, &y, Some(&weights), &indices);

    for pos in 1..y.nrows() {
        gini.update(pos);
        for c in 0..3 {
            assert_relative_eq!(
                gini.sum_left()[c] + gini.sum_right()[c],
                gini.sum_total()[c],
                max_relative = 1e-12,
                epsilon = 1e-12
            );
        }

        mse.update(pos);
        assert_relative_eq!(
            mse.context().sum_left()[0] + mse.context().sum_right()[0],
            mse.context().sum_total()[0],
            max_relative = 1e-12
        );
    }
}

#[rstest]
#[case(3)]
#[case(5)]
#[case(8)]
#[case(9)]
fn single_jump_equals_stepping(#[case] target: usize) {
    let y = shared_targets();
    let weights = shared_weights();
    let indices = ascending_indices(y.nrows());

    for params in each_criterion_case() {
        let mut stepped = params.build().unwrap();
        bind_full(stepped.as_mut(), &y, Some(&weights), &indices);
        for pos in 1..=target {
            stepped.update(pos);
        }

        let mut jumped = params.build().unwrap();
        bind_full(jumped.as_mut(), &y, Some(&weights), &indices);
        jumped.update(target);

        assert_relative_eq!(
            stepped.weighted_n_left(),
            jumped.weighted_n_left(),
            max_relative = 1e-12
        );
        let (sl, sr) = stepped.children_impurity();
        let (jl, jr) = jumped.children_impurity();
        assert_relative_eq!(sl, jl, max_relative = 1e-12, epsilon = 1e-12);
        assert_relative_eq!(sr, jr, max_relative = 1e-12, epsilon = 1e-12);
    }
}

#[test]
fn proxy_and_exact_improvement_agree_on_the_best_split() {
    // Clearly separated target groups so the argmax is untied.
    let y = array![[1.0], [1.0], [1.0], [2.0], [9.0], [9.0], [10.0], [9.0]];
    let indices = ascending_indices(8);

    let params = [
        CriterionParams::Gini {
            n_classes: vec![11],
        },
        CriterionParams::Entropy {
            n_classes: vec![11],
        },
        CriterionParams::Mse {
            n_outputs: 1,
            n_samples: 8,
        },
        CriterionParams::FriedmanMse {
            n_outputs: 1,
            n_samples: 8,
        },
        CriterionParams::Poisson {
            n_outputs: 1,
            n_samples: 8,
        },
        CriterionParams::Huber {
            n_outputs: 1,
            n_samples: 8,
            delta: 1.0,
        },
        CriterionParams::Mae {
            n_outputs: 1,
            n_samples: 8,
        },
    ];

    for params in params {
        let mut criterion = params.build().unwrap();
        bind_full(criterion.as_mut(), &y, None, &indices);
        let parent = criterion.node_impurity();

        let mut best_proxy = (f64::NEG_INFINITY, 0);
        let mut best_exact = (f64::NEG_INFINITY, 0);
        for pos in 1..8 {
            criterion.update(pos);
            let proxy = criterion.proxy_impurity_improvement();
            let (left, right) = criterion.children_impurity();
            let exact = criterion.impurity_improvement(parent, left, right);
            if proxy > best_proxy.0 {
                best_proxy = (proxy, pos);
            }
            if exact > best_exact.0 {
                best_exact = (exact, pos);
            }
        }
        assert_eq!(
            best_proxy.1,
            best_exact.1,
            "proxy and exact disagree for {}",
            params.name()
        );
    }
}

#[test]
fn parent_value_is_weighted_average_of_children() {
    let y = shared_targets();
    let weights = shared_weights();
    let indices = ascending_indices(y.nrows());
    let split_at = 4;

    // Means (regression) and per-class proportions (classification) are
    // weighted averages under any two-way partition; medians are not.
    let decomposable: Vec<CriterionParams> = all_params()
        .into_iter()
        .filter(|p| p.name() != "mae")
        .collect();

    for params in decomposable {
        let mut parent = params.build().unwrap();
        bind_full(parent.as_mut(), &y, Some(&weights), &indices);
        let mut parent_value = vec![0.0; parent.node_value_len()];
        parent.node_value(&mut parent_value);

        let total_weight: f64 = weights.iter().sum();
        let mut left = params.build().unwrap();
        left.init(y.view(), Some(&weights), total_weight, &indices, 0, split_at)
            .unwrap();
        let mut right = params.build().unwrap();
        right
            .init(
                y.view(),
                Some(&weights),
                total_weight,
                &indices,
                split_at,
                y.nrows(),
            )
            .unwrap();

        let mut left_value = vec![0.0; left.node_value_len()];
        left.node_value(&mut left_value);
        let mut right_value = vec![0.0; right.node_value_len()];
        right.node_value(&mut right_value);

        let w_left = left.weighted_n_node_samples();
        let w_right = right.weighted_n_node_samples();
        for i in 0..parent_value.len() {
            let combined =
                (w_left * left_value[i] + w_right * right_value[i]) / (w_left + w_right);
            assert_relative_eq!(
                parent_value[i],
                combined,
                max_relative = 1e-12,
                epsilon = 1e-12
            );
        }
    }
}

#[rstest]
#[case::increasing(MonotonicConstraint::Increasing, true, false)]
#[case::none(MonotonicConstraint::None, true, true)]
#[case::decreasing(MonotonicConstraint::Decreasing, false, true)]
fn monotonicity_check_tracks_child_order(
    #[case] constraint: MonotonicConstraint,
    #[case] expect_on_ascending: bool,
    #[case] expect_on_descending: bool,
) {
    let ascending = array![[1.0], [2.0], [7.0], [8.0]];
    let descending = array![[8.0], [7.0], [2.0], [1.0]];
    let indices = ascending_indices(4);

    for (y, expected) in [
        (&ascending, expect_on_ascending),
        (&descending, expect_on_descending),
    ] {
        let mut mse = MseCriterion::new(1, 4).unwrap();
        bind_full(&mut mse, y, None, &indices);
        mse.update(2);
        assert_eq!(
            mse.check_monotonicity(constraint, f64::NEG_INFINITY, f64::INFINITY),
            expected
        );

        let mut mae = MaeCriterion::new(1, 4).unwrap();
        bind_full(&mut mae, y, None, &indices);
        mae.update(2);
        assert_eq!(
            mae.check_monotonicity(constraint, f64::NEG_INFINITY, f64::INFINITY),
            expected
        );
    }
}

#[test]
fn monotonicity_bounds_reject_out_of_range_children() {
    let y = array![[1.0], [2.0], [7.0], [8.0]];
    let indices = ascending_indices(4);
    let mut mse = MseCriterion::new(1, 4).unwrap();
    bind_full(&mut mse, &y, None, &indices);
    mse.update(2);

    // Child means are 1.5 and 7.5.
    assert!(mse.check_monotonicity(MonotonicConstraint::Increasing, 0.0, 10.0));
    assert!(!mse.check_monotonicity(MonotonicConstraint::Increasing, 2.0, 10.0));
    assert!(!mse.check_monotonicity(MonotonicConstraint::Increasing, 0.0, 5.0));
}

#[test]
fn missing_side_choice_matches_policy() {
    let y = shared_targets();
    let indices = ascending_indices(y.nrows());
    let n_missing = 2;

    // Every criterion that supports missing values.
    let supports_missing: Vec<CriterionParams> = all_params()
        .into_iter()
        .filter(|p| p.name() != "mae")
        .collect();

    for params in supports_missing {
        let mut criterion = params.build().unwrap();
        bind_full(criterion.as_mut(), &y, None, &indices);
        criterion.init_missing(n_missing).unwrap();
        assert_eq!(criterion.weighted_n_missing(), n_missing as f64);

        criterion.set_missing_go_to_left(true);
        criterion.reset();
        assert_eq!(
            criterion.weighted_n_left(),
            criterion.weighted_n_missing(),
            "missing-left reset for {}",
            params.name()
        );

        criterion.set_missing_go_to_left(false);
        criterion.reset();
        assert_eq!(criterion.weighted_n_left(), 0.0);
        assert_relative_eq!(
            criterion.weighted_n_left() + criterion.weighted_n_right(),
            criterion.weighted_n_node_samples(),
            max_relative = 1e-12
        );
    }
}

#[test]
fn mae_rejects_missing_but_other_criteria_accept() {
    let y = shared_targets();
    let indices = ascending_indices(y.nrows());

    for params in all_params() {
        let mut criterion = params.build().unwrap();
        bind_full(criterion.as_mut(), &y, None, &indices);
        let outcome = criterion.init_missing(1);
        if params.name() == "mae" {
            assert!(outcome.is_err());
        } else {
            assert!(outcome.is_ok());
        }
    }
}

#[test]
fn node_impurity_is_stable_across_boundary_motion() {
    let y = shared_targets();
    let weights = shared_weights();
    let indices = ascending_indices(y.nrows());

    for params in each_criterion_case() {
        let mut criterion = params.build().unwrap();
        bind_full(criterion.as_mut(), &y, Some(&weights), &indices);
        let before = criterion.node_impurity();
        for pos in [2, 5, 9] {
            criterion.update(pos);
        }
        criterion.reset();
        assert_relative_eq!(
            criterion.node_impurity(),
            before,
            max_relative = 1e-12,
            epsilon = 1e-12
        );
    }
}

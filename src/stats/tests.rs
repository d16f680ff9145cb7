// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use approx::assert_abs_diff_eq;

use super::*;

fn real(values: &[f32]) -> Vec<c32> {
    values.iter().map(|&v| c32::new(v, v)).collect()
}

#[test]
fn test_classical() {
    let values = real(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    let mask = vec![true; values.len()];
    let result = RobustEstimator::Classical.estimate(&values, &mask, 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, 4.0);
    assert_abs_diff_eq!(result.real_variance, 4.0);
    assert_abs_diff_eq!(result.imag_variance, 4.0);
    assert!(!result.real_imag_discrepant());
}

#[test]
fn test_real_and_imag_are_independent() {
    // Real part has a variance of 1, imaginary part 9.
    let values = vec![
        c32::new(1.0, 3.0),
        c32::new(-1.0, -3.0),
        c32::new(1.0, 3.0),
        c32::new(-1.0, -3.0),
    ];
    let mask = [true; 4];
    let result = RobustEstimator::Classical.estimate(&values, &mask, 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.real_variance, 1.0);
    assert_abs_diff_eq!(result.imag_variance, 9.0);
    assert_abs_diff_eq!(result.variance, 5.0);
    assert!(result.real_imag_discrepant());
}

#[test]
fn test_mask_excludes_values() {
    let values = real(&[1.0, -1.0, 1000.0, 1.0, -1.0]);
    let mask = [true, true, false, true, true];
    let result = RobustEstimator::Classical.estimate(&values, &mask, 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, 1.0);
}

#[test]
fn test_too_few_samples() {
    let values = real(&[1.0, 2.0, 3.0, 4.0]);
    let mask = [true, false, true, true];
    let result = RobustEstimator::Classical.estimate(&values, &mask, 5);
    assert!(!result.ok);

    let result = RobustEstimator::Classical.estimate(&values, &[false; 4], 2);
    assert!(!result.ok);
}

#[test]
fn test_chauvenet_rejects_only_the_outlier() {
    let mut plain = vec![];
    for i in 0..19 {
        plain.push(if i % 2 == 0 { 1.0 } else { -1.0 });
    }
    let mut with_outlier = plain.clone();
    with_outlier.insert(7, 50.0);

    let estimator = RobustEstimator::Chauvenet {
        max_iter: None,
        zscore: None,
    };
    let mask = vec![true; with_outlier.len()];
    let result = estimator.estimate(&real(&with_outlier), &mask, 2);
    let expected =
        RobustEstimator::Classical.estimate(&real(&plain), &vec![true; plain.len()], 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, expected.variance, epsilon = 1e-12);

    // With no iterations allowed, the outlier stays.
    let estimator = RobustEstimator::Chauvenet {
        max_iter: Some(0),
        zscore: None,
    };
    let result = estimator.estimate(&real(&with_outlier), &mask, 2);
    let classical = RobustEstimator::Classical.estimate(&real(&with_outlier), &mask, 2);
    assert_abs_diff_eq!(result.variance, classical.variance, epsilon = 1e-12);
    assert!(result.variance > expected.variance);
}

#[test]
fn test_chauvenet_identical_values() {
    let mut values = vec![3.0; 19];
    values.push(40.0);
    let mask = vec![true; values.len()];
    let estimator = RobustEstimator::Chauvenet {
        max_iter: None,
        zscore: None,
    };
    let result = estimator.estimate(&real(&values), &mask, 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, 0.0);
}

#[test]
fn test_chauvenet_zscore_override() {
    // A small z-score keeps rejecting until all remaining values are equal.
    let values = real(&[1.0, 1.0, 1.0, 2.0, 3.0]);
    let mask = [true; 5];
    let estimator = RobustEstimator::Chauvenet {
        max_iter: None,
        zscore: Some(0.1),
    };
    let result = estimator.estimate(&values, &mask, 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, 0.0);

    // A huge z-score never rejects anything.
    let estimator = RobustEstimator::Chauvenet {
        max_iter: None,
        zscore: Some(100.0),
    };
    let result = estimator.estimate(&values, &mask, 2);
    let classical = RobustEstimator::Classical.estimate(&values, &mask, 2);
    assert_abs_diff_eq!(result.variance, classical.variance);
}

#[test]
fn test_fit_to_half() {
    let values = real(&[-3.0, -1.0, 0.0, 1.0, 2.0, 10.0]);
    let mask = [true; 6];

    // Values <= 0: (-3)^2 + (-1)^2 + 0^2 over 3.
    let estimator = RobustEstimator::FitToHalf {
        center: FitToHalfCenter::Zero,
        lside: true,
    };
    let result = estimator.estimate(&values, &mask, 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, 10.0 / 3.0);

    // Values >= 0, the center value included on this side too.
    let estimator = RobustEstimator::FitToHalf {
        center: FitToHalfCenter::Zero,
        lside: false,
    };
    let result = estimator.estimate(&values, &mask, 2);
    assert_abs_diff_eq!(result.variance, 105.0 / 4.0);

    // Median of the values is 0.5.
    let estimator = RobustEstimator::FitToHalf {
        center: FitToHalfCenter::Median,
        lside: true,
    };
    let result = estimator.estimate(&values, &mask, 2);
    assert_abs_diff_eq!(result.variance, (12.25 + 2.25 + 0.25) / 3.0);

    // Mean of the values is 1.5.
    let estimator = RobustEstimator::FitToHalf {
        center: FitToHalfCenter::Mean,
        lside: false,
    };
    let result = estimator.estimate(&values, &mask, 2);
    assert_abs_diff_eq!(result.variance, (0.25 + 72.25) / 2.0);
}

#[test]
fn test_fit_to_half_ties_are_inclusive() {
    let values = real(&[1.0, 1.0, 1.0, 1.0]);
    let mask = [true; 4];
    for lside in [true, false] {
        let estimator = RobustEstimator::FitToHalf {
            center: FitToHalfCenter::Median,
            lside,
        };
        let result = estimator.estimate(&values, &mask, 2);
        assert!(result.ok);
        assert_abs_diff_eq!(result.variance, 0.0);
    }
}

#[test]
fn test_fit_to_half_empty_side() {
    let values = real(&[1.0, 2.0, 3.0]);
    let mask = [true; 3];
    let estimator = RobustEstimator::FitToHalf {
        center: FitToHalfCenter::Zero,
        lside: true,
    };
    assert!(!estimator.estimate(&values, &mask, 2).ok);
}

#[test]
fn test_hinges_fences() {
    // Q1 = 2, Q3 = 4, IQR = 2; a fence of 1 keeps [0, 6].
    let values = real(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 3.0, 2.0, 4.0]);
    let mask = vec![true; values.len()];
    let estimator = RobustEstimator::HingesFences { fence: Some(1.0) };
    let result = estimator.estimate(&values, &mask, 2);
    let kept = real(&[1.0, 2.0, 3.0, 4.0, 5.0, 3.0, 2.0, 4.0]);
    let expected = RobustEstimator::Classical.estimate(&kept, &vec![true; kept.len()], 2);
    assert!(result.ok);
    assert_abs_diff_eq!(result.variance, expected.variance, epsilon = 1e-12);

    // No fence is the classical estimator.
    let estimator = RobustEstimator::HingesFences { fence: None };
    let result = estimator.estimate(&values, &mask, 2);
    let classical = RobustEstimator::Classical.estimate(&values, &mask, 2);
    assert_abs_diff_eq!(result.variance, classical.variance);
}

#[test]
fn test_center_parsing() {
    assert_eq!(
        FitToHalfCenter::from_str("MEDIAN").unwrap(),
        FitToHalfCenter::Median
    );
    assert_eq!(FitToHalfCenter::Zero.to_string(), "zero");
    assert!(FitToHalfCenter::from_str("mode").is_err());
}

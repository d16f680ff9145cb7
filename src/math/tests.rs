// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_median_odd() {
    let mut v = [5.0_f64, 1.0, 3.0];
    assert_abs_diff_eq!(median_inplace(&mut v).unwrap(), 3.0);
}

#[test]
fn test_median_even() {
    let mut v = [4.0_f32, 1.0, 3.0, 2.0];
    assert_abs_diff_eq!(median_inplace(&mut v).unwrap(), 2.5);

    let mut v = [7.0_f32, 7.0];
    assert_abs_diff_eq!(median_inplace(&mut v).unwrap(), 7.0);
}

#[test]
fn test_median_empty() {
    let mut v: [f64; 0] = [];
    assert!(median_inplace(&mut v).is_none());
}

#[test]
fn test_quantiles() {
    let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_abs_diff_eq!(quantile_sorted(&sorted, 0.25).unwrap(), 2.0);
    assert_abs_diff_eq!(quantile_sorted(&sorted, 0.5).unwrap(), 3.0);
    assert_abs_diff_eq!(quantile_sorted(&sorted, 0.75).unwrap(), 4.0);

    let sorted = [1.0, 2.0, 3.0, 4.0];
    assert_abs_diff_eq!(quantile_sorted(&sorted, 0.25).unwrap(), 1.75);
    assert_abs_diff_eq!(quantile_sorted(&sorted, 0.75).unwrap(), 3.25);

    assert_abs_diff_eq!(quantile_sorted(&[9.0], 0.1).unwrap(), 9.0);
    assert!(quantile_sorted(&[], 0.5).is_none());
}

#[test]
fn test_mean_and_variance() {
    let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    let (mean, var) = mean_and_variance(values.iter().copied()).unwrap();
    assert_abs_diff_eq!(mean, 5.0);
    assert_abs_diff_eq!(var, 4.0);

    assert!(mean_and_variance(std::iter::empty()).is_none());
}

#[test]
fn test_inverse_normal_cdf() {
    assert_abs_diff_eq!(inverse_normal_cdf(0.5), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(inverse_normal_cdf(0.975), 1.959_963_985, epsilon = 1e-7);
    assert_abs_diff_eq!(inverse_normal_cdf(0.025), -1.959_963_985, epsilon = 1e-7);
    // Tail regions.
    assert_abs_diff_eq!(inverse_normal_cdf(0.999), 3.090_232_306, epsilon = 1e-7);
    assert_abs_diff_eq!(inverse_normal_cdf(0.001), -3.090_232_306, epsilon = 1e-7);
    assert!(inverse_normal_cdf(0.0).is_infinite());
    assert!(inverse_normal_cdf(1.0).is_infinite());
}

#[test]
fn test_chauvenet_criterion() {
    // For 10 samples, P(|Z| > z) = 0.05 => z = 1.96.
    assert_abs_diff_eq!(chauvenet_criterion(10), 1.959_963_985, epsilon = 1e-7);
    // Larger samples tolerate larger deviations.
    assert!(chauvenet_criterion(1000) > chauvenet_criterion(20));
    assert!(chauvenet_criterion(1).is_infinite());
}

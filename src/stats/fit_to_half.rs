// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::FitToHalfCenter;
use crate::math::{mean_and_variance, median_inplace};

/// The variance of the distribution made by reflecting the values on one side
/// of the center about the center. Values equal to the center belong to both
/// sides. `None` if the chosen side is empty.
pub(super) fn variance(values: &mut [f64], center: FitToHalfCenter, lside: bool) -> Option<f64> {
    let center = match center {
        FitToHalfCenter::Mean => mean_and_variance(values.iter().copied())?.0,
        FitToHalfCenter::Median => median_inplace(values)?,
        FitToHalfCenter::Zero => 0.0,
    };

    let (n, sum_sq) = values
        .iter()
        .filter(|&&v| if lside { v <= center } else { v >= center })
        .fold((0_usize, 0.0), |(n, acc), v| {
            (n + 1, acc + (v - center) * (v - center))
        });
    if n == 0 {
        None
    } else {
        // The reflected distribution has 2n values with a mean of `center`.
        Some(sum_sq / n as f64)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::cmp::Ordering;

use crate::math::{mean_and_variance, quantile_sorted};

/// Population variance of the values inside `[Q1 - fence * IQR, Q3 + fence *
/// IQR]`.
pub(super) fn variance(values: &mut [f64], fence: f64) -> Option<f64> {
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let q1 = quantile_sorted(values, 0.25)?;
    let q3 = quantile_sorted(values, 0.75)?;
    let iqr = q3 - q1;
    let (low, high) = (q1 - fence * iqr, q3 + fence * iqr);

    mean_and_variance(
        values
            .iter()
            .copied()
            .filter(|v| (low..=high).contains(v)),
    )
    .map(|(_, var)| var)
}

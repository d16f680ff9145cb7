// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use log::trace;

use crate::math::{chauvenet_criterion, mean_and_variance};

/// Population variance after iteratively rejecting the single most outlying
/// value, for as long as its z-score exceeds the criterion. Rejected values
/// are removed from `values`.
pub(super) fn variance(
    values: &mut Vec<f64>,
    max_iter: Option<u32>,
    zscore: Option<f64>,
) -> Option<f64> {
    let mut num_iter = 0;
    loop {
        let (mean, var) = mean_and_variance(values.iter().copied())?;
        if var == 0.0 || max_iter.map(|max| num_iter >= max).unwrap_or(false) {
            return Some(var);
        }

        let criterion = zscore.unwrap_or_else(|| chauvenet_criterion(values.len()));
        let sd = var.sqrt();
        let (i_worst, worst_dev) = values
            .iter()
            .map(|v| (v - mean).abs())
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(i_acc, acc), (i, dev)| {
                if dev > acc {
                    (i, dev)
                } else {
                    (i_acc, acc)
                }
            });
        if worst_dev / sd <= criterion {
            return Some(var);
        }

        trace!(
            "Rejecting value with z-score {} > {criterion} ({} values remain)",
            worst_dev / sd,
            values.len() - 1
        );
        values.swap_remove(i_worst);
        num_iter += 1;
    }
}

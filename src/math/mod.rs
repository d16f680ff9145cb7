// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use num_traits::Float;

fn total_cmp<F: Float>(a: &F, b: &F) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// The median of the supplied values. The slice is reordered. For an even
/// number of values, the mean of the two middle values is returned. An empty
/// slice has no median.
pub(crate) fn median_inplace<F: Float>(values: &mut [F]) -> Option<F> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        Some(upper)
    } else {
        // The largest value in the lower partition is the other middle value.
        let lower = lower
            .iter()
            .copied()
            .fold(F::neg_infinity(), |acc, v| if v > acc { v } else { acc });
        Some((lower + upper) / (F::one() + F::one()))
    }
}

/// The `q`th quantile (0 <= q <= 1) of *sorted* values, linearly
/// interpolating between the closest order statistics.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    match sorted {
        [] => None,
        [v] => Some(*v),
        _ => {
            let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
        }
    }
}

/// The mean and population variance of the values. `None` if there are no
/// values.
pub(crate) fn mean_and_variance<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let (n, sum) = iter.clone().fold((0_usize, 0.0), |(n, s), v| (n + 1, s + v));
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    let sum_sq = iter.fold(0.0, |acc, v| acc + (v - mean) * (v - mean));
    Some((mean, sum_sq / n as f64))
}

/// The inverse of the standard normal cumulative distribution function,
/// using Acklam's rational approximation (relative error < 1.2e-9).
pub(crate) fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// Chauvenet's criterion: the absolute z-score beyond which a sample drawn
/// from `n` normally-distributed samples is expected to occur fewer than half
/// a time, i.e. `n * P(|Z| > z) = 0.5`.
pub(crate) fn chauvenet_criterion(n: usize) -> f64 {
    if n < 2 {
        return f64::INFINITY;
    }
    inverse_normal_cdf(1.0 - 0.25 / n as f64)
}

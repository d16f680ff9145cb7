// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Variance estimators.
//!
//! Each estimator works on one part (real or imaginary) of the usable samples
//! of an aggregation unit at a time; the variance of the unit is the mean of
//! the two part variances.

mod chauvenet;
mod classical;
mod fit_to_half;
mod hinges_fences;
#[cfg(test)]
mod tests;

use num_complex::Complex32 as c32;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::constants::REAL_IMAG_VARIANCE_TOLERANCE;

/// The value about which the fit-to-half estimator measures dispersion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FitToHalfCenter {
    Mean,
    Median,
    Zero,
}

/// A variance estimator. Chosen once, then used for every aggregation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum RobustEstimator {
    /// The population variance of all usable samples.
    Classical,

    /// Iteratively reject the most outlying sample while its z-score exceeds
    /// Chauvenet's criterion (or `zscore`, if given).
    Chauvenet {
        /// `None` means iterate until nothing more is rejected.
        max_iter: Option<u32>,
        zscore: Option<f64>,
    },

    /// The dispersion of only the samples on one side of a center value.
    FitToHalf {
        center: FitToHalfCenter,
        /// Use the samples <= the center (otherwise >= the center).
        lside: bool,
    },

    /// The population variance of samples within the fences
    /// `[Q1 - fence * IQR, Q3 + fence * IQR]`. With no fence, this is the
    /// classical estimator.
    HingesFences { fence: Option<f64> },
}

impl std::fmt::Display for RobustEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RobustEstimator::Classical => write!(f, "classical"),
            RobustEstimator::Chauvenet { max_iter, zscore } => {
                write!(f, "Chauvenet (max iterations: ")?;
                match max_iter {
                    Some(n) => write!(f, "{n}")?,
                    None => write!(f, "until convergence")?,
                }
                match zscore {
                    Some(z) => write!(f, ", z-score: {z})"),
                    None => write!(f, ", z-score: Chauvenet's criterion)"),
                }
            }
            RobustEstimator::FitToHalf { center, lside } => write!(
                f,
                "fit-to-half (center: {center}, using values {} the center)",
                if *lside { "<=" } else { ">=" }
            ),
            RobustEstimator::HingesFences { fence: Some(fence) } => {
                write!(f, "hinges-fences (fence: {fence})")
            }
            RobustEstimator::HingesFences { fence: None } => {
                write!(f, "hinges-fences (no fence; classical)")
            }
        }
    }
}

/// The result of estimating the variance of one aggregation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceEstimate {
    /// The mean of the real- and imaginary-part variances. Not meaningful if
    /// `ok` is false.
    pub variance: f64,

    /// False if there were too few usable samples.
    pub ok: bool,

    pub real_variance: f64,
    pub imag_variance: f64,
}

impl VarianceEstimate {
    fn insufficient() -> VarianceEstimate {
        VarianceEstimate {
            variance: 0.0,
            ok: false,
            real_variance: 0.0,
            imag_variance: 0.0,
        }
    }

    /// Whether the real-part variance differs from the imaginary-part
    /// variance by more than the tolerance (or the imaginary part has no
    /// variance).
    pub fn real_imag_discrepant(&self) -> bool {
        self.imag_variance == 0.0
            || (self.real_variance / self.imag_variance - 1.0).abs()
                > REAL_IMAG_VARIANCE_TOLERANCE
    }
}

impl RobustEstimator {
    /// Estimate the variance of the `values` whose corresponding `mask` value
    /// is true. Fewer than `min_samp` usable values gives a result that is not
    /// ok.
    pub fn estimate(&self, values: &[c32], mask: &[bool], min_samp: usize) -> VarianceEstimate {
        let (mut re, mut im): (Vec<f64>, Vec<f64>) = values
            .iter()
            .zip(mask)
            .filter(|&(_, &usable)| usable)
            .map(|(v, _)| (f64::from(v.re), f64::from(v.im)))
            .unzip();

        if re.is_empty() || re.len() < min_samp {
            return VarianceEstimate::insufficient();
        }

        match (self.estimate_part(&mut re), self.estimate_part(&mut im)) {
            (Some(real_variance), Some(imag_variance)) => VarianceEstimate {
                variance: (real_variance + imag_variance) / 2.0,
                ok: true,
                real_variance,
                imag_variance,
            },
            _ => VarianceEstimate::insufficient(),
        }
    }

    /// Estimate the variance of real numbers. The values may be reordered or
    /// truncated.
    fn estimate_part(&self, values: &mut Vec<f64>) -> Option<f64> {
        match self {
            RobustEstimator::Classical | RobustEstimator::HingesFences { fence: None } => {
                classical::variance(values)
            }
            RobustEstimator::Chauvenet { max_iter, zscore } => {
                chauvenet::variance(values, *max_iter, *zscore)
            }
            RobustEstimator::FitToHalf { center, lside } => {
                fit_to_half::variance(values, *center, *lside)
            }
            RobustEstimator::HingesFences { fence: Some(fence) } => {
                hinges_fences::variance(values, *fence)
            }
        }
    }
}

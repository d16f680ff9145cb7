// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Statistics are accumulated in double precision; only the values handed back
through the accessor surface are demoted to single precision.
 */

/// The smallest number of usable samples a unit may have before its variance
/// is considered meaningful. Also the default for `minsamp`.
pub const DEFAULT_MIN_SAMP: usize = 2;

/// The value given to sigma when the corresponding weight is 0 (otherwise it
/// would be infinite).
pub const SIGMA_FOR_ZERO_WEIGHT: f32 = -1.0;

/// The fraction by which the real-part variance of a unit must differ from
/// its imaginary-part variance before it is counted as discrepant.
pub const REAL_IMAG_VARIANCE_TOLERANCE: f64 = 0.5;

/// The keyword that requests one channel bin per spectral window.
pub const CHANBIN_WHOLE_SPW: &str = "spw";

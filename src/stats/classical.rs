// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::math::mean_and_variance;

/// Population variance.
pub(super) fn variance(values: &[f64]) -> Option<f64> {
    mean_and_variance(values.iter().copied()).map(|(_, var)| var)
}

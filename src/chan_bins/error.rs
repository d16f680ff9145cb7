// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::unit_parsing::UnitParseError;

#[derive(Error, Debug)]
pub enum ChanBinError {
    #[error("Channel bin width must be positive; got {0}")]
    NonPositiveWidth(i64),

    #[error("Channel bin frequency width must be positive; got {0} Hz")]
    NonPositiveFreqWidth(f64),

    #[error("If specified as a quantity, the channel bin width must have frequency units; '{0}' does not")]
    NotAFrequency(String),

    #[error("Spectral window {0} has no channels")]
    NoChannels(usize),

    #[error(transparent)]
    Parse(#[from] UnitParseError),
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from resolving the configuration.

use thiserror::Error;

use super::DataColumn;
use crate::{chan_bins::ChanBinError, source::VisColumn, unit_parsing::UnitParseError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("minsamp must be at least 2; got {0}")]
    MinSampTooSmall(i64),

    #[error("wtrange must be empty or have exactly 2 values; got {0}")]
    WtRangeLength(usize),

    #[error("wtrange values must be non-negative; got {0:?}")]
    WtRangeNegative(Vec<f64>),

    #[error("wtrange values must be distinct; got {0:?}")]
    WtRangeNotDistinct(Vec<f64>),

    #[error("Unsupported datacolumn '{0}'; supported values are corrected, data, residual and residual_data")]
    UnknownDataColumn(String),

    #[error("datacolumn '{datacolumn}' requires the {column} column, which the source doesn't have")]
    MissingColumn {
        datacolumn: DataColumn,
        column: VisColumn,
    },

    #[error("Unsupported statalg '{0}'; supported values are classic, chauvenet, fit-half and hinges-fences")]
    UnknownStatAlg(String),

    #[error("Unsupported center '{0}'; supported values are mean, median and zero")]
    UnknownCenter(String),

    #[error("Unsupported timealign '{0}'; supported values are center and trailing")]
    UnknownTimeAlign(String),

    #[error("zscore must be positive, or negative to use Chauvenet's criterion; got {0}")]
    BadZScore(f64),

    #[error("timebin must be positive; got {0}")]
    NonPositiveTimeBin(String),

    #[error("timebin must be specified when slidetimebin is true")]
    TimeBinRequired,

    #[error("Could not parse fitspw '{input}': {reason}")]
    FitSpw { input: String, reason: String },

    #[error("fitspw refers to spectral window {0}, which the source doesn't have")]
    FitSpwUnknownSpw(usize),

    #[error("fitspw refers to channel {chan} of spectral window {spw}, but it only has {num_chans} channels")]
    FitSpwChanOutOfRange {
        spw: usize,
        chan: usize,
        num_chans: usize,
    },

    #[error(transparent)]
    ChanBin(#[from] ChanBinError),

    #[error(transparent)]
    UnitParse(#[from] UnitParseError),
}

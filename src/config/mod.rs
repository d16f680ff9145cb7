// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! User-facing settings, and their validation into parameters.
//!
//! [`StatWtArgs`] is the raw key/value record; it can be deserialised from a
//! file (e.g. TOML or JSON) or filled in code. [`StatWtArgs::parse`] resolves
//! it against a source into [`StatWtParams`], which never changes afterwards.

mod error;
mod fitspw;

pub use error::ConfigError;
pub(crate) use fitspw::format_chan_ranges;

use std::str::FromStr;

use hifitime::Duration;
use indexmap::IndexMap;
use log::{debug, warn};
use ndarray::prelude::*;
use num_complex::Complex32 as c32;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::{
    aggregate::{TimeAlign, TimeBin},
    chan_bins::{BinMap, ChanBinPolicy},
    constants::DEFAULT_MIN_SAMP,
    source::{SampleSource, SourceError, VisColumn},
    stats::{FitToHalfCenter, RobustEstimator},
    unit_parsing::parse_time,
};

/// The visibilities that feed the variance estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
pub enum DataColumn {
    #[strum(serialize = "corrected")]
    Corrected,

    #[strum(serialize = "data")]
    Data,

    /// Corrected minus model.
    #[strum(serialize = "residual")]
    Residual,

    /// Data minus model.
    #[strum(serialize = "residual_data")]
    ResidualData,
}

impl DataColumn {
    /// Case-insensitive; any prefix of a column name is accepted, with
    /// "residual" preferred over "residual_data" for ambiguous prefixes.
    pub fn parse(s: &str) -> Result<DataColumn, ConfigError> {
        let lower = s.trim().to_lowercase();
        if lower.is_empty() {
            return Err(ConfigError::UnknownDataColumn(s.to_string()));
        }
        [
            (DataColumn::Corrected, "corrected"),
            (DataColumn::Data, "data"),
            (DataColumn::Residual, "residual"),
            (DataColumn::ResidualData, "residual_data"),
        ]
        .into_iter()
        .find(|(_, name)| name.starts_with(&lower))
        .map(|(c, _)| c)
        .ok_or_else(|| ConfigError::UnknownDataColumn(s.to_string()))
    }

    /// Whether the sigmas are derived from the new weights.
    pub fn must_compute_sigma(self) -> bool {
        matches!(self, DataColumn::Data | DataColumn::ResidualData)
    }

    /// The source column this must be derived from (other than the model).
    pub fn required_column(self) -> VisColumn {
        match self {
            DataColumn::Corrected | DataColumn::Residual => VisColumn::Corrected,
            DataColumn::Data | DataColumn::ResidualData => VisColumn::Data,
        }
    }

    /// The samples of the current subchunk of the source. A missing model is
    /// treated as zero.
    pub fn samples_rfp(self, source: &dyn SampleSource) -> Result<Array3<c32>, SourceError> {
        let column = self.required_column();
        let vis = source
            .vis_rfp(column)
            .ok_or(SourceError::MissingColumn(column))?;
        match self {
            DataColumn::Corrected | DataColumn::Data => Ok(vis.to_owned()),
            DataColumn::Residual | DataColumn::ResidualData => {
                match source.vis_rfp(VisColumn::Model) {
                    Some(model) if model.dim() == vis.dim() => Ok(&vis - &model),
                    Some(model) => Err(SourceError::BadShape {
                        chunk: source.chunk_index(),
                        subchunk: source.subchunk_index(),
                        what: "model data",
                        expected: vis.shape().to_vec(),
                        got: model.shape().to_vec(),
                    }),
                    None => Ok(vis.to_owned()),
                }
            }
        }
    }
}

/// A channel bin width; either a number of channels or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChanBinArg {
    Int(i64),
    Str(String),
}

/// A time bin width; a number of timestamps, a number of seconds, or a
/// string with a time unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBinArg {
    Int(i64),
    Float(f64),
    Str(String),
}

/// How samples are aggregated into units.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationMode {
    /// Disjoint blocks. With no time bin, each chunk is a single block.
    Block { time_bin: Option<TimeBin> },

    /// A window around each timestamp.
    Sliding { time_bin: TimeBin, align: TimeAlign },
}

/// Arguments controlling the reweighting. All fields are optional; see the
/// field docs for the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatWtArgs {
    /// Channel bin width. An integer is a number of channels, a string may be
    /// "spw" (each spectral window is one bin) or a frequency (e.g. "200kHz").
    /// The default is "spw".
    pub chanbin: Option<ChanBinArg>,

    /// The minimum number of usable samples for a unit's variance to be
    /// meaningful. Must be at least 2, the default.
    pub minsamp: Option<i64>,

    /// If this contains "corr", polarisations are combined into a single
    /// population.
    pub combine: Option<String>,

    /// Accepted weights; units with weights outside this range are flagged.
    /// Either empty or two distinct non-negative values.
    pub wtrange: Vec<f64>,

    /// If true, the channels of `fitspw` are excluded from the estimation.
    /// Otherwise, only those channels are used.
    pub excludechans: bool,

    /// Channel selection for estimation, e.g. "0:0~9;20~29,1".
    pub fitspw: Option<String>,

    /// One of corrected (default), data, residual or residual_data.
    pub datacolumn: Option<String>,

    /// Use sliding windows rather than blocks.
    pub slidetimebin: bool,

    /// The width of a block or window. An integer is a number of timestamps,
    /// a float is seconds, and a string is a time (e.g. "30s", "2min").
    pub timebin: Option<TimeBinArg>,

    /// Sliding window alignment; center (default) or trailing.
    pub timealign: Option<String>,

    /// One of classic (default), chauvenet, fit-half or hinges-fences.
    pub statalg: Option<String>,

    /// Chauvenet: maximum number of rejection iterations. Negative (the
    /// default) means iterate to convergence.
    pub maxiter: Option<i64>,

    /// Chauvenet: the z-score beyond which samples are rejected. Negative
    /// (the default) means use Chauvenet's criterion.
    pub zscore: Option<f64>,

    /// Fit-to-half: the center; mean (default), median or zero.
    pub center: Option<String>,

    /// Fit-to-half: use values <= the center (true, the default) or >= the
    /// center.
    pub lside: Option<bool>,

    /// Hinges-fences: the fence multiplier of the interquartile range.
    /// Negative (the default) means no fences.
    pub fence: Option<f64>,

    /// Compute everything, but write nothing back.
    pub preview: bool,
}

/// Resolved, validated parameters.
#[derive(Debug, Clone)]
pub struct StatWtParams {
    pub bin_map: BinMap,
    pub min_samp: usize,
    pub combine_pols: bool,
    pub wt_range: Option<(f64, f64)>,

    /// For each spectral window with a channel selection, whether each channel
    /// is excluded from estimation.
    pub excluded_chans: IndexMap<usize, Vec<bool>>,

    pub data_column: DataColumn,
    pub estimator: RobustEstimator,
    pub aggregation: AggregationMode,
    pub preview: bool,
}

impl StatWtArgs {
    /// Combine two sets of arguments, preferring `self` over `other` where
    /// both specify something.
    pub fn merge(self, other: StatWtArgs) -> StatWtArgs {
        StatWtArgs {
            chanbin: self.chanbin.or(other.chanbin),
            minsamp: self.minsamp.or(other.minsamp),
            combine: self.combine.or(other.combine),
            wtrange: if self.wtrange.is_empty() {
                other.wtrange
            } else {
                self.wtrange
            },
            excludechans: self.excludechans || other.excludechans,
            fitspw: self.fitspw.or(other.fitspw),
            datacolumn: self.datacolumn.or(other.datacolumn),
            slidetimebin: self.slidetimebin || other.slidetimebin,
            timebin: self.timebin.or(other.timebin),
            timealign: self.timealign.or(other.timealign),
            statalg: self.statalg.or(other.statalg),
            maxiter: self.maxiter.or(other.maxiter),
            zscore: self.zscore.or(other.zscore),
            center: self.center.or(other.center),
            lside: self.lside.or(other.lside),
            fence: self.fence.or(other.fence),
            preview: self.preview || other.preview,
        }
    }

    /// Validate the arguments against a source.
    pub fn parse<S>(self, source: &S) -> Result<StatWtParams, ConfigError>
    where
        S: SampleSource + ?Sized,
    {
        debug!("{:#?}", self);

        let StatWtArgs {
            chanbin,
            minsamp,
            combine,
            wtrange,
            excludechans,
            fitspw,
            datacolumn,
            slidetimebin,
            timebin,
            timealign,
            statalg,
            maxiter,
            zscore,
            center,
            lside,
            fence,
            preview,
        } = self;

        let spws = source.spectral_windows();

        let policy = match chanbin {
            None => ChanBinPolicy::WholeSpw,
            Some(ChanBinArg::Int(width)) => ChanBinPolicy::from_int(width)?,
            Some(ChanBinArg::Str(s)) => ChanBinPolicy::from_str_quantity(&s)?,
        };
        let bin_map = BinMap::new(spws, policy)?;

        let min_samp = match minsamp {
            None => DEFAULT_MIN_SAMP,
            Some(n) if n < DEFAULT_MIN_SAMP as i64 => return Err(ConfigError::MinSampTooSmall(n)),
            Some(n) => n as usize,
        };

        let combine_pols = combine
            .map(|c| c.to_lowercase().contains("corr"))
            .unwrap_or(false);

        let wt_range = parse_wtrange(wtrange)?;

        let excluded_chans = match fitspw.as_deref().map(str::trim) {
            None | Some("") => IndexMap::new(),
            Some(sel) => fitspw::parse_fitspw(sel, spws)?
                .into_iter()
                .map(|(spw, listed)| {
                    let excluded = listed
                        .into_iter()
                        .map(|l| if excludechans { l } else { !l })
                        .collect();
                    (spw, excluded)
                })
                .collect(),
        };

        let data_column = match datacolumn {
            None => DataColumn::Corrected,
            Some(s) => DataColumn::parse(&s)?,
        };
        let required = data_column.required_column();
        if !source.has_column(required) {
            return Err(ConfigError::MissingColumn {
                datacolumn: data_column,
                column: required,
            });
        }
        if matches!(data_column, DataColumn::Residual | DataColumn::ResidualData)
            && !source.has_column(VisColumn::Model)
        {
            warn!("There is no model column; the {data_column} samples are the {required} samples");
        }

        let estimator = parse_statalg(statalg.as_deref(), maxiter, zscore, center, lside, fence)?;

        let time_bin = timebin.map(parse_timebin).transpose()?;
        let aggregation = if slidetimebin {
            let align = match timealign {
                None => TimeAlign::default(),
                Some(s) => TimeAlign::from_str(s.trim())
                    .map_err(|_| ConfigError::UnknownTimeAlign(s))?,
            };
            AggregationMode::Sliding {
                time_bin: time_bin.ok_or(ConfigError::TimeBinRequired)?,
                align,
            }
        } else {
            if timealign.is_some() {
                warn!("timealign only applies to sliding windows; ignoring it");
            }
            AggregationMode::Block { time_bin }
        };

        Ok(StatWtParams {
            bin_map,
            min_samp,
            combine_pols,
            wt_range,
            excluded_chans,
            data_column,
            estimator,
            aggregation,
            preview,
        })
    }
}

fn parse_wtrange(wtrange: Vec<f64>) -> Result<Option<(f64, f64)>, ConfigError> {
    let (a, b) = match wtrange.as_slice() {
        [] => return Ok(None),
        &[a, b] => (a, b),
        _ => return Err(ConfigError::WtRangeLength(wtrange.len())),
    };
    if a < 0.0 || b < 0.0 || a.is_nan() || b.is_nan() {
        Err(ConfigError::WtRangeNegative(wtrange))
    } else if a == b {
        Err(ConfigError::WtRangeNotDistinct(wtrange))
    } else {
        Ok(Some((a.min(b), a.max(b))))
    }
}

fn parse_timebin(timebin: TimeBinArg) -> Result<TimeBin, ConfigError> {
    match timebin {
        TimeBinArg::Int(n) if n > 0 => Ok(TimeBin::Count(n as usize)),
        TimeBinArg::Int(n) => Err(ConfigError::NonPositiveTimeBin(n.to_string())),
        TimeBinArg::Float(s) if s > 0.0 && s.is_finite() => {
            Ok(TimeBin::Width(Duration::from_seconds(s)))
        }
        TimeBinArg::Float(s) => Err(ConfigError::NonPositiveTimeBin(s.to_string())),
        TimeBinArg::Str(s) => {
            let (quantity, unit) = parse_time(&s)?;
            let seconds = unit.to_seconds(quantity);
            if seconds > 0.0 && seconds.is_finite() {
                Ok(TimeBin::Width(Duration::from_seconds(seconds)))
            } else {
                Err(ConfigError::NonPositiveTimeBin(s))
            }
        }
    }
}

fn parse_statalg(
    statalg: Option<&str>,
    maxiter: Option<i64>,
    zscore: Option<f64>,
    center: Option<String>,
    lside: Option<bool>,
    fence: Option<f64>,
) -> Result<RobustEstimator, ConfigError> {
    // Negative values mean "not specified".
    let unset = |v: Option<f64>| v.filter(|&v| v >= 0.0);

    let statalg = statalg.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    let estimator = if statalg.is_empty() || statalg.starts_with("cl") {
        RobustEstimator::Classical
    } else if statalg.starts_with("ch") {
        let zscore = match zscore {
            Some(z) if z == 0.0 || z.is_nan() => return Err(ConfigError::BadZScore(z)),
            z => unset(z),
        };
        RobustEstimator::Chauvenet {
            max_iter: maxiter.filter(|&n| n >= 0).map(|n| n.min(u32::MAX as i64) as u32),
            zscore,
        }
    } else if statalg.starts_with('f') {
        let center = match center {
            None => FitToHalfCenter::Mean,
            Some(c) => {
                FitToHalfCenter::from_str(c.trim()).map_err(|_| ConfigError::UnknownCenter(c))?
            }
        };
        RobustEstimator::FitToHalf {
            center,
            lside: lside.unwrap_or(true),
        }
    } else if statalg.starts_with('h') {
        RobustEstimator::HingesFences {
            fence: unset(fence),
        }
    } else {
        return Err(ConfigError::UnknownStatAlg(statalg));
    };
    Ok(estimator)
}

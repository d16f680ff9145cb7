// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Aggregation of samples into units, and the weights of those units.
//!
//! An aggregation unit is a (baseline, polarisation slot, channel bin, time
//! range) tuple. When polarisations are combined, there is a single
//! polarisation slot covering all polarisations.

mod block;
mod sliding;

pub use block::BlockAggregator;
pub use sliding::SlidingWindowAggregator;

use std::{ops::Range, sync::Arc};

use hifitime::Duration;
use ndarray::prelude::*;
use num_complex::Complex32 as c32;
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    chan_bins::ChanBin,
    config::StatWtParams,
    source::{SampleSource, SourceError},
    stats::VarianceEstimate,
};

/// How many timestamps, or how much time, a block or window spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeBin {
    Count(usize),
    Width(Duration),
}

impl std::fmt::Display for TimeBin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeBin::Count(1) => write!(f, "1 timestamp"),
            TimeBin::Count(n) => write!(f, "{n} timestamps"),
            TimeBin::Width(d) => write!(f, "{}s", d.to_seconds()),
        }
    }
}

/// Where a sliding window sits relative to the timestamp it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeAlign {
    /// The window is centered on the timestamp.
    #[default]
    Center,

    /// The window ends at the timestamp; only earlier data contribute.
    Trailing,
}

/// The variance-estimation counters of one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleCounts {
    /// Units with a non-zero variance.
    pub nonzero_variance: usize,

    /// Of those units, the ones where the real-part variance differs from the
    /// imaginary-part variance by more than 50%.
    pub real_imag_discrepant: usize,
}

impl SampleCounts {
    fn count(&mut self, estimate: &VarianceEstimate) {
        if estimate.ok && estimate.variance > 0.0 {
            self.nonzero_variance += 1;
            if estimate.real_imag_discrepant() {
                self.real_imag_discrepant += 1;
            }
        }
    }

    fn merge(&mut self, other: SampleCounts) {
        self.nonzero_variance += other.nonzero_variance;
        self.real_imag_discrepant += other.real_imag_discrepant;
    }
}

/// The weight derived for one aggregation unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitWeight {
    pub weight: f32,

    /// The unit is deemed invalid; every one of its cells is flagged.
    pub flagged: bool,
}

impl UnitWeight {
    const FLAGGED: UnitWeight = UnitWeight {
        weight: 0.0,
        flagged: true,
    };

    /// Weights are the inverse of the variance. Units without enough samples,
    /// without any variance, or with a weight outside the accepted range are
    /// flagged.
    pub(crate) fn from_estimate(
        estimate: &VarianceEstimate,
        wt_range: Option<(f64, f64)>,
    ) -> UnitWeight {
        if !estimate.ok || estimate.variance <= 0.0 || !estimate.variance.is_finite() {
            return UnitWeight::FLAGGED;
        }
        let weight = 1.0 / estimate.variance;
        match wt_range {
            Some((low, high)) if !(low..=high).contains(&weight) => UnitWeight::FLAGGED,
            _ => UnitWeight {
                weight: weight as f32,
                flagged: false,
            },
        }
    }
}

/// The unit weights of one subchunk, indexed `[row, bin, polarisation
/// slot]`.
#[derive(Debug, Clone)]
pub(crate) struct SubchunkWeights {
    weights_rbp: Array3<f32>,
    flagged_rbp: Array3<bool>,
}

impl SubchunkWeights {
    fn new(num_rows: usize, num_bins: usize, num_slots: usize) -> SubchunkWeights {
        SubchunkWeights {
            weights_rbp: Array3::zeros((num_rows, num_bins, num_slots)),
            flagged_rbp: Array3::from_elem((num_rows, num_bins, num_slots), true),
        }
    }

    fn set(&mut self, row: usize, bin: usize, slot: usize, unit: UnitWeight) {
        self.weights_rbp[(row, bin, slot)] = unit.weight;
        self.flagged_rbp[(row, bin, slot)] = unit.flagged;
    }

    fn get(&self, row: usize, bin: usize, slot: usize) -> Option<UnitWeight> {
        Some(UnitWeight {
            weight: *self.weights_rbp.get((row, bin, slot))?,
            flagged: *self.flagged_rbp.get((row, bin, slot))?,
        })
    }
}

/// Everything an aggregator has derived for the most recently aggregated
/// chunk.
#[derive(Debug, Clone)]
pub(crate) struct ChunkWeights {
    spw: usize,
    /// The bin index of every channel.
    chan_to_bin: Vec<usize>,
    combine_pols: bool,
    subchunks: Vec<SubchunkWeights>,
    sample_counts: SampleCounts,
}

impl ChunkWeights {
    fn slot(&self, pol: usize) -> usize {
        if self.combine_pols {
            0
        } else {
            pol
        }
    }

    fn unit(
        &self,
        subchunk: usize,
        row: usize,
        chan: usize,
        pol: usize,
    ) -> Result<UnitWeight, SourceError> {
        let bin = *self
            .chan_to_bin
            .get(chan)
            .ok_or_else(|| out_of_range(subchunk, "channel", chan))?;
        self.subchunks
            .get(subchunk)
            .ok_or_else(|| out_of_range(subchunk, "subchunk", subchunk))?
            .get(row, bin, self.slot(pol))
            .ok_or_else(|| out_of_range(subchunk, "row or polarisation", row))
    }
}

fn out_of_range(subchunk: usize, what: &str, index: usize) -> SourceError {
    SourceError::Generic(format!(
        "Subchunk {subchunk}: {what} index {index} is outside the aggregated chunk"
    ))
}

/// The strategy that turns a chunk of samples into unit weights.
pub trait DataAggregator: Send {
    /// Walk the current chunk of the source and derive the weights for every
    /// one of its subchunks. The source is left at the end of the chunk.
    /// Aggregating the same chunk again replaces the earlier results.
    fn aggregate(&mut self, source: &mut dyn SampleSource) -> Result<(), SourceError>;

    /// The unit weight and unit flag covering one cell of a subchunk of the
    /// aggregated chunk.
    fn weight_spectrum_and_flag(
        &self,
        subchunk: usize,
        row: usize,
        chan: usize,
        pol: usize,
    ) -> Result<(f32, bool), SourceError>;

    /// The weight and flag of a row and polarisation when each spectral
    /// window is a single channel bin.
    fn weight_single_bin(
        &self,
        subchunk: usize,
        row: usize,
        pol: usize,
    ) -> Result<(f32, bool), SourceError> {
        self.weight_spectrum_and_flag(subchunk, row, 0, pol)
    }

    /// Whether per-channel weights will be requested.
    fn set_must_compute_spectrum(&mut self, must_compute_spectrum: bool);

    fn must_compute_spectrum(&self) -> bool;

    /// The spectral window and counters of the aggregated chunk, if any.
    fn sample_counts(&self) -> Option<(usize, SampleCounts)>;

    /// A short description for logging.
    fn describe(&self) -> String;
}

/// The sample-gathering and weighing machinery shared by the aggregators.
#[derive(Debug, Clone)]
pub(crate) struct UnitEstimator {
    params: Arc<StatWtParams>,
}

impl UnitEstimator {
    pub(crate) fn new(params: Arc<StatWtParams>) -> UnitEstimator {
        UnitEstimator { params }
    }

    /// The polarisation ranges of each slot.
    fn pol_slots(&self, num_pols: usize) -> Vec<Range<usize>> {
        if self.params.combine_pols {
            vec![0..num_pols]
        } else {
            (0..num_pols).map(|p| p..p + 1).collect()
        }
    }

    fn chan_to_bin(&self, spw: usize, num_chans: usize) -> Result<Vec<usize>, SourceError> {
        let bin_map = &self.params.bin_map;
        let bins = bin_map.bins(spw).ok_or(SourceError::UnknownSpw(spw))?;
        let expected = bins.last().end + 1;
        (0..num_chans)
            .map(|chan| bin_map.bin_of(spw, chan))
            .collect::<Option<Vec<usize>>>()
            .filter(|_| num_chans == expected)
            .ok_or_else(|| {
                SourceError::Generic(format!(
                    "spw {spw} has {num_chans} channels, but the channel bins expect {expected}"
                ))
            })
    }

    /// Estimate the weight of one unit from a set of (subchunk data, rows)
    /// parts. Samples that are flagged, or in channels excluded from
    /// estimation, are not used.
    fn estimate<'a, I>(
        &self,
        parts: I,
        spw: usize,
        bin: ChanBin,
        pols: Range<usize>,
    ) -> (UnitWeight, VarianceEstimate)
    where
        I: IntoIterator<Item = (ArrayView3<'a, c32>, ArrayView3<'a, bool>, &'a [usize])>,
    {
        let excluded = self.params.excluded_chans.get(&spw);
        let mut values = vec![];
        let mut mask = vec![];
        for (vis_rfp, flags_rfp, rows) in parts {
            values.reserve(rows.len() * bin.len() * pols.len());
            mask.reserve(rows.len() * bin.len() * pols.len());
            for &row in rows {
                for chan in bin.start..=bin.end {
                    let usable_chan = !excluded
                        .and_then(|e| e.get(chan).copied())
                        .unwrap_or(false);
                    for pol in pols.clone() {
                        values.push(vis_rfp[(row, chan, pol)]);
                        mask.push(usable_chan && !flags_rfp[(row, chan, pol)]);
                    }
                }
            }
        }

        let estimate = self
            .params
            .estimator
            .estimate(&values, &mask, self.params.min_samp);
        (UnitWeight::from_estimate(&estimate, self.params.wt_range), estimate)
    }
}

/// The samples of the data column and the flags of the source's current
/// subchunk.
fn read_subchunk(
    params: &StatWtParams,
    source: &mut dyn SampleSource,
) -> Result<(Array3<c32>, Array3<bool>), SourceError> {
    let vis_rfp = params.data_column.samples_rfp(&*source)?;
    let flags_rfp = source.flags_rfp()?;
    if vis_rfp.dim() != flags_rfp.dim() {
        return Err(SourceError::BadShape {
            chunk: source.chunk_index(),
            subchunk: source.subchunk_index(),
            what: "flags",
            expected: vis_rfp.shape().to_vec(),
            got: flags_rfp.shape().to_vec(),
        });
    }
    Ok((vis_rfp, flags_rfp))
}

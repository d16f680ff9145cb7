// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A [`SampleSource`] that replaces the weights, sigmas and flags of another
//! source with ones derived from the statistics of the samples.

mod summary;

pub use summary::{FlaggingSummary, RunningSummary, WeightStatistics};

use std::sync::Arc;

use hifitime::Epoch;
use log::debug;
use ndarray::prelude::*;
use num_complex::Complex32 as c32;

use crate::{
    aggregate::{BlockAggregator, DataAggregator, SlidingWindowAggregator},
    config::{AggregationMode, ConfigError, StatWtArgs, StatWtParams},
    constants::SIGMA_FOR_ZERO_WEIGHT,
    math::median_inplace,
    messages,
    source::{SampleSource, SourceError, SpectralWindow, VisChanges, VisColumn},
};

/// Values computed for the current subchunk. Everything is dropped whenever
/// the subchunk changes.
#[derive(Debug, Default)]
struct Cache {
    weight_spectrum_rfp: Option<Array3<f32>>,
    flags_rfp: Option<Array3<bool>>,
    new_weights_rp: Option<Array2<f32>>,
    sigmas_rp: Option<Array2<f32>>,
    flag_row: Option<Array1<bool>>,
}

impl Cache {
    fn clear(&mut self) {
        *self = Cache::default();
    }
}

/// Wraps a source, aggregating each chunk as soon as it becomes current.
/// Weight, sigma and flag accessors return the reweighted values; everything
/// else is the wrapped source's.
pub struct ReweightingTransform<S: SampleSource> {
    base: S,
    params: Arc<StatWtParams>,
    aggregator: Box<dyn DataAggregator>,

    /// Are sigmas derived from the new weights?
    must_compute_sigma: bool,

    /// Are the weights replaced? They are not when sigmas are derived from
    /// the uncalibrated data, but calibrated data exist.
    update_weight: bool,

    /// The chunk that the aggregator last aggregated.
    aggregated_chunk: Option<usize>,

    cache: Cache,
    summary: RunningSummary,
}

impl<S: SampleSource> ReweightingTransform<S> {
    pub fn new(base: S, params: StatWtParams) -> ReweightingTransform<S> {
        let params = Arc::new(params);
        let mut aggregator: Box<dyn DataAggregator> = match params.aggregation {
            AggregationMode::Block { time_bin } => {
                Box::new(BlockAggregator::new(Arc::clone(&params), time_bin))
            }
            AggregationMode::Sliding { time_bin, align } => Box::new(
                SlidingWindowAggregator::new(Arc::clone(&params), time_bin, align),
            ),
        };
        aggregator.set_must_compute_spectrum(
            params.bin_map.must_compute_spectrum() || base.has_weight_spectrum(),
        );

        let must_compute_sigma = params.data_column.must_compute_sigma();
        let update_weight = !must_compute_sigma || !base.has_column(VisColumn::Corrected);

        messages::TransformDetails {
            params: &params,
            spws: base.spectral_windows(),
            aggregator: aggregator.describe(),
            must_compute_spectrum: aggregator.must_compute_spectrum(),
            must_compute_sigma,
            update_weight,
        }
        .print();

        ReweightingTransform {
            base,
            params,
            aggregator,
            must_compute_sigma,
            update_weight,
            aggregated_chunk: None,
            cache: Cache::default(),
            summary: RunningSummary::default(),
        }
    }

    /// Validate the arguments against the source, then wrap it.
    pub fn from_args(base: S, args: StatWtArgs) -> Result<ReweightingTransform<S>, ConfigError> {
        let params = args.parse(&base)?;
        Ok(ReweightingTransform::new(base, params))
    }

    pub fn params(&self) -> &StatWtParams {
        &self.params
    }

    /// Are per-channel weights produced?
    pub fn must_compute_spectrum(&self) -> bool {
        self.aggregator.must_compute_spectrum()
    }

    pub fn must_compute_sigma(&self) -> bool {
        self.must_compute_sigma
    }

    pub fn update_weight(&self) -> bool {
        self.update_weight
    }

    pub fn base(&self) -> &S {
        &self.base
    }

    pub fn into_inner(self) -> S {
        self.base
    }

    pub fn summary(&self) -> &RunningSummary {
        &self.summary
    }

    /// Report (and return) the flagging totals accumulated so far.
    pub fn summarize_flagging(&self) -> FlaggingSummary {
        let summary = self.summary.flagging();
        messages::FlaggingReport { summary: &summary }.print();
        summary
    }

    /// Report (and return) the statistics of the weights produced so far.
    pub fn summarize_statistics(&self) -> WeightStatistics {
        let statistics = self.summary.weight_statistics();
        messages::StatisticsReport {
            statistics: &statistics,
        }
        .print();
        statistics
    }

    /// Aggregate the base's current chunk (if there is one) and rewind it to
    /// its first subchunk.
    fn aggregate_current_chunk(&mut self) -> Result<(), SourceError> {
        self.cache.clear();
        self.aggregated_chunk = None;
        if !self.base.more_chunks() {
            return Ok(());
        }

        let chunk = self.base.chunk_index();
        self.aggregator.aggregate(&mut self.base)?;
        if let Some((spw, counts)) = self.aggregator.sample_counts() {
            self.summary.add_chunk(chunk, spw, counts);
        }
        self.aggregated_chunk = Some(chunk);
        self.base.origin()
    }

    fn check_ready(&self) -> Result<(), SourceError> {
        if self.aggregated_chunk != Some(self.base.chunk_index()) {
            return Err(SourceError::NotReady);
        }
        if !self.base.more() {
            return Err(SourceError::NoCurrent("subchunk"));
        }
        Ok(())
    }

    /// Fill the weight spectrum and flags of the current subchunk. Cells
    /// flagged upstream keep their flags and get no weight; cells of flagged
    /// units are newly flagged.
    fn compute_weight_spectrum_and_flags(&mut self) -> Result<(), SourceError> {
        if self.cache.weight_spectrum_rfp.is_some() && self.cache.flags_rfp.is_some() {
            return Ok(());
        }
        self.check_ready()?;

        let orig_flags_rfp = self.base.flags_rfp()?;
        let chunk = self.base.chunk_index();
        let subchunk = self.base.subchunk_index();
        let per_channel = self.aggregator.must_compute_spectrum();

        let mut weight_spectrum_rfp = Array3::zeros(orig_flags_rfp.dim());
        let mut flags_rfp = orig_flags_rfp.clone();
        let mut num_orig_flagged = 0;
        let mut num_new_flagged = 0;
        for ((row, chan, pol), &orig_flag) in orig_flags_rfp.indexed_iter() {
            if orig_flag {
                num_orig_flagged += 1;
                continue;
            }
            let (weight, flagged) = if per_channel {
                self.aggregator
                    .weight_spectrum_and_flag(subchunk, row, chan, pol)?
            } else {
                self.aggregator.weight_single_bin(subchunk, row, pol)?
            };
            if flagged {
                flags_rfp[(row, chan, pol)] = true;
                num_new_flagged += 1;
            } else {
                weight_spectrum_rfp[(row, chan, pol)] = weight;
            }
        }

        if self.summary.is_new_subchunk(chunk, subchunk) {
            self.summary.add_subchunk(
                chunk,
                subchunk,
                orig_flags_rfp.len(),
                num_orig_flagged,
                num_new_flagged,
                weight_spectrum_rfp
                    .iter()
                    .zip(flags_rfp.iter())
                    .filter(|(_, &f)| !f)
                    .map(|(w, _)| w),
            );
        }

        self.cache.weight_spectrum_rfp = Some(weight_spectrum_rfp);
        self.cache.flags_rfp = Some(flags_rfp);
        Ok(())
    }

    /// The weight of each row and polarisation: the median of the unflagged
    /// cells of the weight spectrum, or zero if there are none. With a single
    /// channel bin, it is the unit weight.
    fn compute_new_weights(&mut self) -> Result<&Array2<f32>, SourceError> {
        if self.cache.new_weights_rp.is_none() {
            self.compute_weight_spectrum_and_flags()?;
            let (weight_spectrum_rfp, flags_rfp) =
                match (&self.cache.weight_spectrum_rfp, &self.cache.flags_rfp) {
                    (Some(w), Some(f)) => (w, f),
                    _ => return Err(SourceError::NotReady),
                };
            let (num_rows, _, num_pols) = flags_rfp.dim();
            let combine_pols = self.params.combine_pols;
            let subchunk = self.base.subchunk_index();

            let mut weights_rp = Array2::zeros((num_rows, num_pols));
            if self.aggregator.must_compute_spectrum() {
                let mut values = vec![];
                for row in 0..num_rows {
                    let pol_groups: Vec<Vec<usize>> = if combine_pols {
                        vec![(0..num_pols).collect()]
                    } else {
                        (0..num_pols).map(|p| vec![p]).collect()
                    };
                    for pols in pol_groups {
                        values.clear();
                        for &pol in &pols {
                            values.extend(
                                weight_spectrum_rfp
                                    .slice(s![row, .., pol])
                                    .iter()
                                    .zip(flags_rfp.slice(s![row, .., pol]).iter())
                                    .filter(|(_, &f)| !f)
                                    .map(|(&w, _)| w),
                            );
                        }
                        let median = median_inplace(&mut values).unwrap_or(0.0);
                        for pol in pols {
                            weights_rp[(row, pol)] = median;
                        }
                    }
                }
            } else {
                for row in 0..num_rows {
                    let row_flags = flags_rfp.slice(s![row, .., ..]);
                    for pol in 0..num_pols {
                        let all_flagged = if combine_pols {
                            row_flags.iter().all(|&f| f)
                        } else {
                            row_flags.slice(s![.., pol]).iter().all(|&f| f)
                        };
                        let (weight, flagged) =
                            self.aggregator.weight_single_bin(subchunk, row, pol)?;
                        weights_rp[(row, pol)] = if flagged || all_flagged { 0.0 } else { weight };
                    }
                }
            }
            self.cache.new_weights_rp = Some(weights_rp);
        }
        self.cache.new_weights_rp.as_ref().ok_or(SourceError::NotReady)
    }
}

/// `1/sqrt(w)`, or a sentinel for zero weights.
fn sigma_from_weight(weight: f32) -> f32 {
    if weight > 0.0 {
        1.0 / weight.sqrt()
    } else {
        SIGMA_FOR_ZERO_WEIGHT
    }
}

impl<S: SampleSource> SampleSource for ReweightingTransform<S> {
    fn spectral_windows(&self) -> &[SpectralWindow] {
        self.base.spectral_windows()
    }

    fn origin_chunks(&mut self) -> Result<(), SourceError> {
        self.base.origin_chunks()?;
        self.aggregate_current_chunk()
    }

    fn next_chunk(&mut self) -> Result<(), SourceError> {
        self.base.next_chunk()?;
        self.aggregate_current_chunk()
    }

    fn more_chunks(&self) -> bool {
        self.base.more_chunks()
    }

    fn origin(&mut self) -> Result<(), SourceError> {
        self.base.origin()?;
        self.cache.clear();
        Ok(())
    }

    fn next(&mut self) -> Result<(), SourceError> {
        self.base.next()?;
        self.cache.clear();
        Ok(())
    }

    fn more(&self) -> bool {
        self.base.more()
    }

    fn chunk_index(&self) -> usize {
        self.base.chunk_index()
    }

    fn subchunk_index(&self) -> usize {
        self.base.subchunk_index()
    }

    fn num_rows(&self) -> usize {
        self.base.num_rows()
    }

    fn num_chans(&self) -> usize {
        self.base.num_chans()
    }

    fn num_pols(&self) -> usize {
        self.base.num_pols()
    }

    fn spw(&self) -> usize {
        self.base.spw()
    }

    fn antenna1(&self) -> &[usize] {
        self.base.antenna1()
    }

    fn antenna2(&self) -> &[usize] {
        self.base.antenna2()
    }

    fn times(&self) -> &[Epoch] {
        self.base.times()
    }

    fn row_ids(&self) -> &[usize] {
        self.base.row_ids()
    }

    fn has_column(&self, column: VisColumn) -> bool {
        self.base.has_column(column)
    }

    fn has_weight_spectrum(&self) -> bool {
        self.base.has_weight_spectrum() || self.aggregator.must_compute_spectrum()
    }

    fn has_sigma_spectrum(&self) -> bool {
        self.base.has_sigma_spectrum()
            || (self.must_compute_sigma && self.aggregator.must_compute_spectrum())
    }

    fn vis_rfp(&self, column: VisColumn) -> Option<ArrayView3<c32>> {
        self.base.vis_rfp(column)
    }

    fn flags_rfp(&mut self) -> Result<Array3<bool>, SourceError> {
        self.compute_weight_spectrum_and_flags()?;
        self.cache.flags_rfp.clone().ok_or(SourceError::NotReady)
    }

    fn flag_row(&mut self) -> Result<Array1<bool>, SourceError> {
        if self.cache.flag_row.is_none() {
            self.compute_weight_spectrum_and_flags()?;
            let flags_rfp = self.cache.flags_rfp.as_ref().ok_or(SourceError::NotReady)?;
            let flag_row = flags_rfp
                .outer_iter()
                .map(|row| row.iter().all(|&f| f))
                .collect();
            self.cache.flag_row = Some(flag_row);
        }
        self.cache.flag_row.clone().ok_or(SourceError::NotReady)
    }

    fn weights_rp(&mut self) -> Result<Array2<f32>, SourceError> {
        if self.update_weight {
            self.compute_new_weights().cloned()
        } else {
            self.check_ready()?;
            self.base.weights_rp()
        }
    }

    fn weight_spectrum_rfp(&mut self) -> Result<Option<Array3<f32>>, SourceError> {
        self.check_ready()?;
        if !self.update_weight {
            return self.base.weight_spectrum_rfp();
        }
        if !self.aggregator.must_compute_spectrum() {
            return Ok(None);
        }
        self.compute_weight_spectrum_and_flags()?;
        Ok(self.cache.weight_spectrum_rfp.clone())
    }

    fn sigmas_rp(&mut self) -> Result<Array2<f32>, SourceError> {
        if !self.must_compute_sigma {
            self.check_ready()?;
            return self.base.sigmas_rp();
        }
        if self.cache.sigmas_rp.is_none() {
            let sigmas_rp = self.compute_new_weights()?.mapv(sigma_from_weight);
            self.cache.sigmas_rp = Some(sigmas_rp);
        }
        self.cache.sigmas_rp.clone().ok_or(SourceError::NotReady)
    }

    fn sigma_spectrum_rfp(&mut self) -> Result<Option<Array3<f32>>, SourceError> {
        self.check_ready()?;
        if !self.must_compute_sigma {
            return self.base.sigma_spectrum_rfp();
        }
        if !self.aggregator.must_compute_spectrum() {
            return Ok(None);
        }
        self.compute_weight_spectrum_and_flags()?;
        Ok(self
            .cache
            .weight_spectrum_rfp
            .as_ref()
            .map(|w| w.mapv(sigma_from_weight)))
    }

    fn write_back_changes(&mut self, changes: VisChanges) -> Result<(), SourceError> {
        debug!(
            "Writing back chunk {} subchunk {}",
            changes.chunk, changes.subchunk
        );
        self.base.write_back_changes(changes)
    }
}

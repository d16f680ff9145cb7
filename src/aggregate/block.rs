// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Weights from disjoint time blocks.

use std::{cmp::Ordering, sync::Arc};

use indexmap::IndexMap;
use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::{
    read_subchunk, ChunkWeights, DataAggregator, SampleCounts, SubchunkWeights, TimeBin,
    UnitEstimator, UnitWeight,
};
use crate::{
    config::StatWtParams,
    source::{SampleSource, SourceError},
};

/// Splits each chunk into disjoint time blocks, and derives one weight per
/// (baseline, channel bin, polarisation slot, block). The whole chunk is read
/// into memory before any estimation happens.
pub struct BlockAggregator {
    estimator: UnitEstimator,
    params: Arc<StatWtParams>,

    /// `None` means the whole chunk is one block.
    time_bin: Option<TimeBin>,

    must_compute_spectrum: bool,
    chunk: Option<ChunkWeights>,
}

impl BlockAggregator {
    pub fn new(params: Arc<StatWtParams>, time_bin: Option<TimeBin>) -> BlockAggregator {
        BlockAggregator {
            estimator: UnitEstimator::new(Arc::clone(&params)),
            must_compute_spectrum: params.bin_map.must_compute_spectrum(),
            params,
            time_bin,
            chunk: None,
        }
    }
}

/// The block index of every timestamp (GPS seconds). Blocks are formed over
/// the distinct timestamps in time order; a width-based block ends before the
/// first timestamp that is at least the width after the block's first
/// timestamp.
pub(super) fn assign_blocks(times: &[f64], time_bin: Option<TimeBin>) -> Vec<usize> {
    let mut distinct = times.to_vec();
    distinct.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    distinct.dedup();

    let distinct_blocks: Vec<usize> = match time_bin {
        None => vec![0; distinct.len()],
        Some(TimeBin::Count(n)) => (0..distinct.len()).map(|i| i / n.max(1)).collect(),
        Some(TimeBin::Width(width)) => {
            let width = width.to_seconds();
            let mut block = 0;
            let mut block_start = distinct.first().copied().unwrap_or_default();
            distinct
                .iter()
                .map(|&t| {
                    if t - block_start >= width {
                        block += 1;
                        block_start = t;
                    }
                    block
                })
                .collect()
        }
    };

    times
        .iter()
        .map(|t| {
            let i = distinct
                .binary_search_by(|d| d.partial_cmp(t).unwrap_or(Ordering::Equal))
                .unwrap_or_else(|i| i);
            distinct_blocks.get(i).copied().unwrap_or_default()
        })
        .collect()
}

impl DataAggregator for BlockAggregator {
    fn aggregate(&mut self, source: &mut dyn SampleSource) -> Result<(), SourceError> {
        self.chunk = None;

        let mut vis_parts = vec![];
        let mut flag_parts = vec![];
        // The subchunk and subchunk row of every row of the chunk.
        let mut row_locs = vec![];
        let mut baselines = vec![];
        let mut times = vec![];
        let mut subchunk_rows = vec![];

        source.origin()?;
        let spw = source.spw();
        while source.more() {
            let (vis_rfp, flags_rfp) = read_subchunk(&self.params, source)?;
            let num_rows = vis_rfp.len_of(Axis(0));
            let i_subchunk = subchunk_rows.len();
            row_locs.extend((0..num_rows).map(|r| (i_subchunk, r)));
            baselines.extend(
                source
                    .antenna1()
                    .iter()
                    .copied()
                    .zip(source.antenna2().iter().copied()),
            );
            times.extend(source.times().iter().map(|t| t.to_gpst_seconds()));
            subchunk_rows.push(num_rows);
            vis_parts.push(vis_rfp);
            flag_parts.push(flags_rfp);
            source.next()?;
        }

        let (num_chans, num_pols) = match vis_parts.first() {
            Some(v) => (v.len_of(Axis(1)), v.len_of(Axis(2))),
            None => (0, 0),
        };
        let chan_to_bin = self.estimator.chan_to_bin(spw, num_chans)?;
        let bins = self
            .params
            .bin_map
            .bins(spw)
            .ok_or(SourceError::UnknownSpw(spw))?
            .clone();
        let pol_slots = self.estimator.pol_slots(num_pols);
        if baselines.len() != row_locs.len() || times.len() != row_locs.len() {
            return Err(SourceError::Generic(format!(
                "Chunk {}: the number of antennas or timestamps doesn't match the number of rows",
                source.chunk_index()
            )));
        }

        // Collect the chunk into single arrays.
        let shape_err = |e: ndarray::ShapeError| {
            SourceError::Generic(format!(
                "Chunk {}: subchunks have differing shapes ({e})",
                source.chunk_index()
            ))
        };
        let (vis_rfp, flags_rfp) = if vis_parts.is_empty() {
            (
                Array3::zeros((0, num_chans, num_pols)),
                Array3::from_elem((0, num_chans, num_pols), false),
            )
        } else {
            let vis_views: Vec<_> = vis_parts.iter().map(|a| a.view()).collect();
            let flag_views: Vec<_> = flag_parts.iter().map(|a| a.view()).collect();
            (
                ndarray::concatenate(Axis(0), &vis_views).map_err(shape_err)?,
                ndarray::concatenate(Axis(0), &flag_views).map_err(shape_err)?,
            )
        };
        drop(vis_parts);
        drop(flag_parts);

        // Group rows by baseline and block.
        let blocks = assign_blocks(&times, self.time_bin);
        let mut groups: IndexMap<(usize, usize, usize), Vec<usize>> = IndexMap::new();
        for (i_row, (&(ant1, ant2), &block)) in baselines.iter().zip(blocks.iter()).enumerate() {
            groups.entry((ant1, ant2, block)).or_default().push(i_row);
        }

        // Estimate every unit. Groups are independent of one another.
        let results: Vec<(Vec<UnitWeight>, SampleCounts)> = groups
            .par_values()
            .map(|rows| {
                let mut counts = SampleCounts::default();
                let mut units = Vec::with_capacity(bins.len() * pol_slots.len());
                for &bin in bins.iter() {
                    for pols in pol_slots.iter() {
                        let (unit, estimate) = self.estimator.estimate(
                            std::iter::once((vis_rfp.view(), flags_rfp.view(), rows.as_slice())),
                            spw,
                            bin,
                            pols.clone(),
                        );
                        counts.count(&estimate);
                        units.push(unit);
                    }
                }
                (units, counts)
            })
            .collect();

        // Scatter the unit weights to the rows of each subchunk.
        let mut subchunks: Vec<SubchunkWeights> = subchunk_rows
            .iter()
            .map(|&n| SubchunkWeights::new(n, bins.len(), pol_slots.len()))
            .collect();
        let mut sample_counts = SampleCounts::default();
        for (rows, (units, counts)) in groups.values().zip(results) {
            sample_counts.merge(counts);
            for &i_row in rows {
                let (i_subchunk, row) = row_locs[i_row];
                for (i_unit, &unit) in units.iter().enumerate() {
                    let (i_bin, i_slot) = (i_unit / pol_slots.len(), i_unit % pol_slots.len());
                    subchunks[i_subchunk].set(row, i_bin, i_slot, unit);
                }
            }
        }

        debug!(
            "Aggregated chunk {} (spw {spw}): {} rows in {} subchunks, {} baseline-block groups, {} units",
            source.chunk_index(),
            row_locs.len(),
            subchunks.len(),
            groups.len(),
            groups.len() * bins.len() * pol_slots.len()
        );

        self.chunk = Some(ChunkWeights {
            spw,
            chan_to_bin,
            combine_pols: self.params.combine_pols,
            subchunks,
            sample_counts,
        });
        Ok(())
    }

    fn weight_spectrum_and_flag(
        &self,
        subchunk: usize,
        row: usize,
        chan: usize,
        pol: usize,
    ) -> Result<(f32, bool), SourceError> {
        let chunk = self.chunk.as_ref().ok_or(SourceError::NotReady)?;
        let unit = chunk.unit(subchunk, row, chan, pol)?;
        Ok((unit.weight, unit.flagged))
    }

    fn set_must_compute_spectrum(&mut self, must_compute_spectrum: bool) {
        self.must_compute_spectrum = must_compute_spectrum;
    }

    fn must_compute_spectrum(&self) -> bool {
        self.must_compute_spectrum
    }

    fn sample_counts(&self) -> Option<(usize, SampleCounts)> {
        self.chunk.as_ref().map(|c| (c.spw, c.sample_counts))
    }

    fn describe(&self) -> String {
        match self.time_bin {
            None => "block (one block per chunk)".to_string(),
            Some(tb) => format!("block ({tb} per block)"),
        }
    }
}

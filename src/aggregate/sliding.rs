// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Weights from time windows that slide with each timestamp.

use std::{collections::VecDeque, sync::Arc};

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace, warn};
use ndarray::prelude::*;
use num_complex::Complex32 as c32;
use rayon::prelude::*;

use super::{
    read_subchunk, ChunkWeights, DataAggregator, SampleCounts, SubchunkWeights, TimeAlign,
    TimeBin, UnitEstimator, UnitWeight,
};
use crate::{
    config::StatWtParams,
    source::{SampleSource, SourceError},
};

/// Derives the weights of each subchunk from the samples of the same baseline
/// in a window of neighbouring subchunks. Each subchunk is expected to hold a
/// single timestamp. Only the subchunks of the current window are held in
/// memory.
pub struct SlidingWindowAggregator {
    estimator: UnitEstimator,
    params: Arc<StatWtParams>,
    time_bin: TimeBin,
    align: TimeAlign,
    must_compute_spectrum: bool,
    chunk: Option<ChunkWeights>,
}

impl SlidingWindowAggregator {
    pub fn new(
        params: Arc<StatWtParams>,
        time_bin: TimeBin,
        align: TimeAlign,
    ) -> SlidingWindowAggregator {
        SlidingWindowAggregator {
            estimator: UnitEstimator::new(Arc::clone(&params)),
            must_compute_spectrum: params.bin_map.must_compute_spectrum(),
            params,
            time_bin,
            align,
            chunk: None,
        }
    }
}

/// The inclusive range of timestamp indices in the window of each timestamp.
/// `times` (GPS seconds) must be sorted.
pub(super) fn window_bounds(
    times: &[f64],
    time_bin: TimeBin,
    align: TimeAlign,
) -> Vec<(usize, usize)> {
    let num_times = times.len();
    match time_bin {
        TimeBin::Count(n) => {
            let n = n.max(1);
            (0..num_times)
                .map(|i| match align {
                    TimeAlign::Trailing => ((i + 1).saturating_sub(n), i),
                    TimeAlign::Center => {
                        let num_before = if n % 2 == 0 { n / 2 - 1 } else { (n - 1) / 2 };
                        let begin = i.saturating_sub(num_before);
                        let end = begin + n - 1;
                        if end >= num_times {
                            let end = num_times - 1;
                            ((end + 1).saturating_sub(n), end)
                        } else {
                            (begin, end)
                        }
                    }
                })
                .collect()
        }

        TimeBin::Width(width) => {
            let width = width.to_seconds();
            let (before, after) = match align {
                TimeAlign::Center => (width / 2.0, width / 2.0),
                TimeAlign::Trailing => (width, 0.0),
            };
            times
                .iter()
                .enumerate()
                .map(|(i, &t)| {
                    let begin = times.partition_point(|&other| other < t - before).min(i);
                    let end = times
                        .partition_point(|&other| other <= t + after)
                        .saturating_sub(1)
                        .max(i);
                    (begin, end)
                })
                .collect()
        }
    }
}

/// A subchunk held while it is inside the current window.
struct Held {
    index: usize,
    vis_rfp: Array3<c32>,
    flags_rfp: Array3<bool>,
    /// The rows of each baseline.
    baselines: IndexMap<(usize, usize), Vec<usize>>,
}

fn rows_by_baseline(source: &dyn SampleSource) -> IndexMap<(usize, usize), Vec<usize>> {
    let mut baselines: IndexMap<(usize, usize), Vec<usize>> = IndexMap::new();
    for (i_row, (&ant1, &ant2)) in source.antenna1().iter().zip(source.antenna2()).enumerate() {
        baselines.entry((ant1, ant2)).or_default().push(i_row);
    }
    baselines
}

impl DataAggregator for SlidingWindowAggregator {
    fn aggregate(&mut self, source: &mut dyn SampleSource) -> Result<(), SourceError> {
        self.chunk = None;
        let chunk_index = source.chunk_index();

        // First pass: only metadata.
        let mut times = vec![];
        let mut subchunk_rows = vec![];
        let (mut num_chans, mut num_pols) = (0, 0);
        source.origin()?;
        let spw = source.spw();
        while source.more() {
            let subchunk_times = source.times();
            let time = match subchunk_times.first() {
                Some(t) => t.to_gpst_seconds(),
                None => {
                    return Err(SourceError::Inconsistent {
                        chunk: chunk_index,
                        subchunk: source.subchunk_index(),
                        msg: "subchunk has no rows".to_string(),
                    })
                }
            };
            if subchunk_times.iter().map(|t| t.to_gpst_seconds()).any(|t| t != time) {
                warn!(
                    "Chunk {chunk_index} subchunk {} has more than one timestamp; using the first ({time}) for its window",
                    source.subchunk_index()
                );
            }
            if times.last().map(|&last| time < last).unwrap_or(false) {
                return Err(SourceError::Inconsistent {
                    chunk: chunk_index,
                    subchunk: source.subchunk_index(),
                    msg: "subchunks are not in time order".to_string(),
                });
            }
            // Held subchunks are indexed with the chunk's shape.
            let shape = (source.num_chans(), source.num_pols());
            if !times.is_empty() && shape != (num_chans, num_pols) {
                return Err(SourceError::BadShape {
                    chunk: chunk_index,
                    subchunk: source.subchunk_index(),
                    what: "(channels, polarisations)",
                    expected: vec![num_chans, num_pols],
                    got: vec![shape.0, shape.1],
                });
            }
            times.push(time);
            subchunk_rows.push(source.num_rows());
            (num_chans, num_pols) = shape;
            source.next()?;
        }

        let chan_to_bin = self.estimator.chan_to_bin(spw, num_chans)?;
        let bins = self
            .params
            .bin_map
            .bins(spw)
            .ok_or(SourceError::UnknownSpw(spw))?
            .clone();
        let pol_slots = self.estimator.pol_slots(num_pols);
        let bounds = window_bounds(&times, self.time_bin, self.align);
        trace!(
            "Chunk {chunk_index} windows: {}",
            bounds.iter().map(|(b, e)| format!("{b}~{e}")).join(", ")
        );

        // Second pass: hold subchunks while they're inside the current window.
        let mut subchunks: Vec<SubchunkWeights> = subchunk_rows
            .iter()
            .map(|&n| SubchunkWeights::new(n, bins.len(), pol_slots.len()))
            .collect();
        let mut sample_counts = SampleCounts::default();
        let mut held: VecDeque<Held> = VecDeque::new();
        let mut next_to_load = 0;
        let mut max_held = 0;
        source.origin()?;
        for (i_subchunk, &(begin, end)) in bounds.iter().enumerate() {
            while next_to_load <= end {
                if !source.more() {
                    return Err(SourceError::Inconsistent {
                        chunk: chunk_index,
                        subchunk: next_to_load,
                        msg: "the chunk has fewer subchunks than it had on the first pass"
                            .to_string(),
                    });
                }
                let (vis_rfp, flags_rfp) = read_subchunk(&self.params, source)?;
                held.push_back(Held {
                    index: next_to_load,
                    vis_rfp,
                    flags_rfp,
                    baselines: rows_by_baseline(&*source),
                });
                source.next()?;
                next_to_load += 1;
            }
            while held.front().map(|h| h.index < begin).unwrap_or(false) {
                held.pop_front();
            }
            max_held = max_held.max(held.len());

            let current = match held.iter().find(|h| h.index == i_subchunk) {
                Some(c) => c,
                None => continue,
            };

            // Baselines are independent of one another.
            let results: Vec<(&Vec<usize>, Vec<UnitWeight>, SampleCounts)> = current
                .baselines
                .par_iter()
                .map(|(baseline, rows)| {
                    let parts: Vec<_> = held
                        .iter()
                        .filter_map(|h| {
                            h.baselines.get(baseline).map(|rows| {
                                (h.vis_rfp.view(), h.flags_rfp.view(), rows.as_slice())
                            })
                        })
                        .collect();
                    let mut counts = SampleCounts::default();
                    let mut units = Vec::with_capacity(bins.len() * pol_slots.len());
                    for &bin in bins.iter() {
                        for pols in pol_slots.iter() {
                            let (unit, estimate) = self.estimator.estimate(
                                parts.iter().cloned(),
                                spw,
                                bin,
                                pols.clone(),
                            );
                            counts.count(&estimate);
                            units.push(unit);
                        }
                    }
                    (rows, units, counts)
                })
                .collect();

            for (rows, units, counts) in results {
                sample_counts.merge(counts);
                for &row in rows {
                    for (i_unit, &unit) in units.iter().enumerate() {
                        let (i_bin, i_slot) = (i_unit / pol_slots.len(), i_unit % pol_slots.len());
                        subchunks[i_subchunk].set(row, i_bin, i_slot, unit);
                    }
                }
            }
        }

        debug!(
            "Aggregated chunk {chunk_index} (spw {spw}): {} subchunks, at most {max_held} held at once",
            subchunks.len()
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
        format!("sliding window ({}, {}-aligned)", self.time_bin, self.align)
    }
}

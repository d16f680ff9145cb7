// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bookkeeping for end-of-run reports.

use indexmap::IndexMap;
use serde::Serialize;

use crate::aggregate::SampleCounts;

/// Mean and population variance of a stream of values (Welford).
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }
}

/// Flagging totals of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggingSummary {
    pub num_total: usize,
    pub num_orig_flagged: usize,
    pub num_new_flagged: usize,

    /// The variance-estimation counters of each spectral window.
    pub sample_counts: Vec<(usize, SampleCounts)>,
}

impl FlaggingSummary {
    /// Percentage of the data that were flagged before reweighting. NaN if
    /// there were no data.
    pub fn orig_flagged_percent(&self) -> f64 {
        self.num_orig_flagged as f64 / self.num_total as f64 * 100.0
    }

    /// Percentage of the data that were newly flagged. NaN if there were no
    /// data.
    pub fn new_flagged_percent(&self) -> f64 {
        self.num_new_flagged as f64 / self.num_total as f64 * 100.0
    }

    pub fn all_orig_flagged(&self) -> bool {
        self.num_orig_flagged == self.num_total
    }

    pub fn all_flagged(&self) -> bool {
        self.num_orig_flagged + self.num_new_flagged == self.num_total
    }
}

/// Statistics of the weights of all unflagged samples. Both are NaN if there
/// were no such samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightStatistics {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

/// Accumulates everything reported at the end of a run. Each subchunk and
/// each chunk is counted only once, no matter how many times it is visited.
#[derive(Debug, Clone, Default)]
pub struct RunningSummary {
    num_total: usize,
    num_orig_flagged: usize,
    num_new_flagged: usize,
    weights: Accumulator,
    sample_counts: IndexMap<usize, SampleCounts>,

    /// The last (chunk, subchunk) counted.
    last_subchunk: Option<(usize, usize)>,

    /// The last chunk whose sample counts were merged.
    last_chunk: Option<usize>,
}

impl RunningSummary {
    /// Whether this subchunk is yet to be counted. Subchunks are counted in
    /// iteration order, so anything at or before the last one counted has
    /// been seen.
    pub(super) fn is_new_subchunk(&self, chunk: usize, subchunk: usize) -> bool {
        self.last_subchunk
            .map(|last| (chunk, subchunk) > last)
            .unwrap_or(true)
    }

    /// Count the flags and weights of a subchunk.
    pub(super) fn add_subchunk<'a, I>(
        &mut self,
        chunk: usize,
        subchunk: usize,
        num_cells: usize,
        num_orig_flagged: usize,
        num_new_flagged: usize,
        unflagged_weights: I,
    ) where
        I: IntoIterator<Item = &'a f32>,
    {
        if !self.is_new_subchunk(chunk, subchunk) {
            return;
        }
        self.last_subchunk = Some((chunk, subchunk));
        self.num_total += num_cells;
        self.num_orig_flagged += num_orig_flagged;
        self.num_new_flagged += num_new_flagged;
        for &w in unflagged_weights {
            self.weights.add(f64::from(w));
        }
    }

    /// Merge the counters of an aggregated chunk.
    pub(super) fn add_chunk(&mut self, chunk: usize, spw: usize, counts: SampleCounts) {
        if self.last_chunk.map(|last| chunk <= last).unwrap_or(false) {
            return;
        }
        self.last_chunk = Some(chunk);
        let entry = self.sample_counts.entry(spw).or_default();
        entry.nonzero_variance += counts.nonzero_variance;
        entry.real_imag_discrepant += counts.real_imag_discrepant;
    }

    pub fn flagging(&self) -> FlaggingSummary {
        let mut sample_counts: Vec<(usize, SampleCounts)> =
            self.sample_counts.iter().map(|(&s, &c)| (s, c)).collect();
        sample_counts.sort_unstable_by_key(|(spw, _)| *spw);
        FlaggingSummary {
            num_total: self.num_total,
            num_orig_flagged: self.num_orig_flagged,
            num_new_flagged: self.num_new_flagged,
            sample_counts,
        }
    }

    pub fn weight_statistics(&self) -> WeightStatistics {
        let Accumulator { count, mean, m2 } = self.weights;
        if count == 0 {
            WeightStatistics {
                count,
                mean: f64::NAN,
                variance: f64::NAN,
            }
        } else {
            WeightStatistics {
                count,
                mean,
                variance: m2 / count as f64,
            }
        }
    }
}

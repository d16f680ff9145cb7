// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod properties;
mod scenarios;

use ndarray::prelude::*;

use statwt::{
    c32, run_statwt, Epoch, MemorySource, MemorySubchunk, ReweightingTransform, SpectralWindow,
    StatWtArgs, StatWtReport, VisColumn,
};

const FIRST_GPS_TIME: f64 = 1090008640.0;

/// A single-baseline observation. Each subchunk holds one timestamp; there
/// are `chunk_sizes[i]` subchunks in chunk `i`. `vis` is called with
/// (timestamp index, channel, polarisation) and `flag` with the same
/// arguments.
struct Observation {
    num_chans: usize,
    num_pols: usize,
    chunk_sizes: Vec<usize>,
}

impl Observation {
    fn new(num_chans: usize, num_pols: usize, chunk_sizes: &[usize]) -> Observation {
        Observation {
            num_chans,
            num_pols,
            chunk_sizes: chunk_sizes.to_vec(),
        }
    }

    fn num_times(&self) -> usize {
        self.chunk_sizes.iter().sum()
    }

    fn spw(&self) -> SpectralWindow {
        SpectralWindow {
            id: 0,
            chan_freqs: (0..self.num_chans)
                .map(|c| 180e6 + c as f64 * 40e3)
                .collect(),
        }
    }

    fn build<V>(&self, vis: V) -> MemorySource
    where
        V: Fn(usize, usize, usize) -> c32,
    {
        self.build_flagged(vis, |_, _, _| false)
    }

    fn build_flagged<V, F>(&self, vis: V, flag: F) -> MemorySource
    where
        V: Fn(usize, usize, usize) -> c32,
        F: Fn(usize, usize, usize) -> bool,
    {
        let shape = (1, self.num_chans, self.num_pols);
        let mut i_time = 0;
        let mut chunks = vec![];
        for &chunk_size in &self.chunk_sizes {
            let mut chunk = vec![];
            for _ in 0..chunk_size {
                let vis_rfp = Array3::from_shape_fn(shape, |(_, c, p)| vis(i_time, c, p));
                let mut subchunk = MemorySubchunk::new(
                    0,
                    vec![0],
                    vec![1],
                    vec![Epoch::from_gpst_seconds(FIRST_GPS_TIME + 8.0 * i_time as f64)],
                    i_time,
                    VisColumn::Corrected,
                    vis_rfp,
                );
                subchunk.flags_rfp = Array3::from_shape_fn(shape, |(_, c, p)| flag(i_time, c, p));
                chunk.push(subchunk);
                i_time += 1;
            }
            chunks.push(chunk);
        }
        MemorySource::new(vec![self.spw()], chunks).unwrap()
    }
}

/// Values alternating between `a` and `-a` (in both the real and imaginary
/// parts) over time have a variance of a².
fn alternating(a: f32) -> impl Fn(usize, usize, usize) -> c32 {
    move |i_time, _, _| {
        let v = if i_time % 2 == 0 { a } else { -a };
        c32::new(v, v)
    }
}

/// Run over everything and hand back the reweighted source.
fn reweight(source: MemorySource, args: StatWtArgs) -> (MemorySource, StatWtReport) {
    let mut transform = ReweightingTransform::from_args(source, args).unwrap();
    let report = run_statwt(&mut transform, false).unwrap();
    (transform.into_inner(), report)
}

/// The row weights of every subchunk, in order.
fn all_weights(source: &MemorySource) -> Vec<f32> {
    source
        .chunks()
        .iter()
        .flatten()
        .flat_map(|s| s.weights_rp.iter().copied().collect::<Vec<_>>())
        .collect()
}

fn all_flags(source: &MemorySource) -> Vec<bool> {
    source
        .chunks()
        .iter()
        .flatten()
        .flat_map(|s| s.flags_rfp.iter().copied().collect::<Vec<_>>())
        .collect()
}

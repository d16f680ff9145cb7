// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A [`SampleSource`] over visibilities that are already in memory.

use hifitime::Epoch;
use log::trace;
use ndarray::prelude::*;
use num_complex::Complex32 as c32;

use super::{SampleSource, SourceError, SpectralWindow, VisChanges, VisColumn};

/// One subchunk's worth of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySubchunk {
    pub spw: usize,
    pub antenna1: Vec<usize>,
    pub antenna2: Vec<usize>,
    pub times: Vec<Epoch>,
    pub row_ids: Vec<usize>,
    pub data_rfp: Option<Array3<c32>>,
    pub corrected_rfp: Option<Array3<c32>>,
    pub model_rfp: Option<Array3<c32>>,
    pub flags_rfp: Array3<bool>,
    pub weights_rp: Array2<f32>,
    pub weight_spectrum_rfp: Option<Array3<f32>>,
    pub sigmas_rp: Array2<f32>,
    pub sigma_spectrum_rfp: Option<Array3<f32>>,
}

impl MemorySubchunk {
    /// A subchunk with visibilities in a single column. Nothing is flagged,
    /// all weights and sigmas are 1 and there are no spectra. Row IDs are
    /// numbered from `first_row_id`.
    pub fn new(
        spw: usize,
        antenna1: Vec<usize>,
        antenna2: Vec<usize>,
        times: Vec<Epoch>,
        first_row_id: usize,
        column: VisColumn,
        vis_rfp: Array3<c32>,
    ) -> MemorySubchunk {
        let (num_rows, num_chans, num_pols) = vis_rfp.dim();
        let mut subchunk = MemorySubchunk {
            spw,
            antenna1,
            antenna2,
            times,
            row_ids: (first_row_id..first_row_id + num_rows).collect(),
            data_rfp: None,
            corrected_rfp: None,
            model_rfp: None,
            flags_rfp: Array3::from_elem((num_rows, num_chans, num_pols), false),
            weights_rp: Array2::ones((num_rows, num_pols)),
            weight_spectrum_rfp: None,
            sigmas_rp: Array2::ones((num_rows, num_pols)),
            sigma_spectrum_rfp: None,
        };
        *subchunk.column_mut(column) = Some(vis_rfp);
        subchunk
    }

    pub fn column(&self, column: VisColumn) -> Option<&Array3<c32>> {
        match column {
            VisColumn::Data => self.data_rfp.as_ref(),
            VisColumn::Corrected => self.corrected_rfp.as_ref(),
            VisColumn::Model => self.model_rfp.as_ref(),
        }
    }

    pub fn column_mut(&mut self, column: VisColumn) -> &mut Option<Array3<c32>> {
        match column {
            VisColumn::Data => &mut self.data_rfp,
            VisColumn::Corrected => &mut self.corrected_rfp,
            VisColumn::Model => &mut self.model_rfp,
        }
    }

    fn num_rows(&self) -> usize {
        self.flags_rfp.len_of(Axis(0))
    }

    fn check(&self, chunk: usize, subchunk: usize, num_chans: usize) -> Result<(), SourceError> {
        let (num_rows, flag_chans, num_pols) = self.flags_rfp.dim();
        let bad_shape = |what, expected: &[usize], got: &[usize]| SourceError::BadShape {
            chunk,
            subchunk,
            what,
            expected: expected.to_vec(),
            got: got.to_vec(),
        };

        let rfp = [num_rows, num_chans, num_pols];
        let rp = [num_rows, num_pols];
        if flag_chans != num_chans {
            return Err(bad_shape("flags", &rfp, self.flags_rfp.shape()));
        }
        for (what, len) in [
            ("antenna1", self.antenna1.len()),
            ("antenna2", self.antenna2.len()),
            ("times", self.times.len()),
            ("row_ids", self.row_ids.len()),
        ] {
            if len != num_rows {
                return Err(bad_shape(what, &[num_rows], &[len]));
            }
        }
        for (what, vis) in [
            ("data", &self.data_rfp),
            ("corrected data", &self.corrected_rfp),
            ("model data", &self.model_rfp),
        ] {
            if let Some(vis) = vis {
                if vis.shape() != rfp {
                    return Err(bad_shape(what, &rfp, vis.shape()));
                }
            }
        }
        for (what, a) in [("weights", &self.weights_rp), ("sigmas", &self.sigmas_rp)] {
            if a.shape() != rp {
                return Err(bad_shape(what, &rp, a.shape()));
            }
        }
        for (what, a) in [
            ("weight spectrum", &self.weight_spectrum_rfp),
            ("sigma spectrum", &self.sigma_spectrum_rfp),
        ] {
            if let Some(a) = a {
                if a.shape() != rfp {
                    return Err(bad_shape(what, &rfp, a.shape()));
                }
            }
        }
        if self.times.windows(2).any(|w| w[1] < w[0]) {
            return Err(SourceError::Inconsistent {
                chunk,
                subchunk,
                msg: "timestamps are not in time order".to_string(),
            });
        }
        Ok(())
    }
}

/// Chunks of subchunks held in memory. Changes written back are applied to
/// the held subchunks and recorded.
#[derive(Debug, Clone)]
pub struct MemorySource {
    spws: Vec<SpectralWindow>,
    chunks: Vec<Vec<MemorySubchunk>>,
    i_chunk: usize,
    i_subchunk: usize,
    has_data: bool,
    has_corrected: bool,
    has_model: bool,
    has_weight_spectrum: bool,
    has_sigma_spectrum: bool,
    written: Vec<VisChanges>,
}

impl MemorySource {
    pub fn new(
        spws: Vec<SpectralWindow>,
        chunks: Vec<Vec<MemorySubchunk>>,
    ) -> Result<MemorySource, SourceError> {
        for (i_chunk, chunk) in chunks.iter().enumerate() {
            let chunk_spw = match chunk.first() {
                Some(s) => s.spw,
                None => {
                    return Err(SourceError::Inconsistent {
                        chunk: i_chunk,
                        subchunk: 0,
                        msg: "chunk has no subchunks".to_string(),
                    })
                }
            };
            let spw = spws
                .iter()
                .find(|s| s.id == chunk_spw)
                .ok_or(SourceError::UnknownSpw(chunk_spw))?;
            for (i_subchunk, subchunk) in chunk.iter().enumerate() {
                if subchunk.spw != chunk_spw {
                    return Err(SourceError::Inconsistent {
                        chunk: i_chunk,
                        subchunk: i_subchunk,
                        msg: format!(
                            "spectral window {} differs from the chunk's spectral window {chunk_spw}",
                            subchunk.spw
                        ),
                    });
                }
                subchunk.check(i_chunk, i_subchunk, spw.num_chans())?;
            }
        }

        let all = |f: fn(&MemorySubchunk) -> bool| {
            !chunks.is_empty() && chunks.iter().flatten().all(f)
        };
        let has_data = all(|s| s.data_rfp.is_some());
        let has_corrected = all(|s| s.corrected_rfp.is_some());
        let has_model = all(|s| s.model_rfp.is_some());
        let has_weight_spectrum = all(|s| s.weight_spectrum_rfp.is_some());
        let has_sigma_spectrum = all(|s| s.sigma_spectrum_rfp.is_some());

        Ok(MemorySource {
            spws,
            chunks,
            i_chunk: 0,
            i_subchunk: 0,
            has_data,
            has_corrected,
            has_model,
            has_weight_spectrum,
            has_sigma_spectrum,
            written: vec![],
        })
    }

    /// All changes written back so far, in the order they were written.
    pub fn written(&self) -> &[VisChanges] {
        &self.written
    }

    pub fn chunks(&self) -> &[Vec<MemorySubchunk>] {
        &self.chunks
    }

    fn current(&self) -> Option<&MemorySubchunk> {
        self.chunks.get(self.i_chunk)?.get(self.i_subchunk)
    }

    fn current_or_err(&self) -> Result<&MemorySubchunk, SourceError> {
        self.current().ok_or(SourceError::NoCurrent("subchunk"))
    }
}

impl SampleSource for MemorySource {
    fn spectral_windows(&self) -> &[SpectralWindow] {
        &self.spws
    }

    fn origin_chunks(&mut self) -> Result<(), SourceError> {
        self.i_chunk = 0;
        self.i_subchunk = 0;
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<(), SourceError> {
        if !self.more_chunks() {
            return Err(SourceError::NoCurrent("chunk"));
        }
        self.i_chunk += 1;
        self.i_subchunk = 0;
        Ok(())
    }

    fn more_chunks(&self) -> bool {
        self.i_chunk < self.chunks.len()
    }

    fn origin(&mut self) -> Result<(), SourceError> {
        if !self.more_chunks() {
            return Err(SourceError::NoCurrent("chunk"));
        }
        self.i_subchunk = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<(), SourceError> {
        if !self.more() {
            return Err(SourceError::NoCurrent("subchunk"));
        }
        self.i_subchunk += 1;
        Ok(())
    }

    fn more(&self) -> bool {
        self.current().is_some()
    }

    fn chunk_index(&self) -> usize {
        self.i_chunk
    }

    fn subchunk_index(&self) -> usize {
        self.i_subchunk
    }

    fn num_rows(&self) -> usize {
        self.current().map(|s| s.num_rows()).unwrap_or(0)
    }

    fn num_chans(&self) -> usize {
        self.current().map(|s| s.flags_rfp.len_of(Axis(1))).unwrap_or(0)
    }

    fn num_pols(&self) -> usize {
        self.current().map(|s| s.flags_rfp.len_of(Axis(2))).unwrap_or(0)
    }

    fn spw(&self) -> usize {
        self.chunks
            .get(self.i_chunk)
            .and_then(|c| c.first())
            .map(|s| s.spw)
            .unwrap_or(0)
    }

    fn antenna1(&self) -> &[usize] {
        self.current().map(|s| s.antenna1.as_slice()).unwrap_or(&[])
    }

    fn antenna2(&self) -> &[usize] {
        self.current().map(|s| s.antenna2.as_slice()).unwrap_or(&[])
    }

    fn times(&self) -> &[Epoch] {
        self.current().map(|s| s.times.as_slice()).unwrap_or(&[])
    }

    fn row_ids(&self) -> &[usize] {
        self.current().map(|s| s.row_ids.as_slice()).unwrap_or(&[])
    }

    fn has_column(&self, column: VisColumn) -> bool {
        match column {
            VisColumn::Data => self.has_data,
            VisColumn::Corrected => self.has_corrected,
            VisColumn::Model => self.has_model,
        }
    }

    fn has_weight_spectrum(&self) -> bool {
        self.has_weight_spectrum
    }

    fn has_sigma_spectrum(&self) -> bool {
        self.has_sigma_spectrum
    }

    fn vis_rfp(&self, column: VisColumn) -> Option<ArrayView3<c32>> {
        self.current()?.column(column).map(|a| a.view())
    }

    fn flags_rfp(&mut self) -> Result<Array3<bool>, SourceError> {
        Ok(self.current_or_err()?.flags_rfp.clone())
    }

    fn flag_row(&mut self) -> Result<Array1<bool>, SourceError> {
        let s = self.current_or_err()?;
        Ok(s.flags_rfp
            .outer_iter()
            .map(|row| row.iter().all(|&f| f))
            .collect())
    }

    fn weights_rp(&mut self) -> Result<Array2<f32>, SourceError> {
        Ok(self.current_or_err()?.weights_rp.clone())
    }

    fn weight_spectrum_rfp(&mut self) -> Result<Option<Array3<f32>>, SourceError> {
        Ok(self.current_or_err()?.weight_spectrum_rfp.clone())
    }

    fn sigmas_rp(&mut self) -> Result<Array2<f32>, SourceError> {
        Ok(self.current_or_err()?.sigmas_rp.clone())
    }

    fn sigma_spectrum_rfp(&mut self) -> Result<Option<Array3<f32>>, SourceError> {
        Ok(self.current_or_err()?.sigma_spectrum_rfp.clone())
    }

    fn write_back_changes(&mut self, changes: VisChanges) -> Result<(), SourceError> {
        let (i_chunk, i_subchunk) = (self.i_chunk, self.i_subchunk);
        if (changes.chunk, changes.subchunk) != (i_chunk, i_subchunk) {
            return Err(SourceError::Inconsistent {
                chunk: i_chunk,
                subchunk: i_subchunk,
                msg: format!(
                    "changes are for chunk {} subchunk {}",
                    changes.chunk, changes.subchunk
                ),
            });
        }
        let subchunk = self
            .chunks
            .get_mut(i_chunk)
            .and_then(|c| c.get_mut(i_subchunk))
            .ok_or(SourceError::NoCurrent("subchunk"))?;

        let rfp = subchunk.flags_rfp.shape().to_vec();
        let rp = subchunk.weights_rp.shape().to_vec();
        let check = |what, expected: &[usize], got: &[usize]| {
            if expected == got {
                Ok(())
            } else {
                Err(SourceError::BadShape {
                    chunk: i_chunk,
                    subchunk: i_subchunk,
                    what,
                    expected: expected.to_vec(),
                    got: got.to_vec(),
                })
            }
        };
        if let Some(a) = changes.weights_rp.as_ref() {
            check("weights", &rp, a.shape())?;
        }
        if let Some(a) = changes.sigmas_rp.as_ref() {
            check("sigmas", &rp, a.shape())?;
        }
        if let Some(a) = changes.weight_spectrum_rfp.as_ref() {
            check("weight spectrum", &rfp, a.shape())?;
        }
        if let Some(a) = changes.sigma_spectrum_rfp.as_ref() {
            check("sigma spectrum", &rfp, a.shape())?;
        }
        if let Some(a) = changes.flags_rfp.as_ref() {
            check("flags", &rfp, a.shape())?;
        }

        if let Some(a) = changes.weights_rp.clone() {
            subchunk.weights_rp = a;
        }
        if let Some(a) = changes.sigmas_rp.clone() {
            subchunk.sigmas_rp = a;
        }
        if let Some(a) = changes.weight_spectrum_rfp.clone() {
            subchunk.weight_spectrum_rfp = Some(a);
        }
        if let Some(a) = changes.sigma_spectrum_rfp.clone() {
            subchunk.sigma_spectrum_rfp = Some(a);
        }
        if let Some(a) = changes.flags_rfp.clone() {
            subchunk.flags_rfp = a;
        }
        trace!("Wrote back changes for chunk {i_chunk} subchunk {i_subchunk}");
        self.written.push(changes);
        Ok(())
    }
}

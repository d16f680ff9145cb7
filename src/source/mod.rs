// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Chunked, pull-based sources of visibility samples.
//!
//! A source yields chunks, and each chunk is made of subchunks. All rows of a
//! chunk belong to the same spectral window. Per-subchunk arrays are indexed
//! `[row, channel, polarisation]` (the `_rfp` suffix) or `[row,
//! polarisation]` (`_rp`).

mod error;
mod memory;

pub use error::SourceError;
pub use memory::{MemorySource, MemorySubchunk};

use hifitime::Epoch;
use ndarray::prelude::*;
use num_complex::Complex32 as c32;
use strum_macros::{Display, EnumIter, IntoStaticStr};

/// A spectral window and the frequencies of its channels [Hz].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralWindow {
    pub id: usize,
    pub chan_freqs: Vec<f64>,
}

impl SpectralWindow {
    pub fn num_chans(&self) -> usize {
        self.chan_freqs.len()
    }
}

/// The complex visibility columns a source may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum VisColumn {
    #[strum(serialize = "DATA")]
    Data,

    #[strum(serialize = "CORRECTED_DATA")]
    Corrected,

    #[strum(serialize = "MODEL_DATA")]
    Model,
}

/// New values for the current subchunk, handed to
/// [`SampleSource::write_back_changes`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisChanges {
    pub chunk: usize,
    pub subchunk: usize,
    pub weights_rp: Option<Array2<f32>>,
    pub weight_spectrum_rfp: Option<Array3<f32>>,
    pub sigmas_rp: Option<Array2<f32>>,
    pub sigma_spectrum_rfp: Option<Array3<f32>>,
    pub flags_rfp: Option<Array3<bool>>,
    pub flag_row: Option<Array1<bool>>,
}

/// A chunked iterator over visibilities.
///
/// Metadata accessors describe the current subchunk. Accessors that may need
/// to compute something take `&mut self` and return owned arrays.
pub trait SampleSource {
    fn spectral_windows(&self) -> &[SpectralWindow];

    /// Rewind to the first chunk.
    fn origin_chunks(&mut self) -> Result<(), SourceError>;

    /// Advance to the next chunk.
    fn next_chunk(&mut self) -> Result<(), SourceError>;

    /// Is there a current chunk?
    fn more_chunks(&self) -> bool;

    /// Rewind to the first subchunk of the current chunk.
    fn origin(&mut self) -> Result<(), SourceError>;

    /// Advance to the next subchunk of the current chunk.
    fn next(&mut self) -> Result<(), SourceError>;

    /// Is there a current subchunk?
    fn more(&self) -> bool;

    fn chunk_index(&self) -> usize;

    fn subchunk_index(&self) -> usize;

    fn num_rows(&self) -> usize;

    fn num_chans(&self) -> usize;

    fn num_pols(&self) -> usize;

    /// The spectral window of the current subchunk.
    fn spw(&self) -> usize;

    fn antenna1(&self) -> &[usize];

    fn antenna2(&self) -> &[usize];

    /// The timestamp of each row.
    fn times(&self) -> &[Epoch];

    /// Row numbers in the underlying store.
    fn row_ids(&self) -> &[usize];

    /// Does every subchunk of this source have the column?
    fn has_column(&self, column: VisColumn) -> bool;

    fn has_weight_spectrum(&self) -> bool;

    fn has_sigma_spectrum(&self) -> bool;

    /// The visibilities of a column for the current subchunk, if it has it.
    fn vis_rfp(&self, column: VisColumn) -> Option<ArrayView3<c32>>;

    fn flags_rfp(&mut self) -> Result<Array3<bool>, SourceError>;

    fn flag_row(&mut self) -> Result<Array1<bool>, SourceError>;

    fn weights_rp(&mut self) -> Result<Array2<f32>, SourceError>;

    /// `None` if there is no weight spectrum.
    fn weight_spectrum_rfp(&mut self) -> Result<Option<Array3<f32>>, SourceError>;

    fn sigmas_rp(&mut self) -> Result<Array2<f32>, SourceError>;

    /// `None` if there is no sigma spectrum.
    fn sigma_spectrum_rfp(&mut self) -> Result<Option<Array3<f32>>, SourceError>;

    /// Hand new values for the current subchunk to the source.
    fn write_back_changes(&mut self, changes: VisChanges) -> Result<(), SourceError>;
}

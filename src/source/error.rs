// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::VisColumn;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Weights have not been computed yet; a chunk must be aggregated before weights or flags are requested")]
    NotReady,

    #[error("The {0} column is not available")]
    MissingColumn(VisColumn),

    #[error("There is no current {0}; the iteration is exhausted or has not started")]
    NoCurrent(&'static str),

    #[error("Chunk {chunk} subchunk {subchunk}: {what} has shape {got:?}, but {expected:?} was expected")]
    BadShape {
        chunk: usize,
        subchunk: usize,
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Chunk {chunk} subchunk {subchunk}: {msg}")]
    Inconsistent {
        chunk: usize,
        subchunk: usize,
        msg: String,
    },

    #[error("Spectral window {0} is not known to the source")]
    UnknownSpw(usize),

    #[error("{0}")]
    Generic(String),
}

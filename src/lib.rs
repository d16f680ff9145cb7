// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Statistical reweighting of radio-interferometric visibilities.

Visibility weights are replaced by the inverse of the variance of the samples
around them, with units whose variance can't be trusted flagged.
 */

pub mod aggregate;
pub mod apply;
pub mod chan_bins;
pub mod config;
pub mod constants;
mod error;
pub(crate) mod math;
mod messages;
pub(crate) mod printers;
pub mod source;
pub mod stats;
pub mod transform;
pub mod unit_parsing;


// Re-exports.
pub use aggregate::{BlockAggregator, DataAggregator, SlidingWindowAggregator, TimeAlign, TimeBin};
pub use apply::{run_statwt, ColumnWritePlan, StatWtReport};
pub use chan_bins::{BinMap, ChanBin, ChanBinPolicy};
pub use config::{DataColumn, StatWtArgs, StatWtParams};
pub use error::StatWtError;
pub use source::{MemorySource, MemorySubchunk, SampleSource, SpectralWindow, VisChanges, VisColumn};
pub use stats::{RobustEstimator, VarianceEstimate};
pub use transform::ReweightingTransform;

// External re-exports.
pub use hifitime::{Duration, Epoch};
pub use num_complex::Complex32 as c32;

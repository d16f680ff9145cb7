// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Driving a [`ReweightingTransform`] over a whole source and writing its
//! results back.


use log::{debug, info};
use ndarray::prelude::*;
use serde::Serialize;

use crate::{
    config::DataColumn,
    error::StatWtError,
    source::{SampleSource, VisChanges, VisColumn},
    transform::{FlaggingSummary, ReweightingTransform, WeightStatistics},
};

/// Which weight and sigma columns a run writes. Flags are always written
/// unless previewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWritePlan {
    pub preview: bool,
    pub must_write_wt: bool,
    pub must_write_wt_sp: bool,
    pub must_write_sig: bool,
    pub must_write_sig_sp: bool,
}

impl ColumnWritePlan {
    /// `chan_binned` is true when channels are binned more finely than whole
    /// spectral windows. `wt_sp_init` and `sig_sp_init` say whether the source
    /// already has weight and sigma spectra.
    pub fn new(
        data_column: DataColumn,
        preview: bool,
        chan_binned: bool,
        wt_sp_init: bool,
        sig_sp_init: bool,
        has_corrected: bool,
    ) -> ColumnWritePlan {
        let must_write_sig = data_column.must_compute_sigma() && !preview;
        let must_write_sig_sp = must_write_sig && (sig_sp_init || chan_binned);
        let must_write_wt = !preview && (!must_write_sig || !has_corrected);
        let must_write_wt_sp = must_write_wt && (wt_sp_init || chan_binned);

        let plan = ColumnWritePlan {
            preview,
            must_write_wt,
            must_write_wt_sp,
            must_write_sig,
            must_write_sig_sp,
        };
        plan.log();
        plan
    }

    /// The plan for a transform and its wrapped source.
    pub fn for_transform<S: SampleSource>(
        transform: &ReweightingTransform<S>,
        preview: bool,
    ) -> ColumnWritePlan {
        let base = transform.base();
        ColumnWritePlan::new(
            transform.params().data_column,
            preview,
            transform.params().bin_map.must_compute_spectrum(),
            base.has_weight_spectrum(),
            base.has_sigma_spectrum(),
            base.has_column(VisColumn::Corrected),
        )
    }

    fn log(&self) {
        if self.preview {
            info!("Preview only; nothing will be written");
            return;
        }
        match (self.must_write_wt, self.must_write_sig) {
            (true, true) => info!(
                "There is no {} column; updating weights and sigmas from the {} column",
                VisColumn::Corrected,
                VisColumn::Data
            ),
            (true, false) => info!(
                "Updating weights. Sigmas are not recalculated, as they relate to the {} column",
                VisColumn::Data
            ),
            (false, true) => info!(
                "Updating sigmas. Weights are not recalculated, as they relate to the {} column",
                VisColumn::Corrected
            ),
            (false, false) => (),
        }
        debug!("{self:?}");
    }
}

/// The outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatWtReport {
    pub flagging: FlaggingSummary,
    pub weights: WeightStatistics,
}

/// Iterate over every chunk and subchunk of the transform, handing the
/// planned columns back to the source. With `preview`, everything is
/// computed but nothing is written.
pub fn run_statwt<S: SampleSource>(
    transform: &mut ReweightingTransform<S>,
    preview: bool,
) -> Result<StatWtReport, StatWtError> {
    let plan = ColumnWritePlan::for_transform(transform, preview);

    transform.origin_chunks()?;
    while transform.more_chunks() {
        transform.origin()?;
        while transform.more() {
            let mut changes = VisChanges {
                chunk: transform.chunk_index(),
                subchunk: transform.subchunk_index(),
                ..Default::default()
            };

            // This also accumulates the summary.
            let flags_rfp = transform.flags_rfp()?;
            if !plan.preview {
                changes.flag_row = Some(transform.flag_row()?);
                changes.flags_rfp = Some(flags_rfp);
            }
            if plan.must_write_wt {
                changes.weights_rp = Some(transform.weights_rp()?);
            }
            if plan.must_write_wt_sp {
                changes.weight_spectrum_rfp = transform.weight_spectrum_rfp()?;
            }
            if plan.must_write_sig {
                changes.sigmas_rp = Some(transform.sigmas_rp()?);
            }
            if plan.must_write_sig_sp {
                changes.sigma_spectrum_rfp = match transform.sigma_spectrum_rfp()? {
                    Some(s) => Some(s),
                    // Without per-channel weights, each channel gets the
                    // row's sigma.
                    None => {
                        let sigmas_rp = transform.sigmas_rp()?;
                        let num_chans = transform.num_chans();
                        let (num_rows, num_pols) = sigmas_rp.dim();
                        Some(
                            sigmas_rp
                                .insert_axis(Axis(1))
                                .broadcast((num_rows, num_chans, num_pols))
                                .map(|b| b.to_owned())
                                .unwrap_or_else(|| Array3::zeros((num_rows, num_chans, num_pols))),
                        )
                    }
                };
            }

            if !plan.preview {
                transform.write_back_changes(changes)?;
            }
            transform.next()?;
        }
        transform.next_chunk()?;
    }

    Ok(StatWtReport {
        flagging: transform.summarize_flagging(),
        weights: transform.summarize_statistics(),
    })
}

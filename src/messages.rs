// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Messages to report to the user.
//!
//! The details of a reweighting are worked out in different places, so they
//! are collected here and printed together.

use std::borrow::Cow;

use log::warn;

use crate::{
    config::{format_chan_ranges, StatWtParams},
    constants::REAL_IMAG_VARIANCE_TOLERANCE,
    printers::BlockPrinter,
    source::SpectralWindow,
    transform::{FlaggingSummary, WeightStatistics},
};

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct TransformDetails<'a> {
    pub(crate) params: &'a StatWtParams,
    pub(crate) spws: &'a [SpectralWindow],
    pub(crate) aggregator: String,
    pub(crate) must_compute_spectrum: bool,
    pub(crate) must_compute_sigma: bool,
    pub(crate) update_weight: bool,
}

impl TransformDetails<'_> {
    pub(crate) fn print(self) {
        let params = self.params;
        let mut printer = BlockPrinter::info("Statistical reweighting");

        printer.push_block(vec![
            format!("Estimating variances from the {} samples", params.data_column).into(),
            format!("using the {} estimator", params.estimator).into(),
            format!("over {} aggregation", self.aggregator).into(),
        ]);

        let mut block = vec![format!(
            "At least {} usable samples per unit",
            params.min_samp
        )
        .into()];
        if params.combine_pols {
            block.push("Polarisations are combined".into());
        }
        if let Some((low, high)) = params.wt_range {
            block.push(format!("Weights outside [{low}, {high}] are flagged").into());
        }
        printer.push_block(block);

        let mut block: Vec<Cow<'static, str>> = vec![];
        for spw in self.spws {
            let num_bins = params.bin_map.bins(spw.id).map(|b| b.len()).unwrap_or(0);
            let bins = if num_bins == 1 {
                "1 channel bin".to_string()
            } else {
                format!("{num_bins} channel bins")
            };
            match params.excluded_chans.get(&spw.id) {
                Some(excluded) => {
                    let used: Vec<bool> = excluded.iter().map(|e| !e).collect();
                    block.push(
                        format!(
                            "spw {}: {bins}, estimating with channels {}",
                            spw.id,
                            format_chan_ranges(&used)
                        )
                        .into(),
                    );
                }
                None => block.push(
                    format!("spw {}: {bins}, estimating with all channels", spw.id).into(),
                ),
            }
        }
        printer.push_block(block);

        let mut block: Vec<Cow<'static, str>> = vec![];
        block.push(
            if self.must_compute_spectrum {
                "Computing weight spectra"
            } else {
                "Computing one weight per row and polarisation"
            }
            .into(),
        );
        if !self.update_weight {
            block.push("Weights are not updated (a corrected column exists)".into());
        }
        if self.must_compute_sigma {
            block.push("Sigmas are derived from the new weights".into());
        }
        printer.push_block(block);

        printer.display();
    }
}

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct FlaggingReport<'a> {
    pub(crate) summary: &'a FlaggingSummary,
}

impl FlaggingReport<'_> {
    pub(crate) fn print(self) {
        let s = self.summary;
        let mut printer = BlockPrinter::info("Flagging summary");
        printer.push_block(vec![
            format!(
                "{} of {} samples ({:.3}%) were flagged before reweighting",
                s.num_orig_flagged,
                s.num_total,
                s.orig_flagged_percent()
            )
            .into(),
            format!(
                "{} samples ({:.3}%) were newly flagged",
                s.num_new_flagged,
                s.new_flagged_percent()
            )
            .into(),
        ]);

        if !s.sample_counts.is_empty() {
            let mut block = vec![format!(
                "{:>6} {:>14} {:>26}",
                "spw",
                "var > 0",
                format!(
                    "re/im var differ > {}%",
                    (REAL_IMAG_VARIANCE_TOLERANCE * 100.0).round()
                )
            )
            .into()];
            for (spw, counts) in &s.sample_counts {
                block.push(
                    format!(
                        "{spw:>6} {:>14} {:>26}",
                        counts.nonzero_variance, counts.real_imag_discrepant
                    )
                    .into(),
                );
            }
            printer.push_block(block);
        }
        printer.display();

        if s.num_total == 0 {
            warn!("No samples were reweighted");
        } else if s.all_orig_flagged() {
            warn!("All data were originally flagged");
        } else if s.all_flagged() {
            warn!("All remaining data were flagged by the reweighting");
        }
    }
}

#[must_use = "This struct must be consumed with its print() method"]
pub(crate) struct StatisticsReport<'a> {
    pub(crate) statistics: &'a WeightStatistics,
}

impl StatisticsReport<'_> {
    pub(crate) fn print(self) {
        let WeightStatistics {
            count,
            mean,
            variance,
        } = *self.statistics;
        let mut printer =
            BlockPrinter::info(format!("Statistics of the {count} unflagged weights"));
        printer.push_line(format!("mean:     {mean}"));
        printer.push_line(format!("variance: {variance}"));
        printer.display();
        if mean.is_nan() || variance.is_nan() {
            warn!("The mean and variance of the weights could not be determined. Perhaps all the data were originally flagged, or the sample size was consistently too small");
        }
    }
}


// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Grouping of each spectral window's channels into contiguous bins. Every
//! bin is a single statistical population when estimating variances.

mod error;

pub use error::ChanBinError;

use indexmap::IndexMap;
use log::debug;
use vec1::Vec1;

use crate::{
    constants::CHANBIN_WHOLE_SPW,
    source::SpectralWindow,
    unit_parsing::{parse_freq, FreqFormat},
};

/// An inclusive range of channels within one spectral window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChanBin {
    pub start: usize,
    pub end: usize,
}

impl ChanBin {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, chan: usize) -> bool {
        (self.start..=self.end).contains(&chan)
    }
}

impl std::fmt::Display for ChanBin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}~{}", self.start, self.end)
    }
}

/// How channels are grouped into bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChanBinPolicy {
    /// One bin spanning all the channels of a spectral window.
    WholeSpw,

    /// Bins of this many channels; the final bin of a window may be narrower.
    Width(usize),

    /// Bins are grown until the frequency distance from the first channel of
    /// the bin exceeds this many Hz.
    FreqWidth(f64),
}

impl ChanBinPolicy {
    /// Interpret an integer channel bin width.
    pub fn from_int(width: i64) -> Result<ChanBinPolicy, ChanBinError> {
        if width < 1 {
            return Err(ChanBinError::NonPositiveWidth(width));
        }
        Ok(ChanBinPolicy::Width(width as usize))
    }

    /// Interpret a string channel bin width; either the whole-window keyword
    /// or a frequency quantity (e.g. "200kHz").
    pub fn from_str_quantity(s: &str) -> Result<ChanBinPolicy, ChanBinError> {
        if s.trim().eq_ignore_ascii_case(CHANBIN_WHOLE_SPW) {
            return Ok(ChanBinPolicy::WholeSpw);
        }

        let (quantity, unit) = parse_freq(s)?;
        match unit {
            FreqFormat::NoUnit => Err(ChanBinError::NotAFrequency(s.to_string())),
            _ => {
                // Only `NoUnit` has no conversion.
                let hz = unit.to_hz(quantity).unwrap_or(quantity);
                if hz <= 0.0 || !hz.is_finite() {
                    return Err(ChanBinError::NonPositiveFreqWidth(hz));
                }
                Ok(ChanBinPolicy::FreqWidth(hz))
            }
        }
    }
}

/// The channel bins of every spectral window, keyed by the window ID.
#[derive(Debug, Clone)]
pub struct BinMap {
    bins: IndexMap<usize, Vec1<ChanBin>>,

    /// Whether a single weight per row and polarisation is insufficient to
    /// represent the binned statistics.
    must_compute_spectrum: bool,
}

impl BinMap {
    pub fn new(spws: &[SpectralWindow], policy: ChanBinPolicy) -> Result<BinMap, ChanBinError> {
        let mut bins = IndexMap::with_capacity(spws.len());
        for spw in spws {
            let freqs = &spw.chan_freqs;
            let num_chans = freqs.len();
            if num_chans == 0 {
                return Err(ChanBinError::NoChannels(spw.id));
            }
            let last_chan = num_chans - 1;

            let spw_bins: Vec<ChanBin> = match policy {
                ChanBinPolicy::WholeSpw => vec![ChanBin {
                    start: 0,
                    end: last_chan,
                }],

                ChanBinPolicy::Width(width) => {
                    if width == 0 {
                        return Err(ChanBinError::NonPositiveWidth(0));
                    }
                    (0..num_chans)
                        .step_by(width)
                        .map(|start| ChanBin {
                            start,
                            end: (start + width - 1).min(last_chan),
                        })
                        .collect()
                }

                ChanBinPolicy::FreqWidth(width_hz) => {
                    if width_hz <= 0.0 || !width_hz.is_finite() {
                        return Err(ChanBinError::NonPositiveFreqWidth(width_hz));
                    }
                    let mut spw_bins = vec![];
                    let mut start = 0;
                    let mut start_freq = freqs[0];
                    for (i_chan, &freq) in freqs.iter().enumerate() {
                        if (freq - start_freq).abs() > width_hz {
                            spw_bins.push(ChanBin {
                                start,
                                end: i_chan - 1,
                            });
                            start = i_chan;
                            start_freq = freq;
                        }
                    }
                    spw_bins.push(ChanBin {
                        start,
                        end: last_chan,
                    });
                    spw_bins
                }
            };

            debug!(
                "spw {}: {} channel bin(s) over {} channel(s)",
                spw.id,
                spw_bins.len(),
                num_chans
            );
            // None of the arms above produce an empty list.
            let spw_bins =
                Vec1::try_from_vec(spw_bins).map_err(|_| ChanBinError::NoChannels(spw.id))?;
            bins.insert(spw.id, spw_bins);
        }

        Ok(BinMap {
            bins,
            must_compute_spectrum: !matches!(policy, ChanBinPolicy::WholeSpw),
        })
    }

    /// The bins of a spectral window.
    pub fn bins(&self, spw: usize) -> Option<&Vec1<ChanBin>> {
        self.bins.get(&spw)
    }

    /// The bin index of a channel of a spectral window.
    pub fn bin_of(&self, spw: usize, chan: usize) -> Option<usize> {
        self.bins
            .get(&spw)?
            .iter()
            .position(|bin| bin.contains(chan))
    }

    /// Whether the binning policy requires per-channel weights.
    pub fn must_compute_spectrum(&self) -> bool {
        self.must_compute_spectrum
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parsing of channel selections like "0:0~9;20~29,2:4~60^2".

use indexmap::IndexMap;
use regex::Regex;

use super::ConfigError;
use crate::source::SpectralWindow;

lazy_static::lazy_static! {
    static ref SPW_ELEMENT: Regex = Regex::new(r"^\s*(\*|\d+)\s*(?::(.*))?$").unwrap();

    static ref CHAN_RANGE: Regex = Regex::new(r"^\s*(\d+)\s*(?:~\s*(\d+)\s*)?(?:\^\s*(\d+)\s*)?$").unwrap();
}

/// The channels listed for each spectral window named in the selection. A
/// window named without any channel ranges lists all of its channels.
pub(super) fn parse_fitspw(
    input: &str,
    spws: &[SpectralWindow],
) -> Result<IndexMap<usize, Vec<bool>>, ConfigError> {
    let bad = |reason: String| ConfigError::FitSpw {
        input: input.to_string(),
        reason,
    };

    let mut listed: IndexMap<usize, Vec<bool>> = IndexMap::new();
    for element in input.split(',') {
        let caps = SPW_ELEMENT
            .captures(element)
            .ok_or_else(|| {
                bad(format!(
                    "'{}' is not a spectral window selection",
                    element.trim()
                ))
            })?;

        let selected_spws: Vec<&SpectralWindow> = match &caps[1] {
            "*" => spws.iter().collect(),
            id => {
                let id: usize = id
                    .parse()
                    .map_err(|_| bad(format!("'{id}' is not a spectral window ID")))?;
                vec![spws
                    .iter()
                    .find(|s| s.id == id)
                    .ok_or(ConfigError::FitSpwUnknownSpw(id))?]
            }
        };

        let ranges = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        for spw in selected_spws {
            let num_chans = spw.num_chans();
            let chans = listed
                .entry(spw.id)
                .or_insert_with(|| vec![false; num_chans]);
            if ranges.is_empty() {
                chans.fill(true);
                continue;
            }

            for range in ranges.split(';') {
                let caps = CHAN_RANGE
                    .captures(range)
                    .ok_or_else(|| bad(format!("'{}' is not a channel range", range.trim())))?;
                let parse = |m: Option<regex::Match>| -> Result<Option<usize>, ConfigError> {
                    m.map(|m| {
                        m.as_str()
                            .parse::<usize>()
                            .map_err(|_| bad(format!("'{}' is not a channel number", m.as_str())))
                    })
                    .transpose()
                };
                let start = parse(caps.get(1))?.unwrap_or(0);
                let end = parse(caps.get(2))?.unwrap_or(start);
                let step = parse(caps.get(3))?.unwrap_or(1);
                if end < start {
                    return Err(bad(format!("channel range {start}~{end} is descending")));
                }
                if step == 0 {
                    return Err(bad("a channel step must be positive".to_string()));
                }
                if end >= num_chans {
                    return Err(ConfigError::FitSpwChanOutOfRange {
                        spw: spw.id,
                        chan: end,
                        num_chans,
                    });
                }
                for chan in (start..=end).step_by(step) {
                    chans[chan] = true;
                }
            }
        }
    }

    Ok(listed)
}

/// Render the channels where `used` is true as "a~b" ranges.
pub(crate) fn format_chan_ranges(used: &[bool]) -> String {
    let mut ranges = vec![];
    let mut start = None;
    for (chan, &u) in used.iter().chain(std::iter::once(&false)).enumerate() {
        match (u, start) {
            (true, None) => start = Some(chan),
            (false, Some(s)) => {
                ranges.push(if chan - 1 == s {
                    format!("{s}")
                } else {
                    format!("{s}~{}", chan - 1)
                });
                start = None;
            }
            _ => (),
        }
    }
    if ranges.is_empty() {
        "no channels".to_string()
    } else {
        ranges.join(";")
    }
}

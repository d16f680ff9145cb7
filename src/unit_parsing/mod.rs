// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to parse strings into plain numbers or some quantity with a unit.

mod error;
#[cfg(test)]
mod tests;

pub use error::UnitParseError;

use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
pub enum TimeFormat {
    /// Seconds
    #[strum(serialize = "s")]
    S,

    /// Milliseconds
    #[strum(serialize = "ms")]
    Ms,

    /// Minutes
    #[strum(serialize = "min")]
    Min,

    /// Hours
    #[strum(serialize = "h")]
    H,

    NoUnit,
}

impl TimeFormat {
    /// Convert a quantity in this unit to seconds. Unitless quantities are
    /// assumed to already be in seconds.
    pub fn to_seconds(self, quantity: f64) -> f64 {
        match self {
            TimeFormat::S | TimeFormat::NoUnit => quantity,
            TimeFormat::Ms => quantity / 1e3,
            TimeFormat::Min => quantity * 60.0,
            TimeFormat::H => quantity * 3600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[allow(non_camel_case_types)]
pub enum FreqFormat {
    /// Hertz
    Hz,

    /// kiloHertz
    kHz,

    /// MegaHertz
    MHz,

    /// GigaHertz
    GHz,

    NoUnit,
}

impl FreqFormat {
    /// Convert a quantity in this unit to Hz. Returns `None` if there is no
    /// unit, because a bare number can't be interpreted as a frequency here.
    pub fn to_hz(self, quantity: f64) -> Option<f64> {
        match self {
            FreqFormat::Hz => Some(quantity),
            FreqFormat::kHz => Some(quantity * 1e3),
            FreqFormat::MHz => Some(quantity * 1e6),
            FreqFormat::GHz => Some(quantity * 1e9),
            FreqFormat::NoUnit => None,
        }
    }
}

/// Split a string like "10.5 kHz" into its numerical prefix and unit suffix.
fn split_quantity(s: &str) -> (&str, &str) {
    let trimmed = s.trim();
    let suffix = trimmed
        .trim_start_matches(|c: char| {
            c.is_numeric() || c == '.' || c == '-' || c == '+' || c == 'e' || c == 'E'
        })
        .trim();
    let prefix = trimmed[..trimmed.len() - suffix.len()].trim();
    (prefix, suffix)
}

/// Parse a string that may have a unit of time attached to it.
pub fn parse_time(s: &str) -> Result<(f64, TimeFormat), UnitParseError> {
    // Try to parse a naked number.
    let maybe_number: Option<f64> = s.trim().parse().ok();
    if let Some(number) = maybe_number {
        return Ok((number, TimeFormat::NoUnit));
    };

    // That didn't work; let's search over our supported formats.
    let (prefix, suffix) = split_quantity(s);
    for time_format in TimeFormat::iter().filter(|&tf| tf != TimeFormat::NoUnit) {
        let time_format_str: &'static str = time_format.into();
        if suffix.to_uppercase() == time_format_str.to_uppercase() {
            let number: f64 = match prefix.parse() {
                Ok(n) => n,
                Err(_) => {
                    return Err(UnitParseError::GotUnitButCantParse {
                        input: s.to_string(),
                        unit: "time",
                    })
                }
            };
            return Ok((number, time_format));
        }
    }

    // If we made it this far, we don't know how to parse the string.
    Err(UnitParseError::Unknown {
        input: s.to_string(),
        unit_type: "time",
    })
}

/// Parse a string that may have a unit of frequency attached to it.
pub fn parse_freq(s: &str) -> Result<(f64, FreqFormat), UnitParseError> {
    // Try to parse a naked number.
    let maybe_number: Option<f64> = s.trim().parse().ok();
    if let Some(number) = maybe_number {
        return Ok((number, FreqFormat::NoUnit));
    };

    // That didn't work; let's search over our supported formats.
    let (prefix, suffix) = split_quantity(s);
    for freq_format in FreqFormat::iter().filter(|&ff| ff != FreqFormat::NoUnit) {
        let freq_format_str: &'static str = freq_format.into();
        if suffix.to_uppercase() == freq_format_str.to_uppercase() {
            let number: f64 = match prefix.parse() {
                Ok(n) => n,
                Err(_) => {
                    return Err(UnitParseError::GotUnitButCantParse {
                        input: s.to_string(),
                        unit: "frequency",
                    })
                }
            };
            return Ok((number, freq_format));
        }
    }

    // If we made it this far, we don't know how to parse the string.
    Err(UnitParseError::Unknown {
        input: s.to_string(),
        unit_type: "frequency",
    })
}

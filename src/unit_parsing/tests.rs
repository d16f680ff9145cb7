// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use approx::assert_abs_diff_eq;

#[test]
fn test_parse_time_str_without_units() {
    for s in ["1", "1.0", " 1.0 "] {
        let result = parse_time(s);
        assert!(result.is_ok(), "{:?}", result.unwrap_err());
        let pair = result.unwrap();
        assert_abs_diff_eq!(pair.0, 1.0);
        assert_eq!(pair.1, TimeFormat::NoUnit);
    }
}

#[test]
fn test_parse_time_str_with_units() {
    // Iterate over all possible units.
    for time_format in TimeFormat::iter().filter(|&tf| tf != TimeFormat::NoUnit) {
        let time_format_str: &'static str = time_format.into();
        for time_format_str in [
            time_format_str.to_lowercase(),
            time_format_str.to_uppercase(),
        ] {
            for s in [
                format!("1{time_format_str}"),
                format!("1.0{time_format_str}"),
                format!(" 1.0{time_format_str} "),
                format!(" 1.0 {time_format_str} "),
            ] {
                let result = parse_time(&s);
                assert!(result.is_ok(), "{:?}", result.unwrap_err());
                let pair = result.unwrap();
                assert_abs_diff_eq!(pair.0, 1.0);
                assert_eq!(pair.1, time_format);
            }
        }
    }
}

#[test]
fn test_time_conversions() {
    assert_abs_diff_eq!(TimeFormat::S.to_seconds(8.0), 8.0);
    assert_abs_diff_eq!(TimeFormat::NoUnit.to_seconds(8.0), 8.0);
    assert_abs_diff_eq!(TimeFormat::Ms.to_seconds(500.0), 0.5);
    assert_abs_diff_eq!(TimeFormat::Min.to_seconds(2.0), 120.0);
    assert_abs_diff_eq!(TimeFormat::H.to_seconds(0.5), 1800.0);
}

#[test]
fn test_parse_freq_str_without_units() {
    let result = parse_freq(" 40.0 ");
    assert!(result.is_ok(), "{:?}", result.unwrap_err());
    let pair = result.unwrap();
    assert_abs_diff_eq!(pair.0, 40.0);
    assert_eq!(pair.1, FreqFormat::NoUnit);
    assert!(pair.1.to_hz(pair.0).is_none());
}

#[test]
fn test_parse_freq_str_with_units() {
    let (q, f) = parse_freq("20kHz").unwrap();
    assert_eq!(f, FreqFormat::kHz);
    assert_abs_diff_eq!(f.to_hz(q).unwrap(), 20e3);

    let (q, f) = parse_freq("1.28 MHz").unwrap();
    assert_eq!(f, FreqFormat::MHz);
    assert_abs_diff_eq!(f.to_hz(q).unwrap(), 1.28e6, epsilon = 1e-6);

    let (q, f) = parse_freq("3ghz").unwrap();
    assert_eq!(f, FreqFormat::GHz);
    assert_abs_diff_eq!(f.to_hz(q).unwrap(), 3e9);

    let (q, f) = parse_freq("100 hz").unwrap();
    assert_eq!(f, FreqFormat::Hz);
    assert_abs_diff_eq!(f.to_hz(q).unwrap(), 100.0);
}

#[test]
fn test_parse_garbage() {
    assert!(matches!(
        parse_time("10 parsecs"),
        Err(UnitParseError::Unknown {
            unit_type: "time",
            ..
        })
    ));
    assert!(matches!(
        parse_freq("10s"),
        Err(UnitParseError::Unknown {
            unit_type: "frequency",
            ..
        })
    ));
    assert!(matches!(
        parse_freq("1..0kHz"),
        Err(UnitParseError::GotUnitButCantParse { .. })
    ));
}

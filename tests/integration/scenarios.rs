// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reweighting small observations with known answers.

use approx::assert_abs_diff_eq;

use statwt::{c32, config::ChanBinArg, RobustEstimator, StatWtArgs};

use crate::{all_flags, all_weights, alternating, reweight, Observation};

#[test]
fn test_weight_is_inverse_variance() {
    let obs = Observation::new(1, 1, &[10]);
    let (source, report) = reweight(obs.build(alternating(0.5)), StatWtArgs::default());

    for w in all_weights(&source) {
        assert_abs_diff_eq!(w, 4.0, epsilon = 1e-5);
    }
    assert!(all_flags(&source).iter().all(|&f| !f));
    assert_eq!(report.flagging.num_total, 10);
    assert_eq!(report.flagging.num_new_flagged, 0);
    assert_eq!(report.weights.count, 10);
    assert_abs_diff_eq!(report.weights.mean, 4.0, epsilon = 1e-5);
    assert_abs_diff_eq!(report.weights.variance, 0.0, epsilon = 1e-8);
}

#[test]
fn test_too_few_samples_are_flagged() {
    // Only the last three timestamps are usable.
    let obs = Observation::new(1, 1, &[10]);
    let source = obs.build_flagged(alternating(1.0), |i_time, _, _| i_time < 7);
    let (source, report) = reweight(
        source,
        StatWtArgs {
            minsamp: Some(5),
            ..Default::default()
        },
    );

    assert!(all_weights(&source).iter().all(|&w| w == 0.0));
    assert!(all_flags(&source).iter().all(|&f| f));
    assert_eq!(report.flagging.num_orig_flagged, 7);
    assert_eq!(report.flagging.num_new_flagged, 3);
    assert!(report.flagging.all_flagged());
    assert_eq!(report.weights.count, 0);
    assert!(report.weights.mean.is_nan());
}

#[test]
fn test_weights_outside_wtrange_are_flagged() {
    // A variance of 0.02 gives a weight of 50.
    let obs = Observation::new(2, 2, &[6]);
    let source = obs.build(alternating(0.02_f32.sqrt()));
    let (source, report) = reweight(
        source,
        StatWtArgs {
            wtrange: vec![0.1, 10.0],
            ..Default::default()
        },
    );
    assert!(all_weights(&source).iter().all(|&w| w == 0.0));
    assert!(all_flags(&source).iter().all(|&f| f));
    assert_eq!(report.flagging.num_new_flagged, 6 * 2 * 2);

    // The same data are fine with a wider range.
    let (source, report) = reweight(
        obs.build(alternating(0.02_f32.sqrt())),
        StatWtArgs {
            wtrange: vec![100.0, 1.0],
            ..Default::default()
        },
    );
    for w in all_weights(&source) {
        assert_abs_diff_eq!(w, 50.0, epsilon = 1e-3);
    }
    assert_eq!(report.flagging.num_new_flagged, 0);
}

#[test]
fn test_chauvenet_rejects_an_outlier() {
    let value = |i: usize| {
        if i == 19 {
            c32::new(100.0, 100.0)
        } else {
            c32::new(((i * 7) % 5) as f32 - 2.0, ((i * 3) % 5) as f32 - 2.0)
        }
    };
    let inliers: Vec<c32> = (0..19).map(value).collect();
    let expected = RobustEstimator::Classical.estimate(&inliers, &[true; 19], 2);
    assert!(expected.ok);

    let obs = Observation::new(1, 1, &[20]);
    let (source, _) = reweight(
        obs.build(|i_time, _, _| value(i_time)),
        StatWtArgs {
            statalg: Some("chauvenet".to_string()),
            ..Default::default()
        },
    );
    let expected_weight = (1.0 / expected.variance) as f32;
    for w in all_weights(&source) {
        assert_abs_diff_eq!(w, expected_weight, epsilon = expected_weight * 1e-5);
    }

    // The classical estimator is dragged around by the outlier.
    let (source, _) = reweight(
        obs.build(|i_time, _, _| value(i_time)),
        StatWtArgs::default(),
    );
    assert!(all_weights(&source)[0] < expected_weight / 10.0);
}

#[test]
fn test_whole_spw_bin_pools_channel_bins() {
    // Four bins of four channels, each with a zero mean and a variance of
    // (1 + bin)².
    let vis = |i_time: usize, chan: usize, _: usize| {
        let a = (1 + chan / 4) as f32;
        let v = if i_time % 2 == 0 { a } else { -a };
        c32::new(v, v)
    };
    let obs = Observation::new(16, 2, &[4]);

    let (binned, _) = reweight(
        obs.build(vis),
        StatWtArgs {
            chanbin: Some(ChanBinArg::Int(4)),
            ..Default::default()
        },
    );
    let (whole, _) = reweight(
        obs.build(vis),
        StatWtArgs {
            chanbin: Some(ChanBinArg::Str("spw".to_string())),
            ..Default::default()
        },
    );

    for (b, w) in binned.chunks()[0].iter().zip(whole.chunks()[0].iter()) {
        let spectrum = b.weight_spectrum_rfp.as_ref().unwrap();
        for pol in 0..2 {
            for chan in 0..16 {
                let a = (1 + chan / 4) as f32;
                assert_abs_diff_eq!(spectrum[(0, chan, pol)], 1.0 / (a * a), epsilon = 1e-5);
            }
            // Pooling equal-sized zero-mean bins averages their variances.
            let mean_variance: f32 = spectrum
                .slice(ndarray::s![0, .., pol])
                .iter()
                .map(|w| 1.0 / w)
                .sum::<f32>()
                / 16.0;
            assert_abs_diff_eq!(w.weights_rp[(0, pol)], 1.0 / mean_variance, epsilon = 1e-5);
            assert_abs_diff_eq!(w.weights_rp[(0, pol)], 1.0 / 7.5, epsilon = 1e-5);
        }
        assert!(w.weight_spectrum_rfp.is_none());
    }
}

#[test]
fn test_excluded_channels_are_still_weighted() {
    // Channel 3 has 20 times the amplitude of the others.
    let vis = |i_time: usize, chan: usize, _: usize| {
        let a = if chan == 3 { 10.0 } else { 0.5 };
        let v = if i_time % 2 == 0 { a } else { -a };
        c32::new(v, v)
    };
    let obs = Observation::new(4, 2, &[6]);

    for (fitspw, excludechans) in [("0:0~2", false), ("0:3", true)] {
        let (source, report) = reweight(
            obs.build(vis),
            StatWtArgs {
                chanbin: Some(ChanBinArg::Int(4)),
                fitspw: Some(fitspw.to_string()),
                excludechans,
                ..Default::default()
            },
        );
        assert_eq!(report.flagging.num_new_flagged, 0);
        assert!(all_flags(&source).iter().all(|&f| !f));
        for subchunk in source.chunks().iter().flatten() {
            let spectrum = subchunk.weight_spectrum_rfp.as_ref().unwrap();
            assert_eq!(spectrum.dim(), (1, 4, 2));
            for &w in spectrum {
                assert_abs_diff_eq!(w, 4.0, epsilon = 1e-5);
            }
        }
    }

    // Estimating with every channel gives a much smaller weight.
    let (source, _) = reweight(
        obs.build(vis),
        StatWtArgs {
            chanbin: Some(ChanBinArg::Int(4)),
            ..Default::default()
        },
    );
    assert!(all_weights(&source).iter().all(|&w| w < 0.1));
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Behaviour that must hold regardless of the data.

use approx::assert_abs_diff_eq;

use statwt::{
    c32,
    config::{ChanBinArg, TimeBinArg},
    ReweightingTransform, StatWtArgs, StatWtError,
};

use crate::{all_flags, all_weights, reweight, Observation};

/// Deterministic pseudo-random values in [-1, 1).
fn hash(seed: usize) -> f32 {
    let mut z = (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z ^= z >> 29;
    z = z.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z ^= z >> 32;
    ((z >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
}

fn noisy(i_time: usize, chan: usize, pol: usize) -> c32 {
    let seed = ((i_time * 100 + chan) * 4 + pol) * 2;
    c32::new(hash(seed), hash(seed + 1))
}

fn sparse_flags(i_time: usize, chan: usize, pol: usize) -> bool {
    hash(((i_time * 100 + chan) * 4 + pol) * 2 + 7919) > 0.6
}

#[test]
fn test_flags_are_only_added() {
    let obs = Observation::new(8, 2, &[5, 7]);
    let source = obs.build_flagged(noisy, sparse_flags);
    let before = all_flags(&source);
    assert!(before.iter().any(|&f| f));

    for args in [
        StatWtArgs::default(),
        StatWtArgs {
            chanbin: Some(ChanBinArg::Int(2)),
            minsamp: Some(12),
            ..Default::default()
        },
        StatWtArgs {
            wtrange: vec![0.0, 3.0],
            combine: Some("corr".to_string()),
            ..Default::default()
        },
    ] {
        let (source, report) = reweight(obs.build_flagged(noisy, sparse_flags), args);
        let after = all_flags(&source);
        assert!(before.iter().zip(&after).all(|(&b, &a)| !b || a));
        assert_eq!(
            report.flagging.num_orig_flagged,
            before.iter().filter(|&&f| f).count()
        );
        assert_eq!(
            report.flagging.num_orig_flagged + report.flagging.num_new_flagged,
            after.iter().filter(|&&f| f).count()
        );
        assert!(all_weights(&source).iter().all(|&w| w >= 0.0));
    }
}

#[test]
fn test_reweighting_is_idempotent() {
    let obs = Observation::new(6, 2, &[4, 4]);
    let args = StatWtArgs {
        chanbin: Some(ChanBinArg::Int(3)),
        ..Default::default()
    };
    let (once, _) = reweight(obs.build(noisy), args.clone());
    let first = all_weights(&once);
    let (twice, _) = reweight(once, args);
    let second = all_weights(&twice);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_abs_diff_eq!(*a, *b, epsilon = a * 1e-6);
    }
}

#[test]
fn test_sliding_window_spanning_each_chunk_matches_blocks() {
    let obs = Observation::new(4, 2, &[5, 5]);
    let (block, _) = reweight(obs.build(noisy), StatWtArgs::default());
    let (sliding, _) = reweight(
        obs.build(noisy),
        StatWtArgs {
            slidetimebin: true,
            timebin: Some(TimeBinArg::Int(5)),
            ..Default::default()
        },
    );

    for (b, s) in all_weights(&block).iter().zip(all_weights(&sliding)) {
        assert_abs_diff_eq!(*b, s, epsilon = b * 1e-5);
    }
}

#[test]
fn test_everything_originally_flagged() {
    let obs = Observation::new(4, 2, &[3]);
    let (source, report) = reweight(
        obs.build_flagged(noisy, |_, _, _| true),
        StatWtArgs::default(),
    );

    assert!(all_weights(&source).iter().all(|&w| w == 0.0));
    assert!(all_flags(&source).iter().all(|&f| f));
    assert_eq!(report.flagging.num_total, 3 * 4 * 2);
    assert_eq!(report.flagging.num_orig_flagged, 3 * 4 * 2);
    assert_eq!(report.flagging.num_new_flagged, 0);
    assert!(report.flagging.all_orig_flagged());
    assert_eq!(report.weights.count, 0);
    assert!(report.weights.mean.is_nan());
}

#[test]
fn test_bad_configuration_is_an_error() {
    let obs = Observation::new(4, 2, &[3]);
    let result = ReweightingTransform::from_args(
        obs.build(noisy),
        StatWtArgs {
            minsamp: Some(1),
            ..Default::default()
        },
    );
    let err = StatWtError::from(result.err().unwrap());
    assert_eq!(
        err.to_string(),
        "Invalid configuration: minsamp must be at least 2; got 1"
    );

    let result = ReweightingTransform::from_args(
        obs.build(noisy),
        StatWtArgs {
            datacolumn: Some("data".to_string()),
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

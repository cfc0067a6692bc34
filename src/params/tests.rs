// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end runs over small schedules.

use std::{num::NonZeroUsize, sync::Arc};

use approx::assert_abs_diff_eq;
use hifitime::{Duration, Epoch};

use super::*;
use crate::{
    beam::GaussianBeam,
    constants::UNSEEN,
    focal_plane::{FocalPlane, FocalPlaneOptions},
    io::read_maps,
    mapmaking::{MapmakingError, SolveMode, SolveParams},
    pointing::{InstrumentRotation, ObservationConfig},
    schedule::Schedule,
    site::NamedSite,
    sky::SkyCoefficients,
    synthesize::{Interpolation, SynthesisParams},
};

fn params(options: &FocalPlaneOptions, mode: SolveMode) -> SimulateParams {
    let beam = Arc::new(GaussianBeam::new(Some(60.0), Some(16), None, 1.0).unwrap());
    let focal_plane = FocalPlane::build(2, 2, 4.0, beam, options, 16).unwrap();
    let schedule = Schedule::single(
        Epoch::from_gregorian_utc(2025, 3, 1, 4, 0, 0, 0),
        600.0,
        0.0,
        60.0,
        45.0,
        10.0,
    )
    .unwrap();
    let weights = vec![1.0; focal_plane.len()];
    SimulateParams {
        sky: SkyCoefficients::monopole(16, 2.0),
        focal_plane,
        schedule,
        observation: ObservationConfig {
            site: NamedSite::Atacama.position(),
            scan_speed_deg: 1.0,
            dut1: Duration::from_seconds(0.0),
            precess: false,
            rotation: Some(InstrumentRotation::new(vec![0.0, 22.5, 45.0, 67.5], 150.0).unwrap()),
        },
        synthesis: SynthesisParams {
            nside: 8,
            interpolation: Interpolation::Bilinear,
            noise: None,
        },
        solve: SolveParams {
            mode,
            cond_threshold: Some(1e4),
        },
        map_nside: 4,
        chunk_size: NonZeroUsize::new(1000).unwrap(),
        weights,
        retain_tod: true,
        outputs: vec![],
    }
}

#[test]
fn test_monopole_round_trip() {
    let params = params(&FocalPlaneOptions::default(), SolveMode::Polarised);
    let output = params.run().unwrap();

    let acc = &output.accumulator;
    assert_eq!(acc.num_chunks(), 6);
    assert_eq!(acc.num_samples(), 6000);
    assert_eq!(acc.tods().len(), 8);
    for tod in acc.tods() {
        assert_eq!(tod.len(), 6000);
        for &d in &tod.data {
            assert_abs_diff_eq!(d, 2.0, epsilon = 1e-9);
        }
    }

    let maps = &output.maps;
    assert_eq!(maps.hits.iter().sum::<u64>(), 8 * 6000);
    assert!(maps.num_solved() > 0);
    for p in 0..maps.num_pixels() {
        if maps.cond[p].is_finite() {
            assert_abs_diff_eq!(maps.maps[(0, p)], 2.0, epsilon = 1e-8);
            assert_abs_diff_eq!(maps.maps[(1, p)], 0.0, epsilon = 1e-8);
            assert_abs_diff_eq!(maps.maps[(2, p)], 0.0, epsilon = 1e-8);
        } else {
            assert!(maps.maps.column(p).iter().all(|&v| v == UNSEEN));
        }
    }
    // Unhit pixels are never solved.
    for (p, &hits) in maps.hits.iter().enumerate() {
        if hits < 3 {
            assert!(maps.cond[p].is_infinite());
        }
    }
}

#[test]
fn test_runs_are_deterministic_and_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut params = params(&FocalPlaneOptions::default(), SolveMode::Polarised);
    params.synthesis.noise = Some(crate::synthesize::WhiteNoise::new(0.1, 42).unwrap());
    params.retain_tod = false;
    params.outputs = vec![dir.path().join("maps.bin"), dir.path().join("maps.txt")];

    let first = params.run().unwrap();
    let second = params.run().unwrap();
    assert_eq!(first.maps.maps, second.maps.maps);
    assert_eq!(first.maps.hits, second.maps.hits);
    assert!(first.accumulator.tods().is_empty());
    assert_eq!(first.accumulator.num_samples(), 6000);

    let read = read_maps(&dir.path().join("maps.bin")).unwrap();
    assert_eq!(read.nside, 4);
    assert_eq!(read.maps, second.maps.maps);
    assert!(dir.path().join("maps.txt").exists());
}

#[test]
fn test_intensity_only_with_dead_detectors() {
    let options = FocalPlaneOptions {
        dead: vec!["r000c000A".to_string(), "r001c001B".to_string()],
        ..Default::default()
    };
    let params = params(&options, SolveMode::IntensityOnly);
    let output = params.run().unwrap();
    assert_eq!(output.accumulator.tods().len(), 6);
    let maps = &output.maps;
    assert_eq!(maps.num_stokes(), 1);
    assert_eq!(maps.hits.iter().sum::<u64>(), 6 * 6000);
    for p in 0..maps.num_pixels() {
        if maps.hits[p] > 0 {
            assert_abs_diff_eq!(maps.maps[(0, p)], 2.0, epsilon = 1e-9);
            assert_abs_diff_eq!(maps.cond[p], 1.0);
        } else {
            assert_eq!(maps.maps[(0, p)], UNSEEN);
        }
    }
}

#[test]
fn test_missing_weights() {
    let mut params = params(&FocalPlaneOptions::default(), SolveMode::Polarised);
    assert_eq!(params.focal_plane.len(), 8);
    params.weights = vec![1.0; 3];
    let result = params.run();
    assert!(matches!(
        result,
        Err(SimulateError::Mapmaking(MapmakingError::MissingWeight(3)))
    ));
    assert_eq!(
        result.err().unwrap().to_string(),
        "No weight was given for detector 3"
    );

    // Dead detectors don't need a usable weight.
    let options = FocalPlaneOptions {
        dead: vec!["r001c001A".to_string(), "r001c001B".to_string()],
        ..Default::default()
    };
    let mut params = self::params(&options, SolveMode::Polarised);
    params.weights[7] = f64::NAN;
    assert!(params.run().is_ok());
    params.weights[2] = 0.0;
    assert!(matches!(
        params.run(),
        Err(SimulateError::Mapmaking(MapmakingError::BadWeight { detector: 2, .. }))
    ));
}

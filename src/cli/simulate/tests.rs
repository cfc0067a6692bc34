// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::{tempdir, Builder};

use super::*;
use crate::{constants::UNSEEN, io::read_maps};

fn small_args() -> SimulateArgs {
    SimulateArgs {
        sky_args: SkyArgs {
            monopole: Some(1.5),
            ..Default::default()
        },
        beam_args: BeamArgs {
            beam_lmax: Some(8),
            ..Default::default()
        },
        schedule_args: ScheduleArgs {
            start: Some("2025-03-01 04:00:00".to_string()),
            duration: Some(60.0),
            az0: Some(0.0),
            az1: Some(20.0),
            el: Some(45.0),
            ..Default::default()
        },
        simulate_args: SimulateCliArgs {
            rows: Some(2),
            cols: Some(2),
            fov: Some(2.0),
            synth_nside: Some(4),
            nside: Some(2),
            intensity_only: true,
            chunk_size: Some(100),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn ghosts_are_parsed() {
    let g = parse_ghost("0.5, -0.25, 0.1").unwrap();
    assert_abs_diff_eq!(g.az_offset_deg, 0.5);
    assert_abs_diff_eq!(g.el_offset_deg, -0.25);
    assert_abs_diff_eq!(g.amplitude, 0.1);
    assert!(g.fwhm_arcmin.is_none());

    let g = parse_ghost("0,0,0.2,30").unwrap();
    assert_eq!(g.fwhm_arcmin, Some(30.0));

    assert!(matches!(parse_ghost("1,2"), Err(SimulateArgsError::BadGhost(_))));
    assert!(matches!(parse_ghost("a,b,c"), Err(SimulateArgsError::BadGhost(_))));
}

#[test]
fn parse_small_args() {
    let params = small_args().parse().unwrap();
    assert_eq!(params.focal_plane.len(), 8);
    assert_eq!(params.map_nside, 2);
    assert_eq!(params.synthesis.nside, 4);
    assert_eq!(params.solve.mode, SolveMode::IntensityOnly);
    assert_eq!(params.chunk_size.get(), 100);
    assert_eq!(params.weights, vec![1.0; 8]);
    assert_eq!(
        params.outputs,
        vec![PathBuf::from(DEFAULT_OUTPUT_MAP_FILENAME)]
    );
}

#[test]
fn noise_sets_weights() {
    let mut args = small_args();
    args.simulate_args.noise = Some(0.5);
    let params = args.parse().unwrap();
    assert_eq!(params.synthesis.noise.map(|n| n.sigma()), Some(0.5));
    assert_abs_diff_eq!(params.weights[0], 4.0);

    let mut args = small_args();
    args.simulate_args.noise = Some(0.0);
    let params = args.parse().unwrap();
    assert!(params.synthesis.noise.is_none());

    let mut args = small_args();
    args.simulate_args.noise = Some(-1.0);
    assert!(matches!(args.parse(), Err(ScanmapError::Simulate(_))));
}

#[test]
fn bad_args_are_rejected() {
    let mut args = small_args();
    args.simulate_args.rotation_angles = Some(vec![0.0, 45.0]);
    assert!(matches!(args.parse(), Err(ScanmapError::Observation(_))));

    let mut args = small_args();
    args.simulate_args.interpolation = Some("cubic".to_string());
    assert!(matches!(args.parse(), Err(ScanmapError::Simulate(_))));

    let mut args = small_args();
    args.simulate_args.chunk_size = Some(0);
    assert!(matches!(args.parse(), Err(ScanmapError::Simulate(_))));

    let mut args = small_args();
    args.simulate_args.outputs = Some(vec![PathBuf::from("maps.hdf5")]);
    assert!(matches!(args.parse(), Err(ScanmapError::Maps(_))));

    let mut args = small_args();
    args.simulate_args.dead = Some(vec!["r009c009A".to_string()]);
    assert!(matches!(args.parse(), Err(ScanmapError::FocalPlane(_))));

    let mut args = small_args();
    args.simulate_args.nside = Some(0);
    assert!(matches!(args.parse(), Err(ScanmapError::Maps(_))));

    let mut args = small_args();
    args.simulate_args.site = Some("Mars".to_string());
    assert!(matches!(args.parse(), Err(ScanmapError::Observation(_))));

    let mut args = small_args();
    args.sky_args.sky_lmax = Some(20);
    args.simulate_args.band_limit_policy = Some("error".to_string());
    assert!(matches!(args.parse(), Err(ScanmapError::FocalPlane(_))));
}

#[test]
fn arg_file_is_merged() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            [sky]
            monopole = 2.5

            [schedule]
            start = "2025-03-01 04:00:00"
            duration = 30.0
            az0 = 0.0
            az1 = 10.0
            el = 60.0

            [simulate]
            rows = 3
            nside = 8
            precess = true
        "#}
        .as_bytes(),
    )
    .unwrap();
    file.flush().unwrap();

    let args = SimulateArgs {
        args_file: Some(file.path().to_path_buf()),
        simulate_args: SimulateCliArgs {
            rows: Some(1),
            ..Default::default()
        },
        ..Default::default()
    }
    .merge()
    .unwrap();
    assert!(args.args_file.is_none());
    assert_eq!(args.sky_args.monopole, Some(2.5));
    assert_eq!(args.schedule_args.duration, Some(30.0));
    // The command line wins.
    assert_eq!(args.simulate_args.rows, Some(1));
    assert_eq!(args.simulate_args.nside, Some(8));
    assert!(args.simulate_args.precess);
}

#[test]
fn bad_arg_files() {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"rows: 3\n").unwrap();
    file.flush().unwrap();
    let result = SimulateArgs {
        args_file: Some(file.path().to_path_buf()),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(ScanmapError::ArgFile(_))));

    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(b"{ \"simulate\": { \"rows\": \"three\" } }").unwrap();
    file.flush().unwrap();
    let result = SimulateArgs {
        args_file: Some(file.path().to_path_buf()),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(ScanmapError::ArgFile(_))));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("maps.bin");
    let mut args = small_args();
    args.simulate_args.outputs = Some(vec![output.clone()]);
    args.run(true).unwrap();
    assert!(!output.exists());
}

#[test]
fn small_run_recovers_monopole() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("maps.bin");
    let mut args = small_args();
    args.simulate_args.outputs = Some(vec![output.clone()]);
    args.run(false).unwrap();

    let maps = read_maps(&output).unwrap();
    assert_eq!(maps.nside, 2);
    assert_eq!(maps.maps.len_of(ndarray::Axis(0)), 1);
    assert!(maps.hits.iter().any(|&h| h > 0));
    for (p, &hits) in maps.hits.iter().enumerate() {
        if hits > 0 {
            assert_abs_diff_eq!(maps.maps[(0, p)], 1.5, epsilon = 1e-9);
        } else {
            assert_eq!(maps.maps[(0, p)], UNSEEN);
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::num::NonZeroUsize;

use approx::assert_abs_diff_eq;

use super::*;
use crate::site::NamedSite;

fn config() -> ObservationConfig {
    ObservationConfig {
        site: NamedSite::Atacama.position(),
        scan_speed_deg: 1.0,
        dut1: Duration::from_seconds(0.0),
        precess: false,
        rotation: None,
    }
}

fn schedule(az0: f64, az1: f64) -> Schedule {
    Schedule::single(
        Epoch::from_gregorian_utc(2025, 6, 21, 3, 0, 0, 0),
        100.0,
        az0,
        az1,
        50.0,
        10.0,
    )
    .unwrap()
}

fn whole_chunk(schedule: &Schedule) -> Chunk {
    schedule
        .partition(NonZeroUsize::new(schedule.total_num_samples()).unwrap())
        .next()
        .unwrap()
}

fn to_vec(radec: RADec) -> Vector3<f64> {
    let (s_ra, c_ra) = radec.ra.sin_cos();
    let (s_dec, c_dec) = radec.dec.sin_cos();
    Vector3::new(c_dec * c_ra, c_dec * s_ra, s_dec)
}

#[test]
fn test_boustrophedon_within_bounds() {
    let schedule = schedule(350.0, 10.0);
    let entry = &schedule.entries()[0];
    assert_abs_diff_eq!(azimuth_throw_deg(entry), 20.0);

    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();
    let pointing = engine.resolve_pointing(&whole_chunk(&schedule)).unwrap();
    assert_eq!(pointing.len(), 1000);

    let offsets: Vec<f64> = pointing
        .azels
        .iter()
        .map(|azel| {
            let o = (azel.az.to_degrees() - 350.0).rem_euclid(360.0);
            if o > 180.0 {
                o - 360.0
            } else {
                o
            }
        })
        .collect();
    for &o in &offsets {
        assert!((-1e-9..=20.0 + 1e-9).contains(&o), "{o}");
    }
    assert_abs_diff_eq!(offsets[0], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(offsets[200], 20.0, epsilon = 1e-9);

    // Monotone runs between turnarounds at 20, 40, 60 and 80 s.
    let reversals = offsets
        .windows(3)
        .filter(|w| (w[1] - w[0]).signum() != (w[2] - w[1]).signum())
        .count();
    assert_eq!(reversals, 4);
}

#[test]
fn test_full_turn_and_stare() {
    let schedule = schedule(0.0, 360.0);
    let entry = &schedule.entries()[0];
    assert_abs_diff_eq!(azimuth_throw_deg(entry), 360.0);
    assert_abs_diff_eq!(scan_azimuth_deg(entry, 2.0, 10.0), 20.0);

    let schedule = self::schedule(30.0, 30.0);
    let entry = &schedule.entries()[0];
    assert_abs_diff_eq!(scan_azimuth_deg(entry, 2.0, 10.0), 30.0);

    let schedule = self::schedule(30.0, 60.0);
    let entry = &schedule.entries()[0];
    assert_abs_diff_eq!(scan_azimuth_deg(entry, 0.0, 10.0), 30.0);
}

#[test]
fn test_single_entry_elevation_is_constant() {
    let schedule = schedule(0.0, 90.0);
    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();
    let pointing = engine.resolve_pointing(&whole_chunk(&schedule)).unwrap();
    let el = 50.0_f64.to_radians();
    assert!(pointing.azels.iter().all(|azel| azel.el == el));
}

#[test]
fn test_pointing_is_deterministic_and_chunk_independent() {
    let schedule = schedule(10.0, 80.0);
    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();

    let whole = engine.resolve_pointing(&whole_chunk(&schedule)).unwrap();
    let again = engine.resolve_pointing(&whole_chunk(&schedule)).unwrap();
    assert_eq!(whole.quats, again.quats);

    for chunk in schedule.partition(NonZeroUsize::new(37).unwrap()) {
        let pointing = engine.resolve_pointing(&chunk).unwrap();
        assert_eq!(pointing.quats[..], whole.quats[chunk.range()]);
        assert_eq!(pointing.epochs[..], whole.epochs[chunk.range()]);
    }
}

#[test]
fn test_radec_agrees_with_marlu() {
    let schedule = schedule(10.0, 80.0);
    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();
    let pointing = engine.resolve_pointing(&whole_chunk(&schedule)).unwrap();
    let frame = engine.frames[0];

    for i in [0, 1, 250, 999] {
        let t = i as f64 / 10.0;
        let lmst = frame.lmst0 + SIDEREAL_RAD_PER_S * t;
        let expected = pointing.azels[i]
            .to_hadec(config.site.latitude_rad)
            .to_radec(lmst);
        let got = pointing.radecs[i];
        assert_abs_diff_eq!(to_vec(got), to_vec(expected), epsilon = 1e-9);
    }
}

#[test]
fn test_resolve_time() {
    let schedule = schedule(10.0, 80.0);
    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();
    let chunk = schedule.partition(NonZeroUsize::new(300).unwrap()).nth(1).unwrap();
    let epochs = engine.resolve_time(&chunk).unwrap();
    assert_eq!(epochs.len(), 300);
    let start = schedule.first_epoch();
    assert_abs_diff_eq!((epochs[0] - start).to_seconds(), 30.0, epsilon = 1e-9);
    assert_abs_diff_eq!((epochs[1] - epochs[0]).to_seconds(), 0.1, epsilon = 1e-9);
}

#[test]
fn test_out_of_bounds() {
    let schedule = schedule(10.0, 80.0);
    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();
    let chunk = Chunk {
        index: 3,
        entry: 0,
        first_sample: 995,
        entry_offset: 995,
        num_samples: 10,
    };
    assert!(matches!(
        engine.resolve_pointing(&chunk),
        Err(PointingError::OutOfBounds {
            end: 1005,
            num_samples: 1000,
            ..
        })
    ));
    let chunk = Chunk { entry: 2, ..chunk };
    assert!(matches!(
        engine.resolve_time(&chunk),
        Err(PointingError::NoSuchEntry { entry: 2, .. })
    ));

    let bad = ObservationConfig {
        scan_speed_deg: -1.0,
        ..config
    };
    assert!(matches!(
        PointingEngine::new(&schedule, &bad),
        Err(PointingError::BadScanSpeed(_))
    ));
}

#[test]
fn test_detector_pointing() {
    let schedule = schedule(10.0, 80.0);
    let config = config();
    let engine = PointingEngine::new(&schedule, &config).unwrap();
    let pointing = engine.resolve_pointing(&whole_chunk(&schedule)).unwrap();

    // A detector on the boresight sees what the boresight sees.
    let bore = pointing.detector(0.0, 0.0, 0.0);
    for i in [0, 500] {
        assert_abs_diff_eq!(to_vec(bore.radec(i)), to_vec(pointing.radecs[i]), epsilon = 1e-12);
        assert_abs_diff_eq!(bore.psi[i], pointing.position_angles[i], epsilon = 1e-12);
    }

    // Offsets are exact angular distances.
    let det = pointing.detector(1.0, 0.5, 0.0);
    let expected = (1.0_f64.to_radians().cos() * 0.5_f64.to_radians().cos()).acos();
    for i in [0, 123, 999] {
        let sep = to_vec(det.radec(i)).angle(&to_vec(pointing.radecs[i]));
        assert_abs_diff_eq!(sep, expected, epsilon = 1e-9);
    }

    // A and B detectors are orthogonal.
    let a = pointing.detector(0.3, -0.2, 22.5);
    let b = pointing.detector(0.3, -0.2, 112.5);
    for i in 0..a.psi.len() {
        assert_abs_diff_eq!(a.theta[i], b.theta[i], epsilon = 1e-12);
        assert_abs_diff_eq!((2.0 * (b.psi[i] - a.psi[i])).cos(), -1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_instrument_rotation() {
    let rotation = InstrumentRotation::new(vec![0.0, 45.0], 10.0).unwrap();
    assert_abs_diff_eq!(rotation.angle_deg(5.0), 0.0);
    assert_abs_diff_eq!(rotation.angle_deg(15.0), 45.0);
    assert_abs_diff_eq!(rotation.angle_deg(25.0), 0.0);

    assert!(matches!(
        InstrumentRotation::new(vec![], 10.0),
        Err(PointingError::NoRotationAngles)
    ));
    assert!(matches!(
        InstrumentRotation::new(vec![1.0], 0.0),
        Err(PointingError::BadRotationPeriod(_))
    ));

    let schedule = schedule(10.0, 80.0);
    let plain = config();
    let rotated = ObservationConfig {
        rotation: Some(rotation),
        ..config()
    };
    let chunk = whole_chunk(&schedule);
    let p0 = PointingEngine::new(&schedule, &plain)
        .unwrap()
        .resolve_pointing(&chunk)
        .unwrap();
    let p1 = PointingEngine::new(&schedule, &rotated)
        .unwrap()
        .resolve_pointing(&chunk)
        .unwrap();

    // Rotation doesn't move the boresight but turns the position angle.
    for i in [50, 150] {
        assert_abs_diff_eq!(to_vec(p0.radecs[i]), to_vec(p1.radecs[i]), epsilon = 1e-12);
    }
    assert_abs_diff_eq!(p0.position_angles[50], p1.position_angles[50], epsilon = 1e-12);
    let d = p1.position_angles[150] - p0.position_angles[150];
    assert_abs_diff_eq!((2.0 * d).cos(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_precession_is_small() {
    let schedule = schedule(10.0, 80.0);
    let plain = config();
    let precessed = ObservationConfig {
        precess: true,
        ..config()
    };
    let chunk = whole_chunk(&schedule);
    let p0 = PointingEngine::new(&schedule, &plain)
        .unwrap()
        .resolve_pointing(&chunk)
        .unwrap();
    let p1 = PointingEngine::new(&schedule, &precessed)
        .unwrap()
        .resolve_pointing(&chunk)
        .unwrap();
    let sep = to_vec(p0.radecs[0]).angle(&to_vec(p1.radecs[0]));
    assert!(sep > 0.0);
    assert!(sep < 1.0_f64.to_radians());
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    healpix::pix2ang_ring,
    pointing::DetectorPointing,
    schedule::Chunk,
    synthesize::DetectorTimestream,
};

const POLARISED: SolveParams = SolveParams {
    mode: SolveMode::Polarised,
    cond_threshold: None,
};

fn terms(stokes: [f64; 3], psis: &[f64]) -> PixelTerms {
    let mut t = PixelTerms::default();
    for &psi in psis {
        let (s, c) = (2.0 * psi).sin_cos();
        t.add_sample(1.0, stokes[0] + stokes[1] * c + stokes[2] * s, c, s);
    }
    t
}

/// A chunk whose detectors all look at the centre of `pixel`.
fn chunk(index: usize, nside: usize, pixel: usize, psis: &[&[f64]], stokes: [f64; 3]) -> ChunkTimestreams {
    let (theta, phi) = pix2ang_ring(nside, pixel);
    let num_samples = psis[0].len();
    ChunkTimestreams {
        chunk: Chunk {
            index,
            entry: 0,
            first_sample: index * num_samples,
            entry_offset: index * num_samples,
            num_samples,
        },
        detectors: psis
            .iter()
            .enumerate()
            .map(|(detector, psi)| DetectorTimestream {
                detector,
                data: psi
                    .iter()
                    .map(|&p| stokes[0] + stokes[1] * (2.0 * p).cos() + stokes[2] * (2.0 * p).sin())
                    .collect(),
                pointing: DetectorPointing {
                    theta: vec![theta; psi.len()],
                    phi: vec![phi; psi.len()],
                    psi: psi.to_vec(),
                },
            })
            .collect(),
    }
}

#[test]
fn test_pixel_solve_recovers_stokes() {
    let stokes = [1.0, 0.5, -0.2];
    let t = terms(stokes, &[0.0, FRAC_PI_4, FRAC_PI_2, 3.0 * FRAC_PI_4]);
    let (x, cond) = t.solve(&POLARISED).unwrap();
    assert_abs_diff_eq!(x[..], stokes[..], epsilon = 1e-12);
    // Evenly spread angles give the best possible conditioning.
    assert_abs_diff_eq!(cond, 2.0, epsilon = 1e-12);
}

#[test]
fn test_pixel_degeneracies() {
    assert_eq!(
        PixelTerms::default().solve(&POLARISED),
        Err(Degeneracy::NoHits)
    );
    assert_eq!(
        terms([1.0, 0.0, 0.0], &[0.0, FRAC_PI_4]).solve(&POLARISED),
        Err(Degeneracy::TooFewHits)
    );
    assert_eq!(
        terms([1.0, 0.0, 0.0], &[0.0; 5]).solve(&POLARISED),
        Err(Degeneracy::Singular)
    );

    let clustered = terms([1.0, 0.2, 0.1], &[0.0, 0.01, 0.02]);
    let (x, cond) = clustered.solve(&POLARISED).unwrap();
    assert!(cond > 1e4);
    assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-6);
    let strict = SolveParams {
        cond_threshold: Some(100.0),
        ..POLARISED
    };
    assert_eq!(clustered.solve(&strict), Err(Degeneracy::IllConditioned));
}

#[test]
fn test_intensity_only_solve() {
    let params = SolveParams {
        mode: SolveMode::IntensityOnly,
        cond_threshold: Some(1.0),
    };
    let (x, cond) = terms([3.0, 0.0, 0.0], &[0.7]).solve(&params).unwrap();
    assert_abs_diff_eq!(x[0], 3.0);
    assert_abs_diff_eq!(cond, 1.0);
    assert_eq!(
        PixelTerms::default().solve(&params),
        Err(Degeneracy::NoHits)
    );
}

#[test]
fn test_map_solve_marks_unseen() {
    let nside = 1;
    let psis: [&[f64]; 2] = [&[0.0, FRAC_PI_4], &[FRAC_PI_2, 3.0 * FRAC_PI_4]];
    let chunk = chunk(0, nside, 5, &psis, [2.0, 0.0, 0.0]);
    let partial = PartialNormalEquations::from_chunk(nside, &[1.0, 1.0], &chunk).unwrap();
    assert_eq!(partial.num_pixels(), 1);

    let mut normal = NormalEquations::new(nside).unwrap();
    normal.add(&partial).unwrap();
    assert_eq!(normal.pixel(5).unwrap().hits, 4);

    let est = normal.solve(&POLARISED).unwrap();
    assert_eq!(est.num_stokes(), 3);
    assert_eq!(est.num_pixels(), 12);
    assert_eq!(est.num_solved(), 1);
    assert_eq!(est.counts.get(Degeneracy::NoHits), 11);
    assert_eq!(est.hits[5], 4);
    assert_abs_diff_eq!(est.maps[(0, 5)], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(est.maps[(1, 5)], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(est.cond[5], 2.0, epsilon = 1e-12);
    for p in (0..12).filter(|&p| p != 5) {
        assert_eq!(est.hits[p], 0);
        assert_eq!(est.cond[p], f64::INFINITY);
        assert!(est.maps.column(p).iter().all(|&v| v == UNSEEN));
    }

    let est = normal
        .solve(&SolveParams {
            mode: SolveMode::IntensityOnly,
            cond_threshold: None,
        })
        .unwrap();
    assert_eq!(est.num_stokes(), 1);
    assert_abs_diff_eq!(est.maps[(0, 5)], 2.0, epsilon = 1e-12);
}

#[test]
fn test_partials_commute() {
    let nside = 2;
    let a = chunk(0, nside, 3, &[&[0.1, 0.7, 1.3]], [1.0, 0.3, 0.2]);
    let b = chunk(1, nside, 3, &[&[0.4, 1.9, 2.2]], [1.0, 0.3, 0.2]);
    let a = PartialNormalEquations::from_chunk(nside, &[0.5], &a).unwrap();
    let b = PartialNormalEquations::from_chunk(nside, &[0.5], &b).unwrap();

    let mut ab = NormalEquations::new(nside).unwrap();
    ab.add(&a).unwrap();
    ab.add(&b).unwrap();
    let mut ba = NormalEquations::new(nside).unwrap();
    ba.add(&b).unwrap();
    ba.add(&a).unwrap();
    assert_eq!(ab.pixel(3), ba.pixel(3));

    let est = ab.solve(&POLARISED).unwrap();
    assert_abs_diff_eq!(est.maps[(0, 3)], 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(est.maps[(1, 3)], 0.3, epsilon = 1e-10);
    assert_abs_diff_eq!(est.maps[(2, 3)], 0.2, epsilon = 1e-10);
}

#[test]
fn test_bad_inputs() {
    let c = chunk(0, 1, 0, &[&[0.0]], [1.0, 0.0, 0.0]);
    assert!(matches!(
        PartialNormalEquations::from_chunk(1, &[], &c),
        Err(MapmakingError::MissingWeight(0))
    ));
    assert!(matches!(
        PartialNormalEquations::from_chunk(1, &[0.0], &c),
        Err(MapmakingError::BadWeight { detector: 0, .. })
    ));
    assert!(validate_weights(&[1.0, 2.0], [1, 0]).is_ok());
    assert!(matches!(
        validate_weights(&[1.0, 2.0], 0..4),
        Err(MapmakingError::MissingWeight(2))
    ));
    assert!(matches!(
        PartialNormalEquations::from_chunk(0, &[1.0], &c),
        Err(MapmakingError::Healpix(_))
    ));

    let partial = PartialNormalEquations::from_chunk(1, &[1.0], &c).unwrap();
    let mut normal = NormalEquations::new(2).unwrap();
    assert!(matches!(
        normal.add(&partial),
        Err(MapmakingError::NsideMismatch {
            expected: 2,
            got: 1
        })
    ));
    assert!(matches!(
        normal.solve(&SolveParams {
            cond_threshold: Some(0.5),
            ..POLARISED
        }),
        Err(MapmakingError::BadConditionThreshold(_))
    ));
}

#[test]
fn test_solve_from_accumulator() {
    let nside = 2;
    let psis: [&[f64]; 2] = [&[0.2, 0.9], &[1.4, 2.6]];
    let chunks = [
        chunk(0, nside, 7, &psis, [1.5, -0.1, 0.4]),
        chunk(1, nside, 7, &psis, [1.5, -0.1, 0.4]),
    ];

    let mut dropped = TimestreamAccumulator::new(nside, vec![0, 1], false);
    let mut kept = TimestreamAccumulator::new(nside, vec![0, 1], true);
    let mut normal = NormalEquations::new(nside).unwrap();
    for c in &chunks {
        dropped.append(c).unwrap();
        kept.append(c).unwrap();
        normal
            .add(&PartialNormalEquations::from_chunk(nside, &[1.0, 1.0], c).unwrap())
            .unwrap();
    }
    assert!(matches!(
        solve(&dropped, &[1.0, 1.0], &POLARISED),
        Err(MapmakingError::TodNotRetained)
    ));

    let from_tod = solve(&kept, &[1.0, 1.0], &POLARISED).unwrap();
    let from_chunks = normal.solve(&POLARISED).unwrap();
    assert_eq!(from_tod.hits, from_chunks.hits);
    assert_eq!(from_tod.hits[7], 8);
    assert_abs_diff_eq!(from_tod.maps, from_chunks.maps, epsilon = 1e-12);
    assert_abs_diff_eq!(from_tod.maps[(2, 7)], 0.4, epsilon = 1e-10);
}

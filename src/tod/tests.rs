// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::f64::consts::FRAC_PI_2;

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    healpix::pix2ang_ring,
    pointing::DetectorPointing,
    schedule::Chunk,
    synthesize::{ChunkTimestreams, DetectorTimestream},
};

fn chunk(index: usize, first_sample: usize, num_samples: usize, detectors: &[usize]) -> ChunkTimestreams {
    let (theta, phi) = pix2ang_ring(4, 17);
    ChunkTimestreams {
        chunk: Chunk {
            index,
            entry: 0,
            first_sample,
            entry_offset: first_sample,
            num_samples,
        },
        detectors: detectors
            .iter()
            .map(|&detector| DetectorTimestream {
                detector,
                data: (0..num_samples).map(|i| (first_sample + i) as f64).collect(),
                pointing: DetectorPointing {
                    theta: vec![theta; num_samples],
                    phi: vec![phi; num_samples],
                    psi: vec![FRAC_PI_2 / 4.0 * detector as f64; num_samples],
                },
            })
            .collect(),
    }
}

#[test]
fn test_accumulate_in_order() {
    let mut acc = TimestreamAccumulator::new(4, vec![0, 2], true);
    acc.append(&chunk(0, 0, 5, &[0, 2])).unwrap();
    acc.append(&chunk(1, 5, 3, &[0, 2])).unwrap();
    assert_eq!(acc.num_chunks(), 2);
    assert_eq!(acc.num_samples(), 8);

    let tods = acc.tods();
    assert_eq!(tods.len(), 2);
    assert_eq!(tods[1].detector, 2);
    assert_eq!(tods[0].data, (0..8).map(|i| i as f64).collect::<Vec<_>>());
    assert!(tods[0].pixels.iter().all(|&p| p == 17));
    // ψ = π/4 for detector 2.
    assert_abs_diff_eq!(tods[1].cos_2psi[7], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(tods[1].sin_2psi[7], 1.0, epsilon = 1e-15);
    assert_abs_diff_eq!(tods[0].cos_2psi[0], 1.0);
}

#[test]
fn test_accumulator_rejects_bad_appends() {
    let mut acc = TimestreamAccumulator::new(4, vec![0, 1], false);
    assert!(matches!(
        acc.append(&chunk(1, 0, 5, &[0, 1])),
        Err(AccumulationError::OutOfOrder {
            expected: 0,
            got: 1
        })
    ));
    assert!(matches!(
        acc.append(&chunk(0, 2, 5, &[0, 1])),
        Err(AccumulationError::NotContiguous {
            expected: 0,
            got: 2,
            ..
        })
    ));
    assert!(matches!(
        acc.append(&chunk(0, 0, 5, &[1])),
        Err(AccumulationError::DetectorMismatch { .. })
    ));

    let mut short = chunk(0, 0, 5, &[0, 1]);
    short.detectors[1].data.pop();
    assert!(matches!(
        acc.append(&short),
        Err(AccumulationError::BadLength {
            detector: 1,
            expected: 5,
            got: 4,
            ..
        })
    ));

    // Nothing was appended by the failures.
    acc.append(&chunk(0, 0, 5, &[0, 1])).unwrap();
    assert_eq!(acc.num_samples(), 5);
    assert!(!acc.is_retained());
    assert!(acc.tods().is_empty());

    // Replaying a chunk is out of order.
    assert!(matches!(
        acc.append(&chunk(0, 0, 5, &[0, 1])),
        Err(AccumulationError::OutOfOrder { .. })
    ));
}

#[test]
fn test_merger_releases_in_order() {
    let mut merger = ChunkMerger::new();
    assert!(merger.push(2, "c").unwrap().is_empty());
    assert!(merger.push(1, "b").unwrap().is_empty());
    assert_eq!(merger.num_pending(), 2);
    assert_eq!(merger.push(0, "a").unwrap(), vec!["a", "b", "c"]);
    assert_eq!(merger.next_index(), 3);
    assert_eq!(merger.push(3, "d").unwrap(), vec!["d"]);
    merger.finish(4).unwrap();
}

#[test]
fn test_merger_errors() {
    let mut merger = ChunkMerger::new();
    merger.push(0, 0).unwrap();
    assert!(matches!(
        merger.push(0, 0),
        Err(AccumulationError::DuplicateChunk(0))
    ));
    merger.push(2, 2).unwrap();
    assert!(matches!(
        merger.push(2, 2),
        Err(AccumulationError::DuplicateChunk(2))
    ));
    assert!(matches!(
        merger.finish(3),
        Err(AccumulationError::Gap {
            missing: 1,
            pending: 1
        })
    ));

    let mut merger = ChunkMerger::new();
    merger.push(0, ()).unwrap();
    assert!(matches!(
        merger.finish(2),
        Err(AccumulationError::Incomplete {
            expected: 2,
            got: 1
        })
    ));
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with pointing reconstruction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PointingError {
    #[error("Chunk {chunk} covers samples {start}..{end} of schedule entry {entry}, but that entry only has {num_samples} samples")]
    OutOfBounds {
        chunk: usize,
        entry: usize,
        start: usize,
        end: usize,
        num_samples: usize,
    },

    #[error("Chunk {chunk} refers to schedule entry {entry}, but there are only {num_entries} entries")]
    NoSuchEntry {
        chunk: usize,
        entry: usize,
        num_entries: usize,
    },

    #[error("The scan speed must be finite and non-negative, but got {0}°/s")]
    BadScanSpeed(f64),

    #[error("The instrument rotation period must be positive and finite, but got {0} s")]
    BadRotationPeriod(f64),

    #[error("Instrument rotation needs at least one angle")]
    NoRotationAngles,
}

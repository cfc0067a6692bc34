// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with accumulating chunk results.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccumulationError {
    #[error("Expected chunk {expected} next, but got chunk {got}; chunks must be appended in order")]
    OutOfOrder { expected: usize, got: usize },

    #[error("Chunk {chunk} starts at sample {got}, but the previous chunk ended at sample {expected}")]
    NotContiguous {
        chunk: usize,
        expected: usize,
        got: usize,
    },

    #[error("Chunk {chunk} has timestreams for detectors {got:?}, but detectors {expected:?} were expected")]
    DetectorMismatch {
        chunk: usize,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Chunk {chunk} detector {detector} has {got} samples, but the chunk has {expected}")]
    BadLength {
        chunk: usize,
        detector: usize,
        expected: usize,
        got: usize,
    },

    #[error("Chunk {0} was received more than once")]
    DuplicateChunk(usize),

    #[error("Chunk {missing} never arrived; {pending} later chunk(s) were left waiting")]
    Gap { missing: usize, pending: usize },

    #[error("Only {got} of {expected} chunks were received")]
    Incomplete { expected: usize, got: usize },
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with HEALPix maps.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HealpixError {
    #[error("nside cannot be 0")]
    ZeroNside,

    #[error("nside {0} is too big; the maximum supported is 8192")]
    NsideTooBig(usize),

    #[error("Expected 1 (T) or 3 (T, E, B) rows of harmonic coefficients, but got {0}")]
    BadNumStokes(usize),

    #[error("Expected {expected} harmonic coefficients for lmax {lmax}, but got {got}")]
    BadNumAlms {
        lmax: usize,
        expected: usize,
        got: usize,
    },
}

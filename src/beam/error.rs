// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with beam calculations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("Neither a FWHM nor a band limit (lmax) was given for a Gaussian beam")]
    NoSize,

    #[error("The beam FWHM must be positive and finite, but got {0} arcmin")]
    BadFwhm(f64),

    #[error("The beam band limit (lmax) cannot be 0")]
    ZeroLmax,

    #[error("The beam amplitude must be finite, but got {0}")]
    BadAmplitude(f64),

    #[error("{file}:{line}: {msg}")]
    TabulatedFile {
        file: String,
        line: usize,
        msg: String,
    },

    #[error("Can't normalise tabulated beam windows by b_0 = {0}")]
    TabulatedNoMonopole(f64),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

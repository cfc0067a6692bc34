// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with power spectra and sky realisations.

use thiserror::Error;

/// Power spectra that cannot describe a Gaussian sky.
#[derive(Error, Debug)]
pub enum InvalidSpectrumError {
    #[error("The {name} spectrum has {got} multipoles, but lmax {lmax} needs {}", lmax + 1)]
    Length {
        name: &'static str,
        lmax: usize,
        got: usize,
    },

    #[error("The {name} spectrum has negative power ({value}) at ℓ = {ell}")]
    NegativePower {
        name: &'static str,
        ell: usize,
        value: f64,
    },

    #[error("The {name} spectrum has a non-finite value at ℓ = {ell}")]
    NotFinite { name: &'static str, ell: usize },

    #[error("TE² exceeds TT·EE at ℓ = {ell} (TE = {te}, TT = {tt}, EE = {ee})")]
    CrossExceedsAuto { ell: usize, te: f64, tt: f64, ee: f64 },
}

/// Problems reading a power-spectrum file.
#[derive(Error, Debug)]
pub enum SpectrumFileError {
    #[error("{file}:{line}: expected 1 (TT), 2 (ℓ TT) or 5 (ℓ TT EE BB TE) columns, but got {got}")]
    BadColumnCount {
        file: String,
        line: usize,
        got: usize,
    },

    #[error("{file}:{line}: expected {expected} columns like the rows before it, but got {got}")]
    InconsistentColumns {
        file: String,
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("{file}:{line}: couldn't parse '{value}' as a number")]
    Parse {
        file: String,
        line: usize,
        value: String,
    },

    #[error("{file}:{line}: multipole {got} isn't an integer between 0 and 2^32 - 1")]
    BadMultipole { file: String, line: usize, got: f64 },

    #[error("{file}:{line}: expected multipole {expected}, but got {got}")]
    NonContiguous {
        file: String,
        line: usize,
        expected: usize,
        got: usize,
    },

    #[error("{file}: spectra stop at ℓ = {last}, but lmax is {lmax}")]
    TooShort {
        file: String,
        last: usize,
        lmax: usize,
    },

    #[error("{file}: no spectra were found")]
    Empty { file: String },

    #[error(transparent)]
    InvalidSpectrum(#[from] InvalidSpectrumError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

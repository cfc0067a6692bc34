// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with building a focal plane.

use thiserror::Error;

use crate::beam::BeamError;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("The focal plane grid must have at least one row and one column, but got {nrow}x{ncol}")]
    EmptyGrid { nrow: usize, ncol: usize },

    #[error("The field of view must be positive and finite, but got {0} degrees")]
    BadFieldOfView(f64),

    #[error("The beam band limit (lmax {beam}) is below the sky's (lmax {sky})")]
    BandLimit { beam: usize, sky: usize },

    #[error("A ghost needs a FWHM when its parent beam doesn't have one")]
    GhostNeedsFwhm,

    #[error("There is no detector named '{0}' in the focal plane")]
    NoSuchDetector(String),

    #[error("All {0} detectors are dead")]
    AllDead(usize),

    #[error(transparent)]
    Beam(#[from] BeamError),
}

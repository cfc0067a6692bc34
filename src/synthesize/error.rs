// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with timestream synthesis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("The white-noise level must be finite and non-negative, but got {0}")]
    BadNoise(f64),

    #[error("The focal plane has {got} detectors, but the convolved sky was made for {expected}")]
    FocalPlaneMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Healpix(#[from] crate::healpix::HealpixError),
}

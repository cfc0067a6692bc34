// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with map-making.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapmakingError {
    #[error("Normal equations at nside {got} can't be combined with those at nside {expected}")]
    NsideMismatch { expected: usize, got: usize },

    #[error("No weight was given for detector {0}")]
    MissingWeight(usize),

    #[error("Detector weights must be finite and positive, but detector {detector} has {weight}")]
    BadWeight { detector: usize, weight: f64 },

    #[error("The condition-number threshold must be at least 1, but got {0}")]
    BadConditionThreshold(f64),

    #[error("Can't make maps from an accumulator that didn't retain its timestreams")]
    TodNotRetained,

    #[error(transparent)]
    Healpix(#[from] crate::healpix::HealpixError),
}

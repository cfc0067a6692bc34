// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all scanmap-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{
    common::{ScheduleArgsError, SkyArgsError},
    simulate::SimulateArgsError,
};
use crate::{
    beam::BeamError,
    focal_plane::ConfigurationError,
    healpix::HealpixError,
    io::MapWriteError,
    mapmaking::MapmakingError,
    params::SimulateError,
    pointing::PointingError,
    schedule::ScheduleError,
    site::SiteError,
    synthesize::SynthesisError,
};

/// The *only* publicly visible error from scanmap. Each variant groups
/// errors by what the user needs to look at to fix them.
#[derive(Error, Debug)]
pub enum ScanmapError {
    /// An error related to simulate, not covered by anything below.
    #[error("{0}")]
    Simulate(String),

    /// An error related to the sky model or power spectra.
    #[error("{0}")]
    Sky(String),

    /// An error related to beam code.
    #[error("{0}")]
    Beam(String),

    /// An error related to the detector layout.
    #[error("{0}")]
    FocalPlane(String),

    /// An error related to schedules or their files.
    #[error("{0}")]
    Schedule(String),

    /// An error related to the site, scanning strategy or pointing.
    #[error("{0}")]
    Observation(String),

    /// An error related to solving for or writing maps.
    #[error("{0}")]
    Maps(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files are TOML or JSON with the same structure that --save-toml writes.")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<SimulateArgsError> for ScanmapError {
    fn from(e: SimulateArgsError) -> Self {
        let s = e.to_string();
        match e {
            SimulateArgsError::BadGhost(_) | SimulateArgsError::BadBandLimitPolicy(_) => {
                Self::FocalPlane(s)
            }
            SimulateArgsError::IncompleteRotation => Self::Observation(s),
            SimulateArgsError::BadInterpolation(_) | SimulateArgsError::ZeroChunkSize => {
                Self::Simulate(s)
            }
        }
    }
}

impl From<SimulateError> for ScanmapError {
    fn from(e: SimulateError) -> Self {
        match e {
            SimulateError::Pointing(e) => Self::from(e),
            SimulateError::Synthesis(e) => Self::from(e),
            SimulateError::Accumulation(e) => Self::Simulate(e.to_string()),
            SimulateError::Mapmaking(e) => Self::from(e),
            SimulateError::MapWrite(e) => Self::from(e),
        }
    }
}

impl From<SkyArgsError> for ScanmapError {
    fn from(e: SkyArgsError) -> Self {
        Self::Sky(e.to_string())
    }
}

impl From<ScheduleArgsError> for ScanmapError {
    fn from(e: ScheduleArgsError) -> Self {
        match e {
            ScheduleArgsError::Schedule(e) => Self::from(e),
            ScheduleArgsError::MissingScanArg(_) | ScheduleArgsError::BadTime(_) => {
                Self::Schedule(e.to_string())
            }
        }
    }
}

// Library code errors.

impl From<BeamError> for ScanmapError {
    fn from(e: BeamError) -> Self {
        let s = e.to_string();
        match e {
            BeamError::IO(_) => Self::Generic(s),
            _ => Self::Beam(s),
        }
    }
}

impl From<ConfigurationError> for ScanmapError {
    fn from(e: ConfigurationError) -> Self {
        match e {
            ConfigurationError::Beam(e) => Self::from(e),
            ConfigurationError::BandLimit { .. } => Self::FocalPlane(format!(
                "{e}\n\nUse a smaller --sky-lmax, a larger --beam-lmax or --band-limit-policy warn."
            )),
            _ => Self::FocalPlane(e.to_string()),
        }
    }
}

impl From<ScheduleError> for ScanmapError {
    fn from(e: ScheduleError) -> Self {
        let s = e.to_string();
        match e {
            ScheduleError::IO(_) => Self::Generic(s),
            _ => Self::Schedule(s),
        }
    }
}

impl From<SiteError> for ScanmapError {
    fn from(e: SiteError) -> Self {
        Self::Observation(e.to_string())
    }
}

impl From<PointingError> for ScanmapError {
    fn from(e: PointingError) -> Self {
        Self::Observation(e.to_string())
    }
}

impl From<SynthesisError> for ScanmapError {
    fn from(e: SynthesisError) -> Self {
        match e {
            SynthesisError::Healpix(e) => Self::from(e),
            _ => Self::Simulate(e.to_string()),
        }
    }
}

impl From<HealpixError> for ScanmapError {
    fn from(e: HealpixError) -> Self {
        Self::Maps(e.to_string())
    }
}

impl From<MapmakingError> for ScanmapError {
    fn from(e: MapmakingError) -> Self {
        Self::Maps(e.to_string())
    }
}

impl From<MapWriteError> for ScanmapError {
    fn from(e: MapWriteError) -> Self {
        let s = e.to_string();
        match e {
            MapWriteError::IO(_) => Self::Generic(s),
            MapWriteError::UnsupportedExt { .. } => Self::Maps(s),
        }
    }
}

impl From<std::io::Error> for ScanmapError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

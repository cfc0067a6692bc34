// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to abstract beam calculations.
//!
//! [`Beam`] is a trait detailing what the rest of the code needs from a beam:
//! its band limits and its harmonic-space windows. By making this trait, we
//! can neatly abstract over multiple beam codes; a circular [`GaussianBeam`]
//! is built in and arbitrary azimuthally-symmetric profiles can be supplied
//! as a [`TabulatedBeam`].
//!
//! Windows are normalised so that `b_0` is the beam amplitude; with an
//! amplitude of 1, the response to a uniform sky is unity.

mod error;
mod gaussian;
mod tabulated;

pub use error::BeamError;
pub use gaussian::GaussianBeam;
pub use tabulated::TabulatedBeam;

use std::f64::consts::TAU;

use strum_macros::{Display, EnumString};

use crate::constants::BEAM_LMAX_FACTOR;

/// Supported beam types.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum BeamType {
    /// A circular Gaussian.
    #[strum(serialize = "gaussian")]
    Gaussian,

    /// Windows read from a file.
    #[strum(serialize = "tabulated")]
    Tabulated,
}

/// Harmonic-space windows of a beam, indexed by ℓ.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamWindows {
    /// Scales temperature coefficients.
    pub intensity: Vec<f64>,

    /// Scales E and B coefficients.
    pub polarisation: Vec<f64>,
}

impl BeamWindows {
    /// A hashable identity of these windows. Beams with the same key convolve
    /// the sky identically.
    pub(crate) fn key(&self) -> Vec<u64> {
        self.intensity
            .iter()
            .chain(self.polarisation.iter())
            .map(|v| v.to_bits())
            .collect()
    }
}

/// A trait abstracting beam code functions.
pub trait Beam: Sync + Send + std::fmt::Debug {
    /// Get the type of beam.
    fn get_beam_type(&self) -> BeamType;

    /// Get the full width at half maximum, if this beam has one
    /// \[arcminutes\].
    fn get_fwhm_arcmin(&self) -> Option<f64>;

    /// The largest multipole this beam responds to.
    fn get_lmax(&self) -> usize;

    /// The largest azimuthal order this beam responds to. Symmetric beams
    /// only use orders 0 (intensity) and 2 (polarisation), so a beam with
    /// `mmax` < 2 is insensitive to polarisation.
    fn get_mmax(&self) -> usize;

    /// The peak response of this beam.
    fn get_amplitude(&self) -> f64;

    /// Calculate this beam's windows up to `lmax`. Windows are zero beyond
    /// the beam's own band limit.
    fn calc_windows(&self, lmax: usize) -> BeamWindows;
}

/// The band limit of a beam with a FWHM of `fwhm_arcmin`.
pub fn default_lmax(fwhm_arcmin: f64) -> usize {
    let fwhm_rad = (fwhm_arcmin / 60.0).to_radians();
    (BEAM_LMAX_FACTOR * TAU / fwhm_rad) as usize
}

/// The FWHM \[arcminutes\] of a beam whose band limit is `lmax`.
pub fn default_fwhm_arcmin(lmax: usize) -> f64 {
    (BEAM_LMAX_FACTOR * TAU / lmax as f64).to_degrees() * 60.0
}

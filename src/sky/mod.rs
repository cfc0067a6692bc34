// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Harmonic-space sky models.
//!
//! A [`SkyCoefficients`] holds the T, E and B spherical-harmonic coefficients
//! of a sky realisation for m >= 0; the negative-m coefficients follow from
//! the sky being real, `a_{ℓ,-m} = (-1)^m conj(a_ℓm)`.

mod error;
mod spectra;

pub use error::{InvalidSpectrumError, SpectrumFileError};
pub use spectra::PowerSpectra;

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use log::debug;
use ndarray::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use strum_macros::{Display, EnumIter};

use crate::{
    c64,
    healpix::{alm_index, num_alms, HealpixError},
};

/// The components of a harmonic-space sky.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum HarmonicComponent {
    T,
    E,
    B,
}

/// T, E and B harmonic coefficients band-limited at `lmax`. Immutable once
/// made.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyCoefficients {
    lmax: usize,

    /// Rows are T, E, B; columns are (ℓ, m) packed with
    /// [`alm_index`](crate::healpix::alm_index).
    alms: Array2<c64>,
}

impl SkyCoefficients {
    /// Draw a Gaussian sky realisation from power spectra. The same `seed`
    /// always gives the same sky.
    ///
    /// For each (ℓ, m), with unit-variance Gaussian deviates g₁, g₂, g₃ (real
    /// for m = 0, complex with variance ½ per part otherwise):
    ///
    /// - T = √TT g₁
    /// - E = TE/√TT g₁ + √(EE - TE²/TT) g₂
    /// - B = √BB g₃
    pub fn generate(
        spectra: &PowerSpectra,
        lmax: usize,
        seed: u64,
    ) -> Result<SkyCoefficients, InvalidSpectrumError> {
        spectra.validate(lmax)?;
        debug!("Generating a sky realisation with lmax {lmax} and seed {seed}");

        let mut rng = StdRng::seed_from_u64(seed);
        let mut alms = Array2::zeros((3, num_alms(lmax)));
        for l in 0..=lmax {
            let tt = spectra.tt[l];
            let ee = spectra.ee[l];
            let bb = spectra.bb[l];
            let te = spectra.te[l];
            let sqrt_tt = tt.sqrt();
            let (te_factor, ee_residual) = if tt > 0.0 {
                (te / sqrt_tt, (ee - te * te / tt).max(0.0).sqrt())
            } else {
                (0.0, ee.sqrt())
            };
            let sqrt_bb = bb.sqrt();

            for m in 0..=l {
                let mut draw = || -> c64 {
                    if m == 0 {
                        c64::new(rng.sample(StandardNormal), 0.0)
                    } else {
                        let re: f64 = rng.sample(StandardNormal);
                        let im: f64 = rng.sample(StandardNormal);
                        c64::new(re, im) * FRAC_1_SQRT_2
                    }
                };
                let g1 = draw();
                let g2 = draw();
                let g3 = draw();

                let i = alm_index(lmax, l, m);
                alms[(0, i)] = g1 * sqrt_tt;
                alms[(1, i)] = g1 * te_factor + g2 * ee_residual;
                alms[(2, i)] = g3 * sqrt_bb;
            }
        }

        Ok(SkyCoefficients { lmax, alms })
    }

    /// A sky that is `amplitude` in every direction, with no polarisation.
    pub fn monopole(lmax: usize, amplitude: f64) -> SkyCoefficients {
        let mut alms = Array2::zeros((3, num_alms(lmax)));
        alms[(0, 0)] = c64::new(amplitude * (4.0 * PI).sqrt(), 0.0);
        SkyCoefficients { lmax, alms }
    }

    /// Use existing coefficients. `alms` must have rows T, E, B and
    /// [`num_alms`]`(lmax)` columns.
    pub fn from_alms(lmax: usize, alms: Array2<c64>) -> Result<SkyCoefficients, HealpixError> {
        if alms.len_of(Axis(0)) != 3 {
            return Err(HealpixError::BadNumStokes(alms.len_of(Axis(0))));
        }
        let expected = num_alms(lmax);
        if alms.len_of(Axis(1)) != expected {
            return Err(HealpixError::BadNumAlms {
                lmax,
                expected,
                got: alms.len_of(Axis(1)),
            });
        }
        Ok(SkyCoefficients { lmax, alms })
    }

    pub fn lmax(&self) -> usize {
        self.lmax
    }

    pub fn alms(&self) -> ArrayView2<c64> {
        self.alms.view()
    }

    /// Get a coefficient. Negative orders are derived from the reality
    /// condition. `None` if (ℓ, m) is outside the band limit.
    pub fn get(&self, component: HarmonicComponent, l: usize, m: i64) -> Option<c64> {
        let abs_m = m.unsigned_abs() as usize;
        if l > self.lmax || abs_m > l {
            return None;
        }
        let row = component as usize;
        let a = self.alms[(row, alm_index(self.lmax, l, abs_m))];
        if m >= 0 {
            Some(a)
        } else if abs_m % 2 == 0 {
            Some(a.conj())
        } else {
            Some(-a.conj())
        }
    }

    /// Multiply the coefficients by beam windows and truncate at `lmax`
    /// (which is clipped to this sky's band limit). `intensity` scales T and
    /// `polarisation` scales E and B; both are indexed by ℓ and must reach
    /// `lmax`.
    pub fn smoothed(&self, lmax: usize, intensity: &[f64], polarisation: &[f64]) -> Array2<c64> {
        let lmax = lmax.min(self.lmax);
        debug_assert!(intensity.len() > lmax && polarisation.len() > lmax);
        let mut out = Array2::zeros((3, num_alms(lmax)));
        for m in 0..=lmax {
            for l in m..=lmax {
                let src = alm_index(self.lmax, l, m);
                let dst = alm_index(lmax, l, m);
                out[(0, dst)] = self.alms[(0, src)] * intensity[l];
                out[(1, dst)] = self.alms[(1, src)] * polarisation[l];
                out[(2, dst)] = self.alms[(2, src)] * polarisation[l];
            }
        }
        out
    }
}

/// Draw a Gaussian sky realisation; see [`SkyCoefficients::generate`].
pub fn generate(
    spectra: &PowerSpectra,
    lmax: usize,
    seed: u64,
) -> Result<SkyCoefficients, InvalidSpectrumError> {
    SkyCoefficients::generate(spectra, lmax, seed)
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::{default_fwhm_arcmin, default_lmax, Beam, BeamError, BeamType, BeamWindows};
use crate::constants::FWHM_FACTOR;

/// A circular Gaussian beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBeam {
    fwhm_arcmin: f64,
    lmax: usize,
    mmax: usize,
    amplitude: f64,
}

impl GaussianBeam {
    /// Make a new Gaussian beam. If only one of `fwhm_arcmin` and `lmax` is
    /// given, the other is derived from it (see [`default_lmax`] and
    /// [`default_fwhm_arcmin`]). `mmax` defaults to, and is clipped at,
    /// `lmax`.
    pub fn new(
        fwhm_arcmin: Option<f64>,
        lmax: Option<usize>,
        mmax: Option<usize>,
        amplitude: f64,
    ) -> Result<GaussianBeam, BeamError> {
        if let Some(f) = fwhm_arcmin {
            if !f.is_finite() || f <= 0.0 {
                return Err(BeamError::BadFwhm(f));
            }
        }
        if lmax == Some(0) {
            return Err(BeamError::ZeroLmax);
        }
        if !amplitude.is_finite() {
            return Err(BeamError::BadAmplitude(amplitude));
        }

        let (fwhm_arcmin, lmax) = match (fwhm_arcmin, lmax) {
            (Some(f), Some(l)) => (f, l),
            (Some(f), None) => {
                let l = default_lmax(f);
                if l == 0 {
                    return Err(BeamError::ZeroLmax);
                }
                (f, l)
            }
            (None, Some(l)) => (default_fwhm_arcmin(l), l),
            (None, None) => return Err(BeamError::NoSize),
        };
        let mmax = mmax.unwrap_or(lmax).min(lmax);

        Ok(GaussianBeam {
            fwhm_arcmin,
            lmax,
            mmax,
            amplitude,
        })
    }

    /// The standard deviation of the beam profile \[radians\].
    pub fn sigma_rad(&self) -> f64 {
        (self.fwhm_arcmin / 60.0).to_radians() / FWHM_FACTOR
    }
}

impl Beam for GaussianBeam {
    fn get_beam_type(&self) -> BeamType {
        BeamType::Gaussian
    }

    fn get_fwhm_arcmin(&self) -> Option<f64> {
        Some(self.fwhm_arcmin)
    }

    fn get_lmax(&self) -> usize {
        self.lmax
    }

    fn get_mmax(&self) -> usize {
        self.mmax
    }

    fn get_amplitude(&self) -> f64 {
        self.amplitude
    }

    fn calc_windows(&self, lmax: usize) -> BeamWindows {
        let sigma2 = self.sigma_rad().powi(2);
        let polarised = self.mmax >= 2;
        let mut intensity = vec![0.0; lmax + 1];
        let mut polarisation = vec![0.0; lmax + 1];
        for l in 0..=lmax.min(self.lmax) {
            let ll1 = (l * (l + 1)) as f64;
            intensity[l] = self.amplitude * (-0.5 * ll1 * sigma2).exp();
            if polarised && l >= 2 {
                // The spin-2 window has an extra exp(2σ²).
                polarisation[l] = self.amplitude * (-0.5 * (ll1 - 4.0) * sigma2).exp();
            }
        }
        BeamWindows {
            intensity,
            polarisation,
        }
    }
}

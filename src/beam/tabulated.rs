// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Azimuthally-symmetric beams described by their windows.
//!
//! Files have whitespace-delimited columns `ℓ b_T [b_P]`, starting at ℓ = 0
//! with no gaps; `#` lines are comments. Without a `b_P` column the
//! polarisation window is the intensity window.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::debug;

use super::{Beam, BeamError, BeamType, BeamWindows};

#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedBeam {
    intensity: Vec<f64>,
    polarisation: Vec<f64>,
    mmax: usize,
    amplitude: f64,
}

impl TabulatedBeam {
    /// Use windows directly. The band limit is set by the shorter window.
    /// If `normalise` is true, both windows are divided by `intensity[0]`,
    /// which must then be non-zero. The windows are then multiplied by
    /// `amplitude`.
    pub fn new(
        mut intensity: Vec<f64>,
        mut polarisation: Vec<f64>,
        mmax: Option<usize>,
        amplitude: f64,
        normalise: bool,
    ) -> Result<TabulatedBeam, BeamError> {
        if !amplitude.is_finite() {
            return Err(BeamError::BadAmplitude(amplitude));
        }
        let n = intensity.len().min(polarisation.len());
        if n < 2 {
            return Err(BeamError::ZeroLmax);
        }
        intensity.truncate(n);
        polarisation.truncate(n);

        let norm = if normalise {
            let b0 = intensity[0];
            if b0 == 0.0 || !b0.is_finite() {
                return Err(BeamError::TabulatedNoMonopole(b0));
            }
            b0
        } else {
            1.0
        };
        for v in intensity.iter_mut().chain(polarisation.iter_mut()) {
            *v *= amplitude / norm;
        }

        let lmax = n - 1;
        Ok(TabulatedBeam {
            intensity,
            polarisation,
            mmax: mmax.unwrap_or(lmax).min(lmax),
            amplitude,
        })
    }

    /// Read windows from a file.
    pub fn read(
        file: &Path,
        mmax: Option<usize>,
        amplitude: f64,
        normalise: bool,
    ) -> Result<TabulatedBeam, BeamError> {
        debug!("Reading tabulated beam windows from {}", file.display());
        let name = file.display().to_string();
        let bad_line = |line: usize, msg: String| BeamError::TabulatedFile {
            file: name.clone(),
            line,
            msg,
        };

        let mut intensity = vec![];
        let mut polarisation = vec![];
        for (i_line, line) in BufReader::new(File::open(file)?).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let values = line
                .split_whitespace()
                .map(|s| s.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| bad_line(i_line + 1, e.to_string()))?;
            let (ell, b_t, b_p) = match values.as_slice() {
                [ell, b_t] => (*ell, *b_t, *b_t),
                [ell, b_t, b_p] => (*ell, *b_t, *b_p),
                _ => {
                    return Err(bad_line(
                        i_line + 1,
                        format!("expected 2 or 3 columns, got {}", values.len()),
                    ))
                }
            };
            if ell != intensity.len() as f64 {
                return Err(bad_line(
                    i_line + 1,
                    format!("expected ℓ = {}, got {ell}", intensity.len()),
                ));
            }
            intensity.push(b_t);
            polarisation.push(b_p);
        }

        TabulatedBeam::new(intensity, polarisation, mmax, amplitude, normalise)
    }
}

impl Beam for TabulatedBeam {
    fn get_beam_type(&self) -> BeamType {
        BeamType::Tabulated
    }

    fn get_fwhm_arcmin(&self) -> Option<f64> {
        None
    }

    fn get_lmax(&self) -> usize {
        self.intensity.len() - 1
    }

    fn get_mmax(&self) -> usize {
        self.mmax
    }

    fn get_amplitude(&self) -> f64 {
        self.amplitude
    }

    fn calc_windows(&self, lmax: usize) -> BeamWindows {
        let polarised = self.mmax >= 2;
        let mut intensity = vec![0.0; lmax + 1];
        let mut polarisation = vec![0.0; lmax + 1];
        let n = (lmax + 1).min(self.intensity.len());
        intensity[..n].copy_from_slice(&self.intensity[..n]);
        if polarised {
            polarisation[..n].copy_from_slice(&self.polarisation[..n]);
        }
        BeamWindows {
            intensity,
            polarisation,
        }
    }
}

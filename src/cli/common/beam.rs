// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{InfoPrinter, Warn};
use crate::{
    beam::{Beam, BeamError, GaussianBeam, TabulatedBeam},
    constants::DEFAULT_FWHM_ARCMIN,
};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct BeamArgs {
    /// The full-width at half-maximum of the Gaussian detector beam [arcmin].
    /// If neither this nor --beam-lmax are given, the default is
    /// 43 arcmin.
    #[clap(long, help_heading = "BEAM")]
    pub(crate) beam_fwhm: Option<f64>,

    /// The band limit of the beam. If not given, it is derived from the FWHM.
    #[clap(long, help_heading = "BEAM")]
    pub(crate) beam_lmax: Option<usize>,

    /// The azimuthal band limit of the beam. Defaults to (and is clipped at)
    /// the band limit.
    #[clap(long, help_heading = "BEAM")]
    pub(crate) beam_mmax: Option<usize>,

    /// Scale the beam response by this amount. Default: 1
    #[clap(long, allow_hyphen_values = true, help_heading = "BEAM")]
    pub(crate) beam_amplitude: Option<f64>,

    /// Read the beam's harmonic windows from this file (columns: ℓ, intensity
    /// window, and optionally a polarisation window) rather than using a
    /// Gaussian.
    #[clap(long, parse(from_os_str), help_heading = "BEAM")]
    pub(crate) beam_file: Option<PathBuf>,

    /// Divide the tabulated windows by their ℓ = 0 value.
    #[clap(long, help_heading = "BEAM")]
    #[serde(default)]
    pub(crate) normalise_beam: bool,
}

impl BeamArgs {
    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            beam_fwhm: self.beam_fwhm.or(other.beam_fwhm),
            beam_lmax: self.beam_lmax.or(other.beam_lmax),
            beam_mmax: self.beam_mmax.or(other.beam_mmax),
            beam_amplitude: self.beam_amplitude.or(other.beam_amplitude),
            beam_file: self.beam_file.or(other.beam_file),
            normalise_beam: self.normalise_beam || other.normalise_beam,
        }
    }

    pub(crate) fn parse(self) -> Result<Arc<dyn Beam>, BeamError> {
        let Self {
            beam_fwhm,
            beam_lmax,
            beam_mmax,
            beam_amplitude,
            beam_file,
            normalise_beam,
        } = self;

        let mut printer = InfoPrinter::new("Beam info".into());
        let amplitude = beam_amplitude.unwrap_or(1.0);

        let beam: Arc<dyn Beam> = match beam_file {
            Some(file) => {
                debug!("Beam file: {}", file.display());
                if beam_fwhm.is_some() || beam_lmax.is_some() {
                    "The beam FWHM and band limit are ignored when a beam file is given".warn();
                }
                printer.push_line(format!("Type: tabulated ({})", file.display()).into());
                if normalise_beam {
                    printer.push_line("Windows normalised to their monopole".into());
                }
                Arc::new(TabulatedBeam::read(
                    &file,
                    beam_mmax,
                    amplitude,
                    normalise_beam,
                )?)
            }

            None => {
                if normalise_beam {
                    "--normalise-beam only applies to tabulated beams; ignoring".warn();
                }
                printer.push_line("Type: Gaussian".into());
                let fwhm = match (beam_fwhm, beam_lmax) {
                    (None, None) => Some(DEFAULT_FWHM_ARCMIN),
                    (f, _) => f,
                };
                Arc::new(GaussianBeam::new(fwhm, beam_lmax, beam_mmax, amplitude)?)
            }
        };

        let mut block = vec![];
        if let Some(fwhm) = beam.get_fwhm_arcmin() {
            block.push(format!("FWHM: {fwhm:.2} arcmin").into());
        }
        block.push(format!("lmax: {}, mmax: {}", beam.get_lmax(), beam.get_mmax()).into());
        if (amplitude - 1.0).abs() > f64::EPSILON {
            block.push(format!("Amplitude: {amplitude}").into());
        }
        printer.push_block(block);
        printer.display();

        Ok(beam)
    }
}

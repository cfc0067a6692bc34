// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::InfoPrinter;
use crate::{
    constants::DEFAULT_SKY_SEED,
    sky::{InvalidSpectrumError, PowerSpectra, SkyCoefficients, SpectrumFileError},
};

/// Flat spectra start here unless told otherwise; the monopole and dipole
/// are usually removed from CMB skies.
const DEFAULT_FLAT_ELL_MIN: usize = 2;

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct SkyArgs {
    /// A file of angular power spectra with columns ℓ, TT and optionally EE,
    /// BB and TE [μK²]. A Gaussian sky is drawn from these.
    #[clap(short, long, parse(from_os_str), help_heading = "SKY")]
    pub(crate) spectra: Option<PathBuf>,

    /// The spectra file holds D_ℓ = ℓ(ℓ+1)C_ℓ/2π rather than C_ℓ.
    #[clap(long, help_heading = "SKY")]
    #[serde(default)]
    pub(crate) spectra_are_dl: bool,

    /// Rather than reading spectra, use this power in each of TT, EE and BB
    /// [μK²].
    #[clap(long, help_heading = "SKY")]
    pub(crate) flat_power: Option<f64>,

    /// The first multipole with power when using --flat-power. Default: 2
    #[clap(long, help_heading = "SKY")]
    pub(crate) flat_ell_min: Option<usize>,

    /// Rather than a Gaussian sky, use a uniform, unpolarised sky with this
    /// value.
    #[clap(long, allow_hyphen_values = true, help_heading = "SKY")]
    pub(crate) monopole: Option<f64>,

    /// The band limit of the sky. Default: the beam's band limit
    #[clap(long, help_heading = "SKY")]
    pub(crate) sky_lmax: Option<usize>,

    /// The seed of the sky realisation. Default: 25
    #[clap(long, help_heading = "SKY")]
    pub(crate) sky_seed: Option<u64>,
}

impl SkyArgs {
    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            spectra: self.spectra.or(other.spectra),
            spectra_are_dl: self.spectra_are_dl || other.spectra_are_dl,
            flat_power: self.flat_power.or(other.flat_power),
            flat_ell_min: self.flat_ell_min.or(other.flat_ell_min),
            monopole: self.monopole.or(other.monopole),
            sky_lmax: self.sky_lmax.or(other.sky_lmax),
            sky_seed: self.sky_seed.or(other.sky_seed),
        }
    }

    /// Make the sky. If the user didn't give a band limit, `default_lmax` is
    /// used.
    pub(crate) fn parse(self, default_lmax: usize) -> Result<SkyCoefficients, SkyArgsError> {
        let Self {
            spectra,
            spectra_are_dl,
            flat_power,
            flat_ell_min,
            monopole,
            sky_lmax,
            sky_seed,
        } = self;

        let lmax = sky_lmax.unwrap_or(default_lmax);
        let seed = sky_seed.unwrap_or(DEFAULT_SKY_SEED);
        let mut printer = InfoPrinter::new("Sky info".into());

        let num_sources = [spectra.is_some(), flat_power.is_some(), monopole.is_some()]
            .into_iter()
            .filter(|&b| b)
            .count();
        if num_sources > 1 {
            return Err(SkyArgsError::MultipleSkies);
        }

        let sky = match (spectra, flat_power, monopole) {
            (Some(file), _, _) => {
                debug!("Spectra file: {}", file.display());
                printer.push_line(format!("Spectra from {}", file.display()).into());
                if spectra_are_dl {
                    printer.push_line("(converted from D_ℓ)".into());
                }
                let spectra = PowerSpectra::read(&file, lmax, spectra_are_dl)?;
                printer.push_line(format!("Seed: {seed}").into());
                SkyCoefficients::generate(&spectra, lmax, seed)?
            }

            (None, Some(power), _) => {
                let ell_min = flat_ell_min.unwrap_or(DEFAULT_FLAT_ELL_MIN);
                printer.push_line(format!("Flat spectra: {power} μK² from ℓ = {ell_min}").into());
                printer.push_line(format!("Seed: {seed}").into());
                let spectra = PowerSpectra::flat(lmax, ell_min, power);
                SkyCoefficients::generate(&spectra, lmax, seed)?
            }

            (None, None, Some(amp)) => {
                printer.push_line(format!("Uniform sky: {amp}").into());
                SkyCoefficients::monopole(lmax, amp)
            }

            (None, None, None) => return Err(SkyArgsError::NoSky),
        };
        printer.push_line(format!("lmax: {lmax}").into());
        printer.display();

        Ok(sky)
    }
}

#[derive(Error, Debug)]
pub(crate) enum SkyArgsError {
    #[error("No sky was specified; use one of --spectra, --flat-power or --monopole")]
    NoSky,

    #[error("Only one of --spectra, --flat-power and --monopole may be used")]
    MultipleSkies,

    #[error(transparent)]
    SpectrumFile(#[from] SpectrumFileError),

    #[error(transparent)]
    InvalidSpectrum(#[from] InvalidSpectrumError),
}

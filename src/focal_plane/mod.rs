// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Detector layout.
//!
//! A [`FocalPlane`] is a rectangular grid of detector pairs offset from the
//! boresight. Columns are spread in azimuth and rows in elevation; each grid
//! point gets an "A" detector at the base polarisation angle and (usually) a
//! "B" partner rotated by 90 degrees.

mod error;

pub use error::ConfigurationError;

use std::{collections::HashSet, sync::Arc};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use vec1::Vec1;

use crate::{
    beam::{Beam, GaussianBeam},
    math::linspace,
};

/// What to do when a beam's band limit is below the sky's.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BandLimitPolicy {
    /// Log a warning; synthesis truncates at the beam's band limit.
    #[default]
    #[strum(serialize = "warn")]
    Warn,

    /// Refuse to build the focal plane.
    #[strum(serialize = "error")]
    Error,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PolarisationLabel {
    A,
    B,
}

/// The parameters of a ghost beam. Offsets are relative to the parent
/// detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostOptions {
    pub az_offset_deg: f64,
    pub el_offset_deg: f64,
    pub amplitude: f64,

    /// If not given, the parent's FWHM (and band limit) is used.
    pub fwhm_arcmin: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FocalPlaneOptions {
    /// The polarisation angle of "A" detectors \[degrees\].
    pub polang_deg: f64,

    /// Don't make "B" detectors.
    pub no_pairs: bool,

    pub band_limit_policy: BandLimitPolicy,

    /// Ghosts given to every detector.
    pub ghosts: Vec<GhostOptions>,

    /// The names of detectors to mark dead.
    pub dead: Vec<String>,
}

impl Default for FocalPlaneOptions {
    fn default() -> Self {
        FocalPlaneOptions {
            polang_deg: 0.0,
            no_pairs: false,
            band_limit_policy: BandLimitPolicy::Warn,
            ghosts: vec![],
            dead: vec![],
        }
    }
}

/// A secondary response of a detector. A ghost is dead whenever its parent
/// is.
#[derive(Debug, Clone)]
pub struct Ghost {
    pub name: String,

    /// Azimuthal offset from the boresight \[degrees\].
    pub az_deg: f64,

    /// Elevation offset from the boresight \[degrees\].
    pub el_deg: f64,

    pub beam: Arc<dyn Beam>,
}

#[derive(Debug, Clone)]
pub struct Detector {
    pub name: String,
    pub pol: PolarisationLabel,

    /// Azimuthal offset from the boresight \[degrees\].
    pub az_deg: f64,

    /// Elevation offset from the boresight \[degrees\].
    pub el_deg: f64,

    /// Polarisation angle \[degrees\].
    pub polang_deg: f64,

    pub dead: bool,
    pub beam: Arc<dyn Beam>,
    pub ghosts: Vec<Ghost>,
}

impl Detector {
    /// The main beam followed by the ghosts, with their offsets.
    pub fn responses(&self) -> impl Iterator<Item = (f64, f64, &Arc<dyn Beam>)> {
        std::iter::once((self.az_deg, self.el_deg, &self.beam)).chain(
            self.ghosts
                .iter()
                .map(|g| (g.az_deg, g.el_deg, &g.beam)),
        )
    }
}

/// An immutable set of detectors.
#[derive(Debug, Clone)]
pub struct FocalPlane {
    detectors: Vec1<Detector>,
}

impl FocalPlane {
    /// Lay out an `nrow` x `ncol` grid spanning `fov_deg` in both azimuth and
    /// elevation. Every detector shares `beam`. `sky_lmax` is checked against
    /// the beam's band limit according to the options' [`BandLimitPolicy`].
    pub fn build(
        nrow: usize,
        ncol: usize,
        fov_deg: f64,
        beam: Arc<dyn Beam>,
        options: &FocalPlaneOptions,
        sky_lmax: usize,
    ) -> Result<FocalPlane, ConfigurationError> {
        if nrow == 0 || ncol == 0 {
            return Err(ConfigurationError::EmptyGrid { nrow, ncol });
        }
        if !fov_deg.is_finite() || fov_deg <= 0.0 {
            return Err(ConfigurationError::BadFieldOfView(fov_deg));
        }
        check_band_limit(beam.as_ref(), sky_lmax, options.band_limit_policy)?;

        let ghost_beams = options
            .ghosts
            .iter()
            .map(|g| {
                let ghost_beam: Arc<dyn Beam> = match (g.fwhm_arcmin, beam.get_fwhm_arcmin()) {
                    (Some(fwhm), _) => {
                        Arc::new(GaussianBeam::new(Some(fwhm), None, None, g.amplitude)?)
                    }
                    (None, Some(fwhm)) => Arc::new(GaussianBeam::new(
                        Some(fwhm),
                        Some(beam.get_lmax()),
                        Some(beam.get_mmax()),
                        g.amplitude,
                    )?),
                    (None, None) => return Err(ConfigurationError::GhostNeedsFwhm),
                };
                check_band_limit(ghost_beam.as_ref(), sky_lmax, options.band_limit_policy)?;
                Ok(ghost_beam)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let half = fov_deg / 2.0;
        let azs = linspace(-half, half, ncol);
        let els = linspace(-half, half, nrow);
        let pols: &[PolarisationLabel] = if options.no_pairs {
            &[PolarisationLabel::A]
        } else {
            &[PolarisationLabel::A, PolarisationLabel::B]
        };

        let mut detectors = Vec::with_capacity(nrow * ncol * pols.len());
        for (row, &el_deg) in els.iter().enumerate() {
            for (col, &az_deg) in azs.iter().enumerate() {
                for &pol in pols {
                    let name = format!("r{row:03}c{col:03}{pol}");
                    let ghosts = options
                        .ghosts
                        .iter()
                        .zip(ghost_beams.iter())
                        .enumerate()
                        .map(|(i, (g, b))| Ghost {
                            name: if options.ghosts.len() == 1 {
                                format!("{name}_ghost")
                            } else {
                                format!("{name}_ghost{i}")
                            },
                            az_deg: az_deg + g.az_offset_deg,
                            el_deg: el_deg + g.el_offset_deg,
                            beam: Arc::clone(b),
                        })
                        .collect();
                    detectors.push(Detector {
                        name,
                        pol,
                        az_deg,
                        el_deg,
                        polang_deg: match pol {
                            PolarisationLabel::A => options.polang_deg,
                            PolarisationLabel::B => options.polang_deg + 90.0,
                        },
                        dead: false,
                        beam: Arc::clone(&beam),
                        ghosts,
                    });
                }
            }
        }

        // The grid is non-empty, so this can't fail.
        let mut fp = FocalPlane {
            detectors: Vec1::try_from_vec(detectors)
                .map_err(|_| ConfigurationError::EmptyGrid { nrow, ncol })?,
        };
        fp.mark_dead(&options.dead)?;
        debug!(
            "Built a focal plane with {} detectors ({} live)",
            fp.len(),
            fp.num_live()
        );
        Ok(fp)
    }

    /// Mark the named detectors (and their ghosts) dead. At least one
    /// detector must remain live.
    pub fn mark_dead<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), ConfigurationError> {
        let names: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        for &name in &names {
            if !self.detectors.iter().any(|d| d.name == name) {
                return Err(ConfigurationError::NoSuchDetector(name.to_string()));
            }
        }
        for d in self.detectors.iter_mut() {
            if names.contains(d.name.as_str()) {
                d.dead = true;
            }
        }
        if self.num_live() == 0 {
            return Err(ConfigurationError::AllDead(self.len()));
        }
        Ok(())
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Detectors that produce data, with their indices.
    pub fn live_detectors(&self) -> impl Iterator<Item = (usize, &Detector)> {
        self.detectors.iter().enumerate().filter(|(_, d)| !d.dead)
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn num_live(&self) -> usize {
        self.detectors.iter().filter(|d| !d.dead).count()
    }

    pub fn num_ghosts(&self) -> usize {
        self.detectors.iter().map(|d| d.ghosts.len()).sum()
    }
}

fn check_band_limit(
    beam: &dyn Beam,
    sky_lmax: usize,
    policy: BandLimitPolicy,
) -> Result<(), ConfigurationError> {
    let beam_lmax = beam.get_lmax();
    if beam_lmax >= sky_lmax {
        return Ok(());
    }
    match policy {
        BandLimitPolicy::Warn => {
            warn!("The beam band limit (lmax {beam_lmax}) is below the sky's (lmax {sky_lmax}); the sky will be truncated");
            Ok(())
        }
        BandLimitPolicy::Error => Err(ConfigurationError::BandLimit {
            beam: beam_lmax,
            sky: sky_lmax,
        }),
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Detector timestreams from a beam-convolved sky.
//!
//! For azimuthally-symmetric beams, convolving the sky with a beam is a
//! multiplication of the sky's harmonic coefficients by the beam's windows.
//! The convolved I, Q and U maps are synthesised once per distinct set of
//! windows (so detectors and ghosts sharing a beam share the maps), and a
//! detector's timestream is
//!
//! `d = I + Q cos 2ψ + U sin 2ψ`
//!
//! evaluated along its pointing and summed over its main beam and ghosts.

mod error;

pub use error::SynthesisError;

use std::collections::HashMap;

use log::{debug, trace};
use ndarray::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    focal_plane::FocalPlane,
    healpix::{alm2map, ang2pix_ring, get_interpol_ring, nside2npix},
    pointing::{DetectorPointing, Pointing},
    schedule::Chunk,
    sky::SkyCoefficients,
};

/// How convolved maps are sampled at a detector's position.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Bilinear interpolation between the four surrounding pixel centres.
    #[default]
    #[strum(serialize = "bilinear")]
    Bilinear,

    /// The value of the containing pixel.
    #[strum(serialize = "nearest")]
    Nearest,
}

/// Gaussian white noise added to every detector sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteNoise {
    sigma: f64,
    seed: u64,
}

impl WhiteNoise {
    pub fn new(sigma: f64, seed: u64) -> Result<WhiteNoise, SynthesisError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(SynthesisError::BadNoise(sigma));
        }
        Ok(WhiteNoise { sigma, seed })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Draw `n` samples for a detector in a chunk. The same (seed, chunk,
    /// detector) always gives the same noise.
    pub fn draw(&self, chunk: usize, detector: usize, n: usize) -> Vec<f64> {
        let mut seed = [0; 32];
        seed[..8].copy_from_slice(&self.seed.to_le_bytes());
        seed[8..16].copy_from_slice(&(chunk as u64).to_le_bytes());
        seed[16..24].copy_from_slice(&(detector as u64).to_le_bytes());
        let mut rng = StdRng::from_seed(seed);
        match Normal::new(0.0, self.sigma) {
            Ok(normal) => normal.sample_iter(&mut rng).take(n).collect(),
            // Only possible with a bad sigma, which `new` rejects.
            Err(_) => vec![0.0; n],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisParams {
    /// The resolution of the convolved maps.
    pub nside: usize,

    pub interpolation: Interpolation,
    pub noise: Option<WhiteNoise>,
}

/// Beam-convolved I, Q, U maps for every detector response.
#[derive(Debug)]
pub struct ConvolvedSky {
    nside: usize,

    /// One (3, npix) map set per distinct beam.
    maps: Vec<Array2<f64>>,

    /// For each detector, the index into `maps` of each of its responses
    /// (main beam first, then ghosts). Empty for dead detectors.
    response_maps: Vec<Vec<usize>>,
}

impl ConvolvedSky {
    /// Convolve `sky` with every live beam in `focal_plane`. Each beam is
    /// truncated at the smaller of its own and the sky's band limit.
    pub fn new(
        sky: &SkyCoefficients,
        focal_plane: &FocalPlane,
        nside: usize,
    ) -> Result<ConvolvedSky, SynthesisError> {
        let mut keys: HashMap<Vec<u64>, usize> = HashMap::new();
        let mut unique = vec![];
        let mut response_maps = vec![vec![]; focal_plane.len()];
        for (i_det, det) in focal_plane.live_detectors() {
            for (_, _, beam) in det.responses() {
                let lmax = beam.get_lmax().min(sky.lmax());
                let windows = beam.calc_windows(lmax);
                let next = unique.len();
                let i_map = *keys.entry(windows.key()).or_insert_with(|| {
                    unique.push((lmax, windows));
                    next
                });
                response_maps[i_det].push(i_map);
            }
        }
        debug!(
            "Convolving the sky with {} distinct beam(s) at nside {nside}",
            unique.len()
        );

        let maps = unique
            .into_iter()
            .map(|(lmax, windows)| {
                let alms = sky.smoothed(lmax, &windows.intensity, &windows.polarisation);
                alm2map(alms.view(), lmax, nside)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConvolvedSky {
            nside,
            maps,
            response_maps,
        })
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn num_distinct_beams(&self) -> usize {
        self.maps.len()
    }

    /// The I, Q, U maps seen by a response of a detector.
    pub fn maps_for(&self, detector: usize, response: usize) -> Option<ArrayView2<f64>> {
        let i_map = *self.response_maps.get(detector)?.get(response)?;
        Some(self.maps[i_map].view())
    }

    /// Sample (I, Q, U) of a map set at a direction.
    fn sample(
        &self,
        maps: ArrayView2<f64>,
        theta: f64,
        phi: f64,
        interpolation: Interpolation,
    ) -> [f64; 3] {
        match interpolation {
            Interpolation::Nearest => {
                let p = ang2pix_ring(self.nside, theta, phi);
                [maps[(0, p)], maps[(1, p)], maps[(2, p)]]
            }
            Interpolation::Bilinear => {
                let (pix, wgt) = get_interpol_ring(self.nside, theta, phi);
                let mut out = [0.0; 3];
                for (&p, &w) in pix.iter().zip(wgt.iter()) {
                    for (s, o) in out.iter_mut().enumerate() {
                        *o += w * maps[(s, p)];
                    }
                }
                out
            }
        }
    }
}

/// The timestream of one detector over one chunk.
#[derive(Debug, Clone)]
pub struct DetectorTimestream {
    /// The index of the detector in the focal plane.
    pub detector: usize,

    pub data: Vec<f64>,

    /// The pointing of the detector's main beam.
    pub pointing: DetectorPointing,
}

/// The timestreams of all live detectors over one chunk.
#[derive(Debug, Clone)]
pub struct ChunkTimestreams {
    pub chunk: Chunk,
    pub detectors: Vec<DetectorTimestream>,
}

/// Samples a [`ConvolvedSky`] along detector pointing.
pub struct TimestreamSynthesizer<'a> {
    sky: &'a ConvolvedSky,
    focal_plane: &'a FocalPlane,
    params: &'a SynthesisParams,
}

impl<'a> TimestreamSynthesizer<'a> {
    pub fn new(
        sky: &'a ConvolvedSky,
        focal_plane: &'a FocalPlane,
        params: &'a SynthesisParams,
    ) -> Result<TimestreamSynthesizer<'a>, SynthesisError> {
        if sky.response_maps.len() != focal_plane.len() {
            return Err(SynthesisError::FocalPlaneMismatch {
                expected: sky.response_maps.len(),
                got: focal_plane.len(),
            });
        }
        Ok(TimestreamSynthesizer {
            sky,
            focal_plane,
            params,
        })
    }

    /// Synthesise the timestreams of every live detector for a chunk of
    /// pointing. Dead detectors are skipped.
    pub fn synthesize(&self, pointing: &Pointing) -> ChunkTimestreams {
        trace!("Synthesising chunk {}", pointing.chunk.index);
        let detectors = self
            .focal_plane
            .live_detectors()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(i_det, det)| {
                let main = pointing.detector(det.az_deg, det.el_deg, det.polang_deg);
                let mut data = vec![0.0; pointing.len()];
                for (i_resp, (az, el, _)) in det.responses().enumerate() {
                    let maps = match self.sky.maps_for(i_det, i_resp) {
                        Some(m) => m,
                        None => continue,
                    };
                    let ghost_pointing;
                    let dp = if i_resp == 0 {
                        &main
                    } else {
                        ghost_pointing = pointing.detector(az, el, det.polang_deg);
                        &ghost_pointing
                    };
                    add_response(self.sky, maps, dp, self.params.interpolation, &mut data);
                }

                if let Some(noise) = self.params.noise {
                    let n = noise.draw(pointing.chunk.index, i_det, data.len());
                    data.iter_mut().zip(n).for_each(|(d, n)| *d += n);
                }

                DetectorTimestream {
                    detector: i_det,
                    data,
                    pointing: main,
                }
            })
            .collect();

        ChunkTimestreams {
            chunk: pointing.chunk,
            detectors,
        }
    }
}

fn add_response(
    sky: &ConvolvedSky,
    maps: ArrayView2<f64>,
    pointing: &DetectorPointing,
    interpolation: Interpolation,
    data: &mut [f64],
) {
    debug_assert_eq!(maps.len_of(Axis(1)), nside2npix(sky.nside));
    data.par_iter_mut()
        .zip(pointing.theta.par_iter())
        .zip(pointing.phi.par_iter())
        .zip(pointing.psi.par_iter())
        .for_each(|(((d, &theta), &phi), &psi)| {
            let [i, q, u] = sky.sample(maps, theta, phi, interpolation);
            let (s2, c2) = (2.0 * psi).sin_cos();
            *d += i + q * c2 + u * s2;
        });
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Binned map-making.
//!
//! Every sample `d` of a detector with weight `w` and polarisation angle `ψ`
//! in pixel `p` contributes `w p pᵀ` and `w d p` to its pixel's normal
//! equations, where `p = [1, cos 2ψ, sin 2ψ]`. Solving the 3x3 system per
//! pixel gives the I, Q and U estimate. Pixels that can't be solved
//! trustworthily are classified by a [`Degeneracy`] and filled with
//! [`UNSEEN`].
//!
//! Normal equations are additive, so each chunk can build its own
//! [`PartialNormalEquations`] and the results summed in any order.

mod error;
#[cfg(test)]
mod tests;

pub use error::MapmakingError;

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use nalgebra::{Matrix3, Vector3};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::{MIN_POL_HITS, SINGULAR_EIGEN_TOLERANCE, UNSEEN},
    healpix::{nside2npix, validate_nside},
    synthesize::ChunkTimestreams,
    tod::{pointing_matrix, DetectorTod, TimestreamAccumulator},
};

/// Which Stokes parameters are solved for.
#[derive(
    Debug, Display, Default, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SolveMode {
    /// I, Q and U.
    #[default]
    #[strum(serialize = "polarised")]
    Polarised,

    /// I only, ignoring polarisation angles.
    #[strum(serialize = "intensity")]
    IntensityOnly,
}

impl SolveMode {
    pub fn num_stokes(self) -> usize {
        match self {
            SolveMode::Polarised => 3,
            SolveMode::IntensityOnly => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SolveParams {
    pub mode: SolveMode,

    /// Pixels whose condition number exceeds this are rejected. With no
    /// threshold, only singular pixels are rejected.
    pub cond_threshold: Option<f64>,
}

impl SolveParams {
    pub fn validate(&self) -> Result<(), MapmakingError> {
        match self.cond_threshold {
            Some(t) if t.is_nan() || t < 1.0 => Err(MapmakingError::BadConditionThreshold(t)),
            _ => Ok(()),
        }
    }
}

/// Why a pixel has no estimate.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Degeneracy {
    #[strum(serialize = "no hits")]
    NoHits,

    #[strum(serialize = "too few hits")]
    TooFewHits,

    #[strum(serialize = "singular")]
    Singular,

    #[strum(serialize = "ill-conditioned")]
    IllConditioned,
}

/// How many pixels were rejected for each [`Degeneracy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegeneracyCounts {
    pub no_hits: usize,
    pub too_few_hits: usize,
    pub singular: usize,
    pub ill_conditioned: usize,
}

impl DegeneracyCounts {
    fn count(&mut self, d: Degeneracy) {
        match d {
            Degeneracy::NoHits => self.no_hits += 1,
            Degeneracy::TooFewHits => self.too_few_hits += 1,
            Degeneracy::Singular => self.singular += 1,
            Degeneracy::IllConditioned => self.ill_conditioned += 1,
        }
    }

    pub fn get(&self, d: Degeneracy) -> usize {
        match d {
            Degeneracy::NoHits => self.no_hits,
            Degeneracy::TooFewHits => self.too_few_hits,
            Degeneracy::Singular => self.singular,
            Degeneracy::IllConditioned => self.ill_conditioned,
        }
    }

    pub fn total(&self) -> usize {
        self.no_hits + self.too_few_hits + self.singular + self.ill_conditioned
    }
}

/// The normal-equation terms of a single pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelTerms {
    pub hits: u64,

    /// The upper triangle of `Σ w p pᵀ`: II, IQ, IU, QQ, QU, UU.
    pub ata: [f64; 6],

    /// `Σ w d p`.
    pub atd: [f64; 3],
}

impl PixelTerms {
    #[inline]
    pub fn add_sample(&mut self, weight: f64, d: f64, cos_2psi: f64, sin_2psi: f64) {
        let (c, s) = (cos_2psi, sin_2psi);
        self.hits += 1;
        self.ata[0] += weight;
        self.ata[1] += weight * c;
        self.ata[2] += weight * s;
        self.ata[3] += weight * c * c;
        self.ata[4] += weight * c * s;
        self.ata[5] += weight * s * s;
        self.atd[0] += weight * d;
        self.atd[1] += weight * d * c;
        self.atd[2] += weight * d * s;
    }

    #[inline]
    pub fn merge(&mut self, other: &PixelTerms) {
        self.hits += other.hits;
        self.ata
            .iter_mut()
            .zip(other.ata.iter())
            .for_each(|(a, b)| *a += b);
        self.atd
            .iter_mut()
            .zip(other.atd.iter())
            .for_each(|(a, b)| *a += b);
    }

    /// Solve this pixel. On success, returns the Stokes estimate (only the
    /// first element is meaningful for an intensity-only solve) and the
    /// condition number.
    pub fn solve(&self, params: &SolveParams) -> Result<([f64; 3], f64), Degeneracy> {
        if self.hits == 0 {
            return Err(Degeneracy::NoHits);
        }
        match params.mode {
            SolveMode::IntensityOnly => {
                if self.ata[0].is_nan() || self.ata[0] <= 0.0 {
                    return Err(Degeneracy::Singular);
                }
                Ok(([self.atd[0] / self.ata[0], 0.0, 0.0], 1.0))
            }

            SolveMode::Polarised => {
                if self.hits < u64::from(MIN_POL_HITS) {
                    return Err(Degeneracy::TooFewHits);
                }
                let a = &self.ata;
                let m = Matrix3::new(a[0], a[1], a[2], a[1], a[3], a[4], a[2], a[4], a[5]);
                let eigen = m.symmetric_eigen();
                let lambda_max = eigen.eigenvalues.max();
                let lambda_min = eigen.eigenvalues.min();
                if lambda_max.is_nan()
                    || lambda_max <= 0.0
                    || lambda_min <= SINGULAR_EIGEN_TOLERANCE * f64::EPSILON * lambda_max
                {
                    return Err(Degeneracy::Singular);
                }
                let cond = lambda_max / lambda_min;
                if matches!(params.cond_threshold, Some(t) if cond > t) {
                    return Err(Degeneracy::IllConditioned);
                }

                let v = &eigen.eigenvectors;
                let inv_lambda = Matrix3::from_diagonal(&eigen.eigenvalues.map(|l| 1.0 / l));
                let x = v * inv_lambda * v.transpose() * Vector3::from(self.atd);
                Ok(([x[0], x[1], x[2]], cond))
            }
        }
    }
}

/// Check that each of `detectors` (focal-plane indices) has a usable weight.
/// The first detector without one is reported.
pub fn validate_weights<I>(weights: &[f64], detectors: I) -> Result<(), MapmakingError>
where
    I: IntoIterator<Item = usize>,
{
    for detector in detectors {
        detector_weight(weights, detector)?;
    }
    Ok(())
}

/// Look up the weight of a focal-plane detector.
fn detector_weight(weights: &[f64], detector: usize) -> Result<f64, MapmakingError> {
    let weight = *weights
        .get(detector)
        .ok_or(MapmakingError::MissingWeight(detector))?;
    if !weight.is_finite() || weight <= 0.0 {
        return Err(MapmakingError::BadWeight { detector, weight });
    }
    Ok(weight)
}

fn bin_detector(
    weight: f64,
    data: &[f64],
    pixels: &[u32],
    cos_2psi: &[f64],
    sin_2psi: &[f64],
) -> HashMap<u32, PixelTerms> {
    let mut terms: HashMap<u32, PixelTerms> = HashMap::new();
    for (((&d, &p), &c), &s) in data
        .iter()
        .zip(pixels.iter())
        .zip(cos_2psi.iter())
        .zip(sin_2psi.iter())
    {
        terms.entry(p).or_default().add_sample(weight, d, c, s);
    }
    terms
}

/// The normal-equation terms of the pixels touched by one chunk, sorted by
/// pixel.
#[derive(Debug, Clone)]
pub struct PartialNormalEquations {
    nside: usize,
    pixels: Vec<u32>,
    terms: Vec<PixelTerms>,
}

impl PartialNormalEquations {
    /// Bin the timestreams of a chunk. `weights` is indexed by focal-plane
    /// detector index.
    pub fn from_chunk(
        nside: usize,
        weights: &[f64],
        chunk: &ChunkTimestreams,
    ) -> Result<PartialNormalEquations, MapmakingError> {
        validate_nside(nside)?;
        let binned = chunk
            .detectors
            .par_iter()
            .map(|d| {
                let weight = detector_weight(weights, d.detector)?;
                let (pixels, cos_2psi, sin_2psi) =
                    pointing_matrix(nside, &d.pointing.theta, &d.pointing.phi, &d.pointing.psi);
                Ok(bin_detector(weight, &d.data, &pixels, &cos_2psi, &sin_2psi))
            })
            .collect::<Result<Vec<_>, MapmakingError>>()?;
        Ok(PartialNormalEquations::from_binned(nside, binned))
    }

    /// Bin accumulated timestreams whose pixels are at `nside`.
    pub fn from_tods(
        nside: usize,
        weights: &[f64],
        tods: &[DetectorTod],
    ) -> Result<PartialNormalEquations, MapmakingError> {
        validate_nside(nside)?;
        let binned = tods
            .par_iter()
            .map(|t| {
                let weight = detector_weight(weights, t.detector)?;
                Ok(bin_detector(weight, &t.data, &t.pixels, &t.cos_2psi, &t.sin_2psi))
            })
            .collect::<Result<Vec<_>, MapmakingError>>()?;
        Ok(PartialNormalEquations::from_binned(nside, binned))
    }

    fn from_binned(nside: usize, binned: Vec<HashMap<u32, PixelTerms>>) -> PartialNormalEquations {
        // Merge in detector order so results don't depend on thread timing.
        let mut all: HashMap<u32, PixelTerms> = HashMap::new();
        for map in binned {
            for (p, t) in map {
                all.entry(p).or_default().merge(&t);
            }
        }
        let (pixels, terms) = all.into_iter().sorted_unstable_by_key(|(p, _)| *p).unzip();
        PartialNormalEquations {
            nside,
            pixels,
            terms,
        }
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    /// The number of distinct pixels touched.
    pub fn num_pixels(&self) -> usize {
        self.pixels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &PixelTerms)> {
        self.pixels.iter().copied().zip(self.terms.iter())
    }
}

/// The normal equations of every pixel of a map.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    nside: usize,
    terms: Vec<PixelTerms>,
}

impl NormalEquations {
    pub fn new(nside: usize) -> Result<NormalEquations, MapmakingError> {
        validate_nside(nside)?;
        Ok(NormalEquations {
            nside,
            terms: vec![PixelTerms::default(); nside2npix(nside)],
        })
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn pixel(&self, pixel: usize) -> Option<&PixelTerms> {
        self.terms.get(pixel)
    }

    /// Add the terms of a chunk.
    pub fn add(&mut self, partial: &PartialNormalEquations) -> Result<(), MapmakingError> {
        if partial.nside != self.nside {
            return Err(MapmakingError::NsideMismatch {
                expected: self.nside,
                got: partial.nside,
            });
        }
        for (p, t) in partial.iter() {
            self.terms[p as usize].merge(t);
        }
        Ok(())
    }

    /// Solve every pixel.
    pub fn solve(&self, params: &SolveParams) -> Result<SkyMapEstimate, MapmakingError> {
        params.validate()?;
        let npix = self.terms.len();
        let nstokes = params.mode.num_stokes();
        let solutions: Vec<_> = self.terms.par_iter().map(|t| t.solve(params)).collect();

        let mut maps = Array2::from_elem((nstokes, npix), UNSEEN);
        let mut cond = Array1::from_elem(npix, f64::INFINITY);
        let mut counts = DegeneracyCounts::default();
        for (i_pix, solution) in solutions.into_iter().enumerate() {
            match solution {
                Ok((stokes, c)) => {
                    for (s, &v) in stokes.iter().take(nstokes).enumerate() {
                        maps[(s, i_pix)] = v;
                    }
                    cond[i_pix] = c;
                }
                Err(d) => counts.count(d),
            }
        }
        let hits = self.terms.iter().map(|t| t.hits).collect();
        debug!(
            "Solved {} of {npix} pixels; rejected {} with no hits, {} with too few hits, {} singular, {} ill-conditioned",
            npix - counts.total(),
            counts.no_hits,
            counts.too_few_hits,
            counts.singular,
            counts.ill_conditioned
        );

        Ok(SkyMapEstimate {
            nside: self.nside,
            mode: params.mode,
            maps,
            cond,
            hits,
            counts,
        })
    }
}

/// Solve for maps directly from retained timestreams.
pub fn solve(
    accumulator: &TimestreamAccumulator,
    weights: &[f64],
    params: &SolveParams,
) -> Result<SkyMapEstimate, MapmakingError> {
    if !accumulator.is_retained() {
        return Err(MapmakingError::TodNotRetained);
    }
    let nside = accumulator.nside();
    let partial = PartialNormalEquations::from_tods(nside, weights, accumulator.tods())?;
    let mut normal = NormalEquations::new(nside)?;
    normal.add(&partial)?;
    normal.solve(params)
}

/// Estimated sky maps in the RING scheme.
#[derive(Debug, Clone)]
pub struct SkyMapEstimate {
    pub nside: usize,
    pub mode: SolveMode,

    /// (nstokes, npix); I or I, Q, U. Rejected pixels are [`UNSEEN`].
    pub maps: Array2<f64>,

    /// Condition number of each pixel's normal equations; infinite where
    /// rejected.
    pub cond: Array1<f64>,

    pub hits: Vec<u64>,
    pub counts: DegeneracyCounts,
}

impl SkyMapEstimate {
    pub fn num_stokes(&self) -> usize {
        self.maps.len_of(Axis(0))
    }

    pub fn num_pixels(&self) -> usize {
        self.maps.len_of(Axis(1))
    }

    /// The number of pixels with an estimate.
    pub fn num_solved(&self) -> usize {
        self.num_pixels() - self.counts.total()
    }
}

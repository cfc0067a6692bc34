// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Harmonic synthesis onto HEALPix rings.

use std::{collections::HashMap, sync::Arc};

use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;
use rustfft::{num_complex::Complex64, Fft, FftPlanner};

use super::{alm_index, nside2npix, num_alms, num_rings, ring_info, validate_nside, HealpixError};
use crate::{c64, math::cexp, math::Legendre};

/// Synthesise maps from harmonic coefficients.
///
/// `alms` has either 1 row (T) or 3 rows (T, E, B), each with
/// [`num_alms`]`(lmax)` coefficients in [`alm_index`] order. The output has a
/// row per Stokes parameter (I, or I, Q, U) and [`nside2npix`]`(nside)`
/// columns in RING order.
///
/// Polarisation follows the HEALPix convention
/// `Q + iU = -Σ (E_ℓm + i B_ℓm) ₂Y_ℓm`.
pub fn alm2map(alms: ArrayView2<c64>, lmax: usize, nside: usize) -> Result<Array2<f64>, HealpixError> {
    validate_nside(nside)?;
    let nstokes = alms.len_of(Axis(0));
    if nstokes != 1 && nstokes != 3 {
        return Err(HealpixError::BadNumStokes(nstokes));
    }
    let expected = num_alms(lmax);
    if alms.len_of(Axis(1)) != expected {
        return Err(HealpixError::BadNumAlms {
            lmax,
            expected,
            got: alms.len_of(Axis(1)),
        });
    }
    debug!("alm2map: lmax {lmax}, nside {nside}, {nstokes} Stokes");

    let legendre = Legendre::new(lmax);
    // Rings share only a handful of lengths; plan each once.
    let mut planner = FftPlanner::new();
    let plans: HashMap<usize, Arc<dyn Fft<f64>>> = (1..=num_rings(nside))
        .map(|ring| ring_info(nside, ring).num_pixels)
        .map(|n| (n, planner.plan_fft_inverse(n)))
        .collect();

    let rings: Vec<(usize, Array2<f64>)> = (1..=num_rings(nside))
        .into_par_iter()
        .map(|ring| {
            let info = ring_info(nside, ring);
            let coeffs = ring_coefficients(&legendre, alms, lmax, info.cos_theta, info.sin_theta);
            let fft = &plans[&info.num_pixels];
            (
                info.first_pixel,
                evaluate_ring(coeffs.view(), fft.as_ref(), info.phi0),
            )
        })
        .collect();

    let mut map = Array2::zeros((nstokes, nside2npix(nside)));
    for (first_pixel, values) in rings {
        let n = values.len_of(Axis(1));
        map.slice_mut(s![.., first_pixel..first_pixel + n])
            .assign(&values);
    }
    Ok(map)
}

/// The Fourier coefficients `f_m(θ)` (m = 0..=lmax) of each Stokes parameter
/// along a ring.
fn ring_coefficients(
    legendre: &Legendre,
    alms: ArrayView2<c64>,
    lmax: usize,
    cos_theta: f64,
    sin_theta: f64,
) -> Array2<c64> {
    let nstokes = alms.len_of(Axis(0));
    let mut coeffs = Array2::zeros((nstokes, lmax + 1));
    let mut spin0 = vec![0.0; lmax + 1];
    let mut w = vec![0.0; lmax + 1];
    let mut x = vec![0.0; lmax + 1];

    let mut lambda_mm = Legendre::lambda_00();
    for m in 0..=lmax {
        if m > 0 {
            lambda_mm = Legendre::next_lambda_mm(lambda_mm, m, sin_theta);
        }
        let n = lmax + 1 - m;
        legendre.fill_spin0(m, lambda_mm, cos_theta, &mut spin0[..n]);
        let start = alm_index(lmax, m, m);
        let t = alms.slice(s![0, start..start + n]);
        coeffs[(0, m)] = t
            .iter()
            .zip(spin0[..n].iter())
            .map(|(&a, &l)| a * l)
            .sum();

        if nstokes == 3 {
            legendre.fill_spin2(m, cos_theta, sin_theta, &spin0[..n], &mut w[..n], &mut x[..n]);
            let e = alms.slice(s![1, start..start + n]);
            let b = alms.slice(s![2, start..start + n]);
            let mut q = c64::default();
            let mut u = c64::default();
            for i in 0..n {
                q -= e[i] * w[i] - b[i] * x[i];
                u -= b[i] * w[i] + e[i] * x[i];
            }
            coeffs[(1, m)] = q;
            coeffs[(2, m)] = u;
        }
    }
    coeffs
}

/// Evaluate `f_0 + 2 Re Σ_{m>0} f_m e^{imφ}` at each pixel of a ring.
///
/// The terms are folded into the ring's `n` Fourier bins (m mod n, with the
/// first pixel's phase applied) and summed with one inverse FFT per Stokes
/// parameter.
pub(super) fn evaluate_ring(coeffs: ArrayView2<c64>, fft: &dyn Fft<f64>, phi0: f64) -> Array2<f64> {
    let nstokes = coeffs.len_of(Axis(0));
    let num_pixels = fft.len();
    let mut values = Array2::zeros((nstokes, num_pixels));
    let mut bins = vec![Complex64::default(); num_pixels];
    for (f, mut out) in coeffs.outer_iter().zip(values.outer_iter_mut()) {
        bins.fill(Complex64::default());
        for (m, &f_m) in f.iter().enumerate() {
            let scale = if m == 0 { 1.0 } else { 2.0 };
            let g = f_m * cexp(phi0 * m as f64) * scale;
            bins[m % num_pixels] += Complex64::new(g.re, g.im);
        }
        fft.process(&mut bins);
        out.iter_mut()
            .zip(bins.iter())
            .for_each(|(v, b)| *v = b.re);
    }
    values
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use std::f64::consts::PI;

use crate::c64;

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
///
/// # Examples
///
/// `assert_abs_diff_eq!(cexp(PI), c64::new(-1.0, 0.0));`
#[inline]
pub(crate) fn cexp(x: f64) -> c64 {
    let (im, re) = x.sin_cos();
    c64::new(re, im)
}

/// `n` evenly-spaced values from `start` to `end` (inclusive). A single value
/// is the midpoint.
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![0.5 * (start + end)],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Wrap an angle into [0, 360) degrees.
#[inline]
pub(crate) fn wrap_degrees(deg: f64) -> f64 {
    let w = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.
    if w >= 360.0 {
        0.0
    } else {
        w
    }
}

/// Recursion workspace for the orthonormalised associated Legendre functions
/// `λ_ℓm(cos θ) = sqrt((2ℓ+1)/4π (ℓ-m)!/(ℓ+m)!) P_ℓm(cos θ)`, including the
/// Condon-Shortley phase, and the spin-2 combinations used for polarisation
/// synthesis.
///
/// The ℓ-independent factors are cached once per band limit; a caller walks m
/// upwards, carrying `λ_mm` between steps with [`Legendre::next_lambda_mm`].
pub(crate) struct Legendre {
    lmax: usize,
    /// `sqrt(4ℓ² - 1)` for each ℓ.
    sqrt_4l2_m1: Vec<f64>,
    /// `1 / sqrt((ℓ+2)(ℓ+1)ℓ(ℓ-1))` for ℓ >= 2, otherwise 0.
    spin2_norm: Vec<f64>,
}

impl Legendre {
    pub(crate) fn new(lmax: usize) -> Legendre {
        let sqrt_4l2_m1 = (0..=lmax)
            .map(|l| {
                let l = l as f64;
                (4.0 * l * l - 1.0).max(0.0).sqrt()
            })
            .collect();
        let spin2_norm = (0..=lmax)
            .map(|l| {
                if l < 2 {
                    0.0
                } else {
                    let l = l as f64;
                    1.0 / ((l + 2.0) * (l + 1.0) * l * (l - 1.0)).sqrt()
                }
            })
            .collect();
        Legendre {
            lmax,
            sqrt_4l2_m1,
            spin2_norm,
        }
    }

    /// `λ_00`.
    pub(crate) fn lambda_00() -> f64 {
        (0.25 / PI).sqrt()
    }

    /// Given `λ_{m-1,m-1}`, get `λ_mm`.
    #[inline]
    pub(crate) fn next_lambda_mm(prev: f64, m: usize, sin_theta: f64) -> f64 {
        let m = m as f64;
        -((2.0 * m + 1.0) / (2.0 * m)).sqrt() * sin_theta * prev
    }

    /// Fill `out[ℓ - m]` with `λ_ℓm` for ℓ in m..=lmax, starting from `λ_mm`.
    pub(crate) fn fill_spin0(&self, m: usize, lambda_mm: f64, cos_theta: f64, out: &mut [f64]) {
        let lmax = self.lmax;
        debug_assert_eq!(out.len(), lmax + 1 - m);
        out[0] = lambda_mm;
        if m == lmax {
            return;
        }
        out[1] = ((2 * m + 3) as f64).sqrt() * cos_theta * lambda_mm;

        let m2 = (m * m) as f64;
        for l in m + 2..=lmax {
            let lf = l as f64;
            let lm1 = lf - 1.0;
            let a = self.sqrt_4l2_m1[l] / (lf * lf - m2).sqrt();
            let b = ((lm1 * lm1 - m2).sqrt()) / self.sqrt_4l2_m1[l - 1];
            out[l - m] = a * (cos_theta * out[l - m - 1] - b * out[l - m - 2]);
        }
    }

    /// From the spin-0 functions of order m, fill the spin-2 functions `λ_W`
    /// and `λ_X` (both indexed by ℓ - m). They vanish for ℓ < 2.
    pub(crate) fn fill_spin2(
        &self,
        m: usize,
        cos_theta: f64,
        sin_theta: f64,
        spin0: &[f64],
        w: &mut [f64],
        x: &mut [f64],
    ) {
        let one_on_s2 = 1.0 / (sin_theta * sin_theta);
        let c_on_s2 = cos_theta * one_on_s2;
        let mf = m as f64;
        let m2 = mf * mf;
        for l in m..=self.lmax {
            let i = l - m;
            if l < 2 {
                w[i] = 0.0;
                x[i] = 0.0;
                continue;
            }
            let lf = l as f64;
            let lam = spin0[i];
            let lam_lm1 = if l == m { 0.0 } else { spin0[i - 1] };
            // sqrt((2ℓ+1)/(2ℓ-1) (ℓ² - m²))
            let fac = ((2.0 * lf + 1.0) / (2.0 * lf - 1.0) * (lf * lf - m2)).sqrt();
            let norm = 2.0 * self.spin2_norm[l];
            w[i] = norm
                * (-((lf - m2) * one_on_s2 + 0.5 * lf * (lf - 1.0)) * lam + fac * c_on_s2 * lam_lm1);
            x[i] = norm * mf * one_on_s2 * ((lf - 1.0) * cos_theta * lam - fac * lam_lm1);
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! HEALPix pixelisation in the RING ordering scheme.
//!
//! Only the parts needed to synthesise maps from harmonic coefficients and to
//! bin samples into pixels are here. `nside` need not be a power of two.
//!
//! Angles follow the HEALPix convention: `theta` is the colatitude (0 at the
//! north pole) and `phi` the longitude, both in radians. Function names follow
//! the usual HEALPix library ones (`pix2ring_ring`, `get_interpol_ring`, ...).

mod error;
mod synthesis;

pub use error::HealpixError;
pub use synthesis::alm2map;

use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// The number of pixels in a map.
#[inline]
pub fn nside2npix(nside: usize) -> usize {
    12 * nside * nside
}

/// The number of iso-latitude rings in a map.
#[inline]
pub fn num_rings(nside: usize) -> usize {
    4 * nside - 1
}

/// The number of (ℓ, m ≥ 0) harmonic coefficients up to `lmax`.
#[inline]
pub fn num_alms(lmax: usize) -> usize {
    (lmax + 1) * (lmax + 2) / 2
}

/// The packed index of the (ℓ, m) coefficient. Coefficients are ordered
/// m-major, i.e. all ℓ for m = 0, then all ℓ >= 1 for m = 1, etc.
#[inline]
pub fn alm_index(lmax: usize, l: usize, m: usize) -> usize {
    debug_assert!(m <= l && l <= lmax);
    m * (2 * lmax + 1 - m) / 2 + l
}

/// Check that `nside` can make a map.
pub fn validate_nside(nside: usize) -> Result<(), HealpixError> {
    if nside == 0 {
        return Err(HealpixError::ZeroNside);
    }
    // 12 * nside^2 must fit in a u32 for writing.
    if nside > 8192 {
        return Err(HealpixError::NsideTooBig(nside));
    }
    Ok(())
}

/// Geometry of an iso-latitude ring.
#[derive(Debug, Clone, Copy)]
pub struct Ring {
    /// The RING index of the first pixel in the ring.
    pub first_pixel: usize,

    /// The number of pixels in the ring.
    pub num_pixels: usize,

    pub cos_theta: f64,
    pub sin_theta: f64,
    pub theta: f64,

    /// The longitude of the first pixel centre \[radians\].
    pub phi0: f64,
}

/// The z = cos(θ) of a ring's pixel centres. `ring` is 1-based.
pub fn ring2z_ring(nside: usize, ring: usize) -> f64 {
    let nside_f = nside as f64;
    if ring < nside {
        let ir = ring as f64;
        1.0 - ir * ir / (3.0 * nside_f * nside_f)
    } else if ring <= 3 * nside {
        (2.0 * nside_f - ring as f64) * 2.0 / (3.0 * nside_f)
    } else {
        let ir = (4 * nside - ring) as f64;
        ir * ir / (3.0 * nside_f * nside_f) - 1.0
    }
}

/// Get the geometry of a ring. `ring` is 1-based, running from the north pole
/// (1) to the south pole (`4 nside - 1`).
pub fn ring_info(nside: usize, ring: usize) -> Ring {
    debug_assert!(ring >= 1 && ring <= num_rings(nside));
    let npix = nside2npix(nside);
    let northern_ring = if ring > 2 * nside {
        4 * nside - ring
    } else {
        ring
    };

    let (first_pixel, num_pixels, phi0) = if northern_ring < nside {
        // Polar cap.
        let num_pixels = 4 * northern_ring;
        let phi0 = PI / num_pixels as f64;
        if ring == northern_ring {
            (2 * northern_ring * (northern_ring - 1), num_pixels, phi0)
        } else {
            (npix - 2 * northern_ring * (northern_ring + 1), num_pixels, phi0)
        }
    } else {
        // Equatorial belt.
        let num_pixels = 4 * nside;
        let ncap = 2 * nside * (nside - 1);
        let shifted = (ring - nside) % 2 == 0;
        let phi0 = if shifted {
            PI / num_pixels as f64
        } else {
            0.0
        };
        (ncap + (ring - nside) * num_pixels, num_pixels, phi0)
    };

    let cos_theta = ring2z_ring(nside, ring);
    let sin_theta = ((1.0 - cos_theta) * (1.0 + cos_theta)).max(0.0).sqrt();
    Ring {
        first_pixel,
        num_pixels,
        cos_theta,
        sin_theta,
        theta: cos_theta.acos(),
        phi0,
    }
}

/// Wrap a longitude into [0, 2π).
#[inline]
fn wrap_phi(phi: f64) -> f64 {
    let p = phi.rem_euclid(TAU);
    if p >= TAU {
        0.0
    } else {
        p
    }
}

/// The RING pixel containing the direction (`theta`, `phi`).
pub fn ang2pix_ring(nside: usize, theta: f64, phi: f64) -> usize {
    let nside_i = nside as i64;
    let nl4 = 4 * nside_i;
    let z = theta.cos();
    let za = z.abs();
    // In [0, 4).
    let tt = wrap_phi(phi) / FRAC_PI_2;

    let pix = if za <= 2.0 / 3.0 {
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * z * 0.75;
        // Indices of the ascending and descending edge lines.
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        // Ring number counted from z = 2/3.
        let ir = nside_i + 1 + jp - jm;
        let kshift = 1 - (ir & 1);
        let t1 = jp + jm - nside_i + kshift + 1 + 2 * nl4;
        let ip = (t1 / 2) % nl4;
        let ncap = 2 * nside_i * (nside_i - 1);
        ncap + (ir - 1) * nl4 + ip
    } else {
        let tp = tt - tt.floor();
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp) as i64;
        let jm = ((1.0 - tp) * tmp) as i64;
        // Ring number counted from the closest pole.
        let ir = (jp + jm + 1).max(1);
        let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
        if z > 0.0 {
            2 * ir * (ir - 1) + ip
        } else {
            nside2npix(nside) as i64 - 2 * ir * (ir + 1) + ip
        }
    };
    pix as usize
}

/// The centre of a RING pixel as (`theta`, `phi`).
pub fn pix2ang_ring(nside: usize, pix: usize) -> (f64, f64) {
    let ring = pix2ring_ring(nside, pix);
    let info = ring_info(nside, ring);
    let j = pix - info.first_pixel;
    (
        info.theta,
        info.phi0 + TAU * j as f64 / info.num_pixels as f64,
    )
}

/// The 1-based ring containing a RING pixel.
pub fn pix2ring_ring(nside: usize, pix: usize) -> usize {
    let npix = nside2npix(nside);
    let ncap = 2 * nside * (nside - 1);
    if pix < ncap {
        // Solve 2 ir (ir - 1) <= pix.
        let mut ir = ((1.0 + (1.0 + 2.0 * pix as f64).sqrt()) / 2.0) as usize;
        while 2 * ir * (ir - 1) > pix {
            ir -= 1;
        }
        while 2 * (ir + 1) * ir <= pix {
            ir += 1;
        }
        ir
    } else if pix < npix - ncap {
        (pix - ncap) / (4 * nside) + nside
    } else {
        let p = npix - pix;
        // Solve 2 ir (ir - 1) < p <= 2 ir (ir + 1).
        let mut ir = ((1.0 + (2.0 * p as f64 - 1.0).max(0.0).sqrt()) / 2.0) as usize;
        ir = ir.max(1);
        while 2 * ir * (ir + 1) < p {
            ir += 1;
        }
        while ir > 1 && 2 * (ir - 1) * ir >= p {
            ir -= 1;
        }
        4 * nside - ir
    }
}

/// Convert a unit vector into (`theta`, `phi`).
#[inline]
pub fn vec2ang(v: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = v;
    let theta = (x * x + y * y).sqrt().atan2(z);
    let phi = wrap_phi(y.atan2(x));
    (theta, phi)
}

/// The index of the ring lying at or just north of `cos_theta`; 0 if the
/// direction is north of the first ring and `4 nside - 1` if it is south of
/// the last ring.
fn ring_above(nside: usize, cos_theta: f64) -> usize {
    let nside_f = nside as f64;
    let az = cos_theta.abs();
    if az <= 2.0 / 3.0 {
        return (nside_f * (2.0 - 1.5 * cos_theta)) as usize;
    }
    let iring = (nside_f * (3.0 * (1.0 - az)).sqrt()) as usize;
    if cos_theta > 0.0 {
        iring
    } else {
        4 * nside - iring - 1
    }
}

/// The four pixels and weights that bilinearly interpolate a map at the
/// direction (`theta`, `phi`). Interpolation is linear in longitude within the
/// rings bracketing the direction, then linear in colatitude between them.
/// The weights sum to 1.
pub fn get_interpol_ring(nside: usize, theta: f64, phi: f64) -> ([usize; 4], [f64; 4]) {
    let phi = wrap_phi(phi);
    let nrings = num_rings(nside);
    let ir1 = ring_above(nside, theta.cos()).min(nrings);
    let ir2 = ir1 + 1;

    let mut pix = [0; 4];
    let mut wgt = [0.0; 4];

    // Pixels either side of `phi` in a ring.
    let neighbours = |ring: usize| -> ([usize; 2], [f64; 2], f64) {
        let info = ring_info(nside, ring);
        let nr = info.num_pixels as i64;
        let dphi = TAU / info.num_pixels as f64;
        let tmp = (phi - info.phi0) / dphi;
        let i1 = tmp.floor() as i64;
        let w1 = tmp - i1 as f64;
        let i2 = (i1 + 1).rem_euclid(nr);
        let i1 = i1.rem_euclid(nr);
        (
            [
                info.first_pixel + i1 as usize,
                info.first_pixel + i2 as usize,
            ],
            [1.0 - w1, w1],
            info.theta,
        )
    };

    let mut theta1 = 0.0;
    let mut theta2 = PI;
    if ir1 > 0 {
        let (p, w, t) = neighbours(ir1);
        pix[0] = p[0];
        pix[1] = p[1];
        wgt[0] = w[0];
        wgt[1] = w[1];
        theta1 = t;
    }
    if ir2 <= nrings {
        let (p, w, t) = neighbours(ir2);
        pix[2] = p[0];
        pix[3] = p[1];
        wgt[2] = w[0];
        wgt[3] = w[1];
        theta2 = t;
    }

    if ir1 == 0 {
        // North of the first ring; the pole is the average of the first ring.
        let wtheta = theta / theta2;
        let fac = (1.0 - wtheta) * 0.25;
        wgt[2] = wgt[2] * wtheta + fac;
        wgt[3] = wgt[3] * wtheta + fac;
        wgt[0] = fac;
        wgt[1] = fac;
        pix[0] = (pix[2] + 2) & 3;
        pix[1] = (pix[3] + 2) & 3;
    } else if ir2 > nrings {
        // South of the last ring.
        let npix = nside2npix(nside);
        let wtheta = (theta - theta1) / (PI - theta1);
        let fac = wtheta * 0.25;
        wgt[0] = wgt[0] * (1.0 - wtheta) + fac;
        wgt[1] = wgt[1] * (1.0 - wtheta) + fac;
        wgt[2] = fac;
        wgt[3] = fac;
        pix[2] = ((pix[0] + 2) & 3) + npix - 4;
        pix[3] = ((pix[1] + 2) & 3) + npix - 4;
    } else {
        let wtheta = (theta - theta1) / (theta2 - theta1);
        wgt[0] *= 1.0 - wtheta;
        wgt[1] *= 1.0 - wtheta;
        wgt[2] *= wtheta;
        wgt[3] *= wtheta;
    }

    (pix, wgt)
}

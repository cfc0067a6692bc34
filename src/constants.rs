// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. `scanmap` should do as many
calculations as possible in double precision before converting to a lower
precision, if it is ever required.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// The HEALPix "unseen" sentinel. Map pixels without a trustworthy estimate
/// carry this value.
pub const UNSEEN: f64 = -1.6375e30;

/// Ratio of the sidereal rotation rate to the solar (UT1) rate.
pub const SIDEREAL_RATE: f64 = 1.002_737_811_911_354_5;

/// The conversion between a Gaussian's FWHM and its standard deviation,
/// `sqrt(8 ln 2)`.
pub const FWHM_FACTOR: f64 = 2.354_820_045_030_949_3;

/// A beam's default band limit is this many times `2π / FWHM`.
pub const BEAM_LMAX_FACTOR: f64 = 1.4;

/// Default beam FWHM \[arcminutes\].
pub const DEFAULT_FWHM_ARCMIN: f64 = 43.0;

/// Default scan speed \[degrees per second\].
pub const DEFAULT_SCAN_SPEED_DEG: f64 = 1.0;

/// Default detector sample rate \[Hz\].
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 10.0;

/// Default number of samples per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Default output map resolution.
pub const DEFAULT_MAP_NSIDE: usize = 256;

/// Default seed for sky realisations.
pub const DEFAULT_SKY_SEED: u64 = 25;

/// A pixel's smallest normal-equation eigenvalue must exceed this multiple of
/// machine epsilon times its largest eigenvalue to be considered invertible.
pub const SINGULAR_EIGEN_TOLERANCE: f64 = 3.0;

/// The number of hits a pixel needs before a polarised solve is attempted.
pub const MIN_POL_HITS: u32 = 3;

/// The latitude of the Atacama site \[degrees\].
pub const ATACAMA_LAT_DEG: f64 = -22.96;
/// The longitude of the Atacama site \[degrees\].
pub const ATACAMA_LONG_DEG: f64 = -67.79;
/// The height of the Atacama site \[metres\].
pub const ATACAMA_HEIGHT_M: f64 = 5200.0;

/// The latitude of the South Pole site \[degrees\].
pub const SOUTH_POLE_LAT_DEG: f64 = -89.99;
/// The longitude of the South Pole site \[degrees\].
pub const SOUTH_POLE_LONG_DEG: f64 = -44.65;
/// The height of the South Pole site \[metres\].
pub const SOUTH_POLE_HEIGHT_M: f64 = 2835.0;

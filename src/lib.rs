// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Simulate the timestreams of a scanning telescope observing a
//! spherical-harmonic sky, then bin those timestreams back into HEALPix maps.
//!
//! The pipeline, leaf first:
//!
//! - [`sky`]: Gaussian realisations of T/E/B harmonic coefficients;
//! - [`beam`] and [`focal_plane`]: detector layout and beam windows;
//! - [`schedule`]: observing schedule and its chunk partitioner;
//! - [`pointing`]: boresight/detector orientation for each sample;
//! - [`synthesize`]: beam-convolved sky sampled along the pointing;
//! - [`tod`]: ordered accumulation of chunk results;
//! - [`mapmaking`]: per-pixel normal equations and their solution.

pub mod beam;
mod cli;
pub mod constants;
pub mod focal_plane;
pub mod healpix;
pub mod io;
pub mod mapmaking;
pub(crate) mod math;
pub mod params;
pub mod pointing;
pub mod schedule;
pub mod site;
pub mod sky;
pub mod synthesize;
pub mod tod;

use crossbeam_utils::atomic::AtomicCell;

// Re-exports.
pub use cli::{Scanmap, ScanmapError};
pub use marlu::c64;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This should only ever be enabled by CLI
    /// code.
    static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}

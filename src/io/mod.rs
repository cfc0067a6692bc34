// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read and write estimated sky maps.
//!
//! Three formats are supported, chosen by file extension:
//!
//! - `bin`: little-endian binary. The magic bytes `SCANMAP\0`, then `u32`
//!   nside and `u32` number of Stokes maps, then each Stokes map (`f64`
//!   values, one per RING pixel), then the `f64` conditioning map, then the
//!   `u64` hit map.
//! - `txt`: one row per pixel of `pixel`, each Stokes value, conditioning
//!   and hits, after `#` comment lines describing the columns.
//! - `fits`: a HEALPix FITS binary table in RING order, with the Stokes maps,
//!   conditioning and hits as columns. See [`fits`] for details.

mod bin;
mod error;
mod fits;
mod txt;

pub use error::{MapReadError, MapWriteError};

use std::{path::Path, str::FromStr};

use itertools::Itertools;
use log::debug;
use ndarray::prelude::*;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::mapmaking::SkyMapEstimate;

lazy_static::lazy_static! {
    pub(crate) static ref MAP_OUTPUT_EXTENSIONS: String = MapOutputType::iter().join(", ");
}

/// The magic bytes at the start of a binary map file.
const MAGIC: &[u8; 8] = b"SCANMAP\0";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
/// All write-supported map formats.
pub enum MapOutputType {
    #[strum(serialize = "bin")]
    Bin,

    #[strum(serialize = "txt")]
    Txt,

    #[strum(serialize = "fits")]
    Fits,
}

impl MapOutputType {
    pub fn from_path(file: &Path) -> Result<MapOutputType, MapWriteError> {
        let ext = file.extension().and_then(|e| e.to_str());
        ext.and_then(|s| MapOutputType::from_str(s).ok())
            .ok_or_else(|| MapWriteError::UnsupportedExt {
                ext: ext.unwrap_or("<no extension>").to_string(),
            })
    }
}

/// The contents of a map file.
#[derive(Debug, Clone)]
pub struct MapFile {
    pub nside: usize,

    /// (nstokes, npix)
    pub maps: Array2<f64>,

    pub cond: Array1<f64>,
    pub hits: Vec<u64>,
}

/// Write out maps, choosing the format from the file's extension.
pub fn write_maps(estimate: &SkyMapEstimate, file: &Path) -> Result<(), MapWriteError> {
    let output_type = MapOutputType::from_path(file)?;
    debug!("Writing {output_type} maps to {}", file.display());
    match output_type {
        MapOutputType::Bin => bin::write(estimate, file),
        MapOutputType::Txt => txt::write(estimate, file),
        MapOutputType::Fits => fits::write(estimate, file),
    }
}

/// Read a binary map file.
pub fn read_maps(file: &Path) -> Result<MapFile, MapReadError> {
    match file.extension().and_then(|e| e.to_str()) {
        Some("bin") => bin::read(file),
        s => Err(MapReadError::UnsupportedExt {
            ext: s.unwrap_or("<no extension>").to_string(),
        }),
    }
}

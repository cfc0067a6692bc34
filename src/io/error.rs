// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading or writing maps.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapWriteError {
    #[error("Tried to write a map file with an unsupported extension '{ext}'; supported extensions are: {}", *super::MAP_OUTPUT_EXTENSIONS)]
    UnsupportedExt { ext: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum MapReadError {
    #[error("Tried to read a map file with an unsupported extension '{ext}'; only 'bin' files can be read")]
    UnsupportedExt { ext: String },

    #[error("When reading {file}, expected the magic bytes 'SCANMAP\\0', but got {got:?}")]
    BadMagic { file: String, got: Vec<u8> },

    #[error("When reading {file}, got {nstokes} Stokes maps; only 1 or 3 are supported")]
    BadNumStokes { file: String, nstokes: u32 },

    #[error(transparent)]
    Healpix(#[from] crate::healpix::HealpixError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

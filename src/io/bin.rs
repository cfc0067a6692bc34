// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::prelude::*;

use super::{MapFile, MapReadError, MapWriteError, MAGIC};
use crate::{
    healpix::{nside2npix, validate_nside},
    mapmaking::SkyMapEstimate,
};

pub(super) fn write(estimate: &SkyMapEstimate, file: &Path) -> Result<(), MapWriteError> {
    let mut bin_file = BufWriter::new(File::create(file)?);
    bin_file.write_all(MAGIC)?;
    bin_file.write_u32::<LittleEndian>(estimate.nside as u32)?;
    bin_file.write_u32::<LittleEndian>(estimate.num_stokes() as u32)?;
    for &v in estimate.maps.iter() {
        bin_file.write_f64::<LittleEndian>(v)?;
    }
    for &c in estimate.cond.iter() {
        bin_file.write_f64::<LittleEndian>(c)?;
    }
    for &h in &estimate.hits {
        bin_file.write_u64::<LittleEndian>(h)?;
    }
    bin_file.flush()?;
    Ok(())
}

pub(super) fn read(file: &Path) -> Result<MapFile, MapReadError> {
    let file_str = file.display().to_string();
    let mut bin_file = BufReader::new(File::open(file)?);
    let mut magic = [0; 8];
    bin_file.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(MapReadError::BadMagic {
            file: file_str,
            got: magic.to_vec(),
        });
    }
    let nside = bin_file.read_u32::<LittleEndian>()? as usize;
    validate_nside(nside)?;
    let nstokes = bin_file.read_u32::<LittleEndian>()?;
    if nstokes != 1 && nstokes != 3 {
        return Err(MapReadError::BadNumStokes {
            file: file_str,
            nstokes,
        });
    }
    let npix = nside2npix(nside);

    let mut maps = Array2::zeros((nstokes as usize, npix));
    // A freshly-made array is always contiguous.
    if let Some(slice) = maps.as_slice_mut() {
        bin_file.read_f64_into::<LittleEndian>(slice)?;
    }
    let mut cond = vec![0.0; npix];
    bin_file.read_f64_into::<LittleEndian>(&mut cond)?;
    let mut hits = vec![0; npix];
    bin_file.read_u64_into::<LittleEndian>(&mut hits)?;

    Ok(MapFile {
        nside,
        maps,
        cond: Array1::from(cond),
        hits,
    })
}

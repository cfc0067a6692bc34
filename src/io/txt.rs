// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use ndarray::prelude::*;

use super::MapWriteError;
use crate::{constants::UNSEEN, mapmaking::SkyMapEstimate};

pub(super) fn write(estimate: &SkyMapEstimate, file: &Path) -> Result<(), MapWriteError> {
    let mut f = BufWriter::new(File::create(file)?);
    let stokes: &[&str] = if estimate.num_stokes() == 3 {
        &["I", "Q", "U"]
    } else {
        &["I"]
    };
    writeln!(f, "# nside {} (RING ordering)", estimate.nside)?;
    writeln!(f, "# unseen pixels are {UNSEEN:e}")?;
    writeln!(f, "# pixel {} cond hits", stokes.join(" "))?;
    for (i_pix, (values, (&cond, &hits))) in estimate
        .maps
        .axis_iter(Axis(1))
        .zip(estimate.cond.iter().zip(estimate.hits.iter()))
        .enumerate()
    {
        write!(f, "{i_pix}")?;
        for v in values {
            write!(f, " {v:e}")?;
        }
        writeln!(f, " {cond:e} {hits}")?;
    }
    f.flush()?;
    Ok(())
}

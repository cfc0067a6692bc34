// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! HEALPix maps as a FITS binary table.
//!
//! The primary HDU is empty. The extension has one row per RING pixel with
//! the columns `TEMPERATURE`, `Q_POLARISATION` and `U_POLARISATION` (the
//! latter two only for polarised maps), `CONDITIONING` and `HITS`, and
//! carries the usual HEALPix keywords so other HEALPix tools can read it.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use byteorder::{BigEndian, WriteBytesExt};

use super::MapWriteError;
use crate::{constants::UNSEEN, mapmaking::SkyMapEstimate};

/// FITS files are made of blocks of this many bytes.
const BLOCK_SIZE: usize = 2880;

/// The length of a header card.
const CARD_LEN: usize = 80;

const STOKES_COLUMNS: [&str; 3] = ["TEMPERATURE", "Q_POLARISATION", "U_POLARISATION"];

/// A header card value.
enum Value<'a> {
    Logical(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

fn card(key: &str, value: Value, comment: Option<&str>) -> String {
    let value = match value {
        Value::Logical(b) => format!("{:>20}", if b { "T" } else { "F" }),
        Value::Int(i) => format!("{i:>20}"),
        Value::Float(f) => format!("{f:>20E}"),
        // Strings are quoted and at least 8 characters inside the quotes.
        Value::Str(s) => format!("'{:<8}'", s.replace('\'', "''")),
    };
    let mut card = format!("{key:<8}= {value}");
    if let Some(comment) = comment {
        card.push_str(" / ");
        card.push_str(comment);
    }
    card
}

/// Write a header's cards, then `END`, padded out to a whole block.
fn write_header<W: Write>(writer: &mut W, cards: &[String]) -> Result<(), MapWriteError> {
    let mut bytes = Vec::with_capacity(BLOCK_SIZE);
    for card in cards.iter().map(String::as_str).chain(std::iter::once("END")) {
        let mut card = card.as_bytes().to_vec();
        card.resize(CARD_LEN, b' ');
        bytes.extend(card);
    }
    bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, b' ');
    writer.write_all(&bytes)?;
    Ok(())
}

pub(super) fn write(estimate: &SkyMapEstimate, file: &Path) -> Result<(), MapWriteError> {
    let nstokes = estimate.num_stokes();
    let npix = estimate.hits.len();
    let mut fits_file = BufWriter::new(File::create(file)?);

    write_header(
        &mut fits_file,
        &[
            card("SIMPLE", Value::Logical(true), Some("conforms to FITS standard")),
            card("BITPIX", Value::Int(8), None),
            card("NAXIS", Value::Int(0), None),
            card("EXTEND", Value::Logical(true), None),
        ],
    )?;

    let mut columns: Vec<(&str, &str, Option<&str>)> = STOKES_COLUMNS[..nstokes]
        .iter()
        .map(|&name| (name, "D", Some("uK")))
        .collect();
    columns.push(("CONDITIONING", "D", None));
    columns.push(("HITS", "K", None));
    // Doubles and 64-bit ints are both 8 bytes.
    let row_size = 8 * columns.len();

    let mut cards = vec![
        card("XTENSION", Value::Str("BINTABLE"), Some("binary table extension")),
        card("BITPIX", Value::Int(8), None),
        card("NAXIS", Value::Int(2), None),
        card("NAXIS1", Value::Int(row_size as i64), Some("bytes per row")),
        card("NAXIS2", Value::Int(npix as i64), Some("number of pixels")),
        card("PCOUNT", Value::Int(0), None),
        card("GCOUNT", Value::Int(1), None),
        card("TFIELDS", Value::Int(columns.len() as i64), None),
    ];
    for (i, (name, form, unit)) in columns.iter().enumerate() {
        let i = i + 1;
        cards.push(card(&format!("TTYPE{i}"), Value::Str(name), None));
        cards.push(card(&format!("TFORM{i}"), Value::Str(form), None));
        if let Some(unit) = unit {
            cards.push(card(&format!("TUNIT{i}"), Value::Str(unit), None));
        }
    }
    cards.extend([
        card("EXTNAME", Value::Str("SKYMAP"), None),
        card("PIXTYPE", Value::Str("HEALPIX"), None),
        card("ORDERING", Value::Str("RING"), None),
        card("COORDSYS", Value::Str("C"), Some("equatorial")),
        card("NSIDE", Value::Int(estimate.nside as i64), None),
        card("FIRSTPIX", Value::Int(0), None),
        card("LASTPIX", Value::Int(npix as i64 - 1), None),
        card("INDXSCHM", Value::Str("IMPLICIT"), None),
        card("OBJECT", Value::Str("FULLSKY"), None),
        card("POLAR", Value::Logical(nstokes == 3), None),
        card("BAD_DATA", Value::Float(UNSEEN), Some("unsolved pixels")),
    ]);
    write_header(&mut fits_file, &cards)?;

    for (p, &hits) in estimate.hits.iter().enumerate() {
        for &v in estimate.maps.column(p) {
            fits_file.write_f64::<BigEndian>(v)?;
        }
        fits_file.write_f64::<BigEndian>(estimate.cond[p])?;
        fits_file.write_i64::<BigEndian>(hits as i64)?;
    }
    let data_size = row_size * npix;
    let padding = data_size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE - data_size;
    fits_file.write_all(&vec![0; padding])?;
    fits_file.flush()?;
    Ok(())
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Angular power spectra and the text files that hold them.
//!
//! A spectrum file has whitespace-delimited columns `ℓ TT [EE BB TE]`, or a
//! single TT column whose rows are ℓ = 0, 1, 2, ...; lines starting with `#`
//! are ignored. Every row has the same number of columns and the multipoles
//! must be contiguous. Anything below the first listed multipole is zero, and
//! anything above `lmax` is ignored.

use std::{
    f64::consts::TAU,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use log::{debug, trace};

use super::{InvalidSpectrumError, SpectrumFileError};

/// The largest multipole a spectrum file may list.
const MAX_FILE_ELL: u32 = u32::MAX;

/// TT, EE, BB and TE angular power spectra \[μK²\], indexed by ℓ.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectra {
    pub tt: Vec<f64>,
    pub ee: Vec<f64>,
    pub bb: Vec<f64>,
    pub te: Vec<f64>,
}

impl PowerSpectra {
    /// All-zero spectra up to `lmax`.
    pub fn zeros(lmax: usize) -> PowerSpectra {
        PowerSpectra {
            tt: vec![0.0; lmax + 1],
            ee: vec![0.0; lmax + 1],
            bb: vec![0.0; lmax + 1],
            te: vec![0.0; lmax + 1],
        }
    }

    /// Spectra with `power` in each of TT, EE and BB for `ell_min <= ℓ <=
    /// lmax`, and zero elsewhere. TE is zero.
    pub fn flat(lmax: usize, ell_min: usize, power: f64) -> PowerSpectra {
        let mut spectra = PowerSpectra::zeros(lmax);
        for ell in ell_min..=lmax {
            spectra.tt[ell] = power;
            spectra.ee[ell] = power;
            spectra.bb[ell] = power;
        }
        spectra
    }

    /// Check that these spectra can make a Gaussian sky band-limited at
    /// `lmax`.
    pub fn validate(&self, lmax: usize) -> Result<(), InvalidSpectrumError> {
        for (name, spectrum) in [
            ("TT", &self.tt),
            ("EE", &self.ee),
            ("BB", &self.bb),
            ("TE", &self.te),
        ] {
            if spectrum.len() != lmax + 1 {
                return Err(InvalidSpectrumError::Length {
                    name,
                    lmax,
                    got: spectrum.len(),
                });
            }
            if let Some(ell) = spectrum.iter().position(|v| !v.is_finite()) {
                return Err(InvalidSpectrumError::NotFinite { name, ell });
            }
        }

        for (name, spectrum) in [("TT", &self.tt), ("EE", &self.ee), ("BB", &self.bb)] {
            if let Some((ell, &value)) = spectrum.iter().enumerate().find(|&(_, &v)| v < 0.0) {
                return Err(InvalidSpectrumError::NegativePower { name, ell, value });
            }
        }

        for ell in 0..=lmax {
            let (tt, ee, te) = (self.tt[ell], self.ee[ell], self.te[ell]);
            // Allow for round-off in spectra that are exactly correlated.
            if te * te > tt * ee * (1.0 + 1e-12) {
                return Err(InvalidSpectrumError::CrossExceedsAuto { ell, te, tt, ee });
            }
        }

        Ok(())
    }

    /// Read spectra from a file. If `is_dl` is true, the file holds `D_ℓ =
    /// ℓ(ℓ+1) C_ℓ / 2π` and it is converted to `C_ℓ`.
    pub fn read(file: &Path, lmax: usize, is_dl: bool) -> Result<PowerSpectra, SpectrumFileError> {
        debug!("Reading power spectra from {}", file.display());
        let f = BufReader::new(File::open(file)?);
        PowerSpectra::from_reader(f, &file.display().to_string(), lmax, is_dl)
    }

    /// Read spectra from anything that yields lines. `name` identifies the
    /// source in errors.
    pub fn from_reader<R: BufRead>(
        reader: R,
        name: &str,
        lmax: usize,
        is_dl: bool,
    ) -> Result<PowerSpectra, SpectrumFileError> {
        let mut spectra = PowerSpectra::zeros(lmax);
        let mut last_ell: Option<usize> = None;
        let mut num_columns: Option<usize> = None;

        for (i_line, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = i_line + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let values = line
                .split_whitespace()
                .map(|s| {
                    s.parse::<f64>().map_err(|_| SpectrumFileError::Parse {
                        file: name.to_string(),
                        line: line_num,
                        value: s.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            if !matches!(values.len(), 1 | 2 | 5) {
                return Err(SpectrumFileError::BadColumnCount {
                    file: name.to_string(),
                    line: line_num,
                    got: values.len(),
                });
            }
            match num_columns {
                Some(expected) if expected != values.len() => {
                    return Err(SpectrumFileError::InconsistentColumns {
                        file: name.to_string(),
                        line: line_num,
                        expected,
                        got: values.len(),
                    })
                }
                _ => num_columns = Some(values.len()),
            }

            // A lone column is TT, with ℓ counting up from 0.
            let (ell, powers) = if values.len() == 1 {
                (last_ell.map_or(0, |l| l + 1), &values[..])
            } else {
                let ell_f = values[0];
                if ell_f < 0.0 || ell_f.fract() != 0.0 || ell_f > MAX_FILE_ELL as f64 {
                    return Err(SpectrumFileError::BadMultipole {
                        file: name.to_string(),
                        line: line_num,
                        got: ell_f,
                    });
                }
                (ell_f as usize, &values[1..])
            };
            if let Some(last) = last_ell {
                if ell != last + 1 {
                    return Err(SpectrumFileError::NonContiguous {
                        file: name.to_string(),
                        line: line_num,
                        expected: last + 1,
                        got: ell,
                    });
                }
            }
            last_ell = Some(ell);
            if ell > lmax {
                trace!("Ignoring ℓ = {ell} > lmax");
                continue;
            }

            let conversion = if is_dl && ell > 0 {
                TAU / (ell * (ell + 1)) as f64
            } else {
                1.0
            };
            spectra.tt[ell] = powers[0] * conversion;
            if let &[_, ee, bb, te] = powers {
                spectra.ee[ell] = ee * conversion;
                spectra.bb[ell] = bb * conversion;
                spectra.te[ell] = te * conversion;
            }
        }

        match last_ell {
            None => Err(SpectrumFileError::Empty {
                file: name.to_string(),
            }),
            Some(last) if last < lmax => Err(SpectrumFileError::TooShort {
                file: name.to_string(),
                last,
                lmax,
            }),
            Some(_) => {
                spectra.validate(lmax)?;
                Ok(spectra)
            }
        }
    }
}

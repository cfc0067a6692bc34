// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. The `simulate` and
//! `schedule-info` subcommands both read a schedule, so the schedule
//! arguments are shared between them; the sky and beam arguments live here
//! too to keep `simulate` readable.

mod beam;
mod printers;
mod schedule;
mod sky;

pub(super) use beam::BeamArgs;
pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};
pub(super) use schedule::{ScheduleArgs, ScheduleArgsError};
pub(super) use sky::{SkyArgs, SkyArgsError};

use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::constants::{ATACAMA_HEIGHT_M, ATACAMA_LAT_DEG, ATACAMA_LONG_DEG};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    pub(super) static ref SITE_POSITION_HELP: String =
        format!("The Earth longitude, latitude, and height of the telescope [degrees, degrees, meters]. Overrides --site. Default (Atacama): ({ATACAMA_LONG_DEG}°, {ATACAMA_LAT_DEG}°, {ATACAMA_HEIGHT_M}m)");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// Read an arguments file into whatever type the caller destructures it
/// into. Returns early from the calling function with a [`ScanmapError`] if
/// the file can't be read or decoded.
///
/// [`ScanmapError`]: crate::ScanmapError
macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(ScanmapError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(ScanmapError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(ScanmapError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

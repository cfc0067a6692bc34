// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Telescope sites.

use std::str::FromStr;

use itertools::Itertools;
use marlu::LatLngHeight;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::constants::*;

lazy_static::lazy_static! {
    pub(crate) static ref SITES_COMMA_SEPARATED: String = NamedSite::iter().join(", ");
}

/// Sites that can be referred to by name.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum NamedSite {
    #[strum(serialize = "atacama")]
    Atacama,

    #[strum(serialize = "south-pole")]
    SouthPole,

    #[strum(serialize = "mwa")]
    Mwa,
}

impl NamedSite {
    pub fn position(self) -> LatLngHeight {
        match self {
            NamedSite::Atacama => LatLngHeight {
                longitude_rad: ATACAMA_LONG_DEG.to_radians(),
                latitude_rad: ATACAMA_LAT_DEG.to_radians(),
                height_metres: ATACAMA_HEIGHT_M,
            },
            NamedSite::SouthPole => LatLngHeight {
                longitude_rad: SOUTH_POLE_LONG_DEG.to_radians(),
                latitude_rad: SOUTH_POLE_LAT_DEG.to_radians(),
                height_metres: SOUTH_POLE_HEIGHT_M,
            },
            NamedSite::Mwa => LatLngHeight::mwa(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Unrecognised site '{0}'; named sites are: {}", *SITES_COMMA_SEPARATED)]
    UnknownName(String),

    #[error("A site position needs exactly 3 values (longitude, latitude, height), but got {0:?}")]
    BadPosition(Vec<f64>),

    #[error("The site latitude must be within [-90, 90] degrees, but got {0}")]
    BadLatitude(f64),
}

/// Get a site position from either a name or a `[longitude_deg,
/// latitude_deg, height_m]` triple. The triple takes precedence; with neither,
/// the Atacama site is used.
pub fn get_site(name: Option<&str>, position: Option<&[f64]>) -> Result<LatLngHeight, SiteError> {
    match (position, name) {
        (Some(&[long, lat, height]), _) => {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(SiteError::BadLatitude(lat));
            }
            Ok(LatLngHeight {
                longitude_rad: long.to_radians(),
                latitude_rad: lat.to_radians(),
                height_metres: height,
            })
        }
        (Some(p), _) => Err(SiteError::BadPosition(p.to_vec())),
        (None, Some(n)) => NamedSite::from_str(&n.to_lowercase())
            .map(NamedSite::position)
            .map_err(|_| SiteError::UnknownName(n.to_string())),
        (None, None) => Ok(NamedSite::Atacama.position()),
    }
}

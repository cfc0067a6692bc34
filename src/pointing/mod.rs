// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Boresight and detector pointing.
//!
//! Orientations are unit quaternions taking vectors in the instrument frame
//! to the equatorial frame. In the instrument frame, the line of sight is
//! `x̂` and the polarisation-sensitive axis is `ẑ`. The horizontal frame has
//! axes pointing north, west and up.
//!
//! Each schedule entry is an azimuth scan at constant elevation. The local
//! mean sidereal time is worked out once at the start of each entry and
//! advanced at the sidereal rate from there, so a sample's pointing depends
//! only on its entry and its position within that entry, never on how the
//! schedule was chunked.

mod error;
#[cfg(test)]
mod tests;

pub use error::PointingError;

use std::f64::consts::TAU;

use hifitime::{Duration, Epoch};
use log::{debug, trace};
use marlu::{
    precession::{get_lmst, precess_time},
    AzEl, LatLngHeight, RADec,
};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use rayon::prelude::*;
use vec1::Vec1;

use crate::{
    constants::SIDEREAL_RATE,
    math::wrap_degrees,
    schedule::{Chunk, Schedule, ScheduleEntry},
};

/// The sidereal rotation rate of the Earth \[radians per UT1 second\].
const SIDEREAL_RAD_PER_S: f64 = TAU * SIDEREAL_RATE / 86400.0;

/// Boresight rotation about the line of sight, stepped through a list of
/// angles.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRotation {
    angles_deg: Vec1<f64>,
    period_s: f64,
}

impl InstrumentRotation {
    /// The angle changes every `period_s` seconds, cycling through
    /// `angles_deg`.
    pub fn new(angles_deg: Vec<f64>, period_s: f64) -> Result<InstrumentRotation, PointingError> {
        if !period_s.is_finite() || period_s <= 0.0 {
            return Err(PointingError::BadRotationPeriod(period_s));
        }
        let angles_deg =
            Vec1::try_from_vec(angles_deg).map_err(|_| PointingError::NoRotationAngles)?;
        Ok(InstrumentRotation {
            angles_deg,
            period_s,
        })
    }

    /// The rotation angle `t` seconds after the start of the observation
    /// \[degrees\].
    pub fn angle_deg(&self, t: f64) -> f64 {
        let step = (t / self.period_s).floor().max(0.0) as usize;
        self.angles_deg[step % self.angles_deg.len()]
    }
}

/// Everything about an observation that isn't in its schedule.
#[derive(Debug, Clone)]
pub struct ObservationConfig {
    pub site: LatLngHeight,

    /// The azimuthal scan speed \[degrees per second\]. 0 means staring at the
    /// start azimuth of each entry.
    pub scan_speed_deg: f64,

    /// UT1 - UTC.
    pub dut1: Duration,

    /// Precess the site's frame to J2000.
    pub precess: bool,

    pub rotation: Option<InstrumentRotation>,
}

/// The orientation of the site's horizontal frame at the start of an entry.
#[derive(Debug, Clone, Copy)]
struct EntryFrame {
    lmst0: f64,
    latitude: f64,
}

/// Turns chunks of the schedule into pointing.
#[derive(Debug)]
pub struct PointingEngine<'a> {
    schedule: &'a Schedule,
    config: &'a ObservationConfig,
    frames: Vec<EntryFrame>,
}

impl<'a> PointingEngine<'a> {
    pub fn new(
        schedule: &'a Schedule,
        config: &'a ObservationConfig,
    ) -> Result<PointingEngine<'a>, PointingError> {
        if !config.scan_speed_deg.is_finite() || config.scan_speed_deg < 0.0 {
            return Err(PointingError::BadScanSpeed(config.scan_speed_deg));
        }

        let site = config.site;
        let frames = schedule
            .entries()
            .iter()
            .map(|entry| {
                if config.precess {
                    let lmst = get_lmst(site.longitude_rad, entry.start, config.dut1);
                    let info = precess_time(
                        site.longitude_rad,
                        site.latitude_rad,
                        RADec::from_radians(lmst, site.latitude_rad),
                        entry.start,
                        config.dut1,
                    );
                    debug!(
                        "Entry starting {}: LMST {:.6}°, J2000 LMST {:.6}°",
                        entry.start,
                        info.lmst.to_degrees(),
                        info.lmst_j2000.to_degrees()
                    );
                    EntryFrame {
                        lmst0: info.lmst_j2000,
                        latitude: info.array_latitude_j2000,
                    }
                } else {
                    let lmst = get_lmst(site.longitude_rad, entry.start, config.dut1);
                    debug!("Entry starting {}: LMST {:.6}°", entry.start, lmst.to_degrees());
                    EntryFrame {
                        lmst0: lmst,
                        latitude: site.latitude_rad,
                    }
                }
            })
            .collect();

        Ok(PointingEngine {
            schedule,
            config,
            frames,
        })
    }

    fn check_chunk(&self, chunk: &Chunk) -> Result<&'a ScheduleEntry, PointingError> {
        let entries = self.schedule.entries();
        let entry = entries
            .get(chunk.entry)
            .ok_or(PointingError::NoSuchEntry {
                chunk: chunk.index,
                entry: chunk.entry,
                num_entries: entries.len(),
            })?;
        let num_samples = self.schedule.entry_num_samples()[chunk.entry];
        let end = chunk.entry_offset + chunk.num_samples;
        if end > num_samples {
            return Err(PointingError::OutOfBounds {
                chunk: chunk.index,
                entry: chunk.entry,
                start: chunk.entry_offset,
                end,
                num_samples,
            });
        }
        Ok(entry)
    }

    /// The UTC epoch of every sample in a chunk.
    pub fn resolve_time(&self, chunk: &Chunk) -> Result<Vec<Epoch>, PointingError> {
        let entry = self.check_chunk(chunk)?;
        let rate = self.schedule.sample_rate_hz();
        Ok((chunk.entry_offset..chunk.entry_offset + chunk.num_samples)
            .map(|k| entry.sample_epoch(rate, k))
            .collect())
    }

    /// The boresight pointing of every sample in a chunk.
    pub fn resolve_pointing(&self, chunk: &Chunk) -> Result<Pointing, PointingError> {
        let entry = self.check_chunk(chunk)?;
        let frame = self.frames[chunk.entry];
        let rate = self.schedule.sample_rate_hz();
        let entry_t0 = (entry.start - self.schedule.first_epoch()).to_seconds();
        let horizon_to_eq = horizon_frame(frame.latitude);
        let el = entry.el_deg.to_radians();
        trace!(
            "Resolving pointing for chunk {} (entry {}, samples {:?})",
            chunk.index,
            chunk.entry,
            chunk.range()
        );

        let (quats, azels): (Vec<UnitQuaternion<f64>>, Vec<AzEl>) = (chunk.entry_offset
            ..chunk.entry_offset + chunk.num_samples)
            .into_par_iter()
            .map(|k| {
                let t = k as f64 / rate;
                let az = scan_azimuth_deg(entry, self.config.scan_speed_deg, t).to_radians();
                let lmst = frame.lmst0 + SIDEREAL_RAD_PER_S * t;
                let rot = self
                    .config
                    .rotation
                    .as_ref()
                    .map(|r| r.angle_deg(entry_t0 + t).to_radians())
                    .unwrap_or(0.0);
                let q = rot_z(lmst) * horizon_to_eq * rot_z(-az) * rot_y(-el) * rot_x(rot);
                (q, AzEl::from_radians(az, el))
            })
            .unzip();

        let mut radecs = Vec::with_capacity(quats.len());
        let mut position_angles = Vec::with_capacity(quats.len());
        for q in &quats {
            let o = Orientation::from_quaternion(q);
            radecs.push(RADec::from_radians(o.phi, std::f64::consts::FRAC_PI_2 - o.theta));
            position_angles.push(o.psi);
        }

        Ok(Pointing {
            chunk: *chunk,
            epochs: self.resolve_time(chunk)?,
            quats,
            azels,
            radecs,
            position_angles,
        })
    }
}

/// Boresight pointing for the samples of a chunk.
#[derive(Debug, Clone)]
pub struct Pointing {
    pub chunk: Chunk,
    pub epochs: Vec<Epoch>,

    /// Boresight orientations.
    pub quats: Vec<UnitQuaternion<f64>>,

    pub azels: Vec<AzEl>,
    pub radecs: Vec<RADec>,

    /// The boresight position angle \[radians\].
    pub position_angles: Vec<f64>,
}

impl Pointing {
    pub fn len(&self) -> usize {
        self.quats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quats.is_empty()
    }

    /// The pointing of a detector (or ghost) offset from the boresight by
    /// `az_deg` and `el_deg` with polarisation angle `polang_deg`.
    pub fn detector(&self, az_deg: f64, el_deg: f64, polang_deg: f64) -> DetectorPointing {
        let offset = rot_z(-az_deg.to_radians())
            * rot_y(-el_deg.to_radians())
            * rot_x(polang_deg.to_radians());
        let orientations: Vec<Orientation> = self
            .quats
            .par_iter()
            .map(|q| Orientation::from_quaternion(&(q * offset)))
            .collect();
        let mut pointing = DetectorPointing {
            theta: Vec::with_capacity(orientations.len()),
            phi: Vec::with_capacity(orientations.len()),
            psi: Vec::with_capacity(orientations.len()),
        };
        for o in orientations {
            pointing.theta.push(o.theta);
            pointing.phi.push(o.phi);
            pointing.psi.push(o.psi);
        }
        pointing
    }
}

/// The sky position and polarisation angle of a detector for each sample of
/// a chunk. All angles are in radians; `theta` is the colatitude and `phi`
/// the right ascension.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorPointing {
    pub theta: Vec<f64>,
    pub phi: Vec<f64>,

    /// The polarisation angle, measured from the local meridian (`e_θ`)
    /// towards `e_φ`.
    pub psi: Vec<f64>,
}

impl DetectorPointing {
    pub fn radec(&self, i: usize) -> RADec {
        RADec::from_radians(self.phi[i], std::f64::consts::FRAC_PI_2 - self.theta[i])
    }
}

/// The azimuth of a triangle-wave scan `t` seconds into a schedule entry
/// \[degrees, in [0, 360)\].
pub fn scan_azimuth_deg(entry: &ScheduleEntry, speed_deg: f64, t: f64) -> f64 {
    let throw = azimuth_throw_deg(entry);
    if throw == 0.0 || speed_deg == 0.0 {
        return wrap_degrees(entry.az0_deg);
    }
    let s = (speed_deg * t).rem_euclid(2.0 * throw);
    let offset = if s <= throw { s } else { 2.0 * throw - s };
    wrap_degrees(entry.az0_deg + offset)
}

/// The width of an entry's azimuth scan \[degrees\]. A non-zero multiple of
/// 360 is a full turn.
pub fn azimuth_throw_deg(entry: &ScheduleEntry) -> f64 {
    let d = entry.az1_deg - entry.az0_deg;
    let w = d.rem_euclid(360.0);
    if w == 0.0 && d != 0.0 {
        360.0
    } else {
        w
    }
}

struct Orientation {
    theta: f64,
    phi: f64,
    psi: f64,
}

impl Orientation {
    fn from_quaternion(q: &UnitQuaternion<f64>) -> Orientation {
        let n = q * Vector3::x();
        let e = q * Vector3::z();
        let theta = n.z.clamp(-1.0, 1.0).acos();
        let phi = n.y.atan2(n.x).rem_euclid(TAU);
        let (sin_t, cos_t) = theta.sin_cos();
        let (sin_p, cos_p) = phi.sin_cos();
        let e_theta = Vector3::new(cos_t * cos_p, cos_t * sin_p, -sin_t);
        let e_phi = Vector3::new(-sin_p, cos_p, 0.0);
        Orientation {
            theta,
            phi,
            psi: e.dot(&e_phi).atan2(e.dot(&e_theta)),
        }
    }
}

fn rot_x(angle: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle)
}

fn rot_y(angle: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle)
}

fn rot_z(angle: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle)
}

/// The rotation from the (north, west, up) horizontal frame to the
/// equatorial frame at zero local sidereal time.
fn horizon_frame(latitude: f64) -> UnitQuaternion<f64> {
    let (s, c) = latitude.sin_cos();
    #[rustfmt::skip]
    let m = Matrix3::new(
        -s, 0.0, c,
        0.0, -1.0, 0.0,
        c, 0.0, s,
    );
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Simulate a scanning telescope observing a harmonic sky and make maps from
//! its timestreams.

#[cfg(test)]
mod tests;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr};

use clap::Parser;
use hifitime::Duration;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    display_warnings, BeamArgs, InfoPrinter, ScheduleArgs, SkyArgs, ARG_FILE_HELP,
    SITE_POSITION_HELP,
};
use crate::{
    beam::Beam,
    constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAP_NSIDE, DEFAULT_SCAN_SPEED_DEG},
    focal_plane::{BandLimitPolicy, FocalPlane, FocalPlaneOptions, GhostOptions},
    healpix::{nside2npix, validate_nside},
    io::{MapOutputType, MAP_OUTPUT_EXTENSIONS},
    mapmaking::{SolveMode, SolveParams},
    params::SimulateParams,
    pointing::{InstrumentRotation, ObservationConfig, PointingEngine},
    site::{get_site, SITES_COMMA_SEPARATED},
    synthesize::{Interpolation, SynthesisParams, WhiteNoise},
    ScanmapError,
};

const DEFAULT_OUTPUT_MAP_FILENAME: &str = "scanmap_maps.bin";
const DEFAULT_GRID_SIZE: usize = 1;
const DEFAULT_FOV_DEG: f64 = 5.0;
const DEFAULT_NOISE_SEED: u64 = 0;

lazy_static::lazy_static! {
    static ref SITE_HELP: String =
        format!("The name of the telescope site. Named sites are: {}. Default: atacama", *SITES_COMMA_SEPARATED);

    static ref MAP_NSIDE_HELP: String =
        format!("The HEALPix resolution of the output maps. Default: {DEFAULT_MAP_NSIDE}");

    static ref CHUNK_SIZE_HELP: String =
        format!("The maximum number of samples per detector handled at once. Default: {DEFAULT_CHUNK_SIZE}");

    static ref SCAN_SPEED_HELP: String =
        format!("The azimuthal scan speed [degrees/second]. Default: {DEFAULT_SCAN_SPEED_DEG}");

    static ref OUTPUTS_HELP: String =
        format!("Paths to the output map files. Supported formats: {}. Default: {DEFAULT_OUTPUT_MAP_FILENAME}", *MAP_OUTPUT_EXTENSIONS);
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct SimulateCliArgs {
    /// The number of rows in the focal-plane grid. Default: 1
    #[clap(long, help_heading = "FOCAL PLANE")]
    pub(super) rows: Option<usize>,

    /// The number of columns in the focal-plane grid. Default: 1
    #[clap(long, help_heading = "FOCAL PLANE")]
    pub(super) cols: Option<usize>,

    /// The field of view spanned by the grid [degrees]. Default: 5
    #[clap(long, help_heading = "FOCAL PLANE")]
    pub(super) fov: Option<f64>,

    /// The polarisation angle of the "A" detectors [degrees]. "B" detectors
    /// are 90° from this. Default: 0
    #[clap(long, allow_hyphen_values = true, help_heading = "FOCAL PLANE")]
    pub(super) polang: Option<f64>,

    /// Don't pair each "A" detector with an orthogonal "B" detector.
    #[clap(long, help_heading = "FOCAL PLANE")]
    #[serde(default)]
    pub(super) no_pairs: bool,

    /// Give every detector a ghost beam. Each ghost is
    /// "AZ_OFFSET,EL_OFFSET,AMPLITUDE[,FWHM]" with offsets in degrees and the
    /// FWHM in arcmin.
    #[clap(long, multiple_values(true), allow_hyphen_values = true, help_heading = "FOCAL PLANE")]
    pub(super) ghosts: Option<Vec<String>>,

    /// The names of dead detectors, e.g. r000c001B.
    #[clap(long, multiple_values(true), help_heading = "FOCAL PLANE")]
    pub(super) dead: Option<Vec<String>>,

    /// What to do when the beam's band limit is below the sky's; "warn" or
    /// "error". Default: warn
    #[clap(long, help_heading = "FOCAL PLANE")]
    pub(super) band_limit_policy: Option<String>,

    #[clap(long, help = SITE_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) site: Option<String>,

    #[clap(
        long, help = SITE_POSITION_HELP.as_str(), help_heading = "OBSERVATION",
        number_of_values = 3,
        allow_hyphen_values = true,
        value_names = &["LONG_DEG", "LAT_DEG", "HEIGHT_M"]
    )]
    pub(super) site_position: Option<Vec<f64>>,

    #[clap(long, help = SCAN_SPEED_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) scan_speed: Option<f64>,

    /// Use this value as the DUT1 [seconds]. Default: 0
    #[clap(long, allow_hyphen_values = true, help_heading = "OBSERVATION")]
    pub(super) dut1: Option<f64>,

    /// Precess the pointing to J2000.
    #[clap(long, help_heading = "OBSERVATION")]
    #[serde(default)]
    pub(super) precess: bool,

    /// Rotate the instrument about its boresight through these angles
    /// [degrees], one per --rotation-period.
    #[clap(long, multiple_values(true), allow_hyphen_values = true, help_heading = "OBSERVATION")]
    pub(super) rotation_angles: Option<Vec<f64>>,

    /// How long the instrument stays at each rotation angle [seconds].
    #[clap(long, help_heading = "OBSERVATION")]
    pub(super) rotation_period: Option<f64>,

    #[clap(long, help = CHUNK_SIZE_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) chunk_size: Option<usize>,

    /// The HEALPix resolution of the beam-convolved sky that timestreams are
    /// sampled from. Default: the map resolution
    #[clap(long, help_heading = "SYNTHESIS")]
    pub(super) synth_nside: Option<usize>,

    /// How to sample the convolved sky; "bilinear" or "nearest". Default:
    /// bilinear
    #[clap(long, help_heading = "SYNTHESIS")]
    pub(super) interpolation: Option<String>,

    /// Add white noise with this standard deviation to every sample. Detector
    /// weights become 1/σ².
    #[clap(long, help_heading = "SYNTHESIS")]
    pub(super) noise: Option<f64>,

    /// The seed of the white noise. Default: 0
    #[clap(long, help_heading = "SYNTHESIS")]
    pub(super) noise_seed: Option<u64>,

    #[clap(short, long, help = MAP_NSIDE_HELP.as_str(), help_heading = "MAP-MAKING")]
    pub(super) nside: Option<usize>,

    /// Only solve for Stokes I.
    #[clap(long, help_heading = "MAP-MAKING")]
    #[serde(default)]
    pub(super) intensity_only: bool,

    /// Reject pixels whose 3x3 normal matrix has a condition number above
    /// this. Without a threshold, only singular pixels are rejected.
    #[clap(long, help_heading = "MAP-MAKING")]
    pub(super) cond_threshold: Option<f64>,

    /// Keep every timestream in memory rather than only what's needed for
    /// the maps.
    #[clap(long, help_heading = "MAP-MAKING")]
    #[serde(default)]
    pub(super) retain_tod: bool,

    #[clap(
        short = 'o',
        long,
        multiple_values(true),
        help = OUTPUTS_HELP.as_str(),
        help_heading = "OUTPUT FILES"
    )]
    pub(super) outputs: Option<Vec<PathBuf>>,
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct SimulateArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "sky")]
    #[serde(default)]
    pub(super) sky_args: SkyArgs,

    #[clap(flatten)]
    #[serde(rename = "beam")]
    #[serde(default)]
    pub(super) beam_args: BeamArgs,

    #[clap(flatten)]
    #[serde(rename = "schedule")]
    #[serde(default)]
    pub(super) schedule_args: ScheduleArgs,

    #[clap(flatten)]
    #[serde(rename = "simulate")]
    #[serde(default)]
    pub(super) simulate_args: SimulateCliArgs,
}

impl SimulateArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<SimulateArgs, ScanmapError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let SimulateArgs {
                args_file: _,
                sky_args,
                beam_args,
                schedule_args,
                simulate_args,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(SimulateArgs {
                args_file: None,
                sky_args: cli_args.sky_args.merge(sky_args),
                beam_args: cli_args.beam_args.merge(beam_args),
                schedule_args: cli_args.schedule_args.merge(schedule_args),
                simulate_args: cli_args.simulate_args.merge(simulate_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    fn parse(self) -> Result<SimulateParams, ScanmapError> {
        debug!("{:#?}", self);

        // Expose all the struct fields to ensure they're all used.
        let SimulateArgs {
            args_file: _,
            sky_args,
            beam_args,
            schedule_args,
            simulate_args:
                SimulateCliArgs {
                    rows,
                    cols,
                    fov,
                    polang,
                    no_pairs,
                    ghosts,
                    dead,
                    band_limit_policy,
                    site,
                    site_position,
                    scan_speed,
                    dut1,
                    precess,
                    rotation_angles,
                    rotation_period,
                    chunk_size,
                    synth_nside,
                    interpolation,
                    noise,
                    noise_seed,
                    nside,
                    intensity_only,
                    cond_threshold,
                    retain_tod,
                    outputs,
                },
        } = self;

        let beam = beam_args.parse()?;
        let sky = sky_args.parse(beam.get_lmax())?;
        let schedule = schedule_args.parse()?;

        // Focal plane.
        let band_limit_policy = match band_limit_policy {
            Some(p) => BandLimitPolicy::from_str(&p.to_lowercase())
                .map_err(|_| SimulateArgsError::BadBandLimitPolicy(p))?,
            None => BandLimitPolicy::default(),
        };
        let ghosts = ghosts
            .unwrap_or_default()
            .iter()
            .map(|g| parse_ghost(g))
            .collect::<Result<Vec<_>, _>>()?;
        let options = FocalPlaneOptions {
            polang_deg: polang.unwrap_or(0.0),
            no_pairs,
            band_limit_policy,
            ghosts,
            dead: dead.unwrap_or_default(),
        };
        let nrow = rows.unwrap_or(DEFAULT_GRID_SIZE);
        let ncol = cols.unwrap_or(DEFAULT_GRID_SIZE);
        let fov = fov.unwrap_or(DEFAULT_FOV_DEG);
        let focal_plane = FocalPlane::build(nrow, ncol, fov, beam, &options, sky.lmax())?;
        let mut printer = InfoPrinter::new("Focal plane".into());
        printer.push_line(format!("{nrow}x{ncol} grid over {fov}°").into());
        printer.push_block(vec![
            format!(
                "{} detectors ({} live)",
                focal_plane.len(),
                focal_plane.num_live()
            )
            .into(),
            format!("{} ghost(s)", focal_plane.num_ghosts()).into(),
        ]);
        printer.display();

        // Observation.
        let site = get_site(site.as_deref(), site_position.as_deref())?;
        let rotation = match (rotation_angles, rotation_period) {
            (Some(angles), Some(period)) => Some(InstrumentRotation::new(angles, period)?),
            (None, None) => None,
            _ => return Err(SimulateArgsError::IncompleteRotation.into()),
        };
        let observation = ObservationConfig {
            site,
            scan_speed_deg: scan_speed.unwrap_or(DEFAULT_SCAN_SPEED_DEG),
            dut1: Duration::from_seconds(dut1.unwrap_or(0.0)),
            precess,
            rotation,
        };
        // Make a pointing engine to check the observation against the
        // schedule; it's made again when running.
        PointingEngine::new(&schedule, &observation)?;
        let chunk_size = NonZeroUsize::new(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
            .ok_or(SimulateArgsError::ZeroChunkSize)?;
        let mut printer = InfoPrinter::new("Observation".into());
        printer.push_block(vec![
            format!(
                "Site: ({:.4}°, {:.4}°, {}m)",
                site.longitude_rad.to_degrees(),
                site.latitude_rad.to_degrees(),
                site.height_metres
            )
            .into(),
            format!("Scan speed: {}°/s", observation.scan_speed_deg).into(),
        ]);
        if let Some(rotation) = observation.rotation.as_ref() {
            printer.push_line(format!("Boresight rotation: {rotation:?}").into());
        }
        if precess {
            printer.push_line("Precessing to J2000".into());
        }
        printer.push_line(
            format!(
                "{} chunk(s) of at most {chunk_size} samples",
                schedule.partition(chunk_size).num_chunks()
            )
            .into(),
        );
        printer.display();

        // Synthesis and map-making.
        let map_nside = nside.unwrap_or(DEFAULT_MAP_NSIDE);
        validate_nside(map_nside)?;
        let synth_nside = synth_nside.unwrap_or(map_nside);
        validate_nside(synth_nside)?;
        let interpolation = match interpolation {
            Some(i) => Interpolation::from_str(&i.to_lowercase())
                .map_err(|_| SimulateArgsError::BadInterpolation(i))?,
            None => Interpolation::default(),
        };
        let noise = match noise {
            Some(sigma) if sigma > 0.0 => Some(WhiteNoise::new(
                sigma,
                noise_seed.unwrap_or(DEFAULT_NOISE_SEED),
            )?),
            Some(sigma) => {
                // Zero is noiseless; anything else here is invalid.
                WhiteNoise::new(sigma, 0)?;
                None
            }
            None => None,
        };
        let weight = match noise {
            Some(n) => 1.0 / (n.sigma() * n.sigma()),
            None => 1.0,
        };
        let solve = SolveParams {
            mode: if intensity_only {
                SolveMode::IntensityOnly
            } else {
                SolveMode::Polarised
            },
            cond_threshold,
        };
        solve.validate()?;

        let outputs = outputs.unwrap_or_else(|| vec![PathBuf::from(DEFAULT_OUTPUT_MAP_FILENAME)]);
        for output in &outputs {
            MapOutputType::from_path(output)?;
        }

        let mut printer = InfoPrinter::new("Map-making".into());
        printer.push_block(vec![
            format!("Synthesis nside: {synth_nside} ({interpolation})").into(),
            match noise {
                Some(n) => format!("White noise σ = {}", n.sigma()).into(),
                None => "Noiseless".into(),
            },
        ]);
        printer.push_block(vec![
            format!(
                "Map nside: {map_nside} ({} pixels)",
                nside2npix(map_nside)
            )
            .into(),
            format!("Solving for: {}", solve.mode).into(),
            match cond_threshold {
                Some(t) => format!("Condition number threshold: {t}").into(),
                None => "No condition number threshold".into(),
            },
        ]);
        printer.push_block(
            outputs
                .iter()
                .map(|o| format!("Writing {}", o.display()).into())
                .collect(),
        );
        printer.display();

        display_warnings();

        let weights = vec![weight; focal_plane.len()];
        Ok(SimulateParams {
            sky,
            focal_plane,
            schedule,
            observation,
            synthesis: SynthesisParams {
                nside: synth_nside,
                interpolation,
                noise,
            },
            solve,
            map_nside,
            chunk_size,
            weights,
            retain_tod,
            outputs,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), ScanmapError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let output = params.run()?;
        let counts = &output.maps.counts;
        info!(
            "Solved {} of {} pixels",
            output.maps.num_solved(),
            output.maps.num_pixels()
        );
        if counts.total() > 0 {
            info!(
                "Rejected: {} unhit, {} with too few hits, {} singular, {} ill-conditioned",
                counts.no_hits, counts.too_few_hits, counts.singular, counts.ill_conditioned
            );
        }
        Ok(())
    }
}

/// Parse "AZ_OFFSET,EL_OFFSET,AMPLITUDE[,FWHM]".
fn parse_ghost(s: &str) -> Result<GhostOptions, SimulateArgsError> {
    let bad = || SimulateArgsError::BadGhost(s.to_string());
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| bad())?;
    match values.as_slice() {
        &[az_offset_deg, el_offset_deg, amplitude] => Ok(GhostOptions {
            az_offset_deg,
            el_offset_deg,
            amplitude,
            fwhm_arcmin: None,
        }),
        &[az_offset_deg, el_offset_deg, amplitude, fwhm] => Ok(GhostOptions {
            az_offset_deg,
            el_offset_deg,
            amplitude,
            fwhm_arcmin: Some(fwhm),
        }),
        _ => Err(bad()),
    }
}

#[derive(Error, Debug)]
pub(super) enum SimulateArgsError {
    #[error("Couldn't parse ghost '{0}'; expected AZ_OFFSET,EL_OFFSET,AMPLITUDE[,FWHM]")]
    BadGhost(String),

    #[error("Unrecognised band-limit policy '{0}'; expected 'warn' or 'error'")]
    BadBandLimitPolicy(String),

    #[error("Unrecognised interpolation '{0}'; expected 'bilinear' or 'nearest'")]
    BadInterpolation(String),

    #[error("Instrument rotation needs both --rotation-angles and --rotation-period")]
    IncompleteRotation,

    #[error("The chunk size cannot be 0")]
    ZeroChunkSize,
}

impl SimulateCliArgs {
    fn merge(self, other: Self) -> Self {
        Self {
            rows: self.rows.or(other.rows),
            cols: self.cols.or(other.cols),
            fov: self.fov.or(other.fov),
            polang: self.polang.or(other.polang),
            no_pairs: self.no_pairs || other.no_pairs,
            ghosts: self.ghosts.or(other.ghosts),
            dead: self.dead.or(other.dead),
            band_limit_policy: self.band_limit_policy.or(other.band_limit_policy),
            site: self.site.or(other.site),
            site_position: self.site_position.or(other.site_position),
            scan_speed: self.scan_speed.or(other.scan_speed),
            dut1: self.dut1.or(other.dut1),
            precess: self.precess || other.precess,
            rotation_angles: self.rotation_angles.or(other.rotation_angles),
            rotation_period: self.rotation_period.or(other.rotation_period),
            chunk_size: self.chunk_size.or(other.chunk_size),
            synth_nside: self.synth_nside.or(other.synth_nside),
            interpolation: self.interpolation.or(other.interpolation),
            noise: self.noise.or(other.noise),
            noise_seed: self.noise_seed.or(other.noise_seed),
            nside: self.nside.or(other.nside),
            intensity_only: self.intensity_only || other.intensity_only,
            cond_threshold: self.cond_threshold.or(other.cond_threshold),
            retain_tod: self.retain_tod || other.retain_tod,
            outputs: self.outputs.or(other.outputs),
        }
    }
}

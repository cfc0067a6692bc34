// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Observing schedules.
//!
//! A schedule is an ordered list of constant-elevation azimuth scans. Schedule
//! files have one scan per line:
//!
//! ```text
//! <start date> <start time> <end date> <end time> <az0> <az1> <el> [<mjd start> <mjd end>]
//! ```
//!
//! Dates are `YYYY-MM-DD` and times `HH:MM:SS[.fff]`, both UTC. Angles are in
//! degrees. `#` starts a comment.

mod error;
mod partition;

pub use error::ScheduleError;
pub use partition::{Chunk, Partitioner};

use std::{
    fs::File,
    io::{BufRead, BufReader},
    num::NonZeroUsize,
    path::Path,
    str::FromStr,
};

use hifitime::{Duration, Epoch};
use log::{debug, warn};
use vec1::Vec1;

/// The largest allowed difference between a row's civil times and its MJDs
/// \[seconds\].
const MJD_TOLERANCE_S: f64 = 1.0;

/// One constant-elevation scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    pub start: Epoch,
    pub end: Epoch,

    /// The azimuth where the scan starts \[degrees\].
    pub az0_deg: f64,

    /// The other end of the azimuth throw \[degrees\].
    pub az1_deg: f64,

    pub el_deg: f64,
}

impl ScheduleEntry {
    pub fn duration_s(&self) -> f64 {
        (self.end - self.start).to_seconds()
    }

    /// The number of samples taken during this scan.
    pub fn num_samples(&self, sample_rate_hz: f64) -> usize {
        (self.duration_s() * sample_rate_hz).round().max(0.0) as usize
    }

    /// The epoch of sample `k` of this scan.
    pub fn sample_epoch(&self, sample_rate_hz: f64, k: usize) -> Epoch {
        self.start + Duration::from_seconds(k as f64 / sample_rate_hz)
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        let duration = self.duration_s();
        if !(duration > 0.0) {
            return Err(ScheduleError::BadDuration(duration));
        }
        if !(self.el_deg > 0.0 && self.el_deg <= 90.0) {
            return Err(ScheduleError::BadElevation(self.el_deg));
        }
        if !self.az0_deg.is_finite() || !self.az1_deg.is_finite() {
            return Err(ScheduleError::BadAzimuth {
                az0: self.az0_deg,
                az1: self.az1_deg,
            });
        }
        Ok(())
    }
}

/// An ordered, non-empty set of scans sampled at a fixed rate. Every entry
/// has at least one sample.
#[derive(Debug, Clone)]
pub struct Schedule {
    entries: Vec1<ScheduleEntry>,
    sample_rate_hz: f64,

    /// The number of samples in each entry.
    num_samples: Vec<usize>,

    /// The global index of each entry's first sample.
    first_samples: Vec<usize>,
}

impl Schedule {
    /// Make a schedule. Entries that round to zero samples are dropped with a
    /// warning; if nothing is left, [`ScheduleError::EmptySchedule`] is
    /// returned.
    pub fn new(entries: Vec<ScheduleEntry>, sample_rate_hz: f64) -> Result<Schedule, ScheduleError> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(ScheduleError::BadSampleRate(sample_rate_hz));
        }

        let mut kept = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            entry.validate()?;
            if entry.num_samples(sample_rate_hz) == 0 {
                warn!(
                    "Schedule entry {i} ({} s) has no samples at {sample_rate_hz} Hz; ignoring it",
                    entry.duration_s()
                );
                continue;
            }
            kept.push(entry);
        }
        let entries = Vec1::try_from_vec(kept).map_err(|_| ScheduleError::EmptySchedule)?;

        let num_samples: Vec<usize> = entries
            .iter()
            .map(|e| e.num_samples(sample_rate_hz))
            .collect();
        let first_samples = num_samples
            .iter()
            .scan(0, |acc, &n| {
                let first = *acc;
                *acc += n;
                Some(first)
            })
            .collect();

        Ok(Schedule {
            entries,
            sample_rate_hz,
            num_samples,
            first_samples,
        })
    }

    /// A schedule with a single scan starting at `start`.
    pub fn single(
        start: Epoch,
        duration_s: f64,
        az0_deg: f64,
        az1_deg: f64,
        el_deg: f64,
        sample_rate_hz: f64,
    ) -> Result<Schedule, ScheduleError> {
        if !duration_s.is_finite() || duration_s <= 0.0 {
            return Err(ScheduleError::BadDuration(duration_s));
        }
        Schedule::new(
            vec![ScheduleEntry {
                start,
                end: start + Duration::from_seconds(duration_s),
                az0_deg,
                az1_deg,
                el_deg,
            }],
            sample_rate_hz,
        )
    }

    /// Read a schedule file. If a `window` is given, entries are clipped to
    /// it.
    pub fn read(
        file: &Path,
        sample_rate_hz: f64,
        window: Option<(Epoch, Epoch)>,
    ) -> Result<Schedule, ScheduleError> {
        debug!("Reading schedule from {}", file.display());
        let reader = BufReader::new(File::open(file)?);
        let entries = parse_entries(reader, &file.display().to_string())?;
        let entries = match window {
            Some(window) => clip_to_window(entries, window)?,
            None => entries,
        };
        Schedule::new(entries, sample_rate_hz)
    }

    /// Like [`Schedule::read`], but from any reader. `name` is used in
    /// errors.
    pub fn from_reader<R: BufRead>(
        reader: R,
        name: &str,
        sample_rate_hz: f64,
        window: Option<(Epoch, Epoch)>,
    ) -> Result<Schedule, ScheduleError> {
        let entries = parse_entries(reader, name)?;
        let entries = match window {
            Some(window) => clip_to_window(entries, window)?,
            None => entries,
        };
        Schedule::new(entries, sample_rate_hz)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn entry_num_samples(&self) -> &[usize] {
        &self.num_samples
    }

    pub(crate) fn entry_first_sample(&self, entry: usize) -> usize {
        self.first_samples[entry]
    }

    pub fn total_num_samples(&self) -> usize {
        self.num_samples.iter().sum()
    }

    /// The start of the first scan.
    pub fn first_epoch(&self) -> Epoch {
        self.entries.first().start
    }

    /// The end of the last scan.
    pub fn last_epoch(&self) -> Epoch {
        self.entries.last().end
    }

    /// Split this schedule into chunks of at most `chunk_size` samples.
    pub fn partition(&self, chunk_size: NonZeroUsize) -> Partitioner {
        Partitioner::new(self, chunk_size)
    }
}

/// Parse a "date time" pair into an epoch. hifitime does the parsing and
/// range checks; only the shape of the fields is checked here, as hifitime
/// otherwise accepts partial times and offsets.
pub fn parse_utc(date: &str, time: &str) -> Result<Epoch, String> {
    let s = format!("{date} {time}");
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    let date_ok = {
        let fields: Vec<&str> = date.split('-').collect();
        fields.len() == 3 && fields.iter().all(|f| digits(f))
    };
    let time_ok = match time.split(':').collect::<Vec<_>>()[..] {
        [h, m, sec] => {
            digits(h)
                && digits(m)
                && match sec.split_once('.') {
                    Some((whole, frac)) => digits(whole) && digits(frac) && frac.len() <= 9,
                    None => digits(sec),
                }
        }
        _ => false,
    };
    if !(date_ok && time_ok) {
        return Err(format!("'{s}' is not a 'YYYY-MM-DD HH:MM:SS[.fff]' time"));
    }

    Epoch::from_str(&format!("{date}T{time} UTC"))
        .map_err(|e| format!("'{s}' is not a valid time: {e}"))
}

fn parse_entries<R: BufRead>(reader: R, name: &str) -> Result<Vec<ScheduleEntry>, ScheduleError> {
    let mut entries: Vec<ScheduleEntry> = vec![];
    for (i_line, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = i_line + 1;
        let format_err = |msg: String| ScheduleError::Format {
            file: name.to_string(),
            line: line_num,
            msg,
        };

        let content = match line.find('#') {
            Some(i) => &line[..i],
            None => line.as_str(),
        };
        let fields: Vec<&str> = content.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 7 && fields.len() != 9 {
            return Err(format_err(format!(
                "expected 7 or 9 fields, got {}",
                fields.len()
            )));
        }

        let start = parse_utc(fields[0], fields[1]).map_err(&format_err)?;
        let end = parse_utc(fields[2], fields[3]).map_err(&format_err)?;
        let float = |s: &str| -> Result<f64, ScheduleError> {
            s.parse::<f64>()
                .map_err(|_| format_err(format!("'{s}' is not a number")))
        };
        let entry = ScheduleEntry {
            start,
            end,
            az0_deg: float(fields[4])?,
            az1_deg: float(fields[5])?,
            el_deg: float(fields[6])?,
        };

        if end <= start {
            return Err(format_err("the scan ends before it starts".to_string()));
        }
        if let Some(prev) = entries.last() {
            if start < prev.end {
                return Err(format_err(
                    "the scan starts before the previous scan ends".to_string(),
                ));
            }
        }
        entry.validate().map_err(|e| format_err(e.to_string()))?;

        if fields.len() == 9 {
            for (mjd, epoch) in [(fields[7], start), (fields[8], end)] {
                let mjd = float(mjd)?;
                let diff = (Epoch::from_mjd_utc(mjd) - epoch).to_seconds().abs();
                if !(diff <= MJD_TOLERANCE_S) {
                    return Err(format_err(format!(
                        "MJD {mjd} differs from the civil time by {diff:.3} s"
                    )));
                }
            }
        }

        entries.push(entry);
    }
    Ok(entries)
}

fn clip_to_window(
    entries: Vec<ScheduleEntry>,
    (window_start, window_end): (Epoch, Epoch),
) -> Result<Vec<ScheduleEntry>, ScheduleError> {
    if window_end <= window_start {
        return Err(ScheduleError::BadWindow);
    }
    Ok(entries
        .into_iter()
        .filter_map(|mut e| {
            if e.start < window_start {
                e.start = window_start;
            }
            if e.end > window_end {
                e.end = window_end;
            }
            (e.end > e.start).then_some(e)
        })
        .collect())
}

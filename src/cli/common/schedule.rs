// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use hifitime::Epoch;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{InfoPrinter, Warn};
use crate::{
    constants::DEFAULT_SAMPLE_RATE_HZ,
    schedule::{parse_utc, Schedule, ScheduleError},
};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ScheduleArgs {
    /// A schedule file with one constant-elevation scan per line: start date
    /// and time, end date and time, az0, az1 and el [degrees]. Times are UTC.
    #[clap(long, parse(from_os_str), help_heading = "SCHEDULE")]
    pub(crate) schedule: Option<PathBuf>,

    /// Without a schedule file, make a single scan starting at this UTC time
    /// (e.g. "2025-03-01 04:00:00").
    #[clap(long, help_heading = "SCHEDULE")]
    pub(crate) start: Option<String>,

    /// The length of the single scan [seconds].
    #[clap(long, help_heading = "SCHEDULE")]
    pub(crate) duration: Option<f64>,

    /// The first azimuth bound of the single scan [degrees].
    #[clap(long, allow_hyphen_values = true, help_heading = "SCHEDULE")]
    pub(crate) az0: Option<f64>,

    /// The second azimuth bound of the single scan [degrees].
    #[clap(long, allow_hyphen_values = true, help_heading = "SCHEDULE")]
    pub(crate) az1: Option<f64>,

    /// The elevation of the single scan [degrees].
    #[clap(long, help_heading = "SCHEDULE")]
    pub(crate) el: Option<f64>,

    /// Only use the parts of the schedule file after this UTC time.
    #[clap(long, help_heading = "SCHEDULE")]
    pub(crate) window_start: Option<String>,

    /// Only use the parts of the schedule file before this UTC time.
    #[clap(long, help_heading = "SCHEDULE")]
    pub(crate) window_end: Option<String>,

    /// The detector sample rate [Hz]. Default: 10
    #[clap(long, help_heading = "SCHEDULE")]
    pub(crate) sample_rate: Option<f64>,
}

impl ScheduleArgs {
    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            schedule: self.schedule.or(other.schedule),
            start: self.start.or(other.start),
            duration: self.duration.or(other.duration),
            az0: self.az0.or(other.az0),
            az1: self.az1.or(other.az1),
            el: self.el.or(other.el),
            window_start: self.window_start.or(other.window_start),
            window_end: self.window_end.or(other.window_end),
            sample_rate: self.sample_rate.or(other.sample_rate),
        }
    }

    pub(crate) fn parse(self) -> Result<Schedule, ScheduleArgsError> {
        let Self {
            schedule,
            start,
            duration,
            az0,
            az1,
            el,
            window_start,
            window_end,
            sample_rate,
        } = self;

        let sample_rate = sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE_HZ);
        let mut printer = InfoPrinter::new("Schedule".into());

        let schedule = match schedule {
            Some(file) => {
                if start.is_some()
                    || duration.is_some()
                    || az0.is_some()
                    || az1.is_some()
                    || el.is_some()
                {
                    "Single-scan arguments are ignored when a schedule file is given".warn();
                }
                // An open end of the window is effectively unbounded.
                let window = match (window_start, window_end) {
                    (None, None) => None,
                    (s, e) => {
                        let s = match s {
                            Some(s) => parse_time_arg(&s)?,
                            None => Epoch::from_gregorian_utc_at_midnight(1900, 1, 1),
                        };
                        let e = match e {
                            Some(e) => parse_time_arg(&e)?,
                            None => Epoch::from_gregorian_utc_at_midnight(9999, 1, 1),
                        };
                        Some((s, e))
                    }
                };
                debug!("Schedule file: {}; window: {window:?}", file.display());
                printer.push_line(format!("From {}", file.display()).into());
                Schedule::read(&file, sample_rate, window)?
            }

            None => {
                if window_start.is_some() || window_end.is_some() {
                    "The observing window only applies to schedule files; ignoring".warn();
                }
                let start = start.ok_or(ScheduleArgsError::MissingScanArg("start"))?;
                let start = parse_time_arg(&start)?;
                let duration = duration.ok_or(ScheduleArgsError::MissingScanArg("duration"))?;
                let az0 = az0.ok_or(ScheduleArgsError::MissingScanArg("az0"))?;
                let az1 = az1.ok_or(ScheduleArgsError::MissingScanArg("az1"))?;
                let el = el.ok_or(ScheduleArgsError::MissingScanArg("el"))?;
                printer.push_line("Single scan".into());
                Schedule::single(start, duration, az0, az1, el, sample_rate)?
            }
        };

        printer.push_block(vec![
            format!("{} scan(s) at {sample_rate} Hz", schedule.entries().len()).into(),
            format!("First sample: {}", schedule.first_epoch()).into(),
            format!("Last sample:  {}", schedule.last_epoch()).into(),
            format!("{} samples per detector", schedule.total_num_samples()).into(),
        ]);
        printer.display();

        Ok(schedule)
    }
}

/// Parse a "YYYY-MM-DD HH:MM:SS[.fff]" UTC time; a "T" may separate the date
/// and time.
fn parse_time_arg(s: &str) -> Result<Epoch, ScheduleArgsError> {
    let s = s.trim();
    let (date, time) = s
        .split_once(|c: char| c == ' ' || c == 'T')
        .ok_or_else(|| ScheduleArgsError::BadTime(format!("'{s}' has no time of day")))?;
    parse_utc(date, time.trim()).map_err(ScheduleArgsError::BadTime)
}

#[derive(Error, Debug)]
pub(crate) enum ScheduleArgsError {
    #[error("Without a schedule file, --{0} is needed to make a single scan")]
    MissingScanArg(&'static str),

    #[error("Couldn't parse a UTC time: {0}")]
    BadTime(String),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with observing schedules.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{file}:{line}: {msg}")]
    Format {
        file: String,
        line: usize,
        msg: String,
    },

    #[error("The schedule has no entries with any samples")]
    EmptySchedule,

    #[error("The sample rate must be positive and finite, but got {0} Hz")]
    BadSampleRate(f64),

    #[error("A scan duration must be positive and finite, but got {0} s")]
    BadDuration(f64),

    #[error("Elevation {0}° is outside (0°, 90°]")]
    BadElevation(f64),

    #[error("Azimuth bounds must be finite, but got {az0}° and {az1}°")]
    BadAzimuth { az0: f64, az1: f64 },

    #[error("The observing window ends before it starts")]
    BadWindow,

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `scanmap`
//! subcommands are contained in modules.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `Scanmap`, `Scanmap::run`,
//! and `ScanmapError`.

#[macro_use]
mod common;
mod error;
mod schedule_info;
mod simulate;

pub use error::ScanmapError;

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

use crate::PROGRESS_BARS;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Simulate a scanning telescope observing a harmonic sky, and make maps from its timestreams"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Scanmap {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    #[clap(global = true)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run.
    #[clap(long)]
    #[clap(global = true)]
    save_toml: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "sim")]
    #[clap(about = "Simulate detector timestreams over a schedule and solve for I, Q and U maps.")]
    Simulate(simulate::SimulateArgs),

    #[clap(about = "Summarise a schedule and how it is split into chunks.")]
    ScheduleInfo(schedule_info::ScheduleInfoArgs),
}

impl Scanmap {
    pub fn run(self) -> Result<(), ScanmapError> {
        // Set up logging.
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
            save_toml,
        } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        // Print the version of scanmap and its build-time information.
        let sub_command = match &self.command {
            Command::Simulate(_) => "simulate",
            Command::ScheduleInfo(_) => "schedule-info",
        };
        info!("scanmap {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        macro_rules! merge_save_run {
            ($args:expr) => {{
                let args = $args.merge()?;
                if let Some(toml) = save_toml {
                    use std::{
                        fs::File,
                        io::{BufWriter, Write},
                    };

                    let mut f = BufWriter::new(File::create(toml)?);
                    let toml_str = toml::to_string(&args).map_err(|e| {
                        ScanmapError::ArgFile(format!("Couldn't serialise arguments: {e}"))
                    })?;
                    f.write_all(toml_str.as_bytes())?;
                }
                args.run(dry_run)?;
            }};
        }

        match self.command {
            Command::Simulate(args) => merge_save_run!(args),
            Command::ScheduleInfo(args) => merge_save_run!(args),
        }

        info!("scanmap {} complete.", sub_command);
        Ok(())
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write info-level log lines of how this executable was compiled.
fn display_build_info() {
    info!("Compiled {}", BUILT_TIME_UTC);
    info!("    with compiler {}", RUSTC_VERSION);
    info!("");
}

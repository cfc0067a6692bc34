// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Summarise a schedule and how it would be split into chunks.

use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::common::{display_warnings, InfoPrinter, ScheduleArgs, ARG_FILE_HELP};
use crate::{constants::DEFAULT_CHUNK_SIZE, pointing::azimuth_throw_deg, ScanmapError};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ScheduleInfoArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "schedule")]
    #[serde(default)]
    pub(super) schedule_args: ScheduleArgs,

    /// The maximum number of samples per chunk. Default: 100000
    #[clap(long)]
    pub(super) chunk_size: Option<usize>,

    /// Print every chunk, not just the count.
    #[clap(long)]
    #[serde(default)]
    pub(super) list_chunks: bool,
}

impl ScheduleInfoArgs {
    pub(super) fn merge(self) -> Result<ScheduleInfoArgs, ScanmapError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;
        if let Some(arg_file) = cli_args.args_file {
            let ScheduleInfoArgs {
                args_file: _,
                schedule_args,
                chunk_size,
                list_chunks,
            } = unpack_arg_file!(arg_file);

            Ok(ScheduleInfoArgs {
                args_file: None,
                schedule_args: cli_args.schedule_args.merge(schedule_args),
                chunk_size: cli_args.chunk_size.or(chunk_size),
                list_chunks: cli_args.list_chunks || list_chunks,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), ScanmapError> {
        let ScheduleInfoArgs {
            args_file: _,
            schedule_args,
            chunk_size,
            list_chunks,
        } = self;

        let schedule = schedule_args.parse()?;
        let chunk_size = NonZeroUsize::new(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
            .ok_or_else(|| ScanmapError::Schedule("The chunk size cannot be 0".to_string()))?;
        display_warnings();

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let mut printer = InfoPrinter::new("Scans".into());
        for ((i, entry), num_samples) in schedule
            .entries()
            .iter()
            .enumerate()
            .zip(schedule.entry_num_samples())
        {
            printer.push_block(vec![
                format!("{i}: {} to {}", entry.start, entry.end).into(),
                format!(
                    "az {}° to {}° ({}° throw) at el {}°",
                    entry.az0_deg,
                    entry.az1_deg,
                    azimuth_throw_deg(entry),
                    entry.el_deg
                )
                .into(),
                format!("{num_samples} samples").into(),
            ]);
        }
        printer.display();

        let partitioner = schedule.partition(chunk_size);
        let mut printer = InfoPrinter::new(
            format!(
                "{} chunk(s) of at most {chunk_size} samples",
                partitioner.num_chunks()
            )
            .into(),
        );
        if list_chunks {
            for chunk in partitioner {
                let range = chunk.range();
                printer.push_line(
                    format!(
                        "{}: entry {}, samples {}..{} (entry offset {})",
                        chunk.index, chunk.entry, range.start, range.end, chunk.entry_offset
                    )
                    .into(),
                );
            }
        }
        printer.display();

        Ok(())
    }
}

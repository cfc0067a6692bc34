// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod schedule_info;
mod simulate;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::str::from_utf8;

use assert_cmd::{output::OutputError, Command};

fn scanmap() -> Command {
    Command::cargo_bin("scanmap").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn make_file_in_dir<T: AsRef<Path>, U: AsRef<Path>>(
    filename: T,
    dir: U,
    contents: &str,
) -> PathBuf {
    let path = dir.as_ref().join(filename);
    let mut f = File::create(&path).expect("couldn't make file");
    f.write_all(contents.as_bytes()).expect("couldn't write file");
    path
}

/// Arguments for a single short scan.
fn single_scan_args() -> Vec<&'static str> {
    vec![
        "--start",
        "2025-03-01 04:00:00",
        "--duration",
        "60",
        "--az0",
        "0",
        "--az1",
        "20",
        "--el",
        "45",
    ]
}

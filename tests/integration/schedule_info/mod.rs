// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use indoc::indoc;
use tempfile::TempDir;

use crate::{get_cmd_output, make_file_in_dir, scanmap, single_scan_args};

#[test]
fn test_schedule_info_single_scan() {
    let cmd = scanmap()
        .arg("schedule-info")
        .args(single_scan_args())
        .args(["--chunk-size", "250", "--list-chunks", "--no-progress-bars"])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("600 samples"), "{stdout}");
    assert!(stdout.contains("3 chunk(s) of at most 250 samples"), "{stdout}");
    assert!(stdout.contains("2: entry 0, samples 500..600"), "{stdout}");
}

#[test]
fn test_schedule_info_file() {
    let dir = TempDir::new().unwrap();
    let schedule = make_file_in_dir(
        "schedule.txt",
        dir.path(),
        indoc! {"
            2025-03-01 04:00:00 2025-03-01 04:01:00 0 60 45
            2025-03-01 05:00:00 2025-03-01 05:00:30 0 60 50
        "},
    );
    let cmd = scanmap()
        .args(["schedule-info", "--schedule"])
        .arg(&schedule)
        .args(["--sample-rate", "2"])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("2 scan(s) at 2 Hz"), "{stdout}");
    assert!(stdout.contains("180 samples per detector"), "{stdout}");
}

#[test]
fn test_schedule_info_missing_arg() {
    let cmd = scanmap()
        .args(["schedule-info", "--start", "2025-03-01 04:00:00"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("--duration"), "{stderr}");
}

#[test]
fn test_schedule_info_bad_file() {
    let dir = TempDir::new().unwrap();
    let schedule = make_file_in_dir(
        "schedule.txt",
        dir.path(),
        "2025-03-01 04:00:00 2025-03-01 04:01:00 0 60\n",
    );
    let cmd = scanmap()
        .args(["schedule-info", "--schedule"])
        .arg(&schedule)
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("schedule.txt:1"), "{stderr}");
}

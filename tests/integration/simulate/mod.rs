// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::TempDir;

use crate::{get_cmd_output, make_file_in_dir, scanmap, single_scan_args};
use scanmap::{constants::UNSEEN, io::read_maps};

#[test]
fn test_simulate_help_is_shown() {
    let cmd = scanmap().args(["simulate", "--help"]).ok();
    assert!(cmd.is_ok());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty());
    assert!(stdout.contains("--cond-threshold"));
    assert!(stdout.contains("FOCAL PLANE"));
}

#[test]
fn test_simulate_writes_maps() {
    let dir = TempDir::new().unwrap();
    let bin = dir.path().join("maps.bin");
    let txt = dir.path().join("maps.txt");
    let fits = dir.path().join("maps.fits");
    let cmd = scanmap()
        .arg("simulate")
        .args(single_scan_args())
        .args([
            "--monopole",
            "1.5",
            "--beam-lmax",
            "8",
            "--rows",
            "2",
            "--cols",
            "2",
            "--fov",
            "2",
            "--synth-nside",
            "4",
            "--nside",
            "2",
            "--intensity-only",
            "--chunk-size",
            "100",
            "--no-progress-bars",
            "-o",
        ])
        .arg(&bin)
        .arg(&txt)
        .arg(&fits)
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(stdout.contains("simulate complete"), "{stdout}");

    let maps = read_maps(&bin).unwrap();
    assert_eq!(maps.nside, 2);
    assert_eq!(maps.hits.iter().sum::<u64>(), 8 * 600);
    for (p, &hits) in maps.hits.iter().enumerate() {
        if hits > 0 {
            assert_abs_diff_eq!(maps.maps[(0, p)], 1.5, epsilon = 1e-9);
        } else {
            assert_eq!(maps.maps[(0, p)], UNSEEN);
        }
    }
    assert!(txt.exists());
    // A primary HDU and a HEALPix table for 48 pixels of 24 bytes each.
    let fits = std::fs::read(&fits).unwrap();
    assert_eq!(fits.len() % 2880, 0);
    assert!(fits.starts_with(b"SIMPLE  ="));
    assert_eq!(&fits[2880..2880 + 8], b"XTENSION");
    let header = String::from_utf8_lossy(&fits[2880..2 * 2880]);
    assert!(header.contains("ORDERING= 'RING    '"), "{header}");
}

#[test]
fn test_simulate_dry_run_and_save_toml() {
    let dir = TempDir::new().unwrap();
    let bin = dir.path().join("maps.bin");
    let toml = dir.path().join("args.toml");
    let cmd = scanmap()
        .arg("simulate")
        .args(single_scan_args())
        .args(["--flat-power", "10", "--beam-fwhm", "120", "--dry-run", "--save-toml"])
        .arg(&toml)
        .arg("-o")
        .arg(&bin)
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run -- exiting now."), "{stdout}");
    assert!(!bin.exists());

    // The saved arguments reproduce the run.
    let saved = std::fs::read_to_string(&toml).unwrap();
    assert!(saved.contains("flat_power = 10.0"), "{saved}");
    let cmd = scanmap()
        .arg("simulate")
        .arg(&toml)
        .arg("--dry-run")
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
}

#[test]
fn test_simulate_arg_file_json() {
    let dir = TempDir::new().unwrap();
    let args = make_file_in_dir(
        "args.json",
        dir.path(),
        indoc! {r#"
            {
                "sky": { "monopole": 1.0 },
                "beam": { "beam_lmax": 8 },
                "schedule": {
                    "start": "2025-03-01 04:00:00",
                    "duration": 10.0,
                    "az0": 0.0,
                    "az1": 5.0,
                    "el": 45.0
                },
                "simulate": { "nside": 2, "intensity_only": true }
            }
        "#},
    );
    let cmd = scanmap()
        .arg("simulate")
        .arg(&args)
        .arg("--dry-run")
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
}

#[test]
fn test_simulate_errors_are_reported() {
    // No sky.
    let cmd = scanmap()
        .arg("simulate")
        .args(single_scan_args())
        .arg("--dry-run")
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: No sky was specified"), "{stderr}");

    // An argument file with an unknown extension.
    let dir = TempDir::new().unwrap();
    let args = make_file_in_dir("args.yaml", dir.path(), "sky: {}\n");
    let cmd = scanmap().arg("simulate").arg(&args).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("recognised file extension"), "{stderr}");
}

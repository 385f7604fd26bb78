// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

fn flame() -> Command {
    Command::cargo_bin("flame").unwrap()
}

#[test]
fn renders_a_png() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("heart.png");
    flame()
        .args(&["-s", "64x36", "-n", "20000", "-t", "2", "--seed", "7"])
        .args(&["-x", "heart", "-x", "sinusoidal"])
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let img = image::open(&output).unwrap().to_luma();
    assert_eq!(img.dimensions(), (64, 36));
    assert!(img.pixels().any(|p| p.0[0] == 255));
}

#[test]
fn requires_a_variation() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("none.png");
    flame()
        .args(&["-s", "16x16"])
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("variation"));
    assert!(!output.exists());
}

#[test]
fn rejects_unknown_variations() {
    flame()
        .args(&["-x", "julia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("julia"));
}

#[test]
fn rejects_oversized_images() {
    flame()
        .args(&["-s", "4000x10", "-x", "heart"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Image size must be between"));
}

#[test]
fn rejects_too_many_threads() {
    flame()
        .args(&["-t", "13", "-x", "heart"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Thread count must be between 1 and 12"));
}

#[test]
fn a_degenerate_world_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("flat.png");
    flame()
        .args(&["-s", "16x16", "-n", "100", "--extent", "0,1", "-x", "heart"])
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Render failure"));
    assert!(!output.exists());
}

#[test]
fn a_world_too_far_out_to_sample_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("far.png");
    flame()
        .args(&["-s", "16x16", "-n", "100", "--origin", "1e20,0", "-x", "heart"])
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no room to sample in"))
        .stderr(predicate::str::contains("panicked").not());
    assert!(!output.exists());
}

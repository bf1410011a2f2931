//! End-to-end workflow tests for the pixelguard binary.
//!
//! These tests chain several commands over a shared record file.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pixelguard(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pixelguard").unwrap();
    cmd.env("PIXELGUARD_STORE_PATH", temp.path().join("records.json"))
        .env_remove("PIXELGUARD_MODEL_PATH")
        .env_remove("PIXELGUARD_STRENGTH")
        .env_remove("PIXELGUARD_EPSILON")
        .env_remove("PIXELGUARD_MAX_PIXELS")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (60 + x * 150 / width) as u8,
            (50 + y * 150 / height) as u8,
            (80 + (x + y) * 7 % 100) as u8,
        ])
    });
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Embed → Verify → Lookup
// ============================================================================

#[test]
fn test_e2e_embed_verify_lookup() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "artwork.png", 64, 64);

    let record = json_output(pixelguard(&temp).args([
        "--json",
        "embed",
        image.to_str().unwrap(),
        "--owner",
        "artist-7",
    ]));
    let watermark_id = record["watermark_id"].as_str().unwrap().to_string();
    let marked = temp.path().join("artwork_watermarked.png");

    let verdict = json_output(pixelguard(&temp).args(["--json", "verify", marked.to_str().unwrap()]));
    assert_eq!(verdict["found"], true);
    assert_eq!(verdict["owner_id"], "artist-7");
    assert_eq!(verdict["confidence"], 100);
    assert_eq!(verdict["tamper_status"], "intact");

    pixelguard(&temp)
        .args(["lookup", watermark_id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("artist-7"));
}

#[test]
fn test_e2e_rewatermark_is_refused_unless_forced() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 64, 64);
    let marked = temp.path().join("photo_watermarked.png");

    pixelguard(&temp)
        .args(["embed", image.to_str().unwrap(), "--owner", "first"])
        .assert()
        .success();

    pixelguard(&temp)
        .args(["detect", marked.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Owner ID: first"));

    pixelguard(&temp)
        .args(["embed", marked.to_str().unwrap(), "--owner", "second"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Cannot re-watermark"));

    let second = temp.path().join("second.png");
    pixelguard(&temp)
        .args([
            "embed",
            marked.to_str().unwrap(),
            "--owner",
            "second",
            "--force",
            "-O",
            second.to_str().unwrap(),
        ])
        .assert()
        .success();

    pixelguard(&temp)
        .args(["--quiet", "extract", second.to_str().unwrap()])
        .assert()
        .success()
        .stdout("second\n");
}

#[test]
fn test_e2e_records_accumulate() {
    let temp = TempDir::new().unwrap();
    for i in 0..3 {
        let image = write_png(temp.path(), &format!("image_{i}.png"), 48, 48);
        pixelguard(&temp)
            .args([
                "embed",
                image.to_str().unwrap(),
                "--owner",
                format!("owner-{i}").as_str(),
            ])
            .assert()
            .success();
    }

    let records: serde_json::Value =
        serde_json::from_slice(&fs::read(temp.path().join("records.json")).unwrap()).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 3);
}

// ============================================================================
// Protect
// ============================================================================

#[test]
fn test_e2e_protect_with_saved_model() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "portrait.png", 40, 30);
    let model = temp.path().join("model.cbor");

    pixelguard(&temp)
        .args([
            "model",
            "init",
            model.to_str().unwrap(),
            "--input-size",
            "32",
            "--num-classes",
            "5",
        ])
        .assert()
        .success();

    let report = json_output(
        pixelguard(&temp)
            .env("PIXELGUARD_MODEL_PATH", &model)
            .args(["--json", "protect", image.to_str().unwrap(), "--epsilon", "0.02"]),
    );
    let score = report["robustness_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));

    let protected = image::open(temp.path().join("portrait_protected.png"))
        .unwrap()
        .to_rgb8();
    let original = image::open(&image).unwrap().to_rgb8();
    assert_eq!(protected.dimensions(), original.dimensions());
    for (a, b) in original.as_raw().iter().zip(protected.as_raw()) {
        assert!((*a as i32 - *b as i32).abs() <= 6);
    }
}

#[test]
fn test_e2e_protect_scaled_epsilon() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "portrait.png", 24, 24);
    let model = temp.path().join("model.cbor");

    pixelguard(&temp)
        .args(["model", "init", model.to_str().unwrap(), "--input-size", "16"])
        .assert()
        .success();

    let report = json_output(
        pixelguard(&temp)
            .env("PIXELGUARD_MODEL_PATH", &model)
            .args(["--json", "protect", image.to_str().unwrap(), "--epsilon", "50"]),
    );
    let epsilon = report["epsilon"].as_f64().unwrap();
    assert!((epsilon - 0.025).abs() < 1e-6);
}

#[test]
fn test_e2e_watermark_then_protect_then_strip() {
    let temp = TempDir::new().unwrap();
    let image = write_png(temp.path(), "photo.png", 64, 64);
    let model = temp.path().join("model.cbor");

    pixelguard(&temp)
        .args(["model", "init", model.to_str().unwrap(), "--input-size", "16"])
        .assert()
        .success();
    pixelguard(&temp)
        .args(["embed", image.to_str().unwrap(), "--owner", "dana"])
        .assert()
        .success();

    let marked = temp.path().join("photo_watermarked.png");
    pixelguard(&temp)
        .env("PIXELGUARD_MODEL_PATH", &model)
        .args(["protect", marked.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Robustness score"));

    let protected = temp.path().join("photo_watermarked_protected.png");
    pixelguard(&temp)
        .args(["strip", protected.to_str().unwrap()])
        .assert()
        .success();
    assert!(temp
        .path()
        .join("photo_watermarked_protected_clean.png")
        .exists());
}

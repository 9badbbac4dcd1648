use std::fs;
use std::process::{Command, Output};

use tempfile::tempdir;

fn wallhue(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wallhue"))
        .args(args)
        .env("RUST_LOG", "off")
        .env_remove("WALLHUE_CONFIG")
        .output()
        .expect("failed to spawn wallhue")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn rejects_malformed_colour_flag() {
    let output = wallhue(&["render", "--color", "#12345g", "--output", "out.png"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("non-hex digit"));
}

#[test]
fn render_without_output_is_a_usage_error() {
    let output = wallhue(&["render"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--output"));
}

#[test]
fn rejects_unsupported_config_version() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("scene.toml");
    fs::write(&config, "version = 2\n").unwrap();
    let out = dir.path().join("out.png");

    let output = wallhue(&[
        "render",
        "--config",
        config.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("unsupported config version 2"));
    assert!(!out.exists());
}

#[test]
fn rejects_missing_config_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let output = wallhue(&["view", "--config", missing.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read scene config"));
}

#[test]
fn rejects_zero_canvas_size() {
    let output = wallhue(&["render", "--size", "0x480", "--output", "out.png"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("greater than zero"));
}

#[test]
fn rejects_unparseable_image_url() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.png");

    let out_arg = out.to_str().unwrap();
    let output = wallhue(&["render", "--image", "http://", "--output", out_arg]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid image source"));
    assert!(!out.exists());
}

#[test]
fn missing_textures_never_produce_output() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.png");
    let mask = dir.path().join("mask.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255]))
        .save(&mask)
        .unwrap();

    let output = wallhue(&[
        "render",
        "--image",
        dir.path().join("missing.jpg").to_str().unwrap(),
        "--mask",
        mask.to_str().unwrap(),
        "--size",
        "16x16",
        "--output",
        out.to_str().unwrap(),
    ]);

    // Fails either because no adapter is available or because the gate never
    // opened; in neither case may a file appear.
    assert!(!output.status.success());
    assert!(!out.exists());
}

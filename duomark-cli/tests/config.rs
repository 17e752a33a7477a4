use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn roundtrip_respects_bullet_marker_from_config() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "- a\n- b\n").unwrap();

    let config_path = dir.path().join("custom.toml");
    fs::write(&config_path, "[markdown]\nbullet_marker = \"*\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg("roundtrip")
        .arg(&input)
        .arg("--config")
        .arg(&config_path);
    cmd.assert().success().stdout("* a\n* b\n");
}

#[test]
fn project_config_is_picked_up_from_working_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.md"), "3. c\n4. d\n").unwrap();
    fs::write(
        dir.path().join("duomark.toml"),
        "[markdown]\nordered_list_numbering = \"repeat-one\"\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.current_dir(dir.path()).arg("roundtrip").arg("doc.md");
    cmd.assert().success().stdout("1. c\n1. d\n");
}

#[test]
fn cli_override_precedes_config() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text\n").unwrap();

    let config_path = dir.path().join("custom.toml");
    fs::write(
        &config_path,
        "[convert.html]\nstandalone = true\ntitle = \"From config\"\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input)
        .arg("--to")
        .arg("html")
        .arg("--config")
        .arg(&config_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<title>From config</title>"));

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input)
        .arg("--to")
        .arg("html")
        .arg("--config")
        .arg(&config_path)
        .arg("--extra-standalone")
        .arg("false");
    cmd.assert().success().stdout("<p>text</p>\n");
}

#[test]
fn invalid_config_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text\n").unwrap();
    let config_path = dir.path().join("custom.toml");
    fs::write(&config_path, "[markdown]\nbullet_marker = \"x\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg("roundtrip")
        .arg(&input)
        .arg("--config")
        .arg(&config_path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

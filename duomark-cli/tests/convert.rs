use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn convert_markdown_to_html_fragment() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "# Hi\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg("convert").arg(&input).arg("--to").arg("html");
    cmd.assert().success().stdout("<h1>Hi</h1>\n");
}

#[test]
fn convert_is_the_default_command() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "- [x] done\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input).arg("--to").arg("html");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("type=\"checkbox\""));
}

#[test]
fn convert_passes_extra_parameters() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input)
        .arg("--to")
        .arg("html")
        .arg("--extra-standalone")
        .arg("--extra-title")
        .arg("Notes");
    cmd.assert().success().stdout(
        predicate::str::starts_with("<!DOCTYPE html>")
            .and(predicate::str::contains("<title>Notes</title>"))
            .and(predicate::str::contains("<p>text</p>")),
    );
}

#[test]
fn convert_html_to_markdown() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.html");
    fs::write(&input, "<p>Hello <strong>world</strong></p>").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input).arg("--to").arg("markdown");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Hello **world**"));
}

#[test]
fn convert_writes_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    let output = dir.path().join("doc.json");
    fs::write(&input, "para\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input)
        .arg("--to")
        .arg("json")
        .arg("-o")
        .arg(&output);
    cmd.assert().success().stdout("");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert!(json.is_object());
}

#[test]
fn convert_rejects_unknown_format() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.md");
    fs::write(&input, "text\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input).arg("--to").arg("docx");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Format 'docx' not found"));
}

#[test]
fn convert_needs_a_known_extension() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("doc.txt");
    fs::write(&input, "text\n").unwrap();

    let mut cmd = cargo_bin_cmd!("duomark");
    cmd.arg(&input).arg("--to").arg("html");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("specify --from"));
}

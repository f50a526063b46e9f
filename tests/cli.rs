use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const UPPER_SAMPLE: &str = "12345678 M JOHN DOE 301 042 043 041 048 A1 A1 A1 PASS";

fn cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("result-sheet").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn writes_default_config_when_missing() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .assert()
        .success()
        .stdout(contains("Creating default configuration file"));

    let written = fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(written.contains("level = \"auto\""));
}

#[test]
fn converts_a_bulletin_to_csv() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .arg("--input")
        .arg(fixture("grade12.txt"))
        .args(["--sample", UPPER_SAMPLE, "--output", "out"])
        .assert()
        .success()
        .stdout(contains("Students parsed: 4"))
        .stdout(contains("12345681 SIMRAN KAUR - 87.20%"));

    let records = fs::read_to_string(tmp.path().join("out/results.csv")).unwrap();
    assert!(records.starts_with("Roll No,Gender,Name,ENG-301-G"));
    assert!(records.contains("12345678,M,JOHN DOE"));
    let summary = fs::read_to_string(tmp.path().join("out/results_summary.csv")).unwrap();
    assert!(summary.starts_with("Statistic,ENG-301"));
}

#[test]
fn reads_settings_from_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = format!(
        "level = \"lower\"\nsample_line = \"21100001 F ASHA RANI 184 085 041 086 087 402 PASS\"\ninput_file = {:?}\noutput_directory = \"grade10\"\noutput_name = \"class_x\"\nresync = \"overlapping\"\n",
        fixture("grade10.txt").display().to_string()
    );
    fs::write(tmp.path().join("config.toml"), config).unwrap();

    cmd(tmp.path())
        .assert()
        .success()
        .stdout(contains("Loading configuration"))
        .stdout(contains("Students parsed: 4"));
    assert!(tmp.path().join("grade10/class_x.csv").exists());
}

#[test]
fn rejects_a_bulletin_of_the_wrong_level() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .arg("--input")
        .arg(fixture("grade10.txt"))
        .args(["--sample", UPPER_SAMPLE, "--level", "upper"])
        .assert()
        .failure()
        .stdout(contains("Wrong subject codes in first student record"));
    assert!(!tmp.path().join("output").exists());
}

#[test]
fn tolerates_undecodable_bytes() {
    let tmp = TempDir::new().unwrap();
    let mut bytes = fs::read(fixture("grade12.txt")).unwrap();
    bytes.splice(0..0, b"\xff\xfe garbage banner\n".iter().copied());
    let input = tmp.path().join("latin.txt");
    fs::write(&input, bytes).unwrap();

    cmd(tmp.path())
        .arg("--input")
        .arg(&input)
        .args(["--sample", UPPER_SAMPLE])
        .assert()
        .success()
        .stdout(contains("Students parsed: 4"));
}

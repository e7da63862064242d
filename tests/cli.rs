use assert_cmd::Command;
use predicates::prelude::*;

fn kakeibo(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kakeibo").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("KAKEIBO_ENDPOINT_URL")
        .env_remove("KAKEIBO_PASSPHRASE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("summary"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn months_include_current_month() {
    let home = tempfile::tempdir().unwrap();
    let now = chrono::Local::now().format("%Y/%m").to_string();
    kakeibo(&home)
        .args(["months", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains(now));
}

#[test]
fn empty_store_shows_sample_data() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .args(["summary", "--month", "all", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sample data"))
        .stdout(predicate::str::contains("A pays B ¥35,500"));
}

#[test]
fn add_then_list() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .args(["add", "Lunch", "1200", "--payer", "A", "--date", "2026-01-05", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    kakeibo(&home)
        .args(["list", "--month", "2026/01", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lunch"))
        .stdout(predicate::str::contains("¥1,200"))
        .stdout(predicate::str::contains("2026/01/05"));
}

#[test]
fn add_rejects_bad_amount() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .args(["add", "Lunch", "abc", "--payer", "A", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid amount"));
}

#[test]
fn add_rejects_unknown_payer() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .args(["add", "Lunch", "100", "--payer", "Zed", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid payer"));
}

#[test]
fn config_sets_payers() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .args(["config", "--set", "payers=Ryo,Mari"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ryo, Mari"));

    kakeibo(&home)
        .args(["add", "Rent", "74000", "--payer", "Mari", "--offline"])
        .assert()
        .success();
}

#[test]
fn passphrase_gate_blocks_until_login() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .env("KAKEIBO_PASSPHRASE", "secret")
        .args(["list", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kakeibo login"));
}

#[test]
fn passphrase_gate_covers_backup_and_config_changes() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("copy.sqlite3");
    kakeibo(&home)
        .env("KAKEIBO_PASSPHRASE", "secret")
        .args(["backup", "--output"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("kakeibo login"));
    assert!(!out.exists());

    kakeibo(&home)
        .env("KAKEIBO_PASSPHRASE", "secret")
        .args(["config", "--set", "passphrase=mine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kakeibo login"));

    // Reading settings stays open.
    kakeibo(&home)
        .env("KAKEIBO_PASSPHRASE", "secret")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("from KAKEIBO_PASSPHRASE"));
}

#[test]
fn backup_writes_copy_when_unlocked() {
    let home = tempfile::tempdir().unwrap();
    let out = home.path().join("copy.sqlite3");
    kakeibo(&home)
        .args(["add", "Lunch", "500", "--payer", "B", "--offline"])
        .assert()
        .success();
    kakeibo(&home)
        .args(["backup", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 expense(s)"));
    assert!(out.exists());
}

#[test]
fn unknown_id_fails() {
    let home = tempfile::tempdir().unwrap();
    kakeibo(&home)
        .args(["add", "Lunch", "500", "--payer", "B", "--offline"])
        .assert()
        .success();
    kakeibo(&home)
        .args(["settle", "nope-nope", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown expense"));
}

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let ordering = dir.path().join("ordering.toml");
    fs::write(
        &config,
        format!(
            "version = 1\napplication = \"tester\"\n\n[ordering]\nfile = \"{}\"\n\n[model]\ninvalidation_debounce_ms = 10\n\n[logging]\nlevel = \"error\"\n",
            ordering.display()
        ),
    )
    .unwrap();
    let database = dir.path().join("database");
    (dir, config, database)
}

fn actstats(config: &PathBuf, database: &PathBuf) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("actstats"));
    cmd.arg("--config").arg(config).arg("--database").arg(database).arg("--activity").arg("a1");
    cmd
}

fn record(config: &PathBuf, database: &PathBuf, resource: &str, count: &str, activity: &str) {
    actstats(config, database)
        .args(["record", resource, "--count", count, "--in", activity])
        .assert()
        .success();
}

// Resources are relative names: absolute paths that do not exist on disk
// are dropped by the model.

#[test]
fn initial_rows_are_inserted() {
    let (_dir, config, database) = setup();
    record(&config, &database, "docs/a.txt", "2", "a1");
    record(&config, &database, "docs/b.txt", "1", "a1");

    assert_cmd::Command::from_std(actstats(&config, &database))
        .args(["watch", "--select", "used"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::eq(
            "{\"change\":\"inserted\",\"at\":0,\"count\":1}\n{\"change\":\"inserted\",\"at\":1,\"count\":1}\n",
        ));
}

#[test]
fn score_update_inserts_in_place() {
    let (_dir, config, database) = setup();
    record(&config, &database, "docs/a.txt", "2", "a1");
    record(&config, &database, "docs/b.txt", "1", "a1");

    let events = concat!(
        "not json at all\n",
        "{\"event\":\"resource-score-updated\",\"activity\":\"a1\",\"agent\":\"tester\",",
        "\"resource\":\"docs/c.txt\",\"score\":10.0,\"last_update\":1421345799,\"first_update\":1421345799}\n",
        "{\"event\":\"resource-score-updated\",\"activity\":\"a2\",\"agent\":\"tester\",",
        "\"resource\":\"docs/d.txt\",\"score\":50.0,\"last_update\":1421345799,\"first_update\":1421345799}\n",
    );

    let output = assert_cmd::Command::from_std(actstats(&config, &database))
        .args(["watch", "--select", "used", "--dump"])
        .write_stdin(events)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    // Two initial inserts, one for the event, then three dumped rows.
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[2], serde_json::json!({"change": "inserted", "at": 0, "count": 1}));
    assert_eq!(lines[3]["row"], 0);
    assert_eq!(lines[3]["resource"], "docs/c.txt");
    assert_eq!(lines[4]["resource"], "docs/a.txt");
    assert_eq!(lines[5]["resource"], "docs/b.txt");
}

#[test]
fn activity_switch_resets_the_view() {
    let (_dir, config, database) = setup();
    record(&config, &database, "docs/a.txt", "1", "a1");
    record(&config, &database, "docs/other.txt", "1", "a2");

    let output = assert_cmd::Command::from_std(actstats(&config, &database))
        .args(["watch", "--select", "used", "--dump"])
        .write_stdin("{\"event\":\"current-activity-changed\",\"activity\":\"a2\"}\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let last: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(last["row"], 0);
    assert_eq!(last["resource"], "docs/other.txt");
    assert!(stdout.contains("\"change\":\"removed\""));
}

#[test]
fn bulk_deletion_reloads_after_debounce() {
    let (_dir, config, database) = setup();
    record(&config, &database, "docs/a.txt", "1", "a1");

    // The watcher only sees the event; the rows are still in the store,
    // so the reload reports no structural change.
    assert_cmd::Command::from_std(actstats(&config, &database))
        .args(["watch", "--select", "used", "--dump"])
        .write_stdin("{\"event\":\"earlier-stats-deleted\",\"activity\":\"a1\",\"months\":1}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"resource\":\"docs/a.txt\""))
        .stdout(predicate::str::contains("\"change\":\"removed\"").not());
}

#[test]
fn reload_fires_while_stdin_stays_open() {
    let (_dir, config, database) = setup();
    record(&config, &database, "docs/a.txt", "1", "a1");

    let mut child = actstats(&config, &database)
        .args(["watch", "--select", "used"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            if tx.send(line.unwrap()).is_err() {
                break;
            }
        }
    });
    let next = || rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(next(), "{\"change\":\"inserted\",\"at\":0,\"count\":1}");

    // The store changes behind the watcher's back; only the bulk event
    // makes it reload.
    record(&config, &database, "docs/b.txt", "3", "a1");
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "{{\"event\":\"earlier-stats-deleted\",\"activity\":\"a1\",\"months\":1}}")
        .unwrap();
    stdin.flush().unwrap();

    // No further input: the debounced reload must still come through.
    assert_eq!(next(), "{\"change\":\"inserted\",\"at\":0,\"count\":1}");
    assert_eq!(next(), "{\"change\":\"removed\",\"at\":1,\"count\":1}");

    drop(stdin);
    assert!(child.wait().unwrap().success());
}

#[test]
fn unchanged_ordering_is_not_persisted() {
    let (dir, config, database) = setup();
    record(&config, &database, "docs/a.txt", "1", "a1");

    assert_cmd::Command::from_std(actstats(&config, &database))
        .args(["watch", "--select", "all", "--client", "panel"])
        .write_stdin("")
        .assert()
        .success();

    // Nothing was reordered, so nothing needs persisting.
    assert!(!dir.path().join("ordering.toml").exists());
}

// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VERSES_JSON: &str = r#"[
  {"book": "Gen", "chapter": 1, "verse": 1, "text": "In the beginning God created the heaven and the earth"},
  {"book": "Gen", "chapter": 1, "verse": 3, "text": "And God said Let there be light and there was light"},
  {"book": "Psa", "chapter": 23, "verse": 1, "text": "The Lord is my shepherd I shall not want"},
  {"book": "John", "chapter": 11, "verse": 35, "text": "Jesus wept"},
  {"book": "Rom", "chapter": 6, "verse": 23, "text": "For the wages of sin is death"},
  {"book": "John", "chapter": 11, "text": "missing verse number"}
]"#;

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join(".versegreprc.toml"),
        "[embeddings]\nprovider = \"hashing\"\ndimension = 256\n",
    )
    .expect("write config");
    fs::write(dir.path().join("verses.json"), VERSES_JSON).expect("write verses");
    dir
}

fn versegrep(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("versegrep"));
    cmd.env_remove("VERSEGREP_LOG")
        .env("NO_COLOR", "1")
        .arg("--path")
        .arg(dir);
    cmd
}

fn insert_and_build(dir: &Path) {
    versegrep(dir)
        .arg("insert")
        .arg(dir.join("verses.json"))
        .assert()
        .success();
    versegrep(dir).arg("build-index").assert().success();
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    serde_json::from_str(&stdout).expect("json stdout")
}

#[test]
fn insert_reports_inserted_and_skipped() {
    let dir = workspace();
    let assert = versegrep(dir.path())
        .args(["--format", "json", "insert"])
        .arg(dir.path().join("verses.json"))
        .assert()
        .success();

    let report = stdout_json(&assert);
    assert_eq!(report["inserted"], 5);
    assert_eq!(report["skipped"], 1);
    assert!(dir.path().join(".versegrep").join("corpus.sqlite").exists());
}

#[test]
fn build_then_search_returns_nearest_verse() {
    let dir = workspace();
    insert_and_build(dir.path());
    assert!(dir.path().join(".versegrep").join("verses.index").exists());

    let assert = versegrep(dir.path())
        .args(["--format", "json", "search", "In the beginning", "-k", "2"])
        .assert()
        .success();

    let json = stdout_json(&assert);
    assert_eq!(json["query"], "In the beginning");
    assert_eq!(json["k"], 2);
    assert_eq!(json["dangling"], 0);
    let results = json["results"].as_array().expect("results array");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["book"], "Gen");
    assert_eq!(results[0]["chapter"], 1);
    assert_eq!(results[0]["verse"], 1);
}

#[test]
fn text_search_prints_reference_and_distance() {
    let dir = workspace();
    insert_and_build(dir.path());

    versegrep(dir.path())
        .args(["search", "Jesus wept", "-k", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. John 11:35"))
        .stdout(predicate::str::contains("Text: Jesus wept"))
        .stdout(predicate::str::contains("Distance: "));
}

#[test]
fn list_books_is_sorted() {
    let dir = workspace();
    versegrep(dir.path())
        .arg("insert")
        .arg(dir.path().join("verses.json"))
        .assert()
        .success();

    let assert = versegrep(dir.path())
        .args(["--format", "json", "list-books"])
        .assert()
        .success();
    let books = stdout_json(&assert);
    assert_eq!(books, serde_json::json!(["Gen", "John", "Psa", "Rom"]));
}

#[test]
fn list_books_on_empty_corpus() {
    let dir = workspace();
    versegrep(dir.path())
        .arg("list-books")
        .assert()
        .success()
        .stdout(predicate::str::contains("No books found"));
}

#[test]
fn search_without_index_names_the_error_kind() {
    let dir = workspace();
    versegrep(dir.path())
        .args(["search", "light"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[IndexNotFoundError]"))
        .stderr(predicate::str::contains("build-index"));
}

#[test]
fn build_on_empty_corpus_fails() {
    let dir = workspace();
    versegrep(dir.path())
        .arg("build-index")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[EmptyCorpusError]"));
}

#[test]
fn blank_query_is_rejected() {
    let dir = workspace();
    insert_and_build(dir.path());

    versegrep(dir.path())
        .args(["search", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[InvalidQueryError]"));
}

#[test]
fn blank_query_is_rejected_before_index_load() {
    let dir = workspace();
    versegrep(dir.path())
        .args(["search", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[InvalidQueryError]"));
}

#[test]
fn zero_k_is_rejected() {
    let dir = workspace();
    insert_and_build(dir.path());

    versegrep(dir.path())
        .args(["search", "light", "-k", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[InvalidKError]"));
}

#[test]
fn clear_force_empties_corpus_and_stales_index() {
    let dir = workspace();
    insert_and_build(dir.path());

    versegrep(dir.path())
        .args(["clear", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Corpus cleared"));

    versegrep(dir.path())
        .arg("list-books")
        .assert()
        .success()
        .stdout(predicate::str::contains("No books found"));

    versegrep(dir.path())
        .args(["search", "light"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[StaleIndexError]"));
}

#[test]
fn clear_without_confirmation_keeps_data() {
    let dir = workspace();
    versegrep(dir.path())
        .arg("insert")
        .arg(dir.path().join("verses.json"))
        .assert()
        .success();

    versegrep(dir.path())
        .arg("clear")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("cancelled"));

    versegrep(dir.path())
        .arg("list-books")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gen"));
}

#[test]
fn stats_reports_index_state() {
    let dir = workspace();
    insert_and_build(dir.path());

    let assert = versegrep(dir.path())
        .args(["--format", "json", "stats"])
        .assert()
        .success();
    let stats = stdout_json(&assert);
    assert_eq!(stats["verses"], 5);
    assert_eq!(stats["books"], 4);
    assert_eq!(stats["index"]["entries"], 5);
    assert_eq!(stats["index"]["dimension"], 256);
    assert_eq!(stats["index"]["model_id"], "hashing-256");
    assert_eq!(stats["index"]["stale"], false);
}

#[test]
fn shell_answers_until_exit() {
    let dir = workspace();
    insert_and_build(dir.path());

    versegrep(dir.path())
        .arg("shell")
        .write_stdin("\nJesus wept\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("John 11:35"))
        .stdout(predicate::str::contains("Exiting search shell."));
}

#[test]
fn completions_do_not_need_data() {
    let dir = TempDir::new().expect("tempdir");
    versegrep(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("versegrep"));
}

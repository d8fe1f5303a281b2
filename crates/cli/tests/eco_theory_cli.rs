use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";
const AFTER_NF3: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2";

#[allow(deprecated)]
fn eco_theory(workdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("eco-theory").expect("binary");
    cmd.current_dir(workdir).arg("--quiet");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn write_datasets(root: &std::path::Path) {
    fs::write(
        root.join("b.tsv"),
        "eco\tname\tpgn\nB00\tKing's Pawn\t1. e4\n",
    )
    .unwrap();
    fs::write(
        root.join("c.tsv"),
        "eco\tname\tpgn\nC20\tKing's Pawn Game\t1. e4 e5\nC99\tBroken\t1. e4 e5 2. Nf3 Ke3\nshort row\n",
    )
    .unwrap();
}

#[test]
fn build_then_query() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_datasets(root);

    let output = eco_theory(root)
        .args(["build", "--input", "b.tsv", "--input", "c.tsv", "--out-dir", "out"])
        .output()
        .expect("build run");
    let summary = stdout_json(&output);

    assert_eq!(summary["records"], 3);
    assert_eq!(summary["malformed_rows"], 1);
    assert_eq!(summary["processed"], 2);
    assert_eq!(summary["skipped"], 1);
    assert_eq!(summary["illegal_mid_line"], 1);
    assert_eq!(summary["unique_positions"], 4);

    let graph: Value =
        serde_json::from_str(&fs::read_to_string(root.join("out/eco_theory.json")).unwrap())
            .unwrap();
    assert_eq!(graph[START]["depth"], 0);
    assert!(graph[START]["moves"]["e4"].is_string());

    let index: Value =
        serde_json::from_str(&fs::read_to_string(root.join("out/eco_index.json")).unwrap())
            .unwrap();
    assert_eq!(index["B00"][0]["name"], "King's Pawn");
    assert_eq!(index["C20"][0]["name"], "King's Pawn Game");
    assert!(index.get("C99").is_none());

    let output = eco_theory(root)
        .args(["identify", "--db", "out/eco_theory.json", "--fen", AFTER_E4_E5])
        .output()
        .expect("identify run");
    let found = stdout_json(&output);
    assert_eq!(found["opening"]["opening_name"], "King's Pawn Game");
    assert_eq!(found["opening"]["eco_code"], "C20");
    assert_eq!(found["opening"]["confidence"], 1.0);

    // Nf3 was kept from the broken line without a label of its own
    let output = eco_theory(root)
        .args(["identify", "--db", "out/eco_theory.json", "--fen", AFTER_NF3])
        .output()
        .expect("identify run");
    let inherited = stdout_json(&output);
    assert_eq!(inherited["opening"]["opening_name"], "King's Pawn Game");
    assert_eq!(inherited["opening"]["fen"], AFTER_NF3);
    assert_eq!(inherited["opening"]["matching_depth"], 2);
    assert!(inherited["opening"]["confidence"].as_f64().unwrap() < 1.0);

    let output = eco_theory(root)
        .args(["moves", "--db", "out/eco_theory.json", "--fen", START])
        .output()
        .expect("moves run");
    let moves = stdout_json(&output);
    assert_eq!(moves["moves"], serde_json::json!(["e4"]));
}

#[test]
fn build_is_reproducible() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_datasets(root);

    for (order, out) in [(["b.tsv", "c.tsv"], "first"), (["c.tsv", "b.tsv"], "second")] {
        eco_theory(root)
            .args(["build", "--input", order[0], "--input", order[1], "--out-dir", out])
            .assert()
            .success();
    }

    for file in ["eco_theory.json", "eco_index.json"] {
        assert_eq!(
            fs::read(root.join("first").join(file)).unwrap(),
            fs::read(root.join("second").join(file)).unwrap(),
            "{file} differs"
        );
    }
}

#[test]
fn missing_input_fails() {
    let temp = tempdir().unwrap();
    eco_theory(temp.path())
        .args(["build", "--input", "nope.tsv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load ECO datasets"));
}

#[test]
fn unplayable_dataset_fails() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("x.tsv"), "X00\tNonsense\t1. Ke2\n").unwrap();

    eco_theory(temp.path())
        .args(["build", "--input", "x.tsv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No records could be processed"));
    assert!(!temp.path().join("public/data/eco_theory.json").exists());
}

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("card-vision").unwrap()
}

#[test]
fn render_read_label_read() {
    let dir = tempfile::tempdir().unwrap();
    let frame = dir.path().join("flop.png");
    let templates = dir.path().join("templates");

    cli()
        .args(["render", "--hero", "Ah,Kd", "--board", "Qs,Jc,Th"])
        .arg(&frame)
        .assert()
        .success();
    assert!(frame.is_file());

    // Nothing is known yet: every card becomes a provisional template.
    cli()
        .arg("read")
        .arg("--templates")
        .arg(&templates)
        .arg(&frame)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("no_hero_cards"));

    cli()
        .arg("templates")
        .arg("--templates")
        .arg(&templates)
        .assert()
        .success()
        .stdout(predicate::str::contains("#0\t"))
        .stdout(predicate::str::contains("#4\t"));

    // Board slots are read before hero slots, left to right.
    for (id, card) in ["Qs", "Jc", "Th", "Ah", "Kd"].iter().enumerate() {
        cli()
            .arg("label")
            .arg("--templates")
            .arg(&templates)
            .arg(id.to_string())
            .arg(card)
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("#{id} -> {card}")));
    }

    cli()
        .arg("read")
        .arg("--templates")
        .arg(&templates)
        .arg(&frame)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"))
        .stdout(predicate::str::contains("\"street\": \"flop\""));

    cli()
        .arg("templates")
        .arg("--templates")
        .arg(&templates)
        .assert()
        .success()
        .stdout(predicate::str::contains("Qs\t"))
        .stdout(predicate::str::contains("#").not());
}

#[test]
fn label_rejects_unknown_ids_and_cards() {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates");

    cli()
        .arg("label")
        .arg("--templates")
        .arg(&templates)
        .args(["7", "Qs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no provisional template with id 7"));

    cli()
        .arg("label")
        .arg("--templates")
        .arg(&templates)
        .args(["0", "Zz"])
        .assert()
        .failure();
}

#[test]
fn run_prints_one_line_per_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).unwrap();
    for (i, board) in ["Qs,Jc,Th", "Qs,Jc,Th,2c"].iter().enumerate() {
        cli()
            .args(["render", "--hero", "Ah,Kd", "--board", board])
            .arg(frames.join(format!("{i}.png")))
            .assert()
            .success();
    }
    let config = dir.path().join("app.json");
    std::fs::write(
        &config,
        r#"{
            "templates": "templates",
            "source": { "kind": "directory", "path": "frames" },
            "cycle_interval_ms": 0
        }"#,
    )
    .unwrap();

    let out = cli().arg("run").arg("--config").arg(&config).assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["valid"], false);
    }
    assert!(dir.path().join("templates").join("provisional").is_dir());
}

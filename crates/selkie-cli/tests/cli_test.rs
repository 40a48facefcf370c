use assert_cmd::Command;
use serde_json::Value;
use std::fs;

const CLUSTERED: &str = r#"{
  "nodes": [
    {"id": "B", "label": "Group"},
    {"id": "A", "parentId": "B", "width": 40, "height": 20},
    {"id": "C", "width": 40, "height": 20}
  ],
  "edges": [
    {"id": "e1", "start": "A", "end": "C"},
    {"id": "loop", "start": "C", "end": "C"}
  ]
}"#;

fn selkie() -> Command {
    Command::new(assert_cmd::cargo_bin!("selkie"))
}

fn parse_stdout(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

#[test]
fn cli_lays_out_graph_from_stdin() {
    let output = selkie()
        .arg("layout")
        .write_stdin(CLUSTERED)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result = parse_stdout(&output);
    let nodes = result["nodes"].as_array().expect("nodes array");
    // A, C, the two synthetic self-loop nodes, and the cluster B.
    assert_eq!(nodes.len(), 5);
    assert_eq!(result["edges"].as_array().expect("edges").len(), 4);
    assert_eq!(result["clusters"][0]["id"], "B");
    assert!(result.get("failures").is_none(), "no failures are serialized");
}

#[test]
fn cli_writes_output_file_and_reads_input_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("graph.json");
    let out = tmp.path().join("layout.json");
    fs::write(&input, CLUSTERED).expect("write input");

    selkie()
        .args([
            "--pretty",
            "-o",
            out.to_string_lossy().as_ref(),
            input.to_string_lossy().as_ref(),
        ])
        .assert()
        .success()
        .stdout("");

    let text = fs::read_to_string(&out).expect("read output");
    assert!(text.contains('\n'), "pretty output spans lines");
    let result: Value = serde_json::from_str(&text).expect("output is JSON");
    assert!(result["bounds"]["max_x"].as_f64().is_some());
}

#[test]
fn cli_config_file_and_direction_flag_override_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("layout.yaml");
    fs::write(&config, "rankSpacing: 120\nsubGraphTitleMargin:\n  top: 12\n").expect("write config");

    let output = selkie()
        .args([
            "config",
            "--direction",
            "LR",
            "--config",
            config.to_string_lossy().as_ref(),
        ])
        .write_stdin(r#"{"nodes":[],"config":{"rankSpacing":40,"nodeSpacing":30}}"#)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let config = parse_stdout(&output);
    assert_eq!(config["direction"], "LR");
    assert_eq!(config["rankSpacing"].as_f64(), Some(120.0));
    assert_eq!(config["nodeSpacing"].as_f64(), Some(30.0));
    assert_eq!(config["subGraphTitleMargin"]["top"].as_f64(), Some(12.0));
    assert_eq!(config["subGraphTitleMargin"]["bottom"].as_f64(), Some(0.0));
}

#[test]
fn cli_direction_changes_layout_axis() {
    let graph = r#"{"nodes":[{"id":"a","width":40,"height":20},{"id":"b","width":40,"height":20}],
        "edges":[{"id":"e","start":"a","end":"b"}]}"#;

    let output = selkie()
        .args(["--direction", "LR"])
        .write_stdin(graph)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result = parse_stdout(&output);
    let a = &result["nodes"][0];
    let b = &result["nodes"][1];
    assert_eq!(a["y"], b["y"]);
    assert!(b["x"].as_f64().expect("x") > a["x"].as_f64().expect("x"));
}

#[test]
fn cli_strict_mode_fails_on_item_failures() {
    let graph = r#"{"nodes":[{"id":"bad","width":-5,"height":10},{"id":"ok"}],"edges":[]}"#;

    let stderr = selkie()
        .write_stdin(graph)
        .assert()
        .success()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&stderr).contains("`bad`"));

    selkie()
        .arg("--strict")
        .write_stdin(graph)
        .assert()
        .code(3);
}

#[test]
fn cli_reports_structural_errors() {
    selkie()
        .write_stdin(r#"{"nodes":[{"id":"a"}],"edges":[{"id":"e","start":"a","end":"ghost"}]}"#)
        .assert()
        .code(1);

    selkie().write_stdin("not json").assert().code(1);
}

#[test]
fn cli_usage_errors_exit_with_code_2() {
    selkie().arg("--unknown").assert().code(2);
    selkie().args(["--direction", "sideways"]).assert().code(2);
    selkie().arg("--config").assert().code(2);
}

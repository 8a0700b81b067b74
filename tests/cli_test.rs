use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const PAGE: &str = r#"<html><body>
<div class="row"><h3>Alpha</h3><a href="/a">more</a></div>
<div class="row"><h3>Beta</h3></div>
</body></html>"#;

const SPEC: &str = r#"[
  {"name": "root", "xpaths": ["//div[@class='row']"]},
  {"name": "name", "required": true, "xpaths": ["h3"]},
  {"name": "link", "xpaths": ["a/@href"]}
]"#;

fn run(dir: &Path, html: &str, spec: &str, extra: &[&str]) -> Output {
    let html_path = dir.join("page.html");
    let spec_path = dir.join("spec.json");
    fs::write(&html_path, html).expect("write html");
    fs::write(&spec_path, spec).expect("write spec");

    Command::new(env!("CARGO_BIN_EXE_div2csv"))
        .arg(&html_path)
        .arg(&spec_path)
        .arg(dir.join("out.csv"))
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run div2csv")
}

#[test]
fn successful_run_writes_csv() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = run(dir.path(), PAGE, SPEC, &[]);

    assert!(output.status.success(), "{output:?}");
    let csv = fs::read_to_string(dir.path().join("out.csv")).expect("read csv");
    assert_eq!(csv, "name,link\r\nAlpha,/a\r\nBeta,<empty>\r\n");

    let log = String::from_utf8_lossy(&output.stdout);
    assert!(log.contains("Loaded specification with 2 columns."), "{log}");
    assert!(log.contains("Parsed 2 records from HTML."), "{log}");
    assert!(log.contains("CSV saved to"), "{log}");
}

#[test]
fn missing_required_column_fails_without_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let html = r#"<div class="row"><h3>ok</h3></div><div class="row">broken</div>"#;
    let output = run(dir.path(), html, SPEC, &[]);

    assert!(!output.status.success());
    assert!(!dir.path().join("out.csv").exists());
    let log = String::from_utf8_lossy(&output.stdout);
    assert!(log.contains("Required column 'name' is missing in record 1"), "{log}");
}

#[test]
fn skip_invalid_and_missing_value_flags() {
    let dir = tempfile::tempdir().expect("temp dir");
    let html = r#"<div class="row">broken</div><div class="row"><h3>ok</h3></div>"#;
    let output = run(
        dir.path(),
        html,
        SPEC,
        &["--skip-invalid", "--missing-value", "-"],
    );

    assert!(output.status.success(), "{output:?}");
    let csv = fs::read_to_string(dir.path().join("out.csv")).expect("read csv");
    assert_eq!(csv, "name,link\r\nok,-\r\n");
}

#[test]
fn invalid_specification_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = run(dir.path(), PAGE, r#"[{"name": "x", "xpaths": ["b"]}]"#, &[]);

    assert!(!output.status.success());
    assert!(!dir.path().join("out.csv").exists());
    let log = String::from_utf8_lossy(&output.stdout);
    assert!(log.contains("lacks a root column"), "{log}");
}

#[test]
fn missing_arguments_are_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_div2csv"))
        .arg("only-one.html")
        .output()
        .expect("failed to run div2csv");

    assert!(!output.status.success());
    let usage = String::from_utf8_lossy(&output.stderr);
    assert!(usage.contains("Usage"), "{usage}");
}

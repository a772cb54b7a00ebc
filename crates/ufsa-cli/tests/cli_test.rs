use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const REGISTRY: &str = r#"
standards:
  - standard_id: countries
    name: Countries
    governing_body: ISO
    specification_url: fixtures://countries.csv
    data_format: csv
    concept_scheme_uri: http://ufsa.org/v2/standards/countries
  - standard_id: shop_db
    name: Shop database
    specification_url: fixtures://shop.sql
    data_format: sql
    concept_scheme_uri: http://ufsa.org/v2/ast/shop_db
  - standard_id: broken
    name: Broken schema
    specification_url: fixtures://broken.json
    data_format: json-schema
    concept_scheme_uri: http://ufsa.org/v2/standards/broken
"#;

fn run_ufsa(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ufsa"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run ufsa")
}

fn write_workspace(dir: &Path, registry: &str) {
    fs::write(dir.join("registry.yaml"), registry).expect("write registry");
    fs::write(dir.join("countries.csv"), "name,code\nUnited States,US\nGermany,DE\n").expect("write csv");
    fs::write(
        dir.join("shop.sql"),
        "CREATE TABLE users (user_id INT PRIMARY KEY);\n\
         CREATE TABLE orders (order_id INT, user_id INT REFERENCES users(user_id));\n",
    )
    .expect("write sql");
    fs::write(dir.join("broken.json"), "{ not json").expect("write json");
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn run_prints_json_summary_and_writes_tables() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_workspace(dir.path(), REGISTRY);
    let out = dir.path().join("out");

    let output = run_ufsa(&[
        "run",
        "--registry",
        path_arg(&dir.path().join("registry.yaml")),
        "--fixtures",
        path_arg(dir.path()),
        "--out",
        path_arg(&out),
        "--json",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("summary is JSON");
    let sources = summary["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0]["status"], "succeeded");
    assert_eq!(sources[2]["status"], "failed");
    assert_eq!(sources[2]["kind"], "parse");

    for name in [
        "concept_schemes.csv",
        "concepts.csv",
        "semantic_relations.csv",
        "identifier_systems.csv",
        "mappings.csv",
        "mappings.candidates.csv",
        "software_components.csv",
        "database_schemas.csv",
        "countries.concepts.csv",
    ] {
        assert!(out.join(name).is_file(), "{name} missing");
    }
    let relations = fs::read_to_string(out.join("semantic_relations.csv")).expect("relations");
    assert!(relations.contains("shop_db:orders.user_id,skos:relatedMatch,shop_db:users.user_id"));
}

#[test]
fn run_without_per_scheme_tables() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_workspace(dir.path(), REGISTRY);
    let out = dir.path().join("out");

    let output = run_ufsa(&[
        "run",
        "--registry",
        path_arg(&dir.path().join("registry.yaml")),
        "--fixtures",
        path_arg(dir.path()),
        "--out",
        path_arg(&out),
        "--sequential",
        "--no-per-scheme",
    ]);
    assert!(output.status.success());
    assert!(!out.join("countries.concepts.csv").exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 succeeded, 1 failed"), "stdout: {stdout}");
}

#[test]
fn run_exits_non_zero_when_nothing_succeeds() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_workspace(
        dir.path(),
        r#"
standards:
  - standard_id: broken
    name: Broken schema
    specification_url: fixtures://broken.json
    data_format: json-schema
    concept_scheme_uri: urn:broken
"#,
    );
    let out = dir.path().join("out");

    let output = run_ufsa(&[
        "run",
        "--registry",
        path_arg(&dir.path().join("registry.yaml")),
        "--fixtures",
        path_arg(dir.path()),
        "--out",
        path_arg(&out),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(out.join("concepts.csv").is_file());
}

#[test]
fn run_aborts_on_missing_registry() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = run_ufsa(&[
        "run",
        "--registry",
        path_arg(&dir.path().join("missing.yaml")),
        "--out",
        path_arg(&dir.path().join("out")),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.yaml"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn run_reads_settings_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_workspace(dir.path(), REGISTRY);
    let out = dir.path().join("from-settings");
    fs::write(
        dir.path().join("settings.yaml"),
        format!(
            "fixtures_dir: {}\nout_dir: {}\nper_scheme_json: true\n",
            path_arg(dir.path()),
            path_arg(&out)
        ),
    )
    .expect("write settings");

    let output = run_ufsa(&[
        "run",
        "--config",
        path_arg(&dir.path().join("settings.yaml")),
        "--registry",
        path_arg(&dir.path().join("registry.yaml")),
    ]);
    assert!(output.status.success());
    assert!(out.join("countries.concepts.json").is_file());
}

#[test]
fn check_reports_resolution_per_entry() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_workspace(
        dir.path(),
        r#"
standards:
  - standard_id: countries
    name: Countries
    specification_url: fixtures://countries.csv
    parser_module: ufsa_v2.parsers.csv_parser
    concept_scheme_uri: urn:countries
  - standard_id: mystery
    name: Unknown
    specification_url: fixtures://m.bin
    data_format: parquet
    concept_scheme_uri: urn:mystery
"#,
    );

    let output = run_ufsa(&[
        "check",
        "--registry",
        path_arg(&dir.path().join("registry.yaml")),
        "--fixtures",
        path_arg(dir.path()),
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let checks: serde_json::Value = serde_json::from_slice(&output.stdout).expect("report is JSON");
    assert_eq!(checks[0]["source_id"], "countries");
    assert_eq!(checks[0]["format"], "tabular");
    assert!(checks[0]["problem"].is_null());
    assert_eq!(checks[1]["format"], serde_json::Value::Null);
    assert!(
        checks[1]["problem"]
            .as_str()
            .is_some_and(|p| p.contains("parquet"))
    );
}

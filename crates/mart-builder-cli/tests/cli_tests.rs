//! CLI integration tests for mart-builder.
//!
//! These tests verify command-line argument parsing, help output,
//! translation output and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mart-builder binary.
fn cmd() -> Command {
    Command::cargo_bin("mart-builder").unwrap()
}

/// Write `content` to a temporary YAML file.
fn yaml_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const PLAN: &str = r#"
- kind: rename
  dataset_schema: ds
  table: t1
  to: t2
- kind: index
  dataset_schema: ds
  table: t2
  columns: [gene_id]
- kind: index
  dataset_schema: ds
  table: t2
  columns: [gene_id, name]
"#;

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("translate"))
        .stdout(predicate::str::contains("dialects"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("sample"))
        .stdout(predicate::str::contains("distinct"));
}

#[test]
fn test_translate_subcommand_help() {
    cmd()
        .args(["translate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--plan"))
        .stdout(predicate::str::contains("--dialect"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--comments"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mart-builder"));
}

#[test]
fn test_missing_subcommand_fails() {
    cmd().assert().failure();
}

// =============================================================================
// Dialects
// =============================================================================

#[test]
fn test_dialects_lists_builtins_in_order() {
    cmd()
        .arg("dialects")
        .assert()
        .success()
        .stdout("mysql\noracle\npostgres\n");
}

// =============================================================================
// Translate
// =============================================================================

#[test]
fn test_translate_mysql() {
    let plan = yaml_file(PLAN);
    cmd()
        .args(["translate", "--dialect", "mysql", "--plan"])
        .arg(plan.path())
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .success()
        .stdout(
            "rename table ds.t1 to ds.t2;\n\
             create index I_0 on ds.t2(gene_id);\n\
             create index I_1 on ds.t2(gene_id,name);\n",
        );
}

#[test]
fn test_translate_postgres_with_comments() {
    let plan = yaml_file(PLAN);
    cmd()
        .args(["translate", "--dialect", "postgres", "--comments", "--plan"])
        .arg(plan.path())
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "create schema ds;\n-- Rename ds.t1 to t2\nset search_path=ds,pg_catalog;\n",
        ))
        .stdout(predicate::str::contains("alter table ds.t1 rename to t2;"));
}

#[test]
fn test_translate_uses_config_dialect_and_prefix() {
    let plan = yaml_file(PLAN);
    let config = yaml_file("dialect: oracle\ntranslator:\n  index_prefix: MART_\n");
    cmd()
        .args(["translate", "--plan"])
        .arg(plan.path())
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("alter table ds.t1 rename to t2;"))
        .stdout(predicate::str::contains("create index ds.MART_0 on ds.t2(gene_id);"));
}

#[test]
fn test_translate_to_output_file() {
    let plan = yaml_file(PLAN);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.sql");
    cmd()
        .args(["translate", "--dialect", "oracle", "--plan"])
        .arg(plan.path())
        .arg("--output")
        .arg(&out)
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .success()
        .stdout("");
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("alter table ds.t1 rename to t2;\n"));
}

#[test]
fn test_translate_failure_keeps_prior_statements() {
    let plan = yaml_file(
        r#"
- kind: drop
  dataset_schema: ds
  table: temp_0
- kind: rename
  dataset_schema: ds
  table: t1
  to: a_name_that_is_far_too_long_for_oracle
- kind: drop
  dataset_schema: ds
  table: temp_1
"#,
    );
    cmd()
        .args(["translate", "--dialect", "oracle", "--plan"])
        .arg(plan.path())
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .code(3)
        .stdout("drop table ds.temp_0;\n")
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn test_translate_unknown_dialect() {
    let plan = yaml_file(PLAN);
    cmd()
        .args(["translate", "--dialect", "sqlite", "--plan"])
        .arg(plan.path())
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .code(1);
}

#[test]
fn test_translate_malformed_plan() {
    let plan = yaml_file("- kind: teleport\n  dataset_schema: ds\n");
    cmd()
        .args(["translate", "--dialect", "mysql", "--plan"])
        .arg(plan.path())
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .code(1);
}

#[test]
fn test_translate_missing_plan_file() {
    cmd()
        .args(["translate", "--dialect", "mysql", "--plan", "/nonexistent/plan.yaml"])
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .code(7);
}

#[test]
fn test_translate_without_dialect_or_config() {
    let plan = yaml_file(PLAN);
    cmd()
        .args(["translate", "--plan"])
        .arg(plan.path())
        .args(["--config", "/nonexistent/config.yaml"])
        .assert()
        .code(7);
}

// =============================================================================
// Connection Commands
// =============================================================================

#[test]
fn test_probe_requires_connection() {
    let config = yaml_file("dialect: postgres\n");
    cmd()
        .arg("probe")
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("connection"));
}

#[test]
fn test_sample_requires_columns() {
    cmd()
        .args(["sample", "--table", "gene"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--columns"));
}

#[test]
fn test_invalid_config_exit_code() {
    let config = yaml_file("dialect: postgres\ntranslator:\n  index_prefix: \"\"\n");
    cmd()
        .args(["distinct", "--table", "gene", "--column", "biotype"])
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1);
}

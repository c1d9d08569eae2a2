//! Integration tests for the CLI commands

use assert_cmd::Command;
use clap::Parser;
use statistics_gateway::cli::Cli;

use crate::support::{gateway_with, series_body, StubTransport};

fn run_cli(args: &[&str], transport: std::sync::Arc<StubTransport>) -> String {
    let cli = Cli::parse_from(args);
    let gateway = gateway_with(transport);
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut out = Vec::new();
    runtime.block_on(cli.execute(&gateway, &mut out)).unwrap();
    String::from_utf8(out).unwrap()
}

fn trade_transport() -> std::sync::Arc<StubTransport> {
    StubTransport::new(|_| {
        Ok(series_body(&[
            ("202401", "54812.3"),
            ("202402", "52129.9"),
            ("202403", "56559.6"),
        ]))
    })
}

#[test]
fn test_categories_binary_lists_offline() {
    let output = Command::cargo_bin("statistics-gateway")
        .unwrap()
        .args(["--api-key", "dummy", "categories"])
        .env_remove("ECOS_BASE_URL")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("exchange"));
    assert!(stdout.contains("731Y001"));
}

#[test]
fn test_binary_without_api_key_fails() {
    Command::cargo_bin("statistics-gateway")
        .unwrap()
        .arg("categories")
        .env_remove("ECOS_API_KEY")
        .assert()
        .failure();
}

#[test]
fn test_binary_rejects_unknown_subcommand() {
    Command::cargo_bin("statistics-gateway")
        .unwrap()
        .args(["--api-key", "dummy", "download"])
        .assert()
        .failure();
}

#[test]
fn test_fetch_csv_output() {
    let output = run_cli(
        &[
            "statistics-gateway",
            "fetch",
            "trade",
            "--start",
            "20240101",
            "--end",
            "20240331",
            "--format",
            "csv",
        ],
        trade_transport(),
    );

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "period,value,item_name,unit");
    assert_eq!(lines[1], "202401,54812.3,Test item,unit");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_fetch_json_with_summary() {
    let output = run_cli(
        &[
            "statistics-gateway",
            "fetch",
            "trade",
            "--start",
            "20240101",
            "--end",
            "20240331",
            "--summary",
            "--format",
            "json",
        ],
        trade_transport(),
    );

    let report: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["item_key"], "EXPORT_USD");
    assert_eq!(report["fallback_steps"], 0);
    assert_eq!(report["result"]["points"].as_array().unwrap().len(), 3);
    assert_eq!(report["summary"]["latest_period"], "202403");
}

#[test]
fn test_fetch_to_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("out").join("trade.csv");
    let path_arg = path.to_string_lossy().to_string();

    let output = run_cli(
        &[
            "statistics-gateway",
            "fetch",
            "trade",
            "--start",
            "20240101",
            "--end",
            "20240331",
            "--format",
            "csv",
            "--output",
            &path_arg,
        ],
        trade_transport(),
    );

    assert!(output.is_empty());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("period,value,item_name,unit\n"));
}

#[test]
fn test_fetch_set_json_marks_failures() {
    let output = run_cli(
        &[
            "statistics-gateway",
            "fetch-set",
            "balance",
            "--start",
            "20240101",
            "--end",
            "20240131",
            "--items",
            "CURRENT_ACCOUNT,BOGUS",
            "--format",
            "json",
        ],
        trade_transport(),
    );

    let report: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["CURRENT_ACCOUNT"]["status"], "ok");
    assert_eq!(report["CURRENT_ACCOUNT"]["item_code"], "000000");
    assert_eq!(report["BOGUS"]["status"], "error");
    assert_eq!(report["BOGUS"]["error_kind"], "unknown_item");
}

#[test]
fn test_categories_describe_human() {
    let output = run_cli(
        &["statistics-gateway", "categories", "money"],
        trade_transport(),
    );

    assert!(output.contains("102Y004"));
    assert!(output.contains("BASE_MONEY"));
    assert!(output.contains("BBKA01"));
}

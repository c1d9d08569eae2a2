//! Unit tests for command-line parsing

use clap::Parser;
use statistics_gateway::cli::{Cli, Commands, ReportFormat, SeriesFormat};
use statistics_gateway::Granularity;

#[test]
fn test_fetch_defaults() {
    let cli = Cli::parse_from([
        "statistics-gateway",
        "--api-key",
        "key",
        "fetch",
        "exchange",
        "--start",
        "20240101",
        "--end",
        "20240131",
    ]);
    let Commands::Fetch(args) = cli.command else {
        panic!("expected fetch command");
    };
    assert_eq!(args.format, SeriesFormat::Human);
    assert!(args.item.is_none());
    assert!(!args.summary);

    let request = args.to_request();
    assert_eq!(request.category, "exchange");
    assert_eq!(request.start, "20240101");
    assert!(request.rows.is_none());
}

#[test]
fn test_over_window_requires_summary() {
    let result = Cli::try_parse_from([
        "statistics-gateway",
        "fetch",
        "exchange",
        "--start",
        "20240101",
        "--end",
        "20240131",
        "--over-window",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_invalid_granularity_rejected() {
    let result = Cli::try_parse_from([
        "statistics-gateway",
        "fetch",
        "exchange",
        "--start",
        "20240101",
        "--end",
        "20240131",
        "--granularity",
        "W",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_categories_granularity_requires_category() {
    assert!(Cli::try_parse_from(["statistics-gateway", "categories", "--granularity", "M"]).is_err());

    let cli = Cli::parse_from([
        "statistics-gateway",
        "categories",
        "inflation",
        "--granularity",
        "Q",
        "--format",
        "json",
    ]);
    let Commands::Categories(args) = cli.command else {
        panic!("expected categories command");
    };
    assert_eq!(args.category.as_deref(), Some("inflation"));
    assert_eq!(args.granularity, Some(Granularity::Quarterly));
    assert_eq!(args.format, ReportFormat::Json);
}

#[test]
fn test_search_keywords() {
    let cli = Cli::parse_from(["statistics-gateway", "search", "--code", "731", "--name", "rate"]);
    let Commands::Search(args) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(args.code.as_deref(), Some("731"));
    assert_eq!(args.name.as_deref(), Some("rate"));
}

#[test]
fn test_missing_api_key_is_configuration_error() {
    let cli = Cli::parse_from(["statistics-gateway", "--api-key", "  ", "categories"]);
    let err = cli.gateway_config().unwrap_err();
    assert!(err.to_string().contains("missing API key"));
}

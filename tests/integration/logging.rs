//! Integration tests for logging and tracing

use statistics_gateway::IndicatorRequest;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::support::{gateway_with, no_data_body, StubTransport};

#[test]
fn test_tracing_subscriber_initialization() {
    // try_init fails harmlessly when another test installed a subscriber first
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("statistics_gateway=debug")),
        )
        .with_test_writer()
        .try_init();

    assert!(result.is_ok() || result.is_err());
}

#[test]
fn test_tracing_json_format() {
    let result = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("statistics_gateway=info"))
        .with_test_writer()
        .try_init();

    assert!(result.is_ok() || result.is_err());
}

#[test]
fn test_env_filter_parsing() {
    for directive in [
        "info",
        "statistics_gateway=debug",
        "warn,statistics_gateway::gateway=trace",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}

#[test]
fn test_structured_logging_fields() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("statistics_gateway=debug"))
        .with_test_writer()
        .try_init();

    let category = "trade";
    let item = "EXPORT_USD";
    let steps = 2;

    info!(category = %category, item = %item, steps, "Fallback found data in an earlier window");
    warn!(category = %category, error = "timeout", "Item discovery failed");
    error!(category = %category, "Command failed");
}

#[tokio::test]
async fn test_gateway_logs_through_fallback() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("statistics_gateway=trace"))
        .with_test_writer()
        .try_init();

    let gateway = gateway_with(StubTransport::new(|_| Ok(no_data_body())));
    let request = IndicatorRequest::new("trade", "20240101", "20240331");

    // Every debug and info path of the fallback driver runs with logging enabled
    let series = gateway.fetch_indicator(&request).await.unwrap();
    assert!(series.result.is_empty());
    assert_eq!(series.fallback_steps, 2);
}

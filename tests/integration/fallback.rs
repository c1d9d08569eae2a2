//! Integration tests for publication-lag fallback through the gateway

use chrono::NaiveDate;
use statistics_gateway::fetcher::ecos_config::EcosService;
use statistics_gateway::{ErrorKind, Granularity, IndicatorRequest, RowWindow};

use crate::support::{gateway_with, no_data_body, result_body, segment, series_body, StubTransport};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_monthly_series_walks_back_to_published_month() {
    // Data published through April only
    let transport = StubTransport::new(|request| {
        if segment(request, 3) > "202404" {
            Ok(no_data_body())
        } else {
            Ok(series_body(&[("202401", "54812.3"), ("202404", "56256.1")]))
        }
    });
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("trade", "20240101", "20240630");
    let series = gateway.fetch_indicator(&request).await.unwrap();

    assert_eq!(series.item_key, "EXPORT_USD");
    assert_eq!(series.requested_end, date(2024, 6, 30));
    assert_eq!(series.effective_end, date(2024, 4, 30));
    assert_eq!(series.fallback_steps, 2);
    assert_eq!(series.result.len(), 2);

    let ends: Vec<String> = transport
        .requests_for(EcosService::StatisticSearch)
        .iter()
        .map(|r| segment(r, 3).to_string())
        .collect();
    assert_eq!(ends, vec!["202406", "202405", "202404"]);

    // Each attempt sizes its own row window from the span
    let first = &transport.requests_for(EcosService::StatisticSearch)[0];
    assert_eq!(first.rows, RowWindow::new(1, 6));
}

#[tokio::test]
async fn test_quarterly_series_steps_three_months() {
    let transport = StubTransport::new(|request| {
        if segment(request, 3) > "2023Q4" {
            Ok(no_data_body())
        } else {
            Ok(series_body(&[("2023Q3", "571234.5"), ("2023Q4", "580112.0")]))
        }
    });
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("gdp", "20230101", "20240630")
        .granularity(Granularity::Quarterly);
    let series = gateway.fetch_indicator(&request).await.unwrap();

    assert_eq!(series.granularity, Granularity::Quarterly);
    assert_eq!(series.fallback_steps, 2);
    assert_eq!(series.effective_end, date(2023, 12, 30));
    assert_eq!(transport.count(EcosService::StatisticSearch), 3);
}

#[tokio::test]
async fn test_retry_budget_exhaustion_returns_empty() {
    let transport = StubTransport::new(|_| Ok(no_data_body()));
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("trade", "20240101", "20241231");
    let series = gateway.fetch_indicator(&request).await.unwrap();

    assert!(series.result.is_empty());
    assert_eq!(series.fallback_steps, 6);
    assert_eq!(series.effective_end, date(2024, 6, 30));
    assert_eq!(transport.count(EcosService::StatisticSearch), 7);
}

#[tokio::test]
async fn test_window_exhaustion_stops_early() {
    let transport = StubTransport::new(|_| Ok(no_data_body()));
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("trade", "20240301", "20240531");
    let series = gateway.fetch_indicator(&request).await.unwrap();

    assert!(series.result.is_empty());
    assert_eq!(series.fallback_steps, 2);
    assert_eq!(series.effective_end, date(2024, 3, 30));
    assert_eq!(transport.count(EcosService::StatisticSearch), 3);
}

#[tokio::test]
async fn test_hard_error_is_not_retried() {
    let transport = StubTransport::new(|_| Ok(result_body("ERROR-500", "server error")));
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("trade", "20240101", "20240630");
    let err = gateway.fetch_indicator(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamLogic);
    assert_eq!(transport.count(EcosService::StatisticSearch), 1);
}

#[tokio::test]
async fn test_non_lagged_series_is_fetched_once() {
    let transport = StubTransport::new(|_| Ok(no_data_body()));
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("exchange", "20240101", "20240105");
    let series = gateway.fetch_indicator(&request).await.unwrap();

    assert!(series.result.is_empty());
    assert_eq!(series.fallback_steps, 0);
    assert_eq!(series.effective_end, date(2024, 1, 5));
    assert_eq!(transport.count(EcosService::StatisticSearch), 1);
}

//! Integration tests for the cache- and rate-limit-aware series fetcher

use chrono::NaiveDate;
use statistics_gateway::cache::ResponseCache;
use statistics_gateway::fetcher::ecos_config::EcosService;
use statistics_gateway::fetcher::series::{FetchPolicy, SeriesFetcher};
use statistics_gateway::fetcher::{FetcherError, SeriesSource};
use statistics_gateway::gateway::{RateLimitConfig, RateLimiter};
use statistics_gateway::{Granularity, RowWindow, SeriesQuery};
use std::sync::Arc;
use std::time::Duration;

use crate::support::{
    item_list_body, no_data_body, result_body, segment, series_body, StubTransport,
};

fn fetcher(transport: Arc<StubTransport>) -> SeriesFetcher {
    let limiter = RateLimiter::new(RateLimitConfig {
        min_interval: Duration::ZERO,
        ..RateLimitConfig::default()
    });
    SeriesFetcher::new(
        transport,
        Arc::new(ResponseCache::new()),
        Arc::new(limiter),
        FetchPolicy::default(),
    )
}

fn trade_query() -> SeriesQuery {
    SeriesQuery::new(
        "301Y013",
        "110000",
        Granularity::Monthly,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
    )
}

#[tokio::test]
async fn test_request_shape() {
    let transport = StubTransport::new(|_| Ok(series_body(&[("202401", "54812.3")])));
    let fetcher = fetcher(transport.clone());

    fetcher.fetch_series(&trade_query()).await.unwrap();

    let requests = transport.requests_for(EcosService::StatisticSearch);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].rows, RowWindow::new(1, 6));
    assert_eq!(segment(&requests[0], 0), "301Y013");
    assert_eq!(segment(&requests[0], 1), "M");
    assert_eq!(segment(&requests[0], 2), "202401");
    assert_eq!(segment(&requests[0], 3), "202406");
    assert_eq!(segment(&requests[0], 4), "110000");
}

#[tokio::test]
async fn test_cache_hit_skips_transport() {
    let transport = StubTransport::new(|_| Ok(series_body(&[("202401", "54812.3")])));
    let fetcher = fetcher(transport.clone());

    let first = fetcher.fetch_series(&trade_query()).await.unwrap();
    let second = fetcher.fetch_series(&trade_query()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(fetcher.cache().stats().active, 1);
}

#[tokio::test]
async fn test_different_row_window_is_a_different_entry() {
    let transport = StubTransport::new(|_| Ok(series_body(&[("202401", "54812.3")])));
    let fetcher = fetcher(transport.clone());

    fetcher.fetch_series(&trade_query()).await.unwrap();
    fetcher
        .fetch_series(&trade_query().with_rows(RowWindow::new(1, 3)))
        .await
        .unwrap();

    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_no_data_is_empty_and_not_cached() {
    let transport = StubTransport::new(|_| Ok(no_data_body()));
    let fetcher = fetcher(transport.clone());

    assert!(fetcher.fetch_series(&trade_query()).await.unwrap().is_empty());
    assert!(fetcher.fetch_series(&trade_query()).await.unwrap().is_empty());

    assert_eq!(transport.requests().len(), 2);
    assert_eq!(fetcher.cache().stats().total, 0);
}

#[tokio::test]
async fn test_upstream_error_is_not_cached() {
    let transport = StubTransport::new(|_| Ok(result_body("ERROR-100", "invalid key")));
    let fetcher = fetcher(transport.clone());

    for _ in 0..2 {
        let err = fetcher.fetch_series(&trade_query()).await.unwrap_err();
        assert!(matches!(err, FetcherError::Upstream { ref code, .. } if code == "ERROR-100"));
    }
    assert_eq!(transport.requests().len(), 2);
    assert_eq!(fetcher.cache().stats().total, 0);
}

#[tokio::test]
async fn test_transport_error_propagates() {
    let transport = StubTransport::new(|_| Err(FetcherError::decode("truncated body")));
    let fetcher = fetcher(transport.clone());

    let err = fetcher.fetch_series(&trade_query()).await.unwrap_err();
    assert!(matches!(err, FetcherError::Transport { .. }));
}

#[tokio::test]
async fn test_invalid_query_never_reaches_transport() {
    let transport = StubTransport::new(|_| Ok(series_body(&[])));
    let fetcher = fetcher(transport.clone());

    let too_long = SeriesQuery::new(
        "731Y001",
        "0000001",
        Granularity::Daily,
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    );
    let err = fetcher.fetch_series(&too_long).await.unwrap_err();
    assert!(matches!(err, FetcherError::Validation(_)));

    let blank = SeriesQuery {
        item_code: " ".to_string(),
        ..trade_query()
    };
    assert!(fetcher.fetch_series(&blank).await.is_err());

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_item_listing_cached() {
    let transport = StubTransport::new(|_| Ok(item_list_body(&[("00", "All items", "M")])));
    let fetcher = fetcher(transport.clone());

    let first = fetcher.list_items("901Y010").await.unwrap();
    let second = fetcher.list_items("901Y010").await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(transport.count(EcosService::StatisticItemList), 1);
}

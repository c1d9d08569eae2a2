//! Integration tests for catalogue discovery and item resolution

use statistics_gateway::fetcher::ecos_config::EcosService;
use statistics_gateway::fetcher::FetcherError;
use statistics_gateway::{ErrorKind, Granularity, IndicatorRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::support::{
    gateway_with, item_list_body, no_data_body, segment, series_body, StubTransport,
};

fn cpi_listing() -> serde_json::Value {
    item_list_body(&[
        ("00", "All items", "M"),
        ("00", "All items", "Q"),
        ("10", "Fresh food", "M"),
        ("212", "Industrial goods", "M"),
    ])
}

fn cpi_transport() -> Arc<StubTransport> {
    StubTransport::new(|request| match request.service {
        EcosService::StatisticItemList => Ok(cpi_listing()),
        _ => Ok(series_body(&[("202401", "113.15"), ("202402", "113.77")])),
    })
}

#[tokio::test]
async fn test_discovery_runs_once_per_series() {
    let transport = cpi_transport();
    let gateway = gateway_with(transport.clone());
    let request = IndicatorRequest::new("inflation", "20240101", "20240229");

    let first = gateway.fetch_indicator(&request).await.unwrap();
    let second = gateway.fetch_indicator(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.item_key, "CPI_TOTAL");
    assert_eq!(first.item_code, "00");
    assert_eq!(first.item_name, "All items");
    assert_eq!(transport.count(EcosService::StatisticItemList), 1);
    assert!(gateway.catalogue().is_discovered("901Y010"));
}

#[tokio::test]
async fn test_alias_resolves_to_discovered_code() {
    let transport = cpi_transport();
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("inflation", "20240101", "20240229").item("CPI_FRESH");
    let series = gateway.fetch_indicator(&request).await.unwrap();

    assert_eq!(series.item_code, "10");
    assert_eq!(series.item_name, "Fresh food");
    let search = transport.requests_for(EcosService::StatisticSearch);
    assert_eq!(segment(&search[0], 4), "10");
}

#[tokio::test]
async fn test_unknown_item_lists_alternatives() {
    let gateway = gateway_with(cpi_transport());

    let request = IndicatorRequest::new("inflation", "20240101", "20240229").item("NOPE");
    let err = gateway.fetch_indicator(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownItem);
    assert!(err.to_string().contains("NOPE"));
}

#[tokio::test]
async fn test_describe_filters_by_granularity() {
    let gateway = gateway_with(cpi_transport());

    let quarterly = gateway
        .describe_category("inflation", Some(Granularity::Quarterly))
        .await
        .unwrap();
    assert!(!quarterly.relaxed);
    assert_eq!(quarterly.items.len(), 1);
    assert!(quarterly.items.contains_key("00"));

    let annual = gateway
        .describe_category("inflation", Some(Granularity::Annual))
        .await
        .unwrap();
    assert!(annual.relaxed);
    assert_eq!(annual.items.len(), 3);
    assert_eq!(annual.aliases.get("CPI_TOTAL").map(String::as_str), Some("00"));
}

#[tokio::test]
async fn test_dynamic_category_defaults_to_first_item() {
    let transport = StubTransport::new(|request| match request.service {
        EcosService::StatisticItemList => Ok(item_list_body(&[
            ("USA", "United States", "M"),
            ("JPN", "Japan", "M"),
        ])),
        _ => Ok(series_body(&[("202401", "5.5")])),
    });
    let gateway = gateway_with(transport);

    let request = IndicatorRequest::new("interest-international", "20240101", "20240131");
    let series = gateway.fetch_indicator(&request).await.unwrap();
    assert_eq!(series.item_key, "JPN");
    assert_eq!(series.series_code, "902Y006");
}

#[tokio::test]
async fn test_alternate_series_discovered_separately() {
    let transport = cpi_transport();
    let gateway = gateway_with(transport.clone());

    let base = IndicatorRequest::new("inflation", "20240101", "20240229");
    gateway.fetch_indicator(&base).await.unwrap();
    let series = gateway
        .fetch_indicator(&base.clone().series("404Y014"))
        .await
        .unwrap();

    assert_eq!(series.series_code, "404Y014");
    let listings = transport.requests_for(EcosService::StatisticItemList);
    assert_eq!(listings.len(), 2);
    assert_eq!(segment(&listings[1], 0), "404Y014");
}

#[tokio::test]
async fn test_series_outside_category_rejected() {
    let transport = cpi_transport();
    let gateway = gateway_with(transport.clone());

    let request = IndicatorRequest::new("inflation", "20240101", "20240229").series("731Y001");
    let err = gateway.fetch_indicator(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownItem);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_failed_discovery_is_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let transport = StubTransport::new(move |request| match request.service {
        EcosService::StatisticItemList => {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FetcherError::decode("connection reset"))
            } else {
                Ok(cpi_listing())
            }
        }
        _ => Ok(series_body(&[("202401", "113.15")])),
    });
    let gateway = gateway_with(transport.clone());
    let request = IndicatorRequest::new("inflation", "20240101", "20240131");

    let err = gateway.fetch_indicator(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamTransport);
    assert!(!gateway.catalogue().is_discovered("901Y010"));

    let series = gateway.fetch_indicator(&request).await.unwrap();
    assert_eq!(series.item_code, "00");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_listing_is_rediscovered() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let transport = StubTransport::new(move |request| match request.service {
        EcosService::StatisticItemList => {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(no_data_body())
            } else {
                Ok(item_list_body(&[("00", "All items", "M")]))
            }
        }
        _ => Ok(series_body(&[("202401", "113.15")])),
    });
    let gateway = gateway_with(transport.clone());
    let request = IndicatorRequest::new("inflation", "20240101", "20240131");

    let err = gateway.fetch_indicator(&request).await.unwrap_err();
    assert!(err.to_string().contains("no items"));
    assert!(!gateway.catalogue().is_discovered("901Y010"));

    let series = gateway.fetch_indicator(&request).await.unwrap();
    assert_eq!(series.item_code, "00");
    assert_eq!(transport.count(EcosService::StatisticItemList), 2);
}

#[tokio::test]
async fn test_concurrent_discovery_keeps_table_consistent() {
    let transport = cpi_transport();
    let gateway = gateway_with(transport.clone());
    let request = IndicatorRequest::new("inflation", "20240101", "20240229");

    let (first, second) = tokio::join!(
        gateway.fetch_indicator(&request),
        gateway.fetch_indicator(&request)
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.item_code, "00");
    assert_eq!(second.item_code, "00");

    let listings = transport.count(EcosService::StatisticItemList);
    assert!((1..=2).contains(&listings), "listed {listings} times");

    let catalogue = gateway.catalogue();
    let inflation = catalogue.category("inflation").unwrap();
    let merged = catalogue.merged_items(inflation, "901Y010");
    let codes: Vec<&str> = merged.values().map(|item| item.code.as_str()).collect();
    assert_eq!(codes, vec!["00", "10", "212"]);
    assert_eq!(
        merged["00"].granularities,
        vec![Granularity::Monthly, Granularity::Quarterly]
    );
    assert_eq!(merged["10"].granularities, vec![Granularity::Monthly]);
}

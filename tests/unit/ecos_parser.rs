//! Unit tests for ECOS envelope parsing

use serde_json::json;
use statistics_gateway::fetcher::ecos_config::EcosService;
use statistics_gateway::fetcher::ecos_parser::EcosParser;
use statistics_gateway::fetcher::{FetcherError, TransportErrorKind};
use statistics_gateway::Granularity;

use crate::support::{item_list_body, no_data_body, result_body, series_body, table_list_body};

#[test]
fn test_parse_series_rows() {
    let body = series_body(&[("202401", "1325.7"), ("202402", "1331.2")]);
    let result = EcosParser::parse_series(&body).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.total_count, 2);
    assert_eq!(result.points[0].period, "202401");
    assert_eq!(result.points[0].value.as_deref(), Some("1325.7"));
    assert_eq!(result.points[1].item_name.as_deref(), Some("Test item"));
    assert_eq!(result.points[1].unit.as_deref(), Some("unit"));
}

#[test]
fn test_no_data_code() {
    let err = EcosParser::parse_series(&no_data_body()).unwrap_err();
    assert!(err.is_no_data());
}

#[test]
fn test_nested_result_code() {
    let body = json!({
        "StatisticSearch": {
            "RESULT": { "CODE": "INFO-200", "MESSAGE": "no data" }
        }
    });
    assert!(matches!(
        EcosParser::check_result(&body, EcosService::StatisticSearch),
        Err(FetcherError::NoDataForPeriod { .. })
    ));
}

#[test]
fn test_upstream_error_code() {
    let err = EcosParser::parse_series(&result_body("ERROR-100", "인증키가 유효하지 않습니다."))
        .unwrap_err();
    match err {
        FetcherError::Upstream { code, .. } => assert_eq!(code, "ERROR-100"),
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[test]
fn test_success_code_alone_is_not_an_error() {
    let body = result_body("INFO-000", "정상처리되었습니다.");
    assert!(EcosParser::check_result(&body, EcosService::StatisticSearch).is_ok());
}

#[test]
fn test_non_object_body_is_decode_error() {
    let err = EcosParser::parse_series(&json!(["not", "an", "envelope"])).unwrap_err();
    assert!(matches!(
        err,
        FetcherError::Transport {
            kind: TransportErrorKind::Decode,
            ..
        }
    ));
}

#[test]
fn test_missing_payload_is_decode_error() {
    let err = EcosParser::parse_series(&json!({ "Other": {} })).unwrap_err();
    assert!(matches!(err, FetcherError::Transport { .. }));
}

#[test]
fn test_item_list_cycles() {
    let body = item_list_body(&[
        ("00", "All items", "M"),
        ("00", "All items", "Q"),
        ("10", "Fresh food", "X"),
    ]);
    let items = EcosParser::parse_item_list(&body).unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].granularity, Some(Granularity::Monthly));
    assert_eq!(items[1].granularity, Some(Granularity::Quarterly));
    assert_eq!(items[2].granularity, None);
}

#[test]
fn test_item_list_no_data_is_empty() {
    assert!(EcosParser::parse_item_list(&no_data_body()).unwrap().is_empty());
}

#[test]
fn test_table_list() {
    let body = table_list_body(&[("731Y001", "Exchange rates", "D"), ("901Y010", "CPI", "M")]);
    let tables = EcosParser::parse_table_list(&body).unwrap();

    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].series_code, "731Y001");
    assert_eq!(tables[1].granularity, Some(Granularity::Monthly));
    assert_eq!(tables[1].organisation.as_deref(), Some("Bank of Korea"));
}

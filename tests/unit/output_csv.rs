//! Unit tests for the CSV series writer

use statistics_gateway::output::csv::CsvSeriesWriter;
use statistics_gateway::output::{OutputWriter, SeriesWriter};
use statistics_gateway::SeriesPoint;
use tempfile::TempDir;

#[test]
fn test_create_writes_file_in_new_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("trade.csv");

    let mut writer = CsvSeriesWriter::create(&path).unwrap();
    writer
        .write_points(&[
            SeriesPoint::new("202401", "54812.3"),
            SeriesPoint::new("202402", "52129.9"),
        ])
        .unwrap();
    assert_eq!(writer.points_written(), 2);
    writer.close().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "period,value,item_name,unit");
    assert_eq!(lines[1], "202401,54812.3,,");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_value_with_comma_is_quoted() {
    let mut writer = CsvSeriesWriter::from_writer(Vec::new());
    let mut point = SeriesPoint::new("2024", "1,234");
    point.item_name = Some("GDP, nominal".to_string());
    writer.write_point(&point).unwrap();

    let bytes = writer.into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("2024,\"1,234\",\"GDP, nominal\","));
}

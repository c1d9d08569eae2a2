//! CSV series writer

use crate::SeriesPoint;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, SeriesWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Rows between periodic flushes
const FLUSH_EVERY: u64 = 1000;

/// CSV record for one observation
#[derive(Debug, Serialize)]
struct PointRecord<'a> {
    period: &'a str,
    value: &'a str,
    item_name: &'a str,
    unit: &'a str,
}

impl<'a> From<&'a SeriesPoint> for PointRecord<'a> {
    fn from(point: &'a SeriesPoint) -> Self {
        Self {
            period: &point.period,
            value: point.value.as_deref().unwrap_or_default(),
            item_name: point.item_name.as_deref().unwrap_or_default(),
            unit: point.unit.as_deref().unwrap_or_default(),
        }
    }
}

/// CSV writer emitting `period,value,item_name,unit` rows
pub struct CsvSeriesWriter<W: Write> {
    writer: Writer<W>,
    points_written: u64,
}

impl CsvSeriesWriter<BufWriter<File>> {
    /// Create a writer for a file, creating parent directories as needed
    ///
    /// # Arguments
    /// * `path` - Output file path
    pub fn create<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        Ok(Self::from_writer(BufWriter::with_capacity(
            DEFAULT_BUFFER_SIZE,
            file,
        )))
    }
}

impl<W: Write> CsvSeriesWriter<W> {
    /// Wrap any writer; the header is written with the first row
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: Writer::from_writer(inner),
            points_written: 0,
        }
    }

    /// Number of rows written so far
    pub fn points_written(&self) -> u64 {
        self.points_written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> OutputResult<W> {
        self.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))
    }
}

impl<W: Write> SeriesWriter for CsvSeriesWriter<W> {
    fn write_point(&mut self, point: &SeriesPoint) -> OutputResult<()> {
        self.writer
            .serialize(PointRecord::from(point))
            .map_err(|e| OutputError::CsvError(format!("Failed to write point: {e}")))?;

        self.points_written += 1;

        if self.points_written % FLUSH_EVERY == 0 {
            self.flush()?;
            debug!("Progress: {} points written", self.points_written);
        }

        Ok(())
    }
}

impl<W: Write> OutputWriter for CsvSeriesWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(self) -> OutputResult<()> {
        let written = self.points_written;
        let mut inner = self.into_inner()?;
        inner
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
        info!("CSV writer closed: {} points written", written);
        Ok(())
    }
}

//! Series output writers

use crate::SeriesPoint;

pub mod csv;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer
pub trait OutputWriter {
    /// Flush any buffered data
    fn flush(&mut self) -> OutputResult<()>;

    /// Flush and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Writer for series observations
pub trait SeriesWriter: OutputWriter {
    /// Write one observation
    fn write_point(&mut self, point: &SeriesPoint) -> OutputResult<()>;

    /// Write several observations in order
    fn write_points(&mut self, points: &[SeriesPoint]) -> OutputResult<()> {
        for point in points {
            self.write_point(point)?;
        }
        Ok(())
    }
}

//! Destinations of evaluation metrics.
mod buffered_logger;
mod null_logger;

use crate::{metadata::EvalMetadata, record::Record};
use anyhow::Result;
pub use buffered_logger::BufferedMetricsLogger;
pub use null_logger::NullMetricsLogger;

/// Writes records to a metrics dashboard with [`MetricsLogger::write`].
pub trait MetricsLogger {
    /// Write a record at the given step.
    ///
    /// Episode records are written with the episode index as the step and
    /// carry a `num_episode` scalar. Step statistics are written with the
    /// total number of control steps as the step.
    fn write(&mut self, record: Record, step: i64) -> Result<()>;

    /// Logs the metadata of the evaluation session.
    ///
    /// Loggers which have no place for metadata keep the default no-op.
    #[allow(unused_variables)]
    fn log_metadata(&mut self, metadata: &EvalMetadata) -> Result<()> {
        Ok(())
    }

    /// Flushes buffered values, if any.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

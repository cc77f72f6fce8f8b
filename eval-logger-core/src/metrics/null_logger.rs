use super::MetricsLogger;
use crate::record::Record;
use anyhow::Result;

/// A logger that ignores any record. Used when no dashboard is configured.
#[derive(Debug, Default)]
pub struct NullMetricsLogger {}

impl MetricsLogger for NullMetricsLogger {
    /// Discard the given record.
    fn write(&mut self, _record: Record, _step: i64) -> Result<()> {
        Ok(())
    }
}

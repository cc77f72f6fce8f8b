use super::MetricsLogger;
use crate::{metadata::EvalMetadata, record::Record};
use anyhow::Result;
use std::{cell::RefCell, rc::Rc};

#[derive(Default)]
struct Buffer {
    records: Vec<(i64, Record)>,
    metadata: Vec<EvalMetadata>,
}

/// Buffered metrics logger.
///
/// Keeps every written record in memory. Clones share the same buffer, so a
/// clone can be handed to [`EvalLogger`](crate::EvalLogger) while the other
/// one is used to inspect what was logged.
#[derive(Clone, Default)]
pub struct BufferedMetricsLogger {
    buf: Rc<RefCell<Buffer>>,
}

impl BufferedMetricsLogger {
    /// Construct the logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records written so far with their steps.
    pub fn records(&self) -> Vec<(i64, Record)> {
        self.buf.borrow().records.clone()
    }

    /// Returns the metadata logged so far.
    pub fn metadata(&self) -> Vec<EvalMetadata> {
        self.buf.borrow().metadata.clone()
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.buf.borrow().records.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricsLogger for BufferedMetricsLogger {
    fn write(&mut self, record: Record, step: i64) -> Result<()> {
        self.buf.borrow_mut().records.push((step, record));
        Ok(())
    }

    fn log_metadata(&mut self, metadata: &EvalMetadata) -> Result<()> {
        self.buf.borrow_mut().metadata.push(metadata.clone());
        Ok(())
    }
}

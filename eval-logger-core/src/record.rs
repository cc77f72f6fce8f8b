//! Types for the records handed to metrics loggers.
//!
//! * [`Record`] - A container for storing key-value pairs of various data types
//! * [`RecordValue`] - An enum representing the types of values that can be stored
//!
//! # Basic Usage
//!
//! ```rust
//! use eval_logger_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("num_episode", RecordValue::Scalar(3.0));
//! record.insert("pick up cup/episode_success", RecordValue::Scalar(1.0));
//! ```
mod base;

pub use base::{Record, RecordValue};

//! The evaluation logger and its configuration.
mod base;
mod config;
mod dispatch;
mod step_stats;

pub use base::{EvalLogger, NUM_EPISODE};
pub use config::EvalLoggerConfig;
pub use dispatch::{Collaborator, CollaboratorFailure, DispatchError};
pub use step_stats::{EVAL_STEPS_PER_MINUTE, TOTAL_EVAL_STEPS, TOTAL_TIME_ELAPSED};

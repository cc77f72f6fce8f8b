//! A metrics logger for the eval-logger-core crate.
//!
//! This crate is based on [MLflow](https://mlflow.org) tracking.
//!
//! Before running the program using this crate, run a tracking server with the following command:
//!
//! ```bash
//! mlflow server --host 127.0.0.1 --port 8080
//! ```
//!
//! Then, the configuration of an evaluation and its metrics can be logged to the tracking server.
//! Nested configuration parameters will be flattened, logged like `policy.checkpoint`.
//!
//! ```no_run
//! use anyhow::Result;
//! use eval_logger_core::{EpisodeRecord, EvalLogger, EvalLoggerConfig};
//! use eval_logger_mlflow_tracking::{MlflowLoggerConfig, MlflowTrackingClient};
//! use image::RgbImage;
//! use serde::Serialize;
//!
//! #[derive(Debug, Serialize)]
//! struct Variant {
//!     policy: Policy,
//!     max_steps: usize,
//! }
//!
//! #[derive(Debug, Serialize)]
//! struct Policy {
//!     checkpoint: String,
//!     temperature: f32,
//! }
//!
//! fn main() -> Result<()> {
//!     env_logger::init();
//!
//!     let variant = Variant {
//!         policy: Policy {
//!             checkpoint: "octo-small".to_string(),
//!             temperature: 1.0,
//!         },
//!         max_steps: 120,
//!     };
//!
//!     // Creates a run named like `widowx_20240309_080706`
//!     let config = MlflowLoggerConfig::default().exp_descriptor("widowx");
//!     let metrics = MlflowTrackingClient::build_logger(&config, &variant)?;
//!
//!     let mut logger = EvalLogger::new(&EvalLoggerConfig::default()).with_metrics_logger(metrics);
//!     for i in 0..10 {
//!         let frames = vec![RgbImage::new(64, 64); 20];
//!         logger.log_episode(EpisodeRecord::new(i, "pick up cup", i % 2 == 0, frames))?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Images and videos
//!
//! MLflow's REST API has no endpoint for uploading artifacts. [`MlflowMetricsLogger`] writes
//! images and videos directly into the artifact directory of the run, which works when the
//! tracking server runs on the same host. The directory is located with the
//! `MLFLOW_DEFAULT_ARTIFACT_ROOT` environment variable for runs whose artifact URI has the
//! `mlflow-artifacts:/` scheme, or taken from `file://` artifact URIs as they are.
mod client;
mod config;
mod experiment;
mod logger;
mod run;
pub use client::MlflowTrackingClient;
pub use config::MlflowLoggerConfig;
use experiment::Experiment;
pub use logger::MlflowMetricsLogger;
pub use run::{Run, RunInfo};
use std::path::PathBuf;

/// Get the directory to which artifacts of `run` will be saved, if it is on this host.
pub fn get_artifact_base(run: &Run) -> Option<PathBuf> {
    let artifact_uri = run.info.artifact_uri.as_ref()?;
    if let Some(path) = artifact_uri.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    let path = artifact_uri.strip_prefix("mlflow-artifacts:/")?;
    let root: PathBuf = std::env::var("MLFLOW_DEFAULT_ARTIFACT_ROOT").ok()?.into();
    Some(root.join(path.trim_start_matches('/')))
}

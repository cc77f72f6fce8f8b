//! Logging of robot policy evaluations.
//!
//! This crate collects the crates of the workspace:
//!
//! * [eval-logger-core](eval_logger_core) provides [`EvalLogger`], the traits of its
//!   collaborators, the frame visualizer and the local storage.
//! * [eval-logger-mlflow-tracking](eval_logger_mlflow_tracking) logs metrics to an
//!   [MLflow](https://mlflow.org) tracking server.
//! * [eval-logger-tensorboard](eval_logger_tensorboard) writes metrics to TensorBoard
//!   event files.
//! * [eval-logger-hf-hub](eval_logger_hf_hub) uploads the saved data to a dataset
//!   repository on the Hugging Face Hub.
//!
//! [`EvalLoggerSetup`] builds an [`EvalLogger`] from a single YAML file.
//! See `examples/dummy_eval.rs` for an evaluation loop using it.
mod setup;
pub use eval_logger_core::{
    error::EvalLoggerError, record, sampling, Collaborator, DataSaver, DispatchError,
    EpisodeRecord, EvalId, EvalLogger, EvalLoggerConfig, EvalMetadata, ExtraValue, Extras,
    FilmstripVisualizer, Frame, FrameVisualizer, FrameVisualizerConfig, LocalStorage,
    LocalStorageConfig, MetricsLogger, RobotType,
};
pub use eval_logger_hf_hub::{HfHubConfig, HfHubError, HuggingFaceStorage};
pub use eval_logger_mlflow_tracking::{MlflowLoggerConfig, MlflowMetricsLogger, MlflowTrackingClient};
pub use eval_logger_tensorboard::{TensorboardConfig, TensorboardMetricsLogger};
pub use setup::{EvalLoggerSetup, MetricsSetup, StorageSetup};

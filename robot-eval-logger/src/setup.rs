//! Building an [`EvalLogger`] from a YAML file.
use anyhow::Result;
use eval_logger_core::{
    EvalLogger, EvalLoggerConfig, FilmstripVisualizer, FrameVisualizerConfig, LocalStorage,
    LocalStorageConfig,
};
use eval_logger_hf_hub::{HfHubConfig, HuggingFaceStorage};
use eval_logger_mlflow_tracking::{MlflowLoggerConfig, MlflowTrackingClient};
use eval_logger_tensorboard::{TensorboardConfig, TensorboardMetricsLogger};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Where metrics go.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSetup {
    /// An MLflow tracking server.
    Mlflow(MlflowLoggerConfig),

    /// TensorBoard event files.
    Tensorboard(TensorboardConfig),
}

/// Where evaluation data is saved.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum StorageSetup {
    /// The local disk.
    Local(LocalStorageConfig),

    /// The local disk and a dataset repository on the Hugging Face Hub.
    HuggingFace(HfHubConfig),
}

/// Collaborators of an [`EvalLogger`] and their configurations.
///
/// Every section is optional; missing ones leave the role unconfigured.
///
/// ```yaml
/// metrics:
///   tensorboard:
///     logdir: /tmp/eval_logs
/// visualizer:
///   episode_viz_frame_interval: 3
///   success_viz_every_n: 3
/// storage:
///   local:
///     storage_dir: /tmp/eval_data
/// log_step_stats_interval_minutes: 1.0
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct EvalLoggerSetup {
    /// Metrics logger.
    #[serde(default)]
    pub metrics: Option<MetricsSetup>,

    /// Frame visualizer.
    #[serde(default)]
    pub visualizer: Option<FrameVisualizerConfig>,

    /// Data saver.
    #[serde(default)]
    pub storage: Option<StorageSetup>,

    /// Interval of step statistics in minutes.
    #[serde(default)]
    pub log_step_stats_interval_minutes: Option<f64>,
}

impl EvalLoggerSetup {
    /// Sets the metrics logger.
    pub fn metrics(mut self, v: MetricsSetup) -> Self {
        self.metrics = Some(v);
        self
    }

    /// Sets the frame visualizer.
    pub fn visualizer(mut self, v: FrameVisualizerConfig) -> Self {
        self.visualizer = Some(v);
        self
    }

    /// Sets the data saver.
    pub fn storage(mut self, v: StorageSetup) -> Self {
        self.storage = Some(v);
        self
    }

    /// Sets the interval of step statistics in minutes.
    pub fn log_step_stats_interval_minutes(mut self, v: f64) -> Self {
        self.log_step_stats_interval_minutes = Some(v);
        self
    }

    /// Builds the logger.
    ///
    /// `variant` describes the evaluation, like the policy and its options.
    /// It is logged as the parameters of an MLflow run and ignored otherwise.
    pub fn build(&self, variant: impl Serialize) -> Result<EvalLogger> {
        let config = EvalLoggerConfig {
            log_step_stats_interval_minutes: self.log_step_stats_interval_minutes,
        };
        let mut logger = EvalLogger::new(&config);

        match &self.metrics {
            Some(MetricsSetup::Mlflow(config)) => {
                info!("Metrics logged to MLflow at {}", config.tracking_uri);
                let metrics = MlflowTrackingClient::build_logger(config, variant)?;
                logger = logger.with_metrics_logger(metrics);
            }
            Some(MetricsSetup::Tensorboard(config)) => {
                logger = logger.with_metrics_logger(TensorboardMetricsLogger::build(config));
            }
            None => {}
        }

        if let Some(config) = &self.visualizer {
            logger = logger.with_visualizer(FilmstripVisualizer::build(config.clone())?);
        }

        match &self.storage {
            Some(StorageSetup::Local(config)) => {
                logger = logger.with_data_saver(LocalStorage::build(config));
            }
            Some(StorageSetup::HuggingFace(config)) => {
                logger = logger.with_data_saver(HuggingFaceStorage::build(config.clone())?);
            }
            None => {}
        }

        Ok(logger)
    }

    /// Constructs [`EvalLoggerSetup`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EvalLoggerSetup`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_logger_core::EpisodeRecord;
    use image::RgbImage;
    use tempdir::TempDir;

    #[test]
    fn test_build_from_yaml() -> Result<()> {
        let dir = TempDir::new("setup")?;
        let yaml = format!(
            "metrics:\n  tensorboard:\n    logdir: {logs}\nvisualizer:\n  success_viz_every_n: 2\nstorage:\n  local:\n    storage_dir: {data}\n",
            logs = dir.path().join("logs").display(),
            data = dir.path().join("data").display(),
        );
        let setup: EvalLoggerSetup = serde_yaml::from_str(&yaml)?;
        assert!(matches!(setup.metrics, Some(MetricsSetup::Tensorboard(_))));
        assert_eq!(setup.visualizer.as_ref().map(|c| c.success_viz_every_n), Some(2));

        let mut logger = setup.build(())?;
        let record = logger.log_episode(EpisodeRecord::new(
            0,
            "pick up cup",
            true,
            vec![RgbImage::new(32, 32); 12],
        ))?;
        assert!(record.contains_key("pick up cup/frames"));
        drop(logger);

        assert_eq!(std::fs::read_dir(dir.path().join("data"))?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new("setup")?;
        let path = dir.path().join("setup.yaml");
        let setup = EvalLoggerSetup::default()
            .metrics(MetricsSetup::Mlflow(
                MlflowLoggerConfig::default().exp_descriptor("widowx"),
            ))
            .storage(StorageSetup::HuggingFace(HfHubConfig::new(
                "/tmp/eval",
                "lab/eval_logger",
            )))
            .log_step_stats_interval_minutes(1.0);
        setup.save(&path)?;
        assert_eq!(EvalLoggerSetup::load(&path)?, setup);
        Ok(())
    }

    #[test]
    fn test_empty_setup_builds_null_logger() -> Result<()> {
        let setup: EvalLoggerSetup = serde_yaml::from_str("{}")?;
        assert_eq!(setup, EvalLoggerSetup::default());
        let mut logger = setup.build(())?;
        logger.log_step()?;
        Ok(())
    }
}

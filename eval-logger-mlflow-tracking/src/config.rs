//! Configuration of [`MlflowMetricsLogger`](crate::MlflowMetricsLogger).
use anyhow::Result;
use chrono::{DateTime, Local};
use eval_logger_core::util::make_unique_identifier;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`MlflowMetricsLogger`](crate::MlflowMetricsLogger).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct MlflowLoggerConfig {
    /// URL of the tracking server.
    pub tracking_uri: String,

    /// Experiment under which the run is created. Created if missing.
    pub experiment_name: String,

    /// Leading part of the run name. Does not need to be unique.
    pub exp_descriptor: String,

    /// Trailing part of the run name. Generated from the current time when empty.
    pub unique_identifier: String,

    /// Appends random digits to a generated identifier.
    pub random_str_in_identifier: bool,

    /// User name for basic authentication.
    pub user_name: String,

    /// Password for basic authentication.
    pub password: String,
}

impl Default for MlflowLoggerConfig {
    fn default() -> Self {
        Self {
            tracking_uri: "http://localhost:8080".to_string(),
            experiment_name: "eval_logger".to_string(),
            exp_descriptor: "".to_string(),
            unique_identifier: "".to_string(),
            random_str_in_identifier: false,
            user_name: "".to_string(),
            password: "".to_string(),
        }
    }
}

impl MlflowLoggerConfig {
    /// Sets the URL of the tracking server.
    pub fn tracking_uri(mut self, v: impl Into<String>) -> Self {
        self.tracking_uri = v.into();
        self
    }

    /// Sets the experiment name.
    pub fn experiment_name(mut self, v: impl Into<String>) -> Self {
        self.experiment_name = v.into();
        self
    }

    /// Sets the leading part of the run name.
    pub fn exp_descriptor(mut self, v: impl Into<String>) -> Self {
        self.exp_descriptor = v.into();
        self
    }

    /// Sets the trailing part of the run name.
    pub fn unique_identifier(mut self, v: impl Into<String>) -> Self {
        self.unique_identifier = v.into();
        self
    }

    /// Appends random digits to a generated identifier.
    pub fn random_str_in_identifier(mut self, v: bool) -> Self {
        self.random_str_in_identifier = v;
        self
    }

    /// Sets credentials for basic authentication.
    pub fn basic_auth(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self.password = password.into();
        self
    }

    /// Name of a run started at `time`: `{exp_descriptor}_{unique_identifier}`.
    pub fn run_name(&self, time: &DateTime<Local>) -> String {
        let unique_identifier = if self.unique_identifier.is_empty() {
            make_unique_identifier(time, self.random_str_in_identifier)
        } else {
            self.unique_identifier.clone()
        };
        format!("{}_{}", self.exp_descriptor, unique_identifier)
    }

    /// Constructs [`MlflowLoggerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`MlflowLoggerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempdir::TempDir;

    #[test]
    fn test_run_name() {
        let time = Local.with_ymd_and_hms(2024, 3, 9, 8, 7, 6).unwrap();
        let config = MlflowLoggerConfig::default().exp_descriptor("widowx_octo");
        assert_eq!(config.run_name(&time), "widowx_octo_20240309_080706");

        let config = config.unique_identifier("trial3");
        assert_eq!(config.run_name(&time), "widowx_octo_trial3");

        let config = MlflowLoggerConfig::default().random_str_in_identifier(true);
        assert!(config.run_name(&time).starts_with("_20240309_080706_rnd"));
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new("mlflow_config")?;
        let path = dir.path().join("mlflow.yaml");
        let config = MlflowLoggerConfig::default()
            .experiment_name("franka")
            .basic_auth("user", "secret");
        config.save(&path)?;
        assert_eq!(MlflowLoggerConfig::load(&path)?, config);
        Ok(())
    }
}

//! Configuration of [`EvalLogger`](super::EvalLogger).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
    time::Duration,
};

/// Configuration of [`EvalLogger`](super::EvalLogger).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct EvalLoggerConfig {
    /// Interval of step statistics in minutes. `None` disables periodic emission.
    #[serde(default)]
    pub log_step_stats_interval_minutes: Option<f64>,
}

impl EvalLoggerConfig {
    /// Sets the interval of step statistics in minutes.
    pub fn log_step_stats_interval_minutes(mut self, v: f64) -> Self {
        self.log_step_stats_interval_minutes = Some(v);
        self
    }

    pub(crate) fn step_stats_interval(&self) -> Option<Duration> {
        self.log_step_stats_interval_minutes
            .and_then(|m| Duration::try_from_secs_f64(m * 60.0).ok())
    }

    /// Constructs [`EvalLoggerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EvalLoggerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_in_minutes() {
        let config = EvalLoggerConfig::default().log_step_stats_interval_minutes(0.5);
        assert_eq!(config.step_stats_interval(), Some(Duration::from_secs(30)));
        assert_eq!(EvalLoggerConfig::default().step_stats_interval(), None);

        let config = EvalLoggerConfig::default().log_step_stats_interval_minutes(-1.0);
        assert_eq!(config.step_stats_interval(), None);
    }
}

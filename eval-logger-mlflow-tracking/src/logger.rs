use crate::{client::Api, get_artifact_base, Run};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, SecondsFormat};
use eval_logger_core::{
    record::{Record, RecordValue},
    visualize::{encode_gif, encode_png},
    EvalMetadata, MetricsLogger,
};
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Serialize)]
struct LogParamParams<'a> {
    run_id: &'a String,
    key: &'a String,
    value: String,
}

#[derive(Debug, Serialize)]
struct LogMetricParams<'a> {
    run_id: &'a String,
    key: &'a String,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Debug, Serialize)]
struct UpdateRunParams<'a> {
    run_id: &'a String,
    status: String,
    end_time: i64,
    run_name: &'a String,
}

#[derive(Debug, Serialize)]
struct SetTagParams<'a> {
    run_id: &'a String,
    key: &'a String,
    value: &'a String,
}

/// Logs evaluation metrics to a run of the MLflow tracking server.
///
/// [`MlflowMetricsLogger::write()`] logs [`RecordValue::Scalar`] values as metrics
/// at the given step and [`RecordValue::String`] values as tags. Images and videos
/// are saved as PNG and GIF files in the artifact directory of the run, when it
/// can be located on the local file system (see [`get_artifact_base`]);
/// otherwise they are skipped.
///
/// When dropped, this struct updates run's status to "FINISHED"
/// (<https://mlflow.org/docs/latest/rest-api.html#mlflowrunstatus>).
///
/// [`get_artifact_base`]: crate::get_artifact_base
pub struct MlflowMetricsLogger {
    api: Api,
    run_id: String,
    run_name: String,
    start_time: DateTime<Local>,
    artifact_base: Option<PathBuf>,
}

impl MlflowMetricsLogger {
    /// Create a new instance of `MlflowMetricsLogger`.
    ///
    /// This method is used in [`MlflowTrackingClient::create_logger()`].
    /// It adds a tag "host_start_time" with the current time.
    ///
    /// [`MlflowTrackingClient::create_logger()`]: crate::MlflowTrackingClient::create_logger
    pub(crate) fn new(api: Api, run: &Run) -> Result<Self> {
        let start_time = Local::now();
        let artifact_base = get_artifact_base(run);
        match artifact_base.as_ref() {
            Some(path) => debug!("Artifacts of run {} go to {:?}", run.info.run_id, path),
            None => debug!("Artifact directory of run {} is unknown", run.info.run_id),
        }
        let logger = Self {
            api,
            run_id: run.info.run_id.clone(),
            run_name: run.info.run_name.clone(),
            start_time,
            artifact_base,
        };

        // Record current time as tag "host_start_time"
        logger.set_tag(
            "host_start_time",
            start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;

        Ok(logger)
    }

    /// ID of the run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Name of the run.
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Logs `params` as parameters of the run.
    ///
    /// Nested values are flattened, logged like `robot.name`.
    pub fn log_params(&self, params: impl Serialize) -> Result<()> {
        let map = match serde_json::to_value(params)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            v => anyhow::bail!("Parameters must serialize to an object, got {}", v),
        };
        self.log_param_map(&map)
    }

    /// Logs `variant` as parameters, adding the `hostname` of this machine if absent.
    pub fn log_variant(&self, variant: impl Serialize) -> Result<()> {
        let host = hostname::get()?.to_string_lossy().into_owned();
        self.log_param_map(&variant_with_hostname(variant, &host)?)
    }

    fn log_param_map(&self, map: &Map<String, Value>) -> Result<()> {
        for (key, value) in flatten_serde_json::flatten(map).iter() {
            let value = match value {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            };
            self.api.post(
                "runs/log-parameter",
                &LogParamParams {
                    run_id: &self.run_id,
                    key,
                    value,
                },
            )?;
        }
        Ok(())
    }

    /// Sets a tag of the run.
    ///
    /// ```no_run
    /// # use eval_logger_mlflow_tracking::MlflowTrackingClient;
    /// # fn main() -> anyhow::Result<()> {
    /// let client = MlflowTrackingClient::new("http://localhost:8080").set_experiment("widowx")?;
    /// let logger = client.create_logger("eval_run")?;
    /// logger.set_tag("robot", "widowx")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_tag(&self, key: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        self.api.post(
            "runs/set-tag",
            &SetTagParams {
                run_id: &self.run_id,
                key: &key.as_ref().to_string(),
                value: &value.as_ref().to_string(),
            },
        )?;
        Ok(())
    }

    fn log_metric(&self, key: &String, value: f32, timestamp: i64, step: i64) -> Result<()> {
        self.api.post(
            "runs/log-metric",
            &LogMetricParams {
                run_id: &self.run_id,
                key,
                value: value as f64,
                timestamp,
                step,
            },
        )?;
        Ok(())
    }

    fn save_artifact(&self, key: &str, step: i64, ext: &str, bytes: &[u8]) -> Result<()> {
        let base = match self.artifact_base.as_ref() {
            Some(base) => base,
            None => {
                debug!("Skip artifact {}, no artifact directory", key);
                return Ok(());
            }
        };
        let path = artifact_path(base, key, step, ext);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        debug!("Save artifact {:?}", path);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let end_time = Local::now();
        let duration = end_time.signed_duration_since(self.start_time);
        self.set_tag(
            "host_end_time",
            end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        self.set_tag("host_duration", format_duration(&duration))?;

        self.api.post(
            "runs/update",
            &UpdateRunParams {
                run_id: &self.run_id,
                status: "FINISHED".to_string(),
                end_time: end_time.timestamp_millis(),
                run_name: &self.run_name,
            },
        )?;
        Ok(())
    }
}

impl MetricsLogger for MlflowMetricsLogger {
    fn write(&mut self, record: Record, step: i64) -> Result<()> {
        let timestamp = Local::now().timestamp_millis();

        for (key, value) in record.iter() {
            let key = sanitize_key(key);
            match value {
                RecordValue::Scalar(v) => self.log_metric(&key, *v, timestamp, step)?,
                RecordValue::String(s) => self.set_tag(&key, s)?,
                RecordValue::Image(frame) => {
                    self.save_artifact(&key, step, "png", &encode_png(frame)?)?
                }
                RecordValue::Video { frames, fps } => {
                    self.save_artifact(&key, step, "gif", &encode_gif(frames, *fps)?)?
                }
            }
        }
        Ok(())
    }

    fn log_metadata(&mut self, metadata: &EvalMetadata) -> Result<()> {
        let mut map = Map::new();
        map.insert("eval_metadata".to_string(), serde_json::to_value(metadata)?);
        self.log_param_map(&map)
    }
}

impl Drop for MlflowMetricsLogger {
    /// Update run's status to "FINISHED" when dropped.
    ///
    /// It also adds tags "host_end_time" and "host_duration" with the current time and duration.
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to finish run {}: {:#}", self.run_id, e);
        }
    }
}

/// Serializes `variant` into an object with a `hostname` entry.
fn variant_with_hostname(variant: impl Serialize, host: &str) -> Result<Map<String, Value>> {
    let mut map = match serde_json::to_value(variant)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        v => anyhow::bail!("Variant must serialize to an object, got {}", v),
    };
    map.entry("hostname")
        .or_insert_with(|| Value::String(host.to_string()));
    Ok(map)
}

/// Replaces characters MLflow rejects in metric and tag keys.
///
/// Allowed are alphanumerics, underscores, dashes, periods, spaces and slashes.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            c if c.is_alphanumeric() => c,
            '_' | '-' | '.' | ' ' | '/' => c,
            _ => '_',
        })
        .collect()
}

fn artifact_path(base: &Path, key: &str, step: i64, ext: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for part in key.split('/').filter(|p| !p.is_empty() && *p != "." && *p != "..") {
        path.push(part);
    }
    path.join(format!("{:06}.{}", step, ext))
}

fn format_duration(dt: &Duration) -> String {
    let mut seconds = dt.num_seconds();
    let mut minutes = seconds / 60;
    seconds %= 60;
    let hours = minutes / 60;
    minutes %= 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::seconds(3725)), "01:02:05");
        assert_eq!(format_duration(&Duration::seconds(59)), "00:00:59");
    }

    #[test]
    fn test_variant_with_hostname() -> Result<()> {
        let map = variant_with_hostname(json!({"policy": "octo", "seed": 0}), "robot-pc")?;
        assert_eq!(map["hostname"], "robot-pc");
        assert_eq!(map["policy"], "octo");

        let map = variant_with_hostname(json!({"hostname": "given"}), "robot-pc")?;
        assert_eq!(map["hostname"], "given");

        let map = variant_with_hostname((), "robot-pc")?;
        assert_eq!(map.len(), 1);

        assert!(variant_with_hostname(3, "robot-pc").is_err());
        Ok(())
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(
            sanitize_key("pick up cup/episode_success"),
            "pick up cup/episode_success"
        );
        assert_eq!(sanitize_key("put spoon, then cup?"), "put spoon_ then cup_");
    }

    #[test]
    fn test_artifact_path() {
        let path = artifact_path(Path::new("/mlruns/1/abc/artifacts"), "open drawer/../frames", 12, "png");
        assert_eq!(
            path,
            PathBuf::from("/mlruns/1/abc/artifacts/open drawer/frames/000012.png")
        );
    }
}

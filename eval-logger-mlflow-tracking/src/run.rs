use serde::Deserialize;

/// A run on the tracking server.
///
/// Only the fields used by this crate are kept; see
/// <https://mlflow.org/docs/latest/rest-api.html#mlflowrun>.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub info: RunInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub run_name: String,
    pub experiment_id: String,
    pub status: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub artifact_uri: Option<String>,
    pub lifecycle_stage: Option<String>,
}

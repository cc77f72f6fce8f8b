use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentTag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
/// All fields taken from <https://mlflow.org/docs/latest/rest-api.html#mlflowexperiment>.
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub artifact_location: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub last_update_time: Option<i64>,
    pub creation_time: Option<i64>,
    pub tags: Option<Vec<ExperimentTag>>,
}

use crate::{Experiment, MlflowLoggerConfig, MlflowMetricsLogger, Run};
use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
/// Internally used.
struct Experiment_ {
    pub(crate) experiment: Experiment,
}

#[derive(Debug, Deserialize)]
/// Internally used.
struct Run_ {
    run: Run,
}

#[derive(Debug, Serialize)]
/// Parameters adapted from <https://mlflow.org/docs/latest/rest-api.html#create-run>.
struct CreateRunParams {
    experiment_id: String,
    start_time: i64,
    run_name: String,
}

#[derive(Debug, Serialize)]
struct CreateExperimentParams {
    name: String,
}

/// Connection to a tracking server shared by the client and the loggers it creates.
#[derive(Clone)]
pub(crate) struct Api {
    client: Client,
    base_url: String,
    user_name: String,
    password: String,
}

impl Api {
    pub(crate) fn url(&self, api: impl AsRef<str>) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, api.as_ref())
    }

    pub(crate) fn get(&self, api: &str, query: &impl Serialize) -> Result<Response> {
        let url = self.url(api);
        self.client
            .get(&url)
            .basic_auth(&self.user_name, Some(&self.password))
            .query(query)
            .send()
            .with_context(|| format!("GET {}", url))
    }

    /// Posts `params` and fails on a non-success status.
    pub(crate) fn post(&self, api: &str, params: &impl Serialize) -> Result<Response> {
        let url = self.url(api);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.user_name, Some(&self.password))
            .json(params)
            .send()
            .with_context(|| format!("POST {}", url))?;
        Ok(resp.error_for_status()?)
    }
}

/// Provides access to a MLflow tracking server via REST API.
///
/// Support Mlflow API version 2.0.
pub struct MlflowTrackingClient {
    api: Api,

    /// Current experiment ID.
    experiment_id: Option<String>,
}

impl MlflowTrackingClient {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            api: Api {
                client: Client::new(),
                base_url: base_url.as_ref().trim_end_matches('/').to_string(),
                user_name: "".to_string(),
                password: "".to_string(),
            },
            experiment_id: None,
        }
    }

    /// Set user name and password for basic authentication of the tracking server.
    pub fn basic_auth(mut self, user_name: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        self.api.user_name = user_name.as_ref().to_string();
        self.api.password = password.as_ref().to_string();
        self
    }

    /// Set the experiment of the runs created afterwards.
    ///
    /// The experiment is created on the tracking server if it does not exist.
    pub fn set_experiment(mut self, name: impl AsRef<str>) -> Result<Self> {
        let experiment_id = self.get_experiment(name.as_ref())?.experiment_id;

        info!(
            "For experiment '{}', id={} is set in MlflowTrackingClient",
            name.as_ref(),
            experiment_id
        );
        self.experiment_id = Some(experiment_id);

        Ok(self)
    }

    /// Get [`Experiment`] by name from the tracking server.
    ///
    /// If the experiment with given name does not exist in the tracking server,
    /// it will be created.
    pub fn get_experiment(&self, name: impl AsRef<str>) -> Result<Experiment> {
        let query = [("experiment_name", name.as_ref())];
        let mut resp = self.api.get("experiments/get-by-name", &query)?;
        if !resp.status().is_success() {
            info!("Create experiment '{}'", name.as_ref());
            self.api.post(
                "experiments/create",
                &CreateExperimentParams {
                    name: name.as_ref().into(),
                },
            )?;
            resp = self
                .api
                .get("experiments/get-by-name", &query)?
                .error_for_status()?;
        }
        let experiment: Experiment_ = resp
            .json()
            .with_context(|| format!("Failed to parse experiment {:?}", name.as_ref()))?;

        Ok(experiment.experiment)
    }

    /// Create [`MlflowMetricsLogger`] corresponding to a new run.
    ///
    /// If `run_name` is empty (`""`), a run name is generated by the tracking server.
    ///
    /// Needs [`MlflowTrackingClient::set_experiment()`] to be called before.
    pub fn create_logger(&self, run_name: impl AsRef<str>) -> Result<MlflowMetricsLogger> {
        let experiment_id = self
            .experiment_id
            .as_ref()
            .context("Experiment is not set in MlflowTrackingClient")?;
        let resp = self.api.post(
            "runs/create",
            &CreateRunParams {
                experiment_id: experiment_id.to_string(),
                start_time: Local::now().timestamp_millis(),
                run_name: run_name.as_ref().to_string(),
            },
        )?;
        let run = resp.json::<Run_>().context("Failed to parse run")?.run;

        if run_name.as_ref().is_empty() {
            info!(
                "Run name '{}' has been automatically generated",
                run.info.run_name
            );
        }
        MlflowMetricsLogger::new(self.api.clone(), &run)
    }

    /// Creates a run as configured and logs `variant` as its parameters.
    pub fn build_logger(
        config: &MlflowLoggerConfig,
        variant: impl Serialize,
    ) -> Result<MlflowMetricsLogger> {
        let client = Self::new(&config.tracking_uri)
            .basic_auth(&config.user_name, &config.password)
            .set_experiment(&config.experiment_name)?;
        let logger = client.create_logger(config.run_name(&Local::now()))?;
        logger.log_variant(variant)?;
        Ok(logger)
    }
}

use super::{
    dispatch::{Collaborator, DispatchError, Failures},
    step_stats::StepCounter,
    EvalLoggerConfig,
};
use crate::{
    episode::{EpisodeRecord, ExtraValue},
    error::EvalLoggerError,
    metadata::EvalMetadata,
    metrics::{MetricsLogger, NullMetricsLogger},
    record::{Record, RecordValue},
    storage::{DataSaver, NullSaver},
    visualize::{FrameVisualizer, NullVisualizer},
};
use log::{info, warn};
use std::{collections::HashMap, time::Instant};

/// Number of latest episodes in the recent success rate.
const RECENT_EPISODES: usize = 20;

/// Key of the episode axis in records written to the metrics logger.
pub const NUM_EPISODE: &str = "num_episode";

fn round4(v: f32) -> f32 {
    ((v as f64) * 1e4).round() as f32 / 1e4
}

fn mean(vs: &[f32]) -> f32 {
    if vs.is_empty() {
        return 0.0;
    }
    vs.iter().sum::<f32>() / vs.len() as f32
}

/// Logs robot evaluation metrics. This is the main entry point of the library.
///
/// An evaluation loop calls
/// * [`EvalLogger::save_metadata`] once, before the first episode,
/// * [`EvalLogger::log_step`] at the end of every control step,
/// * [`EvalLogger::log_episode`] at the end of every episode,
/// * [`EvalLogger::finish`] after the last episode (or lets it be dropped).
///
/// The logger forwards the data to up to three collaborators: a
/// [`MetricsLogger`], a [`FrameVisualizer`] and a [`DataSaver`]. Roles that
/// are not configured are filled by no-op implementations.
///
/// ```rust
/// use eval_logger_core::{BufferedMetricsLogger, EpisodeRecord, EvalLogger, EvalLoggerConfig};
/// use image::RgbImage;
///
/// let metrics = BufferedMetricsLogger::new();
/// let mut logger = EvalLogger::new(&EvalLoggerConfig::default())
///     .with_metrics_logger(metrics.clone());
///
/// let frames = vec![RgbImage::new(32, 32); 4];
/// let record = logger
///     .log_episode(EpisodeRecord::new(0, "pick up cup", true, frames).extra("eval_rollout_steps", 4))
///     .unwrap();
/// assert_eq!(record.get_scalar("pick up cup/overall_success_rate").unwrap(), 1.0);
/// assert_eq!(metrics.len(), 1);
/// ```
pub struct EvalLogger {
    metrics: Box<dyn MetricsLogger>,
    visualizer: Box<dyn FrameVisualizer>,
    saver: Box<dyn DataSaver>,
    metrics_configured: bool,
    past_success_rates: HashMap<String, Vec<f32>>,
    steps: StepCounter,
    current_episode: usize,
    finished: bool,
}

impl EvalLogger {
    /// Creates a logger without collaborators.
    pub fn new(config: &EvalLoggerConfig) -> Self {
        Self {
            metrics: Box::new(NullMetricsLogger::default()),
            visualizer: Box::new(NullVisualizer::default()),
            saver: Box::new(NullSaver::default()),
            metrics_configured: false,
            past_success_rates: HashMap::new(),
            steps: StepCounter::new(config.step_stats_interval()),
            current_episode: 0,
            finished: false,
        }
    }

    /// Sets the metrics logger.
    pub fn with_metrics_logger(mut self, metrics: impl MetricsLogger + 'static) -> Self {
        self.metrics = Box::new(metrics);
        self.metrics_configured = true;
        self
    }

    /// Sets the frame visualizer.
    pub fn with_visualizer(mut self, visualizer: impl FrameVisualizer + 'static) -> Self {
        self.visualizer = Box::new(visualizer);
        self
    }

    /// Sets the data saver.
    pub fn with_data_saver(mut self, saver: impl DataSaver + 'static) -> Self {
        self.saver = Box::new(saver);
        self
    }

    /// Total number of control steps logged.
    pub fn total_steps(&self) -> u64 {
        self.steps.total_steps()
    }

    /// Index of the last logged episode.
    pub fn current_episode(&self) -> usize {
        self.current_episode
    }

    /// Success flags (`0.0`/`1.0`) of the episodes logged under `logging_prefix`.
    pub fn success_history(&self, logging_prefix: &str) -> Option<&[f32]> {
        self.past_success_rates
            .get(logging_prefix)
            .map(|v| v.as_slice())
    }

    /// Saves the metadata of the evaluation session.
    ///
    /// The metadata goes to the data saver and to the metrics logger.
    pub fn save_metadata(&mut self, metadata: &EvalMetadata) -> Result<(), DispatchError> {
        let mut failures = Failures::default();
        info!("Save metadata of eval {}", metadata.eval_id);

        if let Err(e) = self.saver.save_metadata(metadata) {
            failures.push(Collaborator::Storage, e);
        }
        if let Err(e) = self.metrics.log_metadata(metadata) {
            failures.push(Collaborator::Metrics, e);
        }

        failures.into_result(())
    }

    /// Logs an episode at its end.
    ///
    /// Returns the record forwarded to the metrics logger: success statistics,
    /// visual artifacts and the extras of the episode, keyed under its logging
    /// prefix, plus `num_episode`. The whole episode goes to the data saver.
    ///
    /// # Errors
    ///
    /// Every collaborator is called even if another one fails. Failures are
    /// collected into a [`DispatchError`].
    pub fn log_episode(&mut self, episode: EpisodeRecord) -> Result<Record, DispatchError> {
        let i = episode.episode_index;
        let prefix = episode.logging_prefix.as_str();
        let mut failures = Failures::default();
        self.current_episode = i;

        // Before visualization so the composite includes this episode
        let success_stats = self.log_success_rates(prefix, episode.success);

        let history = self
            .past_success_rates
            .get(prefix)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let frames_viz = match self
            .visualizer
            .log_frames(i, prefix, &episode.frames, history)
        {
            Ok(record) => record,
            Err(e) => {
                failures.push(Collaborator::Visualizer, e);
                Record::empty()
            }
        };

        let mut others = Record::empty();
        for (k, v) in episode.extras.iter() {
            let value = match v {
                ExtraValue::String(s) => RecordValue::String(s.clone()),
                v => RecordValue::Scalar(v.as_scalar().unwrap_or_default()),
            };
            others.insert(format!("{}/{}", prefix, k), value);
        }

        let mut to_log = frames_viz.merge(success_stats).merge(others);
        to_log.insert(NUM_EPISODE, RecordValue::Scalar(i as f32));

        if self.metrics_configured && prefix.is_empty() {
            failures.push(
                Collaborator::Metrics,
                EvalLoggerError::EmptyPrefix(i).into(),
            );
        } else if let Err(e) = self.metrics.write(to_log.clone(), i as i64) {
            failures.push(Collaborator::Metrics, e);
        }

        if let Err(e) = self.saver.save_episode(&episode) {
            failures.push(Collaborator::Storage, e);
        }

        failures.into_result(to_log)
    }

    /// Logs a control step at its end.
    ///
    /// Statistics of the steps are forwarded to the metrics logger whenever
    /// the configured interval has passed.
    pub fn log_step(&mut self) -> Result<(), DispatchError> {
        self.log_step_at(Instant::now())
    }

    pub(crate) fn log_step_at(&mut self, now: Instant) -> Result<(), DispatchError> {
        match self.steps.step(now) {
            Some(record) => self.write_step_stats(record),
            None => Ok(()),
        }
    }

    /// Forwards step statistics to the metrics logger right away.
    pub fn log_step_stats(&mut self) -> Result<(), DispatchError> {
        self.log_step_stats_at(Instant::now())
    }

    pub(crate) fn log_step_stats_at(&mut self, now: Instant) -> Result<(), DispatchError> {
        match self.steps.stats(now) {
            Some(record) => self.write_step_stats(record),
            None => Ok(()),
        }
    }

    fn write_step_stats(&mut self, record: Record) -> Result<(), DispatchError> {
        let mut failures = Failures::default();
        if let Err(e) = self.metrics.write(record, self.steps.total_steps() as i64) {
            failures.push(Collaborator::Metrics, e);
        }
        failures.into_result(())
    }

    /// Flushes pending visualizations and the metrics logger.
    ///
    /// Frames kept for a checkpoint that was never reached are logged as a
    /// final composite. Calling this more than once has no effect; it is
    /// called on drop if it has not been called.
    pub fn finish(&mut self) -> Result<(), DispatchError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let mut failures = Failures::default();

        match self
            .visualizer
            .log_remaining_frames(self.current_episode, &self.past_success_rates)
        {
            Ok(record) if !record.is_empty() => {
                let mut record = record;
                record.insert(NUM_EPISODE, RecordValue::Scalar(self.current_episode as f32));
                if let Err(e) = self.metrics.write(record, self.current_episode as i64) {
                    failures.push(Collaborator::Metrics, e);
                }
            }
            Ok(_) => {}
            Err(e) => failures.push(Collaborator::Visualizer, e),
        }

        if let Err(e) = self.metrics.flush() {
            failures.push(Collaborator::Metrics, e);
        }

        failures.into_result(())
    }

    fn log_success_rates(&mut self, logging_prefix: &str, episode_success: bool) -> Record {
        let history = self
            .past_success_rates
            .entry(logging_prefix.to_string())
            .or_insert_with(Vec::new);
        history.push(if episode_success { 1.0 } else { 0.0 });

        let recent = &history[history.len().saturating_sub(RECENT_EPISODES)..];
        let cumulative: f32 = history.iter().sum();

        Record::from_slice(&[
            (
                format!("{}/episode_success", logging_prefix),
                RecordValue::Scalar(if episode_success { 1.0 } else { 0.0 }),
            ),
            (
                format!("{}/cumulative_num_success", logging_prefix),
                RecordValue::Scalar(cumulative),
            ),
            (
                format!("{}/recent_success_rate", logging_prefix),
                RecordValue::Scalar(round4(mean(recent))),
            ),
            (
                format!("{}/overall_success_rate", logging_prefix),
                RecordValue::Scalar(round4(mean(history))),
            ),
        ])
    }
}

impl Drop for EvalLogger {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Error while finishing EvalLogger: {}", e);
        }
    }
}

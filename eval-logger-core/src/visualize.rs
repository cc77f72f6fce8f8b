//! Visual artifacts of evaluation episodes.
//!
//! A [`FrameVisualizer`] turns the frames of an episode into images and
//! videos that are forwarded to the metrics logger. The default
//! implementation is [`FilmstripVisualizer`]; [`NullVisualizer`] is used
//! when no visualization is configured.
mod config;
mod filmstrip;
mod render;

use crate::{episode::Frame, record::Record};
use anyhow::Result;
pub use config::FrameVisualizerConfig;
pub use filmstrip::FilmstripVisualizer;
pub use render::{bar_strip, encode_gif, encode_png, hconcat, resize_frame, vconcat};
use std::collections::HashMap;

/// Produces visual artifacts from the frames of episodes.
pub trait FrameVisualizer {
    /// Builds the artifacts of one episode.
    ///
    /// `success_history` holds the success flags (`0.0`/`1.0`) of all the
    /// episodes logged so far under `logging_prefix`, including this one.
    fn log_frames(
        &mut self,
        episode_index: usize,
        logging_prefix: &str,
        frames: &[Frame],
        success_history: &[f32],
    ) -> Result<Record>;

    /// Builds artifacts from frames kept for a checkpoint that was never reached.
    ///
    /// Called once when the evaluation ends.
    fn log_remaining_frames(
        &mut self,
        final_episode: usize,
        success_histories: &HashMap<String, Vec<f32>>,
    ) -> Result<Record>;
}

/// A visualizer that produces nothing.
#[derive(Debug, Default)]
pub struct NullVisualizer {}

impl FrameVisualizer for NullVisualizer {
    fn log_frames(
        &mut self,
        _episode_index: usize,
        _logging_prefix: &str,
        _frames: &[Frame],
        _success_history: &[f32],
    ) -> Result<Record> {
        Ok(Record::empty())
    }

    fn log_remaining_frames(
        &mut self,
        _final_episode: usize,
        _success_histories: &HashMap<String, Vec<f32>>,
    ) -> Result<Record> {
        Ok(Record::empty())
    }
}

//! Configuration of [`FilmstripVisualizer`](super::FilmstripVisualizer).
use crate::error::EvalLoggerError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`FilmstripVisualizer`](super::FilmstripVisualizer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct FrameVisualizerConfig {
    /// Playback rate of episode videos.
    pub video_fps: u32,

    /// Size `(width, height)` to which frames are resized.
    pub video_frame_size: (u32, u32),

    /// A filmstrip takes every n-th frame of an episode. Zero disables it.
    pub episode_viz_frame_interval: usize,

    /// Whether to build the composite of initial and final frames on checkpoints.
    pub periodic_log_initial_and_final_frames: bool,

    /// Interval of checkpoints in episodes.
    pub success_viz_every_n: usize,

    /// Whether to build a video of every episode.
    pub log_video: bool,
}

impl Default for FrameVisualizerConfig {
    fn default() -> Self {
        Self {
            video_fps: 10,
            video_frame_size: (128, 128),
            episode_viz_frame_interval: 10,
            periodic_log_initial_and_final_frames: true,
            success_viz_every_n: 10,
            log_video: true,
        }
    }
}

impl FrameVisualizerConfig {
    /// Sets the playback rate of videos.
    pub fn video_fps(mut self, v: u32) -> Self {
        self.video_fps = v;
        self
    }

    /// Sets the size of resized frames.
    pub fn video_frame_size(mut self, width: u32, height: u32) -> Self {
        self.video_frame_size = (width, height);
        self
    }

    /// Sets the frame interval of filmstrips.
    pub fn episode_viz_frame_interval(mut self, v: usize) -> Self {
        self.episode_viz_frame_interval = v;
        self
    }

    /// Sets whether composites are built on checkpoints.
    pub fn periodic_log_initial_and_final_frames(mut self, v: bool) -> Self {
        self.periodic_log_initial_and_final_frames = v;
        self
    }

    /// Sets the interval of checkpoints.
    pub fn success_viz_every_n(mut self, v: usize) -> Self {
        self.success_viz_every_n = v;
        self
    }

    /// Sets whether videos are built.
    pub fn log_video(mut self, v: bool) -> Self {
        self.log_video = v;
        self
    }

    /// Checks ranges of the values.
    pub fn validate(&self) -> Result<(), EvalLoggerError> {
        if self.video_fps == 0 {
            return Err(EvalLoggerError::InvalidConfig(
                "video_fps must be positive".to_string(),
            ));
        }
        if self.video_frame_size.0 == 0 || self.video_frame_size.1 == 0 {
            return Err(EvalLoggerError::InvalidConfig(format!(
                "video_frame_size must be non-zero, got {:?}",
                self.video_frame_size
            )));
        }
        if self.success_viz_every_n == 0 {
            return Err(EvalLoggerError::InvalidConfig(
                "success_viz_every_n must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Constructs [`FrameVisualizerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`FrameVisualizerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

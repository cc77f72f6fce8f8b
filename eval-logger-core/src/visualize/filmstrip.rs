use super::{
    render::{bar_strip, hconcat, resize_frame, vconcat},
    FrameVisualizer, FrameVisualizerConfig,
};
use crate::{
    episode::Frame,
    error::EvalLoggerError,
    record::{Record, RecordValue},
    sampling,
};
use anyhow::Result;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// Initial and final frame of an episode, resized.
type FramePair = (Frame, Frame);

/// Visualizes episodes as filmstrips, videos and periodic composites.
///
/// For every episode, it builds
/// * a filmstrip of every n-th frame (`{prefix}/frames`),
/// * a video of all the frames (`{prefix}/video`), if enabled.
///
/// It also keeps the initial and final frames of recent episodes of each
/// prefix. On checkpoints, they are laid out in columns above a bar chart of
/// the running success rate (`{prefix}/initial_and_final_frames`).
pub struct FilmstripVisualizer {
    config: FrameVisualizerConfig,
    past_frames: HashMap<String, VecDeque<FramePair>>,
}

impl FilmstripVisualizer {
    /// Constructs the visualizer, checking the configuration.
    pub fn build(config: FrameVisualizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            past_frames: HashMap::new(),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FrameVisualizerConfig {
        &self.config
    }

    /// Number of episodes of `logging_prefix` waiting for a checkpoint.
    pub fn pending(&self, logging_prefix: &str) -> usize {
        self.past_frames
            .get(logging_prefix)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    fn composite(&self, pairs: &VecDeque<FramePair>, rates: &[f32]) -> Result<Frame> {
        let (w, h) = self.config.video_frame_size;
        let columns = pairs
            .iter()
            .map(|(initial, last)| vconcat(&[initial.clone(), last.clone()]))
            .collect::<Result<Vec<_>>>()?;
        let frames = hconcat(&columns)?;
        let strip = bar_strip(rates, w, (h / 2).max(16));
        vconcat(&[frames, strip])
    }
}

/// Running success rate after each of the last `n` episodes.
fn running_rates(history: &[f32], n: usize) -> Vec<f32> {
    let mut sum = 0f32;
    let rates: Vec<f32> = history
        .iter()
        .enumerate()
        .map(|(i, v)| {
            sum += *v;
            sum / (i + 1) as f32
        })
        .collect();
    let start = rates.len().saturating_sub(n);
    let mut rates = rates[start..].to_vec();
    // Left-pad when the history is shorter than the kept frames.
    while rates.len() < n {
        rates.insert(0, 0.0);
    }
    rates
}

impl FrameVisualizer for FilmstripVisualizer {
    fn log_frames(
        &mut self,
        episode_index: usize,
        logging_prefix: &str,
        frames: &[Frame],
        success_history: &[f32],
    ) -> Result<Record> {
        if frames.is_empty() {
            return Err(EvalLoggerError::EmptyFrames(episode_index).into());
        }
        let size = self.config.video_frame_size;
        let plan = sampling::plan(episode_index, frames.len(), &self.config);
        let mut record = Record::empty();

        // Keep the ends of the episode for the next checkpoint
        let capacity = self.config.success_viz_every_n;
        let queue = self
            .past_frames
            .entry(logging_prefix.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        queue.push_back((
            resize_frame(&frames[0], size),
            resize_frame(&frames[frames.len() - 1], size),
        ));
        while queue.len() > capacity {
            queue.pop_front();
        }

        if !plan.filmstrip.is_empty() {
            let sampled: Vec<_> = plan
                .filmstrip
                .iter()
                .map(|&i| resize_frame(&frames[i], size))
                .collect();
            record.insert(
                format!("{}/frames", logging_prefix),
                RecordValue::Image(hconcat(&sampled)?),
            );
        }

        if plan.video {
            record.insert(
                format!("{}/video", logging_prefix),
                RecordValue::Video {
                    frames: frames.iter().map(|f| resize_frame(f, size)).collect(),
                    fps: self.config.video_fps,
                },
            );
        }

        if plan.composite {
            if let Some(pairs) = self.past_frames.get(logging_prefix) {
                let rates = running_rates(success_history, pairs.len());
                let img = self.composite(pairs, &rates)?;
                debug!(
                    "Composite of {} episodes for '{}' at episode {}",
                    pairs.len(),
                    logging_prefix,
                    episode_index
                );
                record.insert(
                    format!("{}/initial_and_final_frames", logging_prefix),
                    RecordValue::Image(img),
                );
            }
            if let Some(pairs) = self.past_frames.get_mut(logging_prefix) {
                pairs.clear();
            }
        }

        Ok(record)
    }

    fn log_remaining_frames(
        &mut self,
        final_episode: usize,
        success_histories: &HashMap<String, Vec<f32>>,
    ) -> Result<Record> {
        let mut record = Record::empty();

        for (prefix, pairs) in self.past_frames.iter() {
            if pairs.is_empty() {
                continue;
            }
            let rates = match success_histories.get(prefix) {
                Some(history) => running_rates(history, pairs.len()),
                None => vec![0.0; pairs.len()],
            };
            debug!(
                "Composite of {} remaining episodes for '{}' after episode {}",
                pairs.len(),
                prefix,
                final_episode
            );
            record.insert(
                format!("{}/initial_and_final_frames", prefix),
                RecordValue::Image(self.composite(pairs, &rates)?),
            );
        }

        for pairs in self.past_frames.values_mut() {
            pairs.clear();
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::from_pixel(32, 24, Rgb([i as u8, 0, 0])))
            .collect()
    }

    fn visualizer(every_n: usize) -> FilmstripVisualizer {
        let config = FrameVisualizerConfig::default()
            .video_frame_size(16, 12)
            .episode_viz_frame_interval(4)
            .success_viz_every_n(every_n);
        FilmstripVisualizer::build(config).unwrap()
    }

    #[test]
    fn test_filmstrip_width_counts_sampled_frames() -> Result<()> {
        let mut viz = visualizer(10);
        let record = viz.log_frames(0, "task", &frames(10), &[1.0])?;
        // ceil(10 / 4) = 3 frames, 16 pixels wide each
        assert_eq!(record.get_image("task/frames")?.dimensions(), (48, 12));
        let (video, fps) = record.get_video("task/video")?;
        assert_eq!(video.len(), 10);
        assert_eq!(fps, 10);
        Ok(())
    }

    #[test]
    fn test_composite_only_on_checkpoints() -> Result<()> {
        let mut viz = visualizer(3);
        let mut history = vec![];
        let mut produced = vec![];
        for i in 0..7 {
            history.push((i % 2) as f32);
            let record = viz.log_frames(i, "task", &frames(5), &history)?;
            if record.contains_key("task/initial_and_final_frames") {
                produced.push(i + 1);
                let img = record.get_image("task/initial_and_final_frames")?;
                // three columns, two frames high plus the bar strip
                assert_eq!(img.dimensions(), (48, 24 + 16));
            }
        }
        assert_eq!(produced, vec![3, 6]);
        assert_eq!(viz.pending("task"), 1);
        Ok(())
    }

    #[test]
    fn test_remaining_frames_are_flushed_once() -> Result<()> {
        let mut viz = visualizer(5);
        viz.log_frames(0, "a", &frames(2), &[1.0])?;
        viz.log_frames(1, "a", &frames(2), &[1.0, 0.0])?;

        let histories = HashMap::from([("a".to_string(), vec![1.0, 0.0])]);
        let record = viz.log_remaining_frames(1, &histories)?;
        assert_eq!(
            record.get_image("a/initial_and_final_frames")?.dimensions(),
            (32, 24 + 16)
        );
        assert!(viz.log_remaining_frames(1, &histories)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_frames_are_rejected() {
        let mut viz = visualizer(5);
        let err = viz.log_frames(4, "task", &[], &[0.0]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EvalLoggerError>(),
            Some(EvalLoggerError::EmptyFrames(4))
        ));
    }

    #[test]
    fn test_running_rates() {
        assert_eq!(running_rates(&[1.0, 0.0, 1.0, 1.0], 2), vec![2.0 / 3.0, 0.75]);
        assert_eq!(running_rates(&[1.0], 3), vec![0.0, 0.0, 1.0]);
    }
}

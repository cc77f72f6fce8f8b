//! Which visual artifacts are produced for an episode.
//!
//! Everything here is a pure function of the episode index, the number of
//! frames and the visualizer configuration, so the selection can be checked
//! without rendering anything.
use crate::visualize::FrameVisualizerConfig;

/// Indices of the frames sampled into a filmstrip.
///
/// Takes every `interval`-th frame starting from the first one, which gives
/// `ceil(n_frames / interval)` indices. An interval of zero disables the
/// filmstrip.
pub fn filmstrip_indices(n_frames: usize, interval: usize) -> Vec<usize> {
    if interval == 0 {
        return vec![];
    }
    (0..n_frames).step_by(interval).collect()
}

/// Whether the episode at 0-based `episode_index` is a checkpoint.
///
/// Checkpoints are the 1-based episodes `every_n, 2 * every_n, ...`.
pub fn is_checkpoint(episode_index: usize, every_n: usize) -> bool {
    every_n > 0 && (episode_index + 1) % every_n == 0
}

/// Artifacts to produce for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VizPlan {
    /// Frames sampled into the filmstrip, empty if no filmstrip is built.
    pub filmstrip: Vec<usize>,

    /// Whether a video of the whole episode is built.
    pub video: bool,

    /// Whether the composite of initial and final frames is built.
    pub composite: bool,
}

/// Decides the artifacts of the episode at `episode_index` with `n_frames` frames.
pub fn plan(episode_index: usize, n_frames: usize, config: &FrameVisualizerConfig) -> VizPlan {
    VizPlan {
        filmstrip: filmstrip_indices(n_frames, config.episode_viz_frame_interval),
        video: config.log_video && n_frames > 0,
        composite: config.periodic_log_initial_and_final_frames
            && is_checkpoint(episode_index, config.success_viz_every_n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceil_div(a: usize, b: usize) -> usize {
        (a + b - 1) / b
    }

    #[test]
    fn test_filmstrip_length_is_ceil_of_ratio() {
        for interval in 1..8 {
            for n_frames in 1..40 {
                let ixs = filmstrip_indices(n_frames, interval);
                assert_eq!(ixs.len(), ceil_div(n_frames, interval));
                assert_eq!(ixs[0], 0);
                assert!(ixs.iter().all(|&i| i < n_frames));
            }
        }
    }

    #[test]
    fn test_short_episode_yields_single_frame() {
        assert_eq!(filmstrip_indices(3, 10), vec![0]);
        assert!(filmstrip_indices(0, 10).is_empty());
    }

    #[test]
    fn test_checkpoints_are_multiples_of_every_n() {
        let every_n = 3;
        let n_episodes = 10;
        let checkpoints: Vec<_> = (0..n_episodes)
            .filter(|&i| is_checkpoint(i, every_n))
            .map(|i| i + 1)
            .collect();
        assert_eq!(checkpoints, vec![3, 6, 9]);
    }

    #[test]
    fn test_plan_respects_flags() {
        let config = FrameVisualizerConfig::default()
            .success_viz_every_n(2)
            .log_video(false);
        let p = plan(1, 25, &config);
        assert_eq!(p.filmstrip, vec![0, 10, 20]);
        assert!(!p.video);
        assert!(p.composite);

        let config = config.periodic_log_initial_and_final_frames(false);
        assert!(!plan(1, 25, &config).composite);
        assert!(!plan(0, 25, &config).composite);
    }
}

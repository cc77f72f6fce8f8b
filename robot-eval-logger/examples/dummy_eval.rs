//! A synthetic evaluation of a robot manipulator.
//!
//! Frames are generated images and episodes succeed at random, so the loggers
//! can be tried without a robot:
//!
//! ```bash
//! cargo run --example dummy_eval -- --storage-dir /tmp/eval_data --tensorboard-logdir /tmp/eval_logs
//! cargo run --example dummy_eval -- --setup setup.yaml
//! ```
use anyhow::Result;
use clap::Parser;
use image::{Rgb, RgbImage};
use robot_eval_logger::{
    EpisodeRecord, EvalLoggerSetup, EvalMetadata, FrameVisualizerConfig, LocalStorageConfig,
    MetricsSetup, MlflowLoggerConfig, RobotType, StorageSetup, TensorboardConfig,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Serialize)]
#[command(version, about)]
struct Args {
    /// YAML file of the loggers. Overrides the other logger options
    #[arg(long)]
    setup: Option<PathBuf>,

    /// Language prompt of the task
    #[arg(long, default_value = "pick up the cup")]
    text_cond: String,

    /// Number of episodes to evaluate
    #[arg(long, default_value_t = 7)]
    num_episodes: usize,

    /// Maximum number of steps per episode
    #[arg(long, default_value_t = 20)]
    max_steps: usize,

    /// Log every n frames
    #[arg(long, default_value_t = 3)]
    log_every_n_frames: usize,

    /// Directory for the episode data
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Directory for TensorBoard logs
    #[arg(long)]
    tensorboard_logdir: Option<PathBuf>,

    /// Log metrics with MLflow
    #[arg(short, long, default_value_t = false)]
    mlflow: bool,

    /// Name of the experiment for MLflow logging
    #[arg(long, default_value = "")]
    exp_name: String,
}

fn setup(args: &Args) -> Result<EvalLoggerSetup> {
    if let Some(path) = &args.setup {
        return EvalLoggerSetup::load(path);
    }

    let mut setup = EvalLoggerSetup::default()
        .visualizer(
            FrameVisualizerConfig::default()
                .episode_viz_frame_interval(args.log_every_n_frames)
                .success_viz_every_n(3),
        )
        .log_step_stats_interval_minutes(0.1);
    if args.mlflow {
        setup = setup.metrics(MetricsSetup::Mlflow(
            MlflowLoggerConfig::default().exp_descriptor(&args.exp_name),
        ));
    } else if let Some(logdir) = &args.tensorboard_logdir {
        setup = setup.metrics(MetricsSetup::Tensorboard(TensorboardConfig {
            logdir: logdir.clone(),
            check_unsupported_value: false,
        }));
    }
    if let Some(dir) = &args.storage_dir {
        setup = setup.storage(StorageSetup::Local(
            LocalStorageConfig::default().storage_dir(dir),
        ));
    }
    Ok(setup)
}

/// A frame with a block moving from left to right as the episode proceeds.
fn render(step: usize, max_steps: usize) -> RgbImage {
    let (w, h) = (96u32, 96u32);
    let x0 = (step as u32 * (w - 16)) / max_steps.max(1) as u32;
    RgbImage::from_fn(w, h, |x, y| {
        if x >= x0 && x < x0 + 16 && y >= 40 && y < 56 {
            Rgb([220, 60, 60])
        } else {
            Rgb([40, 40, (y * 2) as u8])
        }
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut logger = setup(&args)?.build(&args)?;
    logger.save_metadata(&EvalMetadata::new(
        "berkeley",
        "widowx_dummy",
        RobotType::Widowx,
        "dummy evaluator",
        Some("dummy eval"),
    ))?;

    for i in 0..args.num_episodes {
        let mut frames = vec![];
        let mut actions = vec![];
        for t in 0..args.max_steps {
            frames.push(render(t, args.max_steps));
            // null policy
            actions.push(vec![0.0; 7]);
            logger.log_step()?;
        }

        let success = fastrand::bool();
        let episode = EpisodeRecord::new(i, &args.text_cond, success, frames)
            .actions(actions)
            .extra("eval_rollout_steps", args.max_steps)
            .extra("experienced_motor_failure", false);
        let record = logger.log_episode(episode)?;
        log::info!(
            "Episode {}: success={}, overall success rate {:?}",
            i,
            success,
            record.get_scalar(&format!("{}/overall_success_rate", args.text_cond))
        );
    }
    logger.finish()?;

    Ok(())
}

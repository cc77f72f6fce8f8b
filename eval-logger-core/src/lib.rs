#![warn(missing_docs)]
//! Logging of robot policy evaluations.
//!
//! [`EvalLogger`] receives the data of an evaluation session (its metadata,
//! every control step and every finished episode) and forwards it to up to
//! three collaborators:
//!
//! * a [`MetricsLogger`] writing success statistics and visual artifacts to a
//!   dashboard,
//! * a [`FrameVisualizer`] turning the frames of episodes into images and
//!   videos,
//! * a [`DataSaver`] persisting the episodes as a dataset.
pub mod error;
pub mod record;
pub mod sampling;
pub mod util;

mod episode;
pub use episode::{EpisodeRecord, ExtraValue, Extras, Frame};

mod metadata;
pub use metadata::{EvalId, EvalMetadata, RobotType};

pub mod metrics;
pub use metrics::{BufferedMetricsLogger, MetricsLogger, NullMetricsLogger};

pub mod visualize;
pub use visualize::{FilmstripVisualizer, FrameVisualizer, FrameVisualizerConfig, NullVisualizer};

pub mod storage;
pub use storage::{DataSaver, LocalStorage, LocalStorageConfig, NullSaver, TrajSidecar};

mod logger;
pub use logger::{
    Collaborator, CollaboratorFailure, DispatchError, EvalLogger, EvalLoggerConfig,
    EVAL_STEPS_PER_MINUTE, NUM_EPISODE, TOTAL_EVAL_STEPS, TOTAL_TIME_ELAPSED,
};

//! Durable storage of evaluation data.
//!
//! [`LocalStorage`] writes the data of a session under a directory named by
//! its [`EvalId`](crate::EvalId):
//!
//! ```text
//! storage_dir/
//!     <eval_id>/
//!         metadata.json
//!         traj_0/
//!             traj.json
//!             frames/000000.png
//!             frames/000001.png
//!             ...
//!         traj_1/
//!         ...
//! ```
mod config;
mod local;

use crate::{episode::EpisodeRecord, metadata::EvalMetadata};
use anyhow::Result;
pub use config::LocalStorageConfig;
pub use local::{LocalStorage, TrajSidecar};

/// Persists episodes and metadata of an evaluation session.
///
/// Saving an episode with an index that has already been saved in the
/// session overwrites it.
pub trait DataSaver {
    /// Saves the metadata of the session.
    fn save_metadata(&mut self, metadata: &EvalMetadata) -> Result<()>;

    /// Saves one episode.
    fn save_episode(&mut self, episode: &EpisodeRecord) -> Result<()>;
}

/// A saver that stores nothing.
#[derive(Debug, Default)]
pub struct NullSaver {}

impl DataSaver for NullSaver {
    fn save_metadata(&mut self, _metadata: &EvalMetadata) -> Result<()> {
        Ok(())
    }

    fn save_episode(&mut self, _episode: &EpisodeRecord) -> Result<()> {
        Ok(())
    }
}

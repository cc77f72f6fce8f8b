use super::{DataSaver, LocalStorageConfig};
use crate::{
    episode::{EpisodeRecord, Extras, Frame},
    error::EvalLoggerError,
    metadata::{EvalId, EvalMetadata},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

const METADATA_FILE: &str = "metadata.json";
const SIDECAR_FILE: &str = "traj.json";
const FRAMES_DIR: &str = "frames";

/// Everything of an episode except its frames, stored next to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajSidecar {
    /// Index of the episode.
    pub episode_index: usize,

    /// Logging prefix, typically the language command of the task.
    pub language_command: String,

    /// Whether the episode succeeded.
    pub success: bool,

    /// Number of frames in the `frames` directory.
    pub num_frames: usize,

    /// Size `(width, height)` of the first frame.
    pub frame_size: Option<(u32, u32)>,

    /// Caller-supplied values.
    pub extras: Extras,

    /// Actions taken at each step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Vec<f32>>,

    /// Proprioceptive state at each step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proprio: Vec<Vec<f32>>,

    /// Partial credit towards success.
    #[serde(default)]
    pub partial_success: Option<f32>,

    /// Feedback from the evaluator.
    #[serde(default)]
    pub language_feedback: Option<String>,

    /// Wall time of the episode in seconds.
    #[serde(default)]
    pub eval_duration_secs: Option<f32>,

    /// When the episode was written.
    pub saved_at: DateTime<Local>,
}

impl TrajSidecar {
    fn new(episode: &EpisodeRecord) -> Self {
        Self {
            episode_index: episode.episode_index,
            language_command: episode.logging_prefix.clone(),
            success: episode.success,
            num_frames: episode.frames.len(),
            frame_size: episode.frames.first().map(|f| f.dimensions()),
            extras: episode.extras.clone(),
            actions: episode.actions.clone(),
            proprio: episode.proprio.clone(),
            partial_success: episode.partial_success,
            language_feedback: episode.language_feedback.clone(),
            eval_duration_secs: episode.eval_duration_secs,
            saved_at: Local::now(),
        }
    }

    /// Loads a sidecar from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        Ok(serde_json::from_reader(rdr)?)
    }
}

struct Session {
    eval_id: EvalId,
    run_dir: PathBuf,
}

/// Stores the episodes and the metadata of a session on the local disk.
///
/// The session directory is created on the first call of
/// [`LocalStorage::write_metadata`] or [`LocalStorage::write_episode`].
/// When an episode comes first, the session id is derived from the current
/// time alone and the metadata written later goes to the same directory.
pub struct LocalStorage {
    storage_dir: PathBuf,
    session: Option<Session>,
}

impl LocalStorage {
    /// Creates a storage writing under `storage_dir`.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        info!("Eval data saving to {:?}", storage_dir);
        Self {
            storage_dir,
            session: None,
        }
    }

    /// Creates a storage from its configuration.
    pub fn build(config: &LocalStorageConfig) -> Self {
        Self::new(config.storage_dir.clone())
    }

    /// Directory under which session directories are created.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Directory of the current session, if already created.
    pub fn run_dir(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.run_dir.as_path())
    }

    /// Identifier of the current session, if already created.
    pub fn eval_id(&self) -> Option<&EvalId> {
        self.session.as_ref().map(|s| &s.eval_id)
    }

    /// Directory of episode `i` in the current session.
    pub fn episode_dir(&self, i: usize) -> Option<PathBuf> {
        self.run_dir().map(|d| d.join(format!("traj_{}", i)))
    }

    fn ensure_session(&mut self, eval_id: impl FnOnce() -> EvalId) -> Result<PathBuf> {
        if let Some(session) = self.session.as_ref() {
            return Ok(session.run_dir.clone());
        }
        let eval_id = eval_id();
        let run_dir = self.storage_dir.join(eval_id.as_str());
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create session directory {:?}", run_dir))?;
        info!("Specific run dir is {:?}", run_dir);
        self.session = Some(Session {
            eval_id,
            run_dir: run_dir.clone(),
        });
        Ok(run_dir)
    }

    /// Writes `metadata.json` into the session directory and returns its path.
    ///
    /// # Errors
    ///
    /// Fails with [`EvalLoggerError::MetadataExists`] if the session already
    /// has metadata.
    pub fn write_metadata(&mut self, metadata: &EvalMetadata) -> Result<PathBuf> {
        let run_dir = self.ensure_session(|| metadata.eval_id.clone())?;
        let path = run_dir.join(METADATA_FILE);
        if path.exists() {
            return Err(EvalLoggerError::MetadataExists(path).into());
        }
        metadata.save(&path)?;
        debug!("Saved metadata to {:?}", path);
        Ok(path)
    }

    /// Writes an episode into `traj_<i>` of the session directory and
    /// returns the path of that directory.
    ///
    /// The episode is first written into a staging directory, which then
    /// replaces any earlier episode with the same index.
    pub fn write_episode(&mut self, episode: &EpisodeRecord) -> Result<PathBuf> {
        let run_dir = self.ensure_session(|| EvalId::create(&Local::now(), None, None))?;
        let i = episode.episode_index;
        let dest = run_dir.join(format!("traj_{}", i));
        let staging = run_dir.join(format!("traj_{}.partial", i));

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        let frames_dir = staging.join(FRAMES_DIR);
        fs::create_dir_all(&frames_dir)?;

        for (k, frame) in episode.frames.iter().enumerate() {
            let path = frames_dir.join(format!("{:06}.png", k));
            frame
                .save(&path)
                .with_context(|| format!("Failed to write frame {:?}", path))?;
        }

        let sidecar = TrajSidecar::new(episode);
        let mut file = File::create(staging.join(SIDECAR_FILE))?;
        file.write_all(serde_json::to_string_pretty(&sidecar)?.as_bytes())?;
        file.flush()?;

        if dest.exists() {
            debug!("Overwrite episode {} at {:?}", i, dest);
            fs::remove_dir_all(&dest)?;
        }
        fs::rename(&staging, &dest)
            .with_context(|| format!("Failed to move {:?} to {:?}", staging, dest))?;
        debug!("Saved episode {} to {:?}", i, dest);

        Ok(dest)
    }

    /// Reads episode `i` of the current session back.
    pub fn load_episode(&self, i: usize) -> Result<EpisodeRecord> {
        let dir = match self.episode_dir(i) {
            Some(dir) if dir.exists() => dir,
            _ => return Err(EvalLoggerError::EpisodeNotFound(i).into()),
        };
        let sidecar = TrajSidecar::load(dir.join(SIDECAR_FILE))?;

        let mut paths: Vec<(u64, PathBuf)> = fs::read_dir(dir.join(FRAMES_DIR))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
            .filter_map(|p| frame_number(&p).map(|k| (k, p)))
            .collect();
        paths.sort_by_key(|(k, _)| *k);
        let frames = paths
            .iter()
            .map(|(_, p)| -> Result<Frame> { Ok(image::open(p)?.to_rgb8()) })
            .collect::<Result<Vec<_>>>()?;

        Ok(EpisodeRecord {
            episode_index: sidecar.episode_index,
            logging_prefix: sidecar.language_command,
            success: sidecar.success,
            frames,
            extras: sidecar.extras,
            actions: sidecar.actions,
            proprio: sidecar.proprio,
            partial_success: sidecar.partial_success,
            language_feedback: sidecar.language_feedback,
            eval_duration_secs: sidecar.eval_duration_secs,
        })
    }
}

/// Position of a frame in its episode, from the stem of its file name.
fn frame_number(path: &Path) -> Option<u64> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
}

impl DataSaver for LocalStorage {
    fn save_metadata(&mut self, metadata: &EvalMetadata) -> Result<()> {
        self.write_metadata(metadata).map(|_| ())
    }

    fn save_episode(&mut self, episode: &EpisodeRecord) -> Result<()> {
        self.write_episode(episode).map(|_| ())
    }
}

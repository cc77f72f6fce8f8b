use crate::{
    commit::{path_in_repo, CommitFile, HubApi},
    token::resolve_token,
    HfHubConfig, HfHubError,
};
use anyhow::Result;
use eval_logger_core::{DataSaver, EpisodeRecord, EvalMetadata, LocalStorage};
use log::info;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

/// Saves evaluation data locally, then uploads it to a dataset repository
/// on the Hugging Face Hub.
///
/// Every saved item is uploaded in its own commit. An episode saved again
/// replaces its earlier folder in the repository. When an upload fails, the
/// local copy stays in place and [`HfHubError::UploadFailed`] tells where.
pub struct HuggingFaceStorage {
    local: LocalStorage,
    config: HfHubConfig,
    api: HubApi,
    uploaded_episodes: HashSet<usize>,
}

impl HuggingFaceStorage {
    /// Creates the storage with the token of the environment.
    ///
    /// Fails with [`HfHubError::MissingToken`] if there is none.
    pub fn build(config: HfHubConfig) -> Result<Self> {
        let token = resolve_token()?;
        Ok(Self::with_token(config, token))
    }

    /// Creates the storage with the given token.
    pub fn with_token(config: HfHubConfig, token: impl Into<String>) -> Self {
        info!(
            "Eval data uploaded to {}/datasets/{} under {}",
            config.endpoint, config.repo_id, config.hf_dir_name
        );
        Self {
            local: LocalStorage::new(config.storage_dir.clone()),
            api: HubApi::new(&config.endpoint, token),
            config,
            uploaded_episodes: HashSet::new(),
        }
    }

    /// The local storage written before each upload.
    pub fn local(&self) -> &LocalStorage {
        &self.local
    }

    /// Destination of `local_path` in the repository.
    fn repo_path(&self, local_path: &Path) -> Result<String> {
        let rel = local_path.strip_prefix(self.local.storage_dir())?;
        Ok(path_in_repo(&self.config.hf_dir_name, rel))
    }

    /// Uploads a file, or every file under a directory, in a single commit.
    ///
    /// With `replace`, the destination folder is deleted first in the same commit.
    fn upload(&self, local_path: &Path, summary: &str, replace: bool) -> Result<(), HfHubError> {
        self.commit_files(local_path, summary, replace)
            .map_err(|source| HfHubError::UploadFailed {
                local_path: local_path.to_path_buf(),
                source,
            })
    }

    fn commit_files(&self, local_path: &Path, summary: &str, replace: bool) -> Result<()> {
        let mut paths = vec![];
        collect_files(local_path, &mut paths)?;
        paths.sort();

        let files = paths
            .iter()
            .map(|p| -> Result<CommitFile> {
                Ok(CommitFile {
                    path_in_repo: self.repo_path(p)?,
                    content: fs::read(p)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let deleted_folders = if replace {
            vec![self.repo_path(local_path)?]
        } else {
            vec![]
        };

        let n = files.len();
        self.api.create_commit(
            &self.config.repo_id,
            &self.config.revision,
            summary,
            &deleted_folders,
            files,
        )?;
        info!("Uploaded {} files of {:?}", n, local_path);
        Ok(())
    }
}

fn collect_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_dir() {
        for entry in fs::read_dir(path)? {
            collect_files(&entry?.path(), out)?;
        }
    } else {
        out.push(path.to_path_buf());
    }
    Ok(())
}

impl DataSaver for HuggingFaceStorage {
    fn save_metadata(&mut self, metadata: &EvalMetadata) -> Result<()> {
        let path = self.local.write_metadata(metadata)?;
        self.upload(&path, &format!("Add metadata of {}", metadata.eval_id), false)?;
        Ok(())
    }

    fn save_episode(&mut self, episode: &EpisodeRecord) -> Result<()> {
        let i = episode.episode_index;
        let path = self.local.write_episode(episode)?;
        let replace = self.uploaded_episodes.contains(&i);
        self.upload(&path, &format!("Add episode {}", i), replace)?;
        self.uploaded_episodes.insert(i);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_collect_files_recursively() -> Result<()> {
        let dir = TempDir::new("collect")?;
        fs::create_dir_all(dir.path().join("a").join("b"))?;
        fs::write(dir.path().join("a").join("x.json"), "{}")?;
        fs::write(dir.path().join("a").join("b").join("y.png"), "")?;

        let mut paths = vec![];
        collect_files(&dir.path().join("a"), &mut paths)?;
        paths.sort();
        assert_eq!(
            paths,
            vec![
                dir.path().join("a").join("b").join("y.png"),
                dir.path().join("a").join("x.json"),
            ]
        );
        Ok(())
    }
}

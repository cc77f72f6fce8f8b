//! Configuration of [`HuggingFaceStorage`](crate::HuggingFaceStorage).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

fn default_hf_dir_name() -> String {
    "eval_data".to_string()
}

fn default_endpoint() -> String {
    std::env::var("HF_ENDPOINT").unwrap_or_else(|_| "https://huggingface.co".to_string())
}

fn default_revision() -> String {
    "main".to_string()
}

/// Configuration of [`HuggingFaceStorage`](crate::HuggingFaceStorage).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct HfHubConfig {
    /// Local directory written before uploading.
    pub storage_dir: PathBuf,

    /// Dataset repository, like `user/eval_logger`.
    pub repo_id: String,

    /// Directory in the repository under which the data is uploaded.
    #[serde(default = "default_hf_dir_name")]
    pub hf_dir_name: String,

    /// URL of the Hub. Defaults to `HF_ENDPOINT` or `https://huggingface.co`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Branch the commits go to.
    #[serde(default = "default_revision")]
    pub revision: String,
}

impl HfHubConfig {
    /// Creates a configuration with default directory, endpoint and revision.
    pub fn new(storage_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            repo_id: repo_id.into(),
            hf_dir_name: default_hf_dir_name(),
            endpoint: default_endpoint(),
            revision: default_revision(),
        }
    }

    /// Sets the directory in the repository.
    pub fn hf_dir_name(mut self, v: impl Into<String>) -> Self {
        self.hf_dir_name = v.into();
        self
    }

    /// Sets the URL of the Hub.
    pub fn endpoint(mut self, v: impl Into<String>) -> Self {
        self.endpoint = v.into();
        self
    }

    /// Sets the branch.
    pub fn revision(mut self, v: impl Into<String>) -> Self {
        self.revision = v.into();
        self
    }

    /// Constructs [`HfHubConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`HfHubConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_yaml() -> Result<()> {
        let config: HfHubConfig =
            serde_yaml::from_str("storage_dir: /tmp/eval\nrepo_id: lab/eval_logger\n")?;
        assert_eq!(config.hf_dir_name, "eval_data");
        assert_eq!(config.revision, "main");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/eval"));
        Ok(())
    }
}

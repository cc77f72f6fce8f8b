//! Configuration of [`LocalStorage`](super::LocalStorage).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`LocalStorage`](super::LocalStorage).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LocalStorageConfig {
    /// Directory under which session directories are created.
    pub storage_dir: PathBuf,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: std::env::temp_dir(),
        }
    }
}

impl LocalStorageConfig {
    /// Sets the storage directory.
    pub fn storage_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.storage_dir = v.into();
        self
    }

    /// Constructs [`LocalStorageConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`LocalStorageConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

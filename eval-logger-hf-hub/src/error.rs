//! Errors in the library.
use std::path::PathBuf;
use thiserror::Error;

/// Errors of [`HuggingFaceStorage`](crate::HuggingFaceStorage).
#[derive(Error, Debug)]
pub enum HfHubError {
    /// No access token in `HF_TOKEN` nor in the token file.
    #[error("No Hugging Face token found in HF_TOKEN or {0:?}")]
    MissingToken(Option<PathBuf>),

    /// The data was written locally but could not be uploaded.
    #[error("Failed to upload {local_path:?}, the local copy is kept")]
    UploadFailed {
        /// What was written locally.
        local_path: PathBuf,

        /// Why the upload failed.
        #[source]
        source: anyhow::Error,
    },
}

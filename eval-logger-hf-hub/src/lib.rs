//! Storage of evaluation data in a dataset repository on the Hugging Face Hub.
//!
//! [`HuggingFaceStorage`] writes every item with
//! [`LocalStorage`](eval_logger_core::LocalStorage) first, then uploads the
//! written files in one commit under `{hf_dir_name}/<path relative to storage_dir>`.
//! Frames go to LFS storage when the Hub asks for it, and an episode saved
//! again replaces its earlier folder.
//!
//! The access token is read from `HF_TOKEN` or from the token file of
//! `huggingface-cli login`. Logging in is left to the user.
//!
//! ```no_run
//! use anyhow::Result;
//! use eval_logger_core::{EvalLogger, EvalLoggerConfig};
//! use eval_logger_hf_hub::{HfHubConfig, HuggingFaceStorage};
//!
//! fn main() -> Result<()> {
//!     let config = HfHubConfig::new(std::env::temp_dir(), "lab/eval_logger");
//!     let storage = HuggingFaceStorage::build(config)?;
//!     let _logger = EvalLogger::new(&EvalLoggerConfig::default()).with_data_saver(storage);
//!     Ok(())
//! }
//! ```
pub mod commit;
mod config;
mod error;
pub mod lfs;
mod storage;
mod token;
pub use config::HfHubConfig;
pub use error::HfHubError;
pub use storage::HuggingFaceStorage;
pub use token::resolve_token;

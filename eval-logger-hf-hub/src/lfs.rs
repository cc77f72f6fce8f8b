//! Files kept in LFS storage rather than in git.
//!
//! Before a commit, the Hub is asked through its `preupload` endpoint how each
//! file goes to the repository. Files marked `lfs` are uploaded through the
//! LFS batch API, then referenced in the commit by their sha256 and size.
use crate::commit::CommitFile;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, fmt::Write};

/// Number of leading bytes the Hub looks at to classify a file.
const SAMPLE_SIZE: usize = 512;

/// How a file goes to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Inline in the commit.
    Regular,

    /// Uploaded to LFS storage, then committed as a pointer.
    Lfs,
}

impl UploadMode {
    /// Mode of a file the Hub did not classify: binary content goes to LFS.
    pub fn guess(content: &[u8]) -> Self {
        if content[..content.len().min(SAMPLE_SIZE)].contains(&0) {
            UploadMode::Lfs
        } else {
            UploadMode::Regular
        }
    }
}

#[derive(Serialize)]
struct PreuploadFile<'a> {
    path: &'a str,
    sample: String,
    size: usize,
}

/// Body of `POST {endpoint}/api/datasets/{repo_id}/preupload/{revision}`.
#[derive(Serialize)]
pub(crate) struct PreuploadRequest<'a> {
    files: Vec<PreuploadFile<'a>>,
}

impl<'a> PreuploadRequest<'a> {
    pub(crate) fn new(files: &'a [CommitFile]) -> Self {
        let files = files
            .iter()
            .map(|f| PreuploadFile {
                path: &f.path_in_repo,
                sample: base64::engine::general_purpose::STANDARD
                    .encode(&f.content[..f.content.len().min(SAMPLE_SIZE)]),
                size: f.content.len(),
            })
            .collect();
        Self { files }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreuploadEntry {
    path: String,
    upload_mode: UploadMode,
}

/// Response of the `preupload` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct PreuploadResponse {
    files: Vec<PreuploadEntry>,
}

impl PreuploadResponse {
    /// Modes of `files` in the same order, guessed for files missing in the response.
    pub(crate) fn upload_modes(&self, files: &[CommitFile]) -> Vec<UploadMode> {
        let modes: HashMap<&str, UploadMode> = self
            .files
            .iter()
            .map(|e| (e.path.as_str(), e.upload_mode))
            .collect();
        files
            .iter()
            .map(|f| match modes.get(f.path_in_repo.as_str()) {
                Some(mode) => *mode,
                None => UploadMode::guess(&f.content),
            })
            .collect()
    }
}

/// Identifies the content of a file in LFS storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LfsPointer {
    /// Hex-encoded sha256 of the content.
    pub oid: String,

    /// Size of the content in bytes.
    pub size: usize,
}

impl LfsPointer {
    /// Pointer of `content`.
    pub fn new(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let mut oid = String::with_capacity(64);
        for b in digest.iter() {
            let _ = write!(oid, "{:02x}", b);
        }
        Self {
            oid,
            size: content.len(),
        }
    }
}

/// Body of `POST {endpoint}/datasets/{repo_id}.git/info/lfs/objects/batch`.
#[derive(Serialize)]
pub(crate) struct BatchRequest<'a> {
    operation: &'static str,
    transfers: [&'static str; 1],
    objects: &'a [LfsPointer],
    hash_algo: &'static str,
}

impl<'a> BatchRequest<'a> {
    pub(crate) fn upload(objects: &'a [LfsPointer]) -> Self {
        Self {
            operation: "upload",
            transfers: ["basic"],
            objects,
            hash_algo: "sha256",
        }
    }
}

/// Response of the LFS batch API.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchResponse {
    pub objects: Vec<BatchObject>,
}

/// What to do with one object. No actions means it is already stored.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchObject {
    pub oid: String,
    pub actions: Option<BatchActions>,
    pub error: Option<BatchError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchActions {
    pub upload: Option<BatchAction>,
    pub verify: Option<BatchAction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchAction {
    pub href: String,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchError {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::{json, Value};

    fn file(path: &str, content: &[u8]) -> CommitFile {
        CommitFile {
            path_in_repo: path.to_string(),
            content: content.to_vec(),
        }
    }

    #[test]
    fn test_upload_modes_follow_the_hub() -> Result<()> {
        let files = vec![
            file("eval_data/abc/traj_0/traj.json", b"{}"),
            file("eval_data/abc/traj_0/frames/000000.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            file("eval_data/abc/traj_0/notes.bin", b"\0\x01"),
            file("eval_data/abc/traj_0/notes.txt", b"success"),
        ];
        let response: PreuploadResponse = serde_json::from_value(json!({
            "files": [
                {"path": "eval_data/abc/traj_0/traj.json", "uploadMode": "regular"},
                {"path": "eval_data/abc/traj_0/frames/000000.png", "uploadMode": "lfs"},
            ]
        }))?;

        assert_eq!(
            response.upload_modes(&files),
            vec![
                UploadMode::Regular,
                UploadMode::Lfs,
                UploadMode::Lfs,
                UploadMode::Regular
            ]
        );
        Ok(())
    }

    #[test]
    fn test_preupload_request_samples_the_head() -> Result<()> {
        let files = vec![file("a.bin", &[7u8; 600])];
        let body = serde_json::to_value(PreuploadRequest::new(&files))?;

        assert_eq!(body["files"][0]["path"], "a.bin");
        assert_eq!(body["files"][0]["size"], 600);
        let sample = body["files"][0]["sample"].as_str().unwrap_or_default();
        let decoded = base64::engine::general_purpose::STANDARD.decode(sample)?;
        assert_eq!(decoded.len(), SAMPLE_SIZE);
        Ok(())
    }

    #[test]
    fn test_lfs_pointer_is_sha256() {
        let pointer = LfsPointer::new(b"hello");
        assert_eq!(
            pointer.oid,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(pointer.size, 5);
    }

    #[test]
    fn test_batch_request_and_response() -> Result<()> {
        let pointers = vec![LfsPointer::new(b"hello")];
        let body = serde_json::to_value(BatchRequest::upload(&pointers))?;
        assert_eq!(body["operation"], "upload");
        assert_eq!(body["transfers"], json!(["basic"]));
        assert_eq!(body["hash_algo"], "sha256");
        assert_eq!(body["objects"][0]["oid"], Value::from(pointers[0].oid.clone()));
        assert_eq!(body["objects"][0]["size"], 5);

        let response: BatchResponse = serde_json::from_value(json!({
            "objects": [
                {
                    "oid": "aa",
                    "size": 5,
                    "actions": {
                        "upload": {"href": "https://lfs/aa", "header": {"X-Amz-Date": "today"}},
                        "verify": {"href": "https://hub/verify"}
                    }
                },
                {"oid": "bb", "size": 3},
                {"oid": "cc", "size": 1, "error": {"code": 422, "message": "too large"}}
            ]
        }))?;
        let upload = response.objects[0]
            .actions
            .as_ref()
            .and_then(|a| a.upload.as_ref())
            .map(|a| (a.href.as_str(), a.header.get("X-Amz-Date").map(String::as_str)));
        assert_eq!(upload, Some(("https://lfs/aa", Some("today"))));
        assert!(response.objects[1].actions.is_none());
        assert_eq!(response.objects[2].error.as_ref().map(|e| e.code), Some(422));
        Ok(())
    }
}

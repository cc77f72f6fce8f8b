//! Commits to a dataset repository through the Hub's commit endpoint.
//!
//! A commit is a single `POST {endpoint}/api/datasets/{repo_id}/commit/{revision}`
//! with an NDJSON body: a header line followed by one line per operation.
//! Small text files carry their content in base64, while the others are
//! uploaded to LFS storage first and referenced by their [`LfsPointer`].
use crate::lfs::{
    BatchRequest, BatchResponse, LfsPointer, PreuploadRequest, PreuploadResponse, UploadMode,
};
use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use log::debug;
use reqwest::{
    blocking::{Client, RequestBuilder},
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::Serialize;
use std::{
    collections::HashMap,
    path::{Component, Path},
};

const LFS_CONTENT_TYPE: &str = "application/vnd.git-lfs+json";

/// A file to add to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitFile {
    /// Destination in the repository, `/`-separated.
    pub path_in_repo: String,

    /// Content of the file.
    pub content: Vec<u8>,
}

/// A change made by a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Removes a folder with everything under it.
    DeleteFolder(String),

    /// Adds a file with its content inline.
    AddRegular(CommitFile),

    /// Adds a file already uploaded to LFS storage.
    AddLfs {
        /// Destination in the repository.
        path_in_repo: String,

        /// Content of the file in LFS storage.
        pointer: LfsPointer,
    },
}

#[derive(Serialize)]
#[serde(tag = "key", content = "value", rename_all = "camelCase")]
enum Line<'a> {
    Header {
        summary: &'a str,
        description: &'a str,
    },
    DeletedFolder {
        path: &'a str,
    },
    File {
        content: String,
        path: &'a str,
        encoding: &'a str,
    },
    LfsFile {
        path: &'a str,
        algo: &'a str,
        oid: &'a str,
        size: usize,
    },
}

impl<'a> From<&'a Operation> for Line<'a> {
    fn from(op: &'a Operation) -> Self {
        match op {
            Operation::DeleteFolder(path) => Line::DeletedFolder {
                path: path.as_str(),
            },
            Operation::AddRegular(file) => Line::File {
                content: base64::engine::general_purpose::STANDARD.encode(&file.content),
                path: file.path_in_repo.as_str(),
                encoding: "base64",
            },
            Operation::AddLfs {
                path_in_repo,
                pointer,
            } => Line::LfsFile {
                path: path_in_repo.as_str(),
                algo: "sha256",
                oid: pointer.oid.as_str(),
                size: pointer.size,
            },
        }
    }
}

/// Builds the NDJSON body of a commit applying `operations` in order.
pub fn commit_body(summary: &str, operations: &[Operation]) -> Result<String> {
    let mut body = serde_json::to_string(&Line::Header {
        summary,
        description: "",
    })?;
    for op in operations {
        body.push('\n');
        body.push_str(&serde_json::to_string(&Line::from(op))?);
    }
    body.push('\n');
    Ok(body)
}

/// Destination of a file at `relpath` under the local storage directory.
pub fn path_in_repo(hf_dir_name: &str, relpath: &Path) -> String {
    let mut parts: Vec<String> = vec![];
    if !hf_dir_name.is_empty() {
        parts.push(hf_dir_name.trim_matches('/').to_string());
    }
    for c in relpath.components() {
        if let Component::Normal(s) = c {
            parts.push(s.to_string_lossy().into_owned());
        }
    }
    parts.join("/")
}

/// Client of the commit endpoint of a dataset repository.
pub struct HubApi {
    client: Client,
    endpoint: String,
    token: String,
}

impl HubApi {
    /// Creates a client of the Hub at `endpoint`.
    pub fn new(endpoint: impl AsRef<str>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.as_ref().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn commit_url(&self, repo_id: &str, revision: &str) -> String {
        format!(
            "{}/api/datasets/{}/commit/{}",
            self.endpoint, repo_id, revision
        )
    }

    fn preupload_url(&self, repo_id: &str, revision: &str) -> String {
        format!(
            "{}/api/datasets/{}/preupload/{}",
            self.endpoint, repo_id, revision
        )
    }

    fn lfs_batch_url(&self, repo_id: &str) -> String {
        format!(
            "{}/datasets/{}.git/info/lfs/objects/batch",
            self.endpoint, repo_id
        )
    }

    /// Deletes `deleted_folders`, then adds `files`, in a single commit.
    ///
    /// Files the Hub wants in LFS storage are uploaded there before the commit.
    pub fn create_commit(
        &self,
        repo_id: &str,
        revision: &str,
        summary: &str,
        deleted_folders: &[String],
        files: Vec<CommitFile>,
    ) -> Result<()> {
        let modes = self.preupload(repo_id, revision, &files)?;

        let mut operations: Vec<Operation> = deleted_folders
            .iter()
            .map(|p| Operation::DeleteFolder(p.clone()))
            .collect();
        let mut lfs_files = vec![];
        for (file, mode) in files.into_iter().zip(modes) {
            match mode {
                UploadMode::Regular => operations.push(Operation::AddRegular(file)),
                UploadMode::Lfs => lfs_files.push(file),
            }
        }
        if !lfs_files.is_empty() {
            self.upload_lfs(repo_id, &lfs_files)?;
            operations.extend(lfs_files.into_iter().map(|file| Operation::AddLfs {
                pointer: LfsPointer::new(&file.content),
                path_in_repo: file.path_in_repo,
            }));
        }

        let url = self.commit_url(repo_id, revision);
        let body = commit_body(summary, &operations)?;
        debug!("Commit {} operations to {}", operations.len(), url);
        self.client
            .post(&url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?;
        Ok(())
    }

    fn preupload(
        &self,
        repo_id: &str,
        revision: &str,
        files: &[CommitFile],
    ) -> Result<Vec<UploadMode>> {
        if files.is_empty() {
            return Ok(vec![]);
        }
        let url = self.preupload_url(repo_id, revision);
        let response: PreuploadResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PreuploadRequest::new(files))
            .send()
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?
            .json()?;
        Ok(response.upload_modes(files))
    }

    fn upload_lfs(&self, repo_id: &str, files: &[CommitFile]) -> Result<()> {
        let mut contents: HashMap<String, (&[u8], LfsPointer)> = HashMap::new();
        for file in files {
            let pointer = LfsPointer::new(&file.content);
            contents.insert(pointer.oid.clone(), (file.content.as_slice(), pointer));
        }
        let pointers: Vec<LfsPointer> = contents.values().map(|(_, p)| p.clone()).collect();

        let url = self.lfs_batch_url(repo_id);
        let batch: BatchResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, LFS_CONTENT_TYPE)
            .header(CONTENT_TYPE, LFS_CONTENT_TYPE)
            .body(serde_json::to_string(&BatchRequest::upload(&pointers))?)
            .send()
            .with_context(|| format!("POST {}", url))?
            .error_for_status()?
            .json()?;

        for object in batch.objects {
            if let Some(e) = object.error {
                bail!("LFS storage refused {}: {} {}", object.oid, e.code, e.message);
            }
            let actions = match object.actions {
                Some(actions) => actions,
                None => {
                    debug!("LFS object {} already stored", object.oid);
                    continue;
                }
            };
            let oid = &object.oid;
            let (content, pointer) = contents
                .get(oid)
                .ok_or_else(|| anyhow!("Unexpected LFS object {}", oid))?;

            if let Some(upload) = actions.upload {
                let req = self.client.put(&upload.href).body(content.to_vec());
                with_headers(req, &upload.header)
                    .send()
                    .with_context(|| format!("PUT {}", upload.href))?
                    .error_for_status()?;
            }
            if let Some(verify) = actions.verify {
                let req = self
                    .client
                    .post(&verify.href)
                    .bearer_auth(&self.token)
                    .json(pointer);
                with_headers(req, &verify.header)
                    .send()
                    .with_context(|| format!("POST {}", verify.href))?
                    .error_for_status()?;
            }
        }
        debug!("Uploaded {} LFS objects", pointers.len());
        Ok(())
    }
}

fn with_headers(mut req: RequestBuilder, headers: &HashMap<String, String>) -> RequestBuilder {
    for (k, v) in headers.iter() {
        req = req.header(k.as_str(), v.as_str());
    }
    req
}

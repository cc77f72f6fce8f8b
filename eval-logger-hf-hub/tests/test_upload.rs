use anyhow::Result;
use eval_logger_core::{
    Collaborator, DataSaver, EpisodeRecord, EvalLogger, EvalLoggerConfig, EvalMetadata,
    RobotType,
};
use eval_logger_hf_hub::{HfHubConfig, HfHubError, HuggingFaceStorage};
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use std::{
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};
use tempdir::TempDir;

fn storage(dir: &TempDir) -> HuggingFaceStorage {
    // Nothing listens on the discard port
    let config = HfHubConfig::new(dir.path(), "lab/eval_logger").endpoint("http://127.0.0.1:9");
    HuggingFaceStorage::with_token(config, "hf_test")
}

#[test]
fn test_failed_upload_keeps_local_copy() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new("hf_hub")?;
    let mut logger = EvalLogger::new(&EvalLoggerConfig::default()).with_data_saver(storage(&dir));

    let metadata = EvalMetadata::new("lab", "panda", RobotType::Franka, "tester", None);
    let err = logger.save_metadata(&metadata).unwrap_err();
    assert!(err.failed(Collaborator::Storage));

    let frames = vec![RgbImage::new(8, 8); 3];
    let err = logger
        .log_episode(EpisodeRecord::new(0, "pick up cup", true, frames))
        .unwrap_err();
    let local_path = match err
        .error_of(Collaborator::Storage)
        .and_then(|e| e.downcast_ref::<HfHubError>())
    {
        Some(HfHubError::UploadFailed { local_path, .. }) => local_path.clone(),
        e => panic!("unexpected error: {:?}", e),
    };

    let run_dir = dir.path().join(metadata.eval_id.as_str());
    assert_eq!(local_path, run_dir.join("traj_0"));
    assert!(local_path.join("traj.json").exists());
    assert_eq!(std::fs::read_dir(local_path.join("frames"))?.count(), 3);
    assert!(run_dir.join("metadata.json").exists());
    Ok(())
}

/// A request received by [`FakeHub`].
struct Request {
    method: String,
    path: String,
    body: Vec<u8>,
}

/// Answers the endpoints used by [`HuggingFaceStorage`] and records requests.
///
/// PNG files are classified as `lfs`, everything else as `regular`.
struct FakeHub {
    url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeHub {
    fn spawn() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let url = format!("http://{}", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(vec![]));
        let (recorded, base) = (requests.clone(), url.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                if let Ok(req) = read_request(&mut stream) {
                    let body = respond(&base, &req);
                    recorded.lock().unwrap().push(req);
                    let _ = write!(
                        stream,
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                }
            }
        });
        Ok(Self { url, requests })
    }

    fn commit_bodies(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path.ends_with("/commit/main"))
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect()
    }

    fn count(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

fn read_request(stream: &mut TcpStream) -> Result<Request> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((k, v)) = header.split_once(':') {
            if k.eq_ignore_ascii_case("content-length") {
                content_length = v.trim().parse()?;
            }
        }
    }
    let mut body = vec![0; content_length];
    reader.read_exact(&mut body)?;
    Ok(Request { method, path, body })
}

fn respond(base: &str, req: &Request) -> String {
    let body: Value = serde_json::from_slice(&req.body).unwrap_or(Value::Null);
    if req.path.ends_with("/preupload/main") {
        let files: Vec<Value> = body["files"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|f| {
                let path = f["path"].as_str().unwrap_or_default();
                let mode = if path.ends_with(".png") { "lfs" } else { "regular" };
                json!({"path": path, "uploadMode": mode})
            })
            .collect();
        json!({ "files": files }).to_string()
    } else if req.path.ends_with("/info/lfs/objects/batch") {
        let objects: Vec<Value> = body["objects"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|o| {
                let oid = o["oid"].as_str().unwrap_or_default();
                json!({
                    "oid": oid,
                    "size": o["size"],
                    "actions": {
                        "upload": {"href": format!("{}/lfs/{}", base, oid)},
                        "verify": {"href": format!("{}/lfs/verify", base)}
                    }
                })
            })
            .collect();
        json!({ "objects": objects }).to_string()
    } else {
        "{}".to_string()
    }
}

fn distinct_frames(n: usize, offset: u8) -> Vec<RgbImage> {
    (0..n)
        .map(|i| RgbImage::from_pixel(8, 8, Rgb([offset, i as u8, 0])))
        .collect()
}

fn lines(body: &str) -> Result<Vec<Value>> {
    Ok(body
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?)
}

#[test]
fn test_resaved_episode_replaces_remote_folder() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let hub = FakeHub::spawn()?;
    let dir = TempDir::new("hf_hub")?;
    let config = HfHubConfig::new(dir.path(), "lab/eval_logger").endpoint(&hub.url);
    let mut storage = HuggingFaceStorage::with_token(config, "hf_test");

    let metadata = EvalMetadata::new("lab", "panda", RobotType::Franka, "tester", None);
    storage.save_metadata(&metadata)?;
    storage.save_episode(&EpisodeRecord::new(0, "pick up cup", false, distinct_frames(5, 0)))?;
    storage.save_episode(&EpisodeRecord::new(0, "pick up cup", true, distinct_frames(2, 9)))?;

    let commits = hub.commit_bodies();
    assert_eq!(commits.len(), 3);
    let traj_dir = format!("eval_data/{}/traj_0", metadata.eval_id.as_str());

    let meta = lines(&commits[0])?;
    assert_eq!(meta.len(), 2);
    assert_eq!(meta[1]["key"], "file");

    let first = lines(&commits[1])?;
    assert!(first.iter().all(|l| l["key"] != "deletedFolder"));
    assert_eq!(first.iter().filter(|l| l["key"] == "lfsFile").count(), 5);

    let second = lines(&commits[2])?;
    assert_eq!(second[0]["key"], "header");
    assert_eq!(second[1]["key"], "deletedFolder");
    assert_eq!(second[1]["value"]["path"], Value::from(traj_dir.clone()));
    let added: Vec<&str> = second[2..]
        .iter()
        .map(|l| l["value"]["path"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(added.len(), 3);
    assert!(added.iter().all(|p| p.starts_with(&traj_dir)));
    assert!(added.contains(&format!("{}/traj.json", traj_dir).as_str()));
    assert!(second[2..]
        .iter()
        .filter(|l| l["key"] == "lfsFile")
        .all(|l| l["value"]["path"].as_str().unwrap_or_default().ends_with(".png")));

    // frames of both saves went to LFS storage
    assert_eq!(hub.count("PUT"), 7);
    Ok(())
}

//! Shared fixtures for app integration tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crossway_core::{LaneVideo, VideoSelection};
use crossway_upload::{TransportResponse, UploadClient, UploadError, UploadRequest, UploadTransport};
use tokio::sync::Notify;
use url::Url;

/// Response from the end-to-end example: lane2 carries an ambulance.
#[allow(dead_code)]
pub const EXAMPLE_RESPONSE: &str = r#"{
    "priority": {"lane1": 2, "lane2": 1, "lane3": 4, "lane4": 3},
    "optimized_times": {"lane1": 30, "lane2": 45, "lane3": 20, "lane4": 25},
    "traffic_data": [
        {"direction": "lane2", "ambulance_detected": true},
        {"direction": "lane1", "ambulance_detected": false},
        {"direction": "lane4", "ambulance_detected": false},
        {"direction": "lane3", "ambulance_detected": false}
    ]
}"#;

/// Transport that records every upload and answers with a fixed response.
#[derive(Debug)]
pub struct ScriptedTransport {
    requests: Mutex<Vec<UploadRequest>>,
    response: Result<TransportResponse, UploadError>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Answers every request with `status` and `body`.
    pub fn answering(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            response: Ok(TransportResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
        })
    }

    /// Fails every request with `error`.
    pub fn failing(error: UploadError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            response: Err(error),
        })
    }

    /// Number of uploads seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request lock should work").len()
    }

    /// Copies of the uploads seen so far.
    pub fn recorded(&self) -> Vec<UploadRequest> {
        self.requests.lock().expect("request lock should work").clone()
    }
}

#[async_trait]
impl UploadTransport for ScriptedTransport {
    async fn post_multipart(
        &self,
        _endpoint: &Url,
        request: &UploadRequest,
    ) -> Result<TransportResponse, UploadError> {
        self.requests
            .lock()
            .expect("request lock should work")
            .push(request.clone());
        self.response.clone()
    }

    async fn get(&self, _endpoint: &Url) -> Result<TransportResponse, UploadError> {
        self.response.clone()
    }
}

/// Transport whose requests never finish; signals each time one starts.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct StalledTransport {
    /// Notified when a request reaches the transport.
    pub started: Notify,
}

#[async_trait]
impl UploadTransport for StalledTransport {
    async fn post_multipart(
        &self,
        _endpoint: &Url,
        _request: &UploadRequest,
    ) -> Result<TransportResponse, UploadError> {
        self.started.notify_one();
        std::future::pending().await
    }

    async fn get(&self, _endpoint: &Url) -> Result<TransportResponse, UploadError> {
        self.started.notify_one();
        std::future::pending().await
    }
}

/// Builds a client against a fake service address.
#[allow(dead_code)]
pub fn client_with<T: UploadTransport + 'static>(transport: Arc<T>) -> UploadClient {
    UploadClient::new("http://analysis.test:5000", transport).expect("client should build")
}

/// Creates a selection of `count` small, distinct videos.
#[allow(dead_code)]
pub fn selection_of(count: usize) -> VideoSelection {
    VideoSelection::new(
        (0..count)
            .map(|index| {
                LaneVideo::new(
                    format!("lane{}.mp4", index + 1),
                    vec![index as u8; 16 + index],
                )
            })
            .collect(),
    )
}

/// Writes `count` small video files into a fresh scratch directory named by
/// `tag` and returns their paths in lane order.
#[allow(dead_code)]
pub fn write_videos(tag: &str, count: usize) -> Vec<PathBuf> {
    let dir = std::env::temp_dir().join(format!("crossway-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    (0..count)
        .map(|index| {
            let path = dir.join(format!("lane{}.mp4", index + 1));
            std::fs::write(&path, vec![index as u8; 16 + index])
                .expect("fixture should be writable");
            path
        })
        .collect()
}

/// Shell line selecting `paths`.
#[allow(dead_code)]
pub fn select_line(paths: &[PathBuf]) -> String {
    let mut line = String::from("select");
    for path in paths {
        line.push(' ');
        line.push_str(&path.display().to_string());
    }
    line.push('\n');
    line
}

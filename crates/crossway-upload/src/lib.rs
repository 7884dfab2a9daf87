#![warn(missing_docs)]
//! # crossway-upload
//!
//! ## Purpose
//! Submits a four-lane video set to the analysis service and resolves the
//! exchange into a [`SubmissionOutcome`].
//!
//! ## Responsibilities
//! - Encode the videos as one multipart request with a repeated `videos`
//!   field, in lane order.
//! - Issue exactly one request per submission through an injectable
//!   [`UploadTransport`]; there is no retry.
//! - Classify transport failures and keep their detail out of user-facing
//!   text.
//! - Probe service health via `GET /ping`.
//!
//! ## Data flow
//! [`LaneVideoSet`] -> [`build_upload_request`] -> [`UploadTransport`] ->
//! [`TransportResponse`] -> analysis contract parsing -> [`SubmissionOutcome`].
//!
//! ## Ownership and lifetimes
//! [`UploadRequest`] parts share the selection's `Arc<[u8]>` buffers; the
//! reqwest transport copies them into the outgoing body only at send time.
//!
//! ## Error model
//! Transport-level problems are [`UploadError`] values. [`UploadClient::submit`]
//! never returns them: every path resolves to a [`SubmissionOutcome`].
//!
//! ## Security and privacy notes
//! Video bytes are never logged. Uploads are identified in logs by
//! [`selection_fingerprint`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossway_analysis_contract::{AnalysisReply, AnalysisResult, parse_analysis_response};
use crossway_core::LaneVideoSet;
use log::{info, warn};
use reqwest::multipart::{Form, Part};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Upload route, relative to the service base address.
pub const UPLOAD_PATH: &str = "upload";

/// Health probe route, relative to the service base address.
pub const HEALTH_PATH: &str = "ping";

/// Multipart field name repeated once per lane video.
pub const VIDEO_FIELD: &str = "videos";

/// Text shown to the operator for any transport failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Upload failed. Please try again later.";

/// One multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPart {
    /// Form field name.
    pub field: &'static str,
    /// File name sent in the part's content disposition.
    pub file_name: String,
    /// Opaque video bytes.
    pub bytes: Arc<[u8]>,
}

/// Fully encoded upload request, independent of the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Parts in lane order; the service derives lanes from this order.
    pub parts: Vec<UploadPart>,
    /// Content fingerprint used for log correlation.
    pub fingerprint: String,
}

impl UploadRequest {
    /// Combined size of all part payloads.
    pub fn payload_bytes(&self) -> usize {
        self.parts.iter().map(|part| part.bytes.len()).sum()
    }
}

/// Encodes a validated video set as an upload request.
pub fn build_upload_request(videos: &LaneVideoSet) -> UploadRequest {
    let parts = videos
        .iter()
        .map(|(_, video)| UploadPart {
            field: VIDEO_FIELD,
            file_name: video.file_name().to_string(),
            bytes: video.shared_bytes(),
        })
        .collect();

    UploadRequest {
        parts,
        fingerprint: selection_fingerprint(videos),
    }
}

/// Computes a stable SHA-256 fingerprint over names and bytes in lane order.
pub fn selection_fingerprint(videos: &LaneVideoSet) -> String {
    let mut hasher = Sha256::new();
    for (lane, video) in videos.iter() {
        hasher.update(lane.id().as_bytes());
        hasher.update((video.file_name().len() as u64).to_le_bytes());
        hasher.update(video.file_name().as_bytes());
        hasher.update((video.len() as u64).to_le_bytes());
        hasher.update(video.bytes());
    }
    hex::encode(hasher.finalize())
}

/// Raw HTTP exchange result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Abstract HTTP transport used by [`UploadClient`].
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Posts one multipart request.
    async fn post_multipart(
        &self,
        endpoint: &Url,
        request: &UploadRequest,
    ) -> Result<TransportResponse, UploadError>;

    /// Issues a body-less GET request.
    async fn get(&self, endpoint: &Url) -> Result<TransportResponse, UploadError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests fail after `timeout`.
    ///
    /// # Errors
    /// Returns [`UploadError::Network`] when the TLS backend cannot initialise.
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UploadTransport for ReqwestTransport {
    async fn post_multipart(
        &self,
        endpoint: &Url,
        request: &UploadRequest,
    ) -> Result<TransportResponse, UploadError> {
        let form = request.parts.iter().fold(Form::new(), |form, part| {
            form.part(
                part.field,
                Part::bytes(part.bytes.to_vec()).file_name(part.file_name.clone()),
            )
        });

        let response = self
            .client
            .post(endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_response(response).await
    }

    async fn get(&self, endpoint: &Url) -> Result<TransportResponse, UploadError> {
        let response = self
            .client
            .get(endpoint.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_response(response).await
    }
}

async fn read_response(response: reqwest::Response) -> Result<TransportResponse, UploadError> {
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(TransportResponse {
        status,
        body: body.to_vec(),
    })
}

fn map_reqwest_error(error: reqwest::Error) -> UploadError {
    if error.is_timeout() {
        UploadError::Timeout
    } else {
        UploadError::Network(error.to_string())
    }
}

/// Broad failure category used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connection could not be made or broke mid-exchange.
    Network,
    /// Request did not finish within the configured timeout.
    Timeout,
    /// Service answered with a non-2xx status.
    Status,
    /// Body was not a valid analysis response.
    MalformedBody,
    /// Client was misconfigured.
    Configuration,
}

/// Maps an upload error to its failure class.
pub fn classify_upload_error(error: &UploadError) -> FailureClass {
    match error {
        UploadError::InvalidEndpoint(_) => FailureClass::Configuration,
        UploadError::Network(_) => FailureClass::Network,
        UploadError::Timeout => FailureClass::Timeout,
        UploadError::Client(_) | UploadError::Server(_) | UploadError::UnexpectedStatus(_) => {
            FailureClass::Status
        }
        UploadError::MalformedBody(_) => FailureClass::MalformedBody,
    }
}

/// A submission that failed below the analysis layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Failure category.
    pub class: FailureClass,
    /// Diagnostic detail; logged, not shown to the operator.
    pub detail: String,
}

impl TransportFailure {
    /// Wraps an upload error.
    pub fn from_error(error: &UploadError) -> Self {
        Self {
            class: classify_upload_error(error),
            detail: error.to_string(),
        }
    }

    /// Operator-facing message.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

/// Terminal result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Service returned a recommendation.
    Completed(AnalysisResult),
    /// Service accepted the request but answered with an `error` message.
    Rejected(String),
    /// Request failed at the transport level.
    Failed(TransportFailure),
}

/// Client for the analysis service.
#[derive(Clone)]
pub struct UploadClient {
    upload_endpoint: Url,
    health_endpoint: Url,
    transport: Arc<dyn UploadTransport>,
}

impl UploadClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    /// Returns [`UploadError::InvalidEndpoint`] when the URL does not parse or
    /// is not `http`/`https`.
    pub fn new(base_url: &str, transport: Arc<dyn UploadTransport>) -> Result<Self, UploadError> {
        let base = service_base(base_url)?;
        Ok(Self {
            upload_endpoint: join_endpoint(&base, UPLOAD_PATH)?,
            health_endpoint: join_endpoint(&base, HEALTH_PATH)?,
            transport,
        })
    }

    /// Resolved upload endpoint.
    pub fn upload_endpoint(&self) -> &Url {
        &self.upload_endpoint
    }

    /// Resolved health endpoint.
    pub fn health_endpoint(&self) -> &Url {
        &self.health_endpoint
    }

    /// Uploads the four lane videos and resolves the service's answer.
    ///
    /// Issues exactly one request. Callers are responsible for keeping at most
    /// one submission in flight.
    pub async fn submit(&self, videos: &LaneVideoSet) -> SubmissionOutcome {
        let request = build_upload_request(videos);
        let started = Instant::now();
        info!(
            "uploading {} videos ({} bytes) fingerprint={}",
            request.parts.len(),
            request.payload_bytes(),
            &request.fingerprint[..12]
        );

        let reply = match self
            .transport
            .post_multipart(&self.upload_endpoint, &request)
            .await
        {
            Ok(response) => interpret_upload_response(response),
            Err(error) => Err(error),
        };

        let elapsed = format!("{:?}", started.elapsed());
        match reply {
            Ok(AnalysisReply::Completed(result)) => {
                info!(duration = &*elapsed; "analysis completed");
                SubmissionOutcome::Completed(result)
            }
            Ok(AnalysisReply::Rejected(message)) => {
                warn!(duration = &*elapsed; "analysis rejected by service: {message}");
                SubmissionOutcome::Rejected(message)
            }
            Err(error) => {
                let failure = TransportFailure::from_error(&error);
                warn!(duration = &*elapsed; "upload failed ({:?}): {}", failure.class, failure.detail);
                SubmissionOutcome::Failed(failure)
            }
        }
    }

    /// Checks that the service answers its health route with a 2xx status.
    ///
    /// # Errors
    /// Returns the transport error or a status error for non-2xx answers.
    pub async fn ping(&self) -> Result<(), UploadError> {
        let response = self.transport.get(&self.health_endpoint).await?;
        check_status(response.status)
    }
}

fn interpret_upload_response(response: TransportResponse) -> Result<AnalysisReply, UploadError> {
    if let Err(error) = check_status(response.status) {
        if !response.body.is_empty() {
            warn!(
                "service answered {}: {}",
                response.status,
                String::from_utf8_lossy(&response.body)
            );
        }
        return Err(error);
    }

    parse_analysis_response(&response.body)
        .map_err(|error| UploadError::MalformedBody(error.to_string()))
}

fn check_status(status: u16) -> Result<(), UploadError> {
    match status {
        200..=299 => Ok(()),
        400..=499 => Err(UploadError::Client(status)),
        500..=599 => Err(UploadError::Server(status)),
        _ => Err(UploadError::UnexpectedStatus(status)),
    }
}

fn service_base(base_url: &str) -> Result<Url, UploadError> {
    let mut base = Url::parse(base_url.trim())
        .map_err(|error| UploadError::InvalidEndpoint(format!("invalid service url: {error}")))?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(UploadError::InvalidEndpoint(format!(
            "unsupported scheme {}",
            base.scheme()
        )));
    }

    // Relative joins replace the last segment unless the path ends in '/'.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn join_endpoint(base: &Url, path: &str) -> Result<Url, UploadError> {
    base.join(path)
        .map_err(|error| UploadError::InvalidEndpoint(format!("cannot resolve {path}: {error}")))
}

/// Upload errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Service address is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Connection-level failure.
    #[error("network failure: {0}")]
    Network(String),
    /// Request exceeded the transport timeout.
    #[error("request timed out")]
    Timeout,
    /// 4xx answer.
    #[error("service rejected request with status {0}")]
    Client(u16),
    /// 5xx answer.
    #[error("service failed with status {0}")]
    Server(u16),
    /// Any other non-2xx answer.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    /// Body could not be decoded as an analysis response.
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

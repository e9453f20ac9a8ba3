//! Upload Client
//!
//! Two transfer modes against a file receiver:
//! - `POST /post`: every file as one part of a single multipart body
//! - `PUT /<name>`: one raw-body request per file, sent one after another
//!
//! Request bodies are produced on a separate task and streamed through a
//! bounded channel, so file contents are never held in memory whole.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, StatusCode};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{ProducerError, UploadError};
use crate::multipart::{guess_mime, multipart_producer, Boundary};
use crate::producer::{body_channel, raw_producer};

/// Per-request timeout; large uploads over slow links take a while
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Largest response body read back from the receiver: 1 GiB
pub const MAX_RESPONSE_BODY: u64 = 1024 * 1024 * 1024;

/// Path of the multipart endpoint
pub const MULTIPART_PATH: &str = "/post";

/// Header in which the receiver reports how many PUT bytes it saw
pub const RECEIVED_BYTES_HEADER: &str = "x-received-bytes";

/// How files are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// One POST with a multipart body
    Multipart,
    /// One PUT per file with the raw bytes as body
    Raw,
}

/// Everything one run of the uploader sends
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub files: Vec<PathBuf>,
    pub mode: UploadMode,
}

/// What the receiver answered
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub status: StatusCode,
    pub received_bytes: Option<u64>,
    pub body: String,
}

impl fmt::Display for UploadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.body)?;
        if let Some(bytes) = self.received_bytes {
            write!(f, " ({} bytes received)", bytes)?;
        }
        Ok(())
    }
}

/// Result of one PUT
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<UploadResponse, UploadError>,
}

/// HTTP client bound to one receiver
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
    max_response_body: u64,
}

impl UploadClient {
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            max_response_body: MAX_RESPONSE_BODY,
        })
    }

    /// Override the response body ceiling
    pub fn with_max_response_body(mut self, limit: u64) -> Self {
        self.max_response_body = limit;
        self
    }

    /// Send `request` and print every response to stdout.
    ///
    /// In raw mode every file is attempted even after a failure; failures are
    /// printed to stderr and summarised as [`UploadError::Incomplete`].
    pub async fn run(&self, request: &TransferRequest) -> Result<(), UploadError> {
        match request.mode {
            UploadMode::Multipart => {
                let response = self.upload_multipart(&request.files).await?;
                println!("{}", response);
                Ok(())
            }
            UploadMode::Raw => {
                let outcomes = self.upload_raw(&request.files).await;
                let total = outcomes.len();
                let mut failed = 0;

                for outcome in outcomes {
                    match outcome.result {
                        Ok(response) => println!("{}: {}", outcome.path.display(), response),
                        Err(e) => {
                            failed += 1;
                            eprintln!("{}: {}", outcome.path.display(), e);
                        }
                    }
                }

                if failed > 0 {
                    return Err(UploadError::Incomplete { failed, total });
                }
                Ok(())
            }
        }
    }

    /// POST all `files` as one multipart body.
    ///
    /// Every path is checked before the request is opened, so a missing file
    /// means nothing is sent.
    pub async fn upload_multipart(&self, files: &[PathBuf]) -> Result<UploadResponse, UploadError> {
        for path in files {
            ensure_file(path).await?;
        }

        let boundary = Boundary::generate();
        let url = format!("{}{}", self.base_url, MULTIPART_PATH);

        tracing::info!(url = %url, files = files.len(), boundary = %boundary, "Starting multipart upload");

        let (mut sink, stream) = body_channel();
        let paths = files.to_vec();
        let part_boundary = boundary.clone();
        let producer = tokio::spawn(async move {
            let result = multipart_producer(&part_boundary, &paths, &mut sink).await;
            sink.finish(result).await
        });

        let sent = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, boundary.content_type())
            .body(Body::wrap_stream(stream))
            .send()
            .await;

        self.complete(sent, producer).await
    }

    /// PUT each file on its own, in order.
    ///
    /// A failed file does not stop the ones after it.
    pub async fn upload_raw(&self, files: &[PathBuf]) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());

        for path in files {
            let result = self.upload_one_raw(path).await;
            if let Err(e) = &result {
                tracing::warn!(path = %path.display(), error = %e, "Upload failed");
            }
            outcomes.push(FileOutcome {
                path: path.clone(),
                result,
            });
        }

        outcomes
    }

    async fn upload_one_raw(&self, path: &Path) -> Result<UploadResponse, UploadError> {
        ensure_file(path).await?;

        let name = path
            .file_name()
            .ok_or_else(|| UploadError::NotAFile(path.to_path_buf()))?
            .to_string_lossy();
        let url = format!("{}/{}", self.base_url, urlencoding::encode(&name));
        let mime = guess_mime(path);

        tracing::info!(url = %url, content_type = %mime, "Starting raw upload");

        let (mut sink, stream) = body_channel();
        let source = path.to_path_buf();
        let producer = tokio::spawn(async move {
            let result = raw_producer(&source, &mut sink).await;
            sink.finish(result).await
        });

        let sent = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, mime)
            .body(Body::wrap_stream(stream))
            .send()
            .await;

        self.complete(sent, producer).await
    }

    /// Join the producer with the request it fed.
    ///
    /// A producer failure is the root cause of a broken request, so it wins;
    /// a closed sink only means the request ended first.
    async fn complete(
        &self,
        sent: reqwest::Result<reqwest::Response>,
        producer: JoinHandle<Result<u64, ProducerError>>,
    ) -> Result<UploadResponse, UploadError> {
        let produced = producer
            .await
            .map_err(|e| UploadError::Task(e.to_string()))?;

        match produced {
            Ok(bytes) => tracing::debug!(bytes, "Request body fully produced"),
            Err(ProducerError::SinkClosed) => {
                tracing::debug!("Request ended before the body was fully produced")
            }
            Err(e) => return Err(e.into()),
        }

        self.read_response(sent?).await
    }

    async fn read_response(&self, mut response: reqwest::Response) -> Result<UploadResponse, UploadError> {
        let limit = self.max_response_body;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(UploadError::ResponseTooLarge { limit });
        }

        let status = response.status();
        let received_bytes = response
            .headers()
            .get(RECEIVED_BYTES_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(UploadError::ResponseTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UploadResponse {
            status,
            received_bytes,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Fail with [`UploadError::FileNotFound`] unless `path` is a readable regular file
async fn ensure_file(path: &Path) -> Result<(), UploadError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| UploadError::FileNotFound {
            path: path.to_path_buf(),
            source,
        })?;

    if !metadata.is_file() {
        return Err(UploadError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

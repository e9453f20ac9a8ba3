//! Error types for the file uploader

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while producing a request body from disk
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Request body closed before the file was sent")]
    SinkClosed,
}

/// Failures of a single upload request
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File not found: {}: {source}", .path.display())]
    FileNotFound { path: PathBuf, source: io::Error },

    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Body producer failed: {0}")]
    Producer(#[from] ProducerError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Response body exceeds {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("Producer task failed: {0}")]
    Task(String),

    #[error("{failed} of {total} uploads failed")]
    Incomplete { failed: usize, total: usize },
}

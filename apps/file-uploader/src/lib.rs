//! File Uploader
//!
//! Sends local files to a file receiver, either as a single
//! `multipart/form-data` POST or as one raw-body PUT per file. Bodies are
//! streamed from disk in 16 KiB chunks.

pub mod client;
pub mod config;
pub mod error;
pub mod multipart;
pub mod producer;

pub use client::{TransferRequest, UploadClient, UploadMode, UploadResponse};
pub use config::Config;
pub use error::{ProducerError, UploadError};

//! Multipart Encoder
//!
//! Streams `multipart/form-data` bodies with one part per file:
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="<path>"; filename="<path>"\r\n
//! Content-Type: <guessed type>\r\n
//! \r\n
//! <file bytes>\r\n
//! --<boundary>--\r\n
//! ```
//!
//! The boundary is a random token and is not checked against file contents;
//! a file containing the boundary line would corrupt the framing.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use uuid::Uuid;

use crate::error::ProducerError;
use crate::producer::{raw_producer, ChunkSink};

/// Content type used when the extension gives no hint
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Part delimiter, unique per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// A fresh token: 32 lowercase hex characters
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the request's `Content-Type` header
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.0)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guess a MIME type from the file extension
pub fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

/// Header block opening the part for `path`
pub fn part_header(boundary: &Boundary, path: &Path) -> Bytes {
    let name = path.to_string_lossy();
    Bytes::from(format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}\"\r\n\
         Content-Type: {mime}\r\n\
         \r\n",
        mime = guess_mime(path),
    ))
}

/// Line that ends the whole body
pub fn closing_boundary(boundary: &Boundary) -> Bytes {
    Bytes::from(format!("--{boundary}--\r\n"))
}

/// Stream a multipart body for `paths` into `sink`, in order.
///
/// Each file is opened only when its part is reached. Returns the total
/// number of bytes written.
pub async fn multipart_producer<S>(
    boundary: &Boundary,
    paths: &[PathBuf],
    sink: &mut S,
) -> Result<u64, ProducerError>
where
    S: ChunkSink + ?Sized,
{
    let mut written = 0u64;

    for path in paths {
        let header = part_header(boundary, path);
        written += header.len() as u64;
        sink.write(header).await?;

        let body = raw_producer(path, sink).await?;
        tracing::debug!(path = %path.display(), bytes = body, "Part body sent");
        written += body;

        sink.write(Bytes::from_static(b"\r\n")).await?;
        written += 2;
    }

    let closing = closing_boundary(boundary);
    written += closing.len() as u64;
    sink.write(closing).await?;

    Ok(written)
}

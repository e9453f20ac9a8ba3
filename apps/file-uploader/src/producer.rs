//! Chunked Body Producer
//!
//! Reads a file front to back in fixed-size chunks and hands each chunk to a
//! [`ChunkSink`], waiting for the sink to accept it before reading the next.
//! Nothing is buffered beyond the chunk in flight.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, Stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::ProducerError;

/// Maximum size of one chunk read from disk: 16 KiB
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Destination for produced body chunks
#[async_trait]
pub trait ChunkSink: Send {
    /// Accept one chunk. The producer does not read further until this resolves.
    async fn write(&mut self, chunk: Bytes) -> Result<(), ProducerError>;
}

/// Stream the file at `path` into `sink`.
///
/// Fails with [`ProducerError::Open`] before anything is written if the file
/// cannot be opened. Returns the number of bytes written.
pub async fn raw_producer<S>(path: &Path, sink: &mut S) -> Result<u64, ProducerError>
where
    S: ChunkSink + ?Sized,
{
    let mut file = File::open(path).await.map_err(|source| ProducerError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = file.read(&mut buf).await.map_err(|source| ProducerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }

        sink.write(Bytes::copy_from_slice(&buf[..n])).await?;
        written += n as u64;
    }

    Ok(written)
}

// ============================================================================
// Sinks
// ============================================================================

/// Sink backed by a bounded channel whose receiving end is a request body
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

/// Create a [`ChannelSink`] and the body stream it feeds.
///
/// The channel holds a single chunk, so the producer runs at most one chunk
/// ahead of the consumer.
pub fn body_channel() -> (ChannelSink, impl Stream<Item = io::Result<Bytes>> + Send + Sync + 'static) {
    let (tx, rx) = mpsc::channel(0);
    (ChannelSink { tx }, rx)
}

impl ChannelSink {
    /// Hand the producer's outcome back, poisoning the body on failure so the
    /// request carrying it is aborted.
    pub async fn finish(mut self, result: Result<u64, ProducerError>) -> Result<u64, ProducerError> {
        match &result {
            Ok(_) | Err(ProducerError::SinkClosed) => {}
            Err(e) => {
                let abort = io::Error::new(io::ErrorKind::Other, e.to_string());
                // The receiver may already be gone
                let _ = self.tx.send(Err(abort)).await;
            }
        }
        result
    }
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), ProducerError> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| ProducerError::SinkClosed)
    }
}

/// Sink that keeps every chunk in memory
#[derive(Debug, Default)]
pub struct CollectSink {
    pub chunks: Vec<Bytes>,
}

impl CollectSink {
    /// All collected chunks joined together
    pub fn concat(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

#[async_trait]
impl ChunkSink for CollectSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), ProducerError> {
        self.chunks.push(chunk);
        Ok(())
    }
}

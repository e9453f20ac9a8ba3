//! Incremental request body consumption
//!
//! A [`ChunkConsumer`] sees every chunk exactly once as it arrives and is told
//! separately when the stream has ended, so a body can be observed without
//! ever being held in memory as a whole.

use axum::body::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{AppError, Result};

/// Receives body chunks one at a time
pub trait ChunkConsumer {
    type Output;

    /// Called once per received chunk, in order
    fn on_chunk(&mut self, chunk: &[u8]);

    /// Called once after the last chunk
    fn complete(self) -> Self::Output;
}

/// Running byte count over a streamed body
#[derive(Debug, Default)]
pub struct ByteCounter {
    total: u64,
}

impl ChunkConsumer for ByteCounter {
    type Output = u64;

    fn on_chunk(&mut self, chunk: &[u8]) {
        self.total += chunk.len() as u64;
    }

    fn complete(self) -> u64 {
        self.total
    }
}

/// Drive `stream` to the end, feeding each chunk to `consumer`.
///
/// A transport error aborts consumption; `complete` is only called when the
/// stream ends cleanly.
pub async fn consume<S, E, C>(stream: S, mut consumer: C) -> Result<C::Output>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
    C: ChunkConsumer,
{
    let mut stream = std::pin::pin!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| AppError::BodyStream(e.to_string()))?;
        consumer.on_chunk(&chunk);
    }

    Ok(consumer.complete())
}

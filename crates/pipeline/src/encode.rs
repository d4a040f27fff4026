//! Encoder chains: one per format being produced for a file.
//!
//! Each chain owns its output file and runs on the blocking thread pool, so
//! the formats for one file compress in parallel. Chunks arrive through a
//! zero-capacity channel: the sending side only becomes ready again once
//! the chain has taken the previous chunk.

use crate::models::CompressionTarget;
use bytes::Bytes;
use futures::channel::mpsc::{self, Receiver, Sender};
use futures::executor::block_on_stream;
use precompress_compress::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tokio::task::JoinHandle;

/// Create the output file for `target` and start encoding into it.
///
/// Returns the chain's input and a handle resolving to the number of source
/// bytes it consumed. The chain finishes its stream once the input is closed
/// or dropped; if it fails, it drops its end of the channel so the sending
/// side notices.
pub(crate) async fn spawn(
    target: &CompressionTarget,
    size_hint: u64,
) -> io::Result<(Sender<Bytes>, JoinHandle<io::Result<u64>>)> {
    let file = tokio::fs::File::create(&target.path).await?.into_std().await;
    let (sender, receiver) = mpsc::channel(0);
    let compression = target.compression;
    let span = tracing::Span::current();
    let handle = tokio::task::spawn_blocking(move || span.in_scope(|| encode(compression, file, size_hint, receiver)));
    Ok((sender, handle))
}

fn encode(compression: Compression, file: File, size_hint: u64, chunks: Receiver<Bytes>) -> io::Result<u64> {
    let mut encoder = compression.encoder(BufWriter::new(file), size_hint);
    let mut consumed = 0;
    for chunk in block_on_stream(chunks) {
        encoder.write_all(&chunk)?;
        consumed += chunk.len() as u64;
    }
    let file = encoder.finish()?.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()?;
    tracing::trace!(algorithm = %compression, consumed, "Encoder finished");
    Ok(consumed)
}

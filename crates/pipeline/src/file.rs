//! Compressing one source file into each of its formats.

use crate::encode;
use crate::error::{Error, ErrorKind, Result};
use crate::fanout::FanOut;
use crate::models::{CompressionOutcome, CompressionTarget, FileCompressionResult, OutcomeState};
use crate::options::Options;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{StreamExt, TryStreamExt};
use precompress_compress::Compression;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tokio::task::JoinError;
use tokio_util::io::ReaderStream;
use tracing::instrument;

/// Compresses one source file into every format in `options`.
///
/// Each format is first resolved against what is already on disk:
///
/// 1. With `skip_existing`, an existing output is left alone and the format
///    is [skipped](OutcomeState::Skipped).
/// 2. With `delete_larger`, an existing output that isn't smaller than the
///    source is deleted outright and the format is
///    [done](OutcomeState::AlreadyLargerDeleted), whether or not it was
///    also skip-eligible.
///
/// The remaining formats each get an encoder chain, and the source is read
/// exactly once, block by block, through a [`FanOut`] into all of them. If
/// nothing remains, the source is never opened. Finished outputs are stat'ed
/// and, with `delete_larger`, removed again when they didn't shrink.
///
/// # Errors
/// Returns [`ErrorKind::SourceUnreadable`] if the source can't be stat'ed or
/// opened; nothing has been written in that case. A failure of a single
/// format doesn't fail the call: the format's outcome is
/// [`Failed`](OutcomeState::Failed) and the cause is attached to
/// [`FileCompressionResult::errors`].
#[instrument(name = "compress_file", skip_all, fields(path = %source.as_ref().display()))]
pub async fn compress_file(source: impl AsRef<Path>, options: &Options) -> Result<FileCompressionResult> {
    let source = source.as_ref();
    let started = Instant::now();
    let unreadable = || ErrorKind::SourceUnreadable(source.to_path_buf());
    let source_size = fs::metadata(source).await.or_raise(unreadable)?.len();

    let mut result = FileCompressionResult {
        source_path: source.to_path_buf(),
        source_size,
        bytes_read: None,
        outcomes: BTreeMap::new(),
        errors: Vec::new(),
    };

    let mut active = Vec::new();
    for &compression in &options.algorithms {
        let target = CompressionTarget::resolve(source, compression).await;
        let mut outcome = CompressionOutcome::pending(&target);
        match resolve_existing(&target, source_size, options).await {
            Some(state) => {
                outcome.settle(state);
            },
            None => active.push(target),
        }
        result.outcomes.insert(compression, outcome);
    }
    if active.is_empty() {
        tracing::debug!("Every format resolved without compressing; source not read");
        return Ok(result);
    }

    // Open the source before creating any output, so an unreadable source
    // leaves nothing behind.
    let reader = fs::File::open(source).await.or_raise(unreadable)?;

    let mut senders = Vec::with_capacity(active.len());
    let mut chains = Vec::with_capacity(active.len());
    for target in active {
        match encode::spawn(&target, source_size).await {
            Ok((sender, handle)) => {
                senders.push(sender);
                chains.push((target, handle));
            },
            // Nothing was created, so whatever is at the target isn't ours to remove.
            Err(err) => fail(&mut result, &target, compression_failed(target.compression, err)),
        }
    }
    if chains.is_empty() {
        return Ok(result);
    }

    let mut bytes_read = 0;
    let mut fanout = FanOut::new(senders);
    let forwarded = ReaderStream::with_capacity(reader, options.block_size.get())
        .inspect_ok(|chunk| bytes_read += chunk.len() as u64)
        .forward(&mut fanout)
        .await;
    // Once every consumer has failed the fan-out gives up, which isn't a read
    // error; the consumers' own errors are collected below.
    let read_error = forwarded.err().filter(|_| fanout.healthy() > 0);
    let failed_consumers = fanout.into_failures().len();
    result.bytes_read = Some(bytes_read);
    tracing::debug!(bytes_read, failed_consumers, "Source read");

    // Completions arrive in whatever order the encoders finish in; the result
    // is only handed back once nothing is pending.
    let mut pending = chains.len();
    let mut completions: FuturesUnordered<_> =
        chains.into_iter().map(|(target, handle)| async move { (target, handle.await) }).collect();
    while let Some((target, joined)) = completions.next().await {
        pending -= 1;
        let finished = match &read_error {
            Some(err) => Err(compression_failed(target.compression, io::Error::new(err.kind(), err.to_string()))),
            None => settle_join(target.compression, joined),
        };
        match finished {
            Ok(_) => finalize(&mut result, &target, started, options).await,
            Err(err) => abandon(&mut result, &target, err).await,
        }
    }
    debug_assert_eq!(pending, 0);
    debug_assert!(result.is_complete());
    Ok(result)
}

/// Decide a format from what's already on disk, without compressing.
async fn resolve_existing(target: &CompressionTarget, source_size: u64, options: &Options) -> Option<OutcomeState> {
    let size = target.existing_size?;
    let skipped = options.skip_existing;
    if options.delete_larger && size >= source_size {
        if remove(&target.path).await {
            tracing::debug!(algorithm = %target.compression, size, source_size, "Deleted existing output that was not smaller");
            return Some(OutcomeState::AlreadyLargerDeleted { size, skipped });
        }
        // Deletion failed; the file stays, so fall back to the skip policy
        // (or overwrite it with a fresh compression).
    }
    if skipped {
        tracing::debug!(algorithm = %target.compression, size, "Output already exists; skipping");
        return Some(OutcomeState::Skipped { size });
    }
    None
}

fn compression_failed(compression: Compression, err: io::Error) -> Error {
    exn::Exn::from(err).raise(ErrorKind::CompressionFailed(compression))
}

fn settle_join(compression: Compression, joined: std::result::Result<io::Result<u64>, JoinError>) -> Result<u64> {
    let failed = || ErrorKind::CompressionFailed(compression);
    joined.or_raise(failed)?.or_raise(failed)
}

async fn finalize(result: &mut FileCompressionResult, target: &CompressionTarget, started: Instant, options: &Options) {
    let elapsed = started.elapsed();
    let size = match fs::metadata(&target.path).await {
        Ok(metadata) => metadata.len(),
        Err(err) => return abandon(result, target, compression_failed(target.compression, err)).await,
    };
    let state = if options.delete_larger && size >= result.source_size && remove(&target.path).await {
        OutcomeState::CompressedThenDeleted { size, elapsed }
    } else {
        OutcomeState::Compressed { size, elapsed }
    };
    tracing::debug!(algorithm = %target.compression, size, ?elapsed, ?state, "Compression finished");
    if let Some(outcome) = result.outcomes.get_mut(&target.compression) {
        outcome.settle(state);
    }
}

/// Fail a format whose chain wrote to the target, removing the partial output.
async fn abandon(result: &mut FileCompressionResult, target: &CompressionTarget, err: Error) {
    match fs::remove_file(&target.path).await {
        Ok(()) => {},
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => tracing::warn!(path = %target.path.display(), error = %e, "Could not remove partial output"),
    }
    fail(result, target, err);
}

fn fail(result: &mut FileCompressionResult, target: &CompressionTarget, err: Error) {
    tracing::warn!(algorithm = %target.compression, error = ?err, "Compression failed");
    if let Some(outcome) = result.outcomes.get_mut(&target.compression) {
        outcome.settle(OutcomeState::Failed);
    }
    result.errors.push(err);
}

/// Best-effort removal; failures are logged, never propagated.
async fn remove(path: &Path) -> bool {
    let removed = fs::remove_file(path).await.or_raise(|| ErrorKind::DeletionFailed(path.to_path_buf()));
    match removed {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = ?err, "Keeping output that should have been deleted");
            false
        },
    }
}

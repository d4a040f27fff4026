//! Bounded, event-streaming compression of many files.

use crate::error::Result;
use crate::file::compress_file;
use crate::models::FileCompressionResult;
use crate::options::Options;
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt, future};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::pin::pin;

/// Progress events emitted by [`compress_files`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of files that will be processed.
/// 3. [`Compressed`](Self::Compressed) once per file that was processed, in
///    completion order. Files that couldn't be processed at all are yielded
///    as `Err` items in their place.
/// 4. [`Complete`](Self::Complete) exactly once.
#[derive(Debug)]
pub enum CompressEvent {
    Started,
    DiscoveryComplete(u64),
    Compressed(FileCompressionResult),
    Complete,
}

/// Runs `f` over every item with at most `limit` of the resulting futures in
/// flight, yielding their outputs in completion order.
///
/// Items are admitted in the order they're given as earlier futures finish.
/// `f` isn't called for an item until it's admitted.
pub fn schedule<I, F, Fut>(items: I, limit: NonZeroUsize, f: F) -> impl Stream<Item = Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut queued = items.into_iter().map(f);
        let mut processing: FuturesUnordered<_> = queued.by_ref().take(limit.get()).collect();
        while let Some(output) = processing.next().await {
            // Pop-n-push, but FIFO instead of LIFO.
            if let Some(next) = queued.next() {
                processing.push(next);
            }
            yield output;
        }
    })
}

/// Streams [`CompressEvent`]s while compressing every file in `files`
/// according to `options`.
///
/// At most [`Options::effective_concurrency`] files are processed at once.
/// A file that fails doesn't stop the others; it's surfaced as an `Err` item
/// and the stream carries on to [`CompressEvent::Complete`].
pub fn compress_files<'a>(
    files: Vec<PathBuf>,
    options: &'a Options,
) -> impl Stream<Item = Result<CompressEvent>> + 'a {
    stream!({
        yield Ok(CompressEvent::Started);

        let count = files.len();
        yield Ok(CompressEvent::DiscoveryComplete(u64::try_from(count).unwrap_or(u64::MAX)));

        let limit = options.effective_concurrency(count);
        tracing::debug!(files = count, concurrency = limit.get(), "Compressing files");
        let mut compressed = pin!(schedule(files, limit, move |path| async move { compress_file(&path, options).await }));
        while let Some(result) = compressed.next().await {
            if let Err(err) = &result {
                tracing::debug!(error = ?err, "Could not compress file");
            }
            yield result.map(CompressEvent::Compressed);
        }

        yield Ok(CompressEvent::Complete);
    })
}

/// Compresses every file, returning exactly one entry per input file in
/// completion order.
pub async fn run(files: Vec<PathBuf>, options: &Options) -> Vec<Result<FileCompressionResult>> {
    compress_files(files, options)
        .filter_map(|event| {
            future::ready(match event {
                Ok(CompressEvent::Compressed(result)) => Some(Ok(result)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
        })
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use precompress_compress::Compression;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[rstest]
    #[case(1, 5)]
    #[case(3, 10)]
    #[case(4, 2)]
    #[case(8, 8)]
    #[tokio::test]
    async fn test_schedule_bounds_in_flight(#[case] limit: usize, #[case] count: usize) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let outputs: Vec<usize> = schedule(0..count, NonZeroUsize::new(limit).unwrap(), |i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            }
        })
        .collect()
        .await;

        let mut sorted = outputs.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..count).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), limit.min(count));
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schedule_single_slot_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let _: Vec<()> = schedule(["a", "b", "c"], NonZeroUsize::MIN, |name| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("start {name}"));
                tokio::time::sleep(Duration::from_millis(2)).await;
                log.lock().unwrap().push(format!("end {name}"));
            }
        })
        .collect()
        .await;

        let log = log.lock().unwrap();
        assert_eq!(*log, ["start a", "end a", "start b", "end b", "start c", "end c"]);
    }

    #[tokio::test]
    async fn test_schedule_empty() {
        let outputs: Vec<()> = schedule(Vec::<()>::new(), NonZeroUsize::MIN, future::ready).collect().await;
        assert!(outputs.is_empty());
    }

    fn sources(dir: &tempfile::TempDir) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for name in ["a.html", "b.css"] {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("{name} ").repeat(200)).unwrap();
            files.push(path);
        }
        files.push(dir.path().join("missing.js"));
        files
    }

    #[tokio::test]
    async fn test_compress_files_events() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options::new([Compression::Gzip]);
        let events: Vec<_> = compress_files(sources(&dir), &options).collect().await;

        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], Ok(CompressEvent::Started)));
        assert!(matches!(events[1], Ok(CompressEvent::DiscoveryComplete(3))));
        assert!(matches!(events[5], Ok(CompressEvent::Complete)));

        let mut compressed = 0;
        let mut failed = 0;
        for event in &events[2..5] {
            match event {
                Ok(CompressEvent::Compressed(result)) => {
                    assert!(result.is_success());
                    assert!(result.outcome(Compression::Gzip).unwrap().is_compressed());
                    compressed += 1;
                },
                Err(err) => {
                    assert!(matches!(&**err, ErrorKind::SourceUnreadable(path) if path.ends_with("missing.js")));
                    failed += 1;
                },
                Ok(other) => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!((compressed, failed), (2, 1));
    }

    #[rstest]
    #[case(1)]
    #[case(4)]
    #[tokio::test]
    async fn test_run_one_result_per_file(#[case] concurrency: usize) {
        let dir = tempfile::tempdir().unwrap();
        let files = sources(&dir);
        let options = Options::new(Compression::ALL).concurrency(NonZeroUsize::new(concurrency).unwrap());

        let results = run(files.clone(), &options).await;
        assert_eq!(results.len(), files.len());
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        for result in results.iter().flatten() {
            assert!(files.contains(&result.source_path));
            assert!(result.outcomes.values().all(|o| o.is_compressed()));
            for format in Compression::ALL {
                assert!(format.target_path(&result.source_path).exists());
            }
        }
    }

    #[tokio::test]
    async fn test_run_nothing() {
        assert!(run(Vec::new(), &Options::default()).await.is_empty());
    }
}

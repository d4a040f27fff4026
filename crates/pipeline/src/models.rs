use crate::error::Error;
use precompress_compress::Compression;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where one format of one source file ends up, and what's there already.
///
/// Derived purely from the source path and format, plus a single stat of the
/// target; never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionTarget {
    pub compression: Compression,
    pub path: PathBuf,
    /// Size of the regular file already at [`path`](Self::path), if any.
    pub existing_size: Option<u64>,
}

impl CompressionTarget {
    pub async fn resolve(source: &Path, compression: Compression) -> Self {
        let path = compression.target_path(source);
        // Anything that can't be stat'ed, or isn't a regular file, counts as
        // absent; opening it for writing later reports the real problem.
        let existing_size = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Some(metadata.len()),
            _ => None,
        };
        Self { compression, path, existing_size }
    }
}

/// Lifecycle of one format for one file.
///
/// Everything except [`Pending`](Self::Pending) is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeState {
    /// Not yet decided.
    Pending,
    /// The output already existed and was left untouched.
    Skipped { size: u64 },
    /// The output already existed, was not smaller than the source, and was
    /// deleted without compressing again. `skipped` records whether the
    /// existing output would also have been skipped.
    AlreadyLargerDeleted { size: u64, skipped: bool },
    /// Freshly compressed and kept.
    Compressed { size: u64, elapsed: Duration },
    /// Freshly compressed, then deleted for not being smaller than the source.
    CompressedThenDeleted { size: u64, elapsed: Duration },
    /// Compression failed; the cause is in [`FileCompressionResult::errors`].
    Failed,
}

impl OutcomeState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The result for one format of one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionOutcome {
    pub compression: Compression,
    pub path: PathBuf,
    state: OutcomeState,
}

impl CompressionOutcome {
    pub fn pending(target: &CompressionTarget) -> Self {
        Self {
            compression: target.compression,
            path: target.path.clone(),
            state: OutcomeState::Pending,
        }
    }

    /// Move a pending outcome into its terminal state.
    ///
    /// Returns `false`, leaving the outcome as it was, when the outcome is
    /// already terminal or `state` isn't.
    pub fn settle(&mut self, state: OutcomeState) -> bool {
        if self.state.is_terminal() || !state.is_terminal() {
            tracing::warn!(
                path = %self.path.display(),
                algorithm = %self.compression,
                current = ?self.state,
                rejected = ?state,
                "Refusing outcome transition"
            );
            return false;
        }
        self.state = state;
        true
    }

    pub fn state(&self) -> OutcomeState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.state, OutcomeState::Compressed { .. } | OutcomeState::CompressedThenDeleted { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.state, OutcomeState::Skipped { .. } | OutcomeState::AlreadyLargerDeleted { skipped: true, .. })
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, OutcomeState::AlreadyLargerDeleted { .. } | OutcomeState::CompressedThenDeleted { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, OutcomeState::Failed)
    }

    /// Size of the output when it was last seen on disk.
    pub fn output_size(&self) -> Option<u64> {
        match self.state {
            OutcomeState::Skipped { size }
            | OutcomeState::AlreadyLargerDeleted { size, .. }
            | OutcomeState::Compressed { size, .. }
            | OutcomeState::CompressedThenDeleted { size, .. } => Some(size),
            OutcomeState::Pending | OutcomeState::Failed => None,
        }
    }

    /// Time from the start of the file's processing until this output was
    /// finished. Zero for anything that wasn't compressed.
    pub fn elapsed(&self) -> Duration {
        match self.state {
            OutcomeState::Compressed { elapsed, .. } | OutcomeState::CompressedThenDeleted { elapsed, .. } => elapsed,
            _ => Duration::ZERO,
        }
    }
}

/// Everything that happened to one source file.
#[derive(Debug)]
pub struct FileCompressionResult {
    pub source_path: PathBuf,
    pub source_size: u64,
    /// Bytes read from the source, or `None` if the source was never opened
    /// because every format was resolved without compressing.
    pub bytes_read: Option<u64>,
    pub outcomes: BTreeMap<Compression, CompressionOutcome>,
    /// Per-format failures. The matching outcomes are [`OutcomeState::Failed`].
    pub errors: Vec<Error>,
}

impl FileCompressionResult {
    pub fn outcome(&self, compression: Compression) -> Option<&CompressionOutcome> {
        self.outcomes.get(&compression)
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.values().all(CompressionOutcome::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn outcome() -> CompressionOutcome {
        CompressionOutcome::pending(&CompressionTarget {
            compression: Compression::Gzip,
            path: PathBuf::from("file.txt.gz"),
            existing_size: None,
        })
    }

    #[test]
    fn settles_exactly_once() {
        let mut outcome = outcome();
        assert!(!outcome.is_terminal());
        assert!(outcome.settle(OutcomeState::Skipped { size: 3 }));
        assert!(!outcome.settle(OutcomeState::Failed));
        assert_eq!(outcome.state(), OutcomeState::Skipped { size: 3 });
    }

    #[test]
    fn refuses_to_settle_as_pending() {
        let mut outcome = outcome();
        assert!(!outcome.settle(OutcomeState::Pending));
        assert!(!outcome.is_terminal());
    }

    #[rstest]
    #[case(OutcomeState::Skipped { size: 1 }, false, true, false)]
    #[case(OutcomeState::AlreadyLargerDeleted { size: 1, skipped: true }, false, true, true)]
    #[case(OutcomeState::AlreadyLargerDeleted { size: 1, skipped: false }, false, false, true)]
    #[case(OutcomeState::Compressed { size: 1, elapsed: Duration::ZERO }, true, false, false)]
    #[case(OutcomeState::CompressedThenDeleted { size: 1, elapsed: Duration::ZERO }, true, false, true)]
    #[case(OutcomeState::Failed, false, false, false)]
    fn flags(#[case] state: OutcomeState, #[case] compressed: bool, #[case] skipped: bool, #[case] deleted: bool) {
        let mut outcome = outcome();
        outcome.settle(state);
        assert_eq!(outcome.is_compressed(), compressed);
        assert_eq!(outcome.is_skipped(), skipped);
        assert_eq!(outcome.is_deleted(), deleted);
    }

    #[tokio::test]
    async fn target_reports_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("file.txt");
        std::fs::write(dir.path().join("file.txt.br"), b"12345").unwrap();

        let brotli = CompressionTarget::resolve(&source, Compression::Brotli).await;
        assert_eq!(brotli.path, dir.path().join("file.txt.br"));
        assert_eq!(brotli.existing_size, Some(5));

        let gzip = CompressionTarget::resolve(&source, Compression::Gzip).await;
        assert_eq!(gzip.existing_size, None);
    }

    #[tokio::test]
    async fn target_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("file.txt");
        std::fs::create_dir(dir.path().join("file.txt.gz")).unwrap();
        let target = CompressionTarget::resolve(&source, Compression::Gzip).await;
        assert_eq!(target.existing_size, None);
    }
}

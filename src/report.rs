//! Human-readable reporting of what happened to each file.

use precompress_pipeline::error::Error;
use precompress_pipeline::{CompressionOutcome, FileCompressionResult, OutcomeState};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

/// One line of the per-file report.
#[derive(Debug, PartialEq)]
pub enum Line<'a> {
    Compressed { outcome: &'a CompressionOutcome, source_size: u64 },
    Skipped(&'a CompressionOutcome),
    Deleted { outcome: &'a CompressionOutcome, source_size: u64 },
    Failed(&'a CompressionOutcome),
}

impl Display for Line<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Compressed { outcome, source_size } => {
                let size = outcome.output_size().unwrap_or_default();
                write!(f, "Compressed file {} in {:.2?}. Compressed size is {size} byte(s)", outcome.path.display(), outcome.elapsed())?;
                match change(size, *source_size) {
                    Some(change) => write!(f, " ({change:+.2} %)"),
                    None => Ok(()),
                }
            },
            Self::Skipped(outcome) => write!(f, "Skipped file {} because it already exists", outcome.path.display()),
            Self::Deleted { outcome, source_size } => write!(
                f,
                "Deleted file {} because {} byte(s) is not smaller than {source_size} byte(s)",
                outcome.path.display(),
                outcome.output_size().unwrap_or_default(),
            ),
            Self::Failed(outcome) => write!(f, "Could not compress into {}", outcome.path.display()),
        }
    }
}

/// Relative size change in percent; negative means the output is smaller.
fn change(size: u64, source_size: u64) -> Option<f64> {
    (source_size > 0).then(|| (size as f64 / source_size as f64 - 1.0) * 100.0)
}

/// The report lines for one file, in algorithm order. A format that was
/// compressed and then deleted again gets both lines.
pub fn lines(result: &FileCompressionResult) -> Vec<Line<'_>> {
    let source_size = result.source_size;
    let mut lines = Vec::new();
    for outcome in result.outcomes.values() {
        match outcome.state() {
            OutcomeState::Compressed { .. } => lines.push(Line::Compressed { outcome, source_size }),
            OutcomeState::CompressedThenDeleted { .. } => {
                lines.push(Line::Compressed { outcome, source_size });
                lines.push(Line::Deleted { outcome, source_size });
            },
            OutcomeState::Skipped { .. } => lines.push(Line::Skipped(outcome)),
            OutcomeState::AlreadyLargerDeleted { skipped, .. } => {
                if skipped {
                    lines.push(Line::Skipped(outcome));
                }
                lines.push(Line::Deleted { outcome, source_size });
            },
            OutcomeState::Failed => lines.push(Line::Failed(outcome)),
            OutcomeState::Pending => {},
        }
    }
    lines
}

/// Tallies across a whole run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub compressed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl Summary {
    /// Report a processed file and count its outcomes.
    pub fn record(&mut self, result: &FileCompressionResult) {
        for line in lines(result) {
            match line {
                Line::Failed(_) => tracing::error!("{line}"),
                _ => tracing::info!("{line}"),
            }
        }
        for error in &result.errors {
            tracing::debug!(path = %result.source_path.display(), ?error, "Compression error");
        }
        self.files += 1;
        let outcomes = result.outcomes.values();
        self.compressed += outcomes.clone().filter(|o| o.is_compressed()).count();
        self.skipped += outcomes.clone().filter(|o| o.is_skipped()).count();
        self.deleted += outcomes.filter(|o| o.is_deleted()).count();
        if !result.is_success() {
            self.failed += 1;
        }
    }

    /// Report a file that couldn't be processed at all.
    pub fn record_error(&mut self, error: &Error) {
        tracing::error!(?error, "Could not compress file");
        self.files += 1;
        self.failed += 1;
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn log(&self, elapsed: Duration) {
        tracing::info!(
            files = self.files,
            compressed = self.compressed,
            skipped = self.skipped,
            deleted = self.deleted,
            failed = self.failed,
            "Total time {elapsed:.2?}",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precompress_compress::Compression;
    use precompress_pipeline::{CompressionTarget, Options, compress_file};
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn outcome(compression: Compression, state: OutcomeState) -> CompressionOutcome {
        let target = CompressionTarget {
            compression,
            path: compression.target_path("index.html"),
            existing_size: None,
        };
        let mut outcome = CompressionOutcome::pending(&target);
        outcome.settle(state);
        outcome
    }

    fn result(outcomes: impl IntoIterator<Item = CompressionOutcome>) -> FileCompressionResult {
        FileCompressionResult {
            source_path: PathBuf::from("index.html"),
            source_size: 200,
            bytes_read: Some(200),
            outcomes: outcomes.into_iter().map(|o| (o.compression, o)).collect::<BTreeMap<_, _>>(),
            errors: Vec::new(),
        }
    }

    #[rstest]
    #[case(
        OutcomeState::Compressed { size: 50, elapsed: Duration::from_millis(12) },
        &["Compressed file index.html.gz in 12.00ms. Compressed size is 50 byte(s) (-75.00 %)"],
    )]
    #[case(
        OutcomeState::CompressedThenDeleted { size: 230, elapsed: Duration::from_millis(3) },
        &[
            "Compressed file index.html.gz in 3.00ms. Compressed size is 230 byte(s) (+15.00 %)",
            "Deleted file index.html.gz because 230 byte(s) is not smaller than 200 byte(s)",
        ],
    )]
    #[case(OutcomeState::Skipped { size: 10 }, &["Skipped file index.html.gz because it already exists"])]
    #[case(
        OutcomeState::AlreadyLargerDeleted { size: 300, skipped: true },
        &[
            "Skipped file index.html.gz because it already exists",
            "Deleted file index.html.gz because 300 byte(s) is not smaller than 200 byte(s)",
        ],
    )]
    #[case(
        OutcomeState::AlreadyLargerDeleted { size: 300, skipped: false },
        &["Deleted file index.html.gz because 300 byte(s) is not smaller than 200 byte(s)"],
    )]
    #[case(OutcomeState::Failed, &["Could not compress into index.html.gz"])]
    fn test_lines(#[case] state: OutcomeState, #[case] expected: &[&str]) {
        let result = result([outcome(Compression::Gzip, state)]);
        let lines: Vec<String> = lines(&result).iter().map(ToString::to_string).collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn test_empty_source_has_no_percentage() {
        let mut result = result([outcome(Compression::Brotli, OutcomeState::Compressed { size: 1, elapsed: Duration::ZERO })]);
        result.source_size = 0;
        assert_eq!(lines(&result)[0].to_string(), "Compressed file index.html.br in 0.00ns. Compressed size is 1 byte(s)");
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.record(&result([
            outcome(Compression::Brotli, OutcomeState::Compressed { size: 40, elapsed: Duration::ZERO }),
            outcome(Compression::Gzip, OutcomeState::CompressedThenDeleted { size: 220, elapsed: Duration::ZERO }),
        ]));
        summary.record(&result([
            outcome(Compression::Brotli, OutcomeState::Skipped { size: 40 }),
            outcome(Compression::Gzip, OutcomeState::AlreadyLargerDeleted { size: 220, skipped: true }),
        ]));
        assert!(summary.is_success());
        assert_eq!(summary, Summary { files: 2, compressed: 2, skipped: 2, deleted: 2, failed: 0 });
    }

    #[tokio::test]
    async fn test_summary_failures() {
        let dir = tempfile::tempdir().unwrap();
        let err = compress_file(dir.path().join("missing.html"), &Options::default()).await.unwrap_err();

        let mut summary = Summary::default();
        summary.record_error(&err);
        assert!(!summary.is_success());
        assert_eq!(summary.files, 1);
        assert_eq!(summary.failed, 1);
    }
}

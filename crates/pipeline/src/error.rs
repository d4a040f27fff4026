//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use precompress_compress::Compression;
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies what failed, and therefore how far the failure reaches.
///
/// - [`ErrorKind::SourceUnreadable`] is fatal for one file.
/// - [`ErrorKind::UnsupportedAlgorithm`] is fatal for the whole run.
/// - [`ErrorKind::CompressionFailed`] is fatal for one format of one file.
/// - [`ErrorKind::DeletionFailed`] is never fatal; it is logged and the
///   outcome simply isn't marked as deleted.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The source file vanished, or couldn't be stat'ed or opened.
    #[display("source unreadable: {}", _0.display())]
    SourceUnreadable(#[error(not(source))] PathBuf),
    /// The configured algorithm set names something we can't produce.
    #[display("unsupported algorithm: {_0}")]
    UnsupportedAlgorithm(#[error(not(source))] String),
    /// Encoding or writing one output failed.
    #[display("{_0} compression failed")]
    CompressionFailed(#[error(not(source))] Compression),
    /// An output file that should have been removed is still on disk.
    #[display("could not delete {}", _0.display())]
    DeletionFailed(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CompressionFailed(_) | Self::DeletionFailed(_))
    }
}

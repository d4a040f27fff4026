//! Errors raised while choosing or running an encoder.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, phrased as what the caller can do about it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested algorithm is not one this crate knows how to produce.
    /// A configuration problem: fix the algorithm list, don't retry.
    #[display("unsupported algorithm: {_0}")]
    UnsupportedAlgorithm(#[error(not(source))] String),
    /// Reading input or writing encoded output failed.
    #[display("encoder I/O failed")]
    Io,
}

impl ErrorKind {
    /// Whether trying the same operation again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

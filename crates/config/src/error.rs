//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// None of these are worth retrying: each one means the configuration (or
/// the command-line) has to be fixed before the run can start.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration file's extension isn't one of TOML, YAML or JSON.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A configuration source could not be read or parsed.
    #[display("could not load configuration")]
    Load,
    /// An algorithm name isn't one that can be produced.
    #[display("unsupported algorithm in configuration")]
    UnsupportedAlgorithm,
    /// A value parsed, but is out of range or otherwise unusable.
    #[display("invalid value for {_0}")]
    InvalidValue(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::NotFound("/etc/p.toml".into()), "configuration file not found: /etc/p.toml")]
    #[case(ErrorKind::UnsupportedFormat("p.ini".into()), "unsupported configuration format: p.ini")]
    #[case(ErrorKind::InvalidValue("block_size".into()), "invalid value for block_size")]
    fn error_kind_display(#[case] kind: ErrorKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }
}

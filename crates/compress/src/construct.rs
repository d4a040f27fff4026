use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::{path::Path, str::FromStr};

impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "br" | "brotli" => Ok(Compression::Brotli),
            "gz" | "gzip" => Ok(Compression::Gzip),
            _ => exn::bail!(ErrorKind::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl Compression {
    /// Detect an already-compressed file from its extension.
    ///
    /// Returns `None` for anything that isn't one of our own output formats,
    /// which is what decides whether a file is eligible as a source.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref().extension().and_then(|ext| ext.to_str()).and_then(|ext| match ext.to_lowercase().as_str() {
            "br" => Some(Compression::Brotli),
            "gz" => Some(Compression::Gzip),
            _ => None,
        })
    }
}

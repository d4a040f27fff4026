//! Streaming compression into sibling files.
//!
//! This crate wraps the compression libraries behind a closed
//! [`Compression`] enum, providing:
//!
//! - **Naming** of the sibling output file ([`Compression::target_path`]) and
//!   detection of already-compressed inputs ([`Compression::from_path`])
//! - **Streaming** encoders over any [`Write`](std::io::Write)r
//!   ([`Compression::encoder`]), finalized with [`Encoder::finish`]
//! - **In-memory** compression ([`Compression::compress`])
//!
//! All compression uses the highest available level for each format,
//! prioritizing storage space over speed. Encoder parameters are deliberately
//! not configurable beyond choosing the format.

#[cfg(feature = "cli")]
pub mod cli;
mod construct;
pub mod error;
mod ops;
mod util;

pub use crate::ops::{Encoder, Recorded};

/// A supported compression format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Compression {
    /// Brotli compression (.br)
    Brotli,
    /// Gzip compression (.gz)
    Gzip,
}

impl Compression {
    /// Every supported format, in the order they are reported.
    pub const ALL: [Compression; 2] = [Compression::Brotli, Compression::Gzip];
}

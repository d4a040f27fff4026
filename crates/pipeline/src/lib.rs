//! Compress files into every requested format while reading each file once.
//!
//! [`compress_file`] handles a single source: existing outputs are resolved
//! against the skip/delete policy, then the source is streamed block by block
//! through a [`FanOut`] into one encoder per remaining format, each running on
//! its own blocking thread. [`compress_files`] and [`run`] do the same for a
//! whole batch with a bounded number of files in flight.

mod encode;
pub mod error;
pub mod fanout;
mod file;
mod models;
mod options;
mod stream;

pub use crate::fanout::FanOut;
pub use crate::file::compress_file;
pub use crate::models::{CompressionOutcome, CompressionTarget, FileCompressionResult, OutcomeState};
pub use crate::options::{DEFAULT_BLOCK_SIZE, Options, default_concurrency, parse_algorithms};
pub use crate::stream::{CompressEvent, compress_files, run, schedule};

use crate::error::{ErrorKind, Result};
use precompress_compress::Compression;
use precompress_compress::cli::parse_list;
use precompress_compress::error::ErrorKind as CompressErrorKind;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

/// Read one mebibyte of source at a time unless told otherwise.
pub const DEFAULT_BLOCK_SIZE: NonZeroUsize = NonZeroUsize::new(1024 * 1024).unwrap();

/// Run-wide settings, resolved once before any file is touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Formats to produce for every file.
    pub algorithms: BTreeSet<Compression>,
    /// Remove outputs that are not smaller than their source.
    pub delete_larger: bool,
    /// Leave formats alone whose output file already exists.
    pub skip_existing: bool,
    /// Maximum number of source bytes read (and fanned out) at a time.
    pub block_size: NonZeroUsize,
    /// Maximum number of files being processed at once.
    pub concurrency: NonZeroUsize,
}

impl Default for Options {
    fn default() -> Self {
        Self::new(Compression::ALL)
    }
}

impl Options {
    pub fn new(algorithms: impl IntoIterator<Item = Compression>) -> Self {
        Self {
            algorithms: algorithms.into_iter().collect(),
            delete_larger: false,
            skip_existing: false,
            block_size: DEFAULT_BLOCK_SIZE,
            concurrency: default_concurrency(),
        }
    }

    #[must_use]
    pub fn delete_larger(mut self, delete_larger: bool) -> Self {
        self.delete_larger = delete_larger;
        self
    }

    #[must_use]
    pub fn skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    #[must_use]
    pub fn block_size(mut self, block_size: NonZeroUsize) -> Self {
        self.block_size = block_size;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The worker pool size for a batch of `file_count` files: never more
    /// slots than files, never fewer than one.
    #[must_use]
    pub fn effective_concurrency(&self, file_count: usize) -> NonZeroUsize {
        NonZeroUsize::new(self.concurrency.get().min(file_count)).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Resolve configured algorithm names (`"br"`, `"gzip"`, `"brotli,gzip"`, ...)
/// into the set of formats to produce.
///
/// # Errors
/// [`ErrorKind::UnsupportedAlgorithm`] naming the first unknown algorithm.
/// This is a configuration problem and should stop the run before any file
/// is touched.
pub fn parse_algorithms<I, S>(names: I) -> Result<BTreeSet<Compression>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_list(names).map_err(|err| {
        let name = match &*err {
            CompressErrorKind::UnsupportedAlgorithm(name) => name.clone(),
            other => other.to_string(),
        };
        err.raise(ErrorKind::UnsupportedAlgorithm(name))
    })
}

/// One worker per available CPU, falling back to a single worker when the
/// platform won't say.
pub fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

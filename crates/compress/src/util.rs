use crate::Compression;
use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl AsRef<str> for Compression {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl Compression {
    /// Returns the file extension for this compression format.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Brotli => ".br",
            Compression::Gzip => ".gz",
        }
    }

    /// Returns the short name for configuration (for displaying to user)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Brotli => "brotli",
            Compression::Gzip => "gzip",
        }
    }

    /// The sibling file this format writes for `source`.
    ///
    /// Always the full source path with the extension appended, so
    /// `style.css` becomes `style.css.gz`. The source itself is never touched.
    #[must_use]
    pub fn target_path(&self, source: impl AsRef<Path>) -> PathBuf {
        let mut target: OsString = source.as_ref().as_os_str().to_owned();
        target.push(self.extension());
        PathBuf::from(target)
    }
}

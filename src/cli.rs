use clap::Parser;
use precompress_config::Overrides;
use std::path::PathBuf;

/// Compress files ahead of time into `.br` and `.gz` siblings, for web
/// servers that serve pre-compressed assets.
#[derive(Debug, Parser)]
#[command(name = "precompress", version)]
pub struct Args {
    /// Files to compress; glob patterns (`*`, `?`, `**`, `[...]`, `{a,b}`)
    /// are expanded. Existing `.gz` and `.br` files are never compressed.
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<String>,

    /// Delete compressed files that are not smaller than their source
    #[arg(short, long)]
    pub delete_larger: bool,

    /// Don't compress into formats whose output already exists
    #[arg(short, long)]
    pub skip_existing: bool,

    /// Number of files to compress at once [default: number of CPUs]
    #[arg(short = 'r', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Compression algorithms to use (brotli, gzip) [default: all]
    #[arg(short, long, value_name = "NAME", num_args = 1.., value_delimiter = ',')]
    pub compressors: Option<Vec<String>>,

    /// Bytes of source to read at a time, e.g. 65536, 64KiB or 1MB [default: 1MB]
    #[arg(short, long, value_name = "SIZE")]
    pub block_size: Option<String>,

    /// Log every step, not just the outcome of each file
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Don't log anything
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable coloured output
    #[arg(short, long)]
    pub no_color: bool,

    /// Change to this directory before expanding patterns
    #[arg(short = 'C', long, value_name = "PATH")]
    pub chdir: Option<PathBuf>,

    /// Read configuration from this file (TOML, YAML or JSON)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// The values given on the command-line, to be layered over the
    /// configuration files and environment.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            algorithms: self.compressors.clone(),
            delete_larger: self.delete_larger.then_some(true),
            skip_existing: self.skip_existing.then_some(true),
            block_size: self.block_size.clone(),
            concurrency: self.concurrency,
        }
    }
}

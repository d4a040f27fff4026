mod cli;
mod files;
mod logging;
mod report;

use crate::cli::Args;
use crate::report::Summary;
use clap::Parser;
use futures::StreamExt;
use precompress_config::Config;
use precompress_pipeline::{CompressEvent, compress_files};
use std::path::Path;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Instant;

/// Configuration or usage problems; clap exits with the same code.
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(&args);

    // Configuration paths are relative to where we were started, not to
    // `--chdir`.
    let options = match Config::load(args.config.as_deref(), args.overrides()).and_then(Config::into_options) {
        Ok(options) => options,
        Err(err) => {
            tracing::error!(error = ?err, "Invalid configuration");
            return ExitCode::from(EXIT_USAGE);
        },
    };
    tracing::debug!(?options, "Resolved options");

    if let Some(dir) = &args.chdir
        && let Err(err) = std::env::set_current_dir(dir)
    {
        tracing::error!(path = %dir.display(), error = %err, "Could not change directory");
        return ExitCode::from(EXIT_USAGE);
    }

    let files = files::expand(&args.files, Path::new("."));
    if files.is_empty() {
        tracing::info!("No files matched");
        return ExitCode::SUCCESS;
    }

    let started = Instant::now();
    let mut summary = Summary::default();
    let mut events = pin!(compress_files(files, &options));
    while let Some(event) = events.next().await {
        match event {
            Ok(CompressEvent::Started) | Ok(CompressEvent::Complete) => {},
            Ok(CompressEvent::DiscoveryComplete(count)) => {
                tracing::debug!(files = count, concurrency = options.effective_concurrency(count as usize).get(), "Starting");
            },
            Ok(CompressEvent::Compressed(result)) => summary.record(&result),
            Err(err) => summary.record_error(&err),
        }
    }
    summary.log(started.elapsed());

    if summary.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

use crate::cli::Args;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `--verbose`, but nothing overrides
/// `--quiet`.
pub fn init(args: &Args) {
    let filter = match (args.quiet, EnvFilter::try_from_default_env()) {
        (true, _) => EnvFilter::new("off"),
        (false, Ok(filter)) => filter,
        (false, Err(_)) => EnvFilter::new(if args.verbose { "debug" } else { "info" }),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!args.no_color && std::io::stdout().is_terminal())
        .with_target(false)
        .init();
}

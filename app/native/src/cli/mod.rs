//! CLI module for sysbars.
//!
//! One-shot commands (`eval`, `policy`, `schema`, `completions`) evaluate the
//! policy in-process. `run` starts the policy daemon on a single-threaded
//! runtime and feeds it window events from stdin.

mod commands;
mod daemon;
mod output;

use clap::Parser;
pub use commands::{Cli, Commands};
pub use daemon::{Daemon, DaemonCommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config;
use crate::error::SysbarsError;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level`. Logs go to stderr so command output
/// on stdout stays machine readable.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), SysbarsError> {
    let cli = Cli::parse();
    commands::apply_config_flag(&cli);

    let config = config::init();
    init_tracing(&config.log_level);
    if let Some(path) = config::get_config_path() {
        tracing::debug!(path = %path.display(), daemon = cli.is_daemon(), "configuration loaded");
    }

    cli.execute(config)
}

//! Glint binary.

use clap::Parser;
use glint_cli::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);
	glint_cli::run(cli).await
}

/// Logs to stderr so rendered markup on stdout stays clean. `RUST_LOG`
/// overrides the level chosen by `--verbose`.
fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("glint_preview=debug,glint_cli=debug,info")
		} else {
			EnvFilter::new("info")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

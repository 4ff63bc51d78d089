use std::path::PathBuf;

use clap::{Parser, Subcommand};
use glint_preview::{ConfigError, PreviewConfig};

#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(about = "Live markdown preview")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (defaults to <config_dir>/glint/config.toml)
	#[arg(long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Render a file once, diagrams included
	Render {
		file: PathBuf,
		/// Write the markup here instead of stdout
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
	/// Re-render on every change to the file until interrupted
	Watch {
		file: PathBuf,
		/// Write each view here instead of stdout
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
	/// List the links of the rendered file
	Links { file: PathBuf },
	/// Open a link of the rendered file by its index in `links`
	Open { file: PathBuf, index: usize },
}

impl Cli {
	/// `--config` if given, else the default location.
	pub fn load_config(&self) -> Result<PreviewConfig, ConfigError> {
		match &self.config {
			Some(path) => PreviewConfig::load(path),
			None => PreviewConfig::load_default(),
		}
	}
}

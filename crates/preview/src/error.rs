//! Error types for the preview pipeline.
//!
//! None of these is fatal to the driver: each is logged and the preview
//! degrades to its last good state.

use std::path::PathBuf;
use std::time::Duration;

use glint_dom::{DomError, MarkupError};
use thiserror::Error;

/// Markdown conversion failed; the displayed tree is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
	/// The renderer reported a failure.
	#[error("renderer failed: {0}")]
	Renderer(String),

	/// The renderer did not answer within the configured bound.
	#[error("renderer timed out after {0:?}")]
	Timeout(Duration),

	/// The task running the conversion panicked or was cancelled.
	#[error("conversion task failed: {0}")]
	Task(String),
}

/// A single diagram block failed to render. Isolated to that block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramRenderError {
	/// The renderer rejected the payload.
	#[error("diagram renderer failed: {0}")]
	Renderer(String),

	/// The renderer did not answer within the configured bound.
	#[error("diagram renderer timed out after {0:?}")]
	Timeout(Duration),

	/// The renderer process could not be started.
	#[error("failed to spawn diagram renderer `{program}`: {error}")]
	Spawn {
		/// Program that failed to start.
		program: String,
		/// The underlying I/O error, rendered.
		error: String,
	},

	/// The renderer process exited unsuccessfully.
	#[error("diagram renderer exited with {status}: {stderr}")]
	Exit {
		/// Exit status as reported by the OS.
		status: String,
		/// Trimmed standard error output.
		stderr: String,
	},

	/// The renderer produced output that is not usable image markup.
	#[error("diagram renderer produced invalid image markup: {0}")]
	InvalidSvg(String),
}

/// A reconcile call was aborted; the displayed tree keeps its prior state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
	/// The new markup could not be parsed.
	#[error("malformed markup: {0}")]
	Markup(#[from] MarkupError),

	/// A tree operation failed mid-patch.
	#[error("tree operation failed: {0}")]
	Dom(#[from] DomError),
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid configuration TOML.
	#[error("invalid configuration in {path}: {error}")]
	Parse {
		/// Path to the offending file.
		path: PathBuf,
		/// The underlying deserialization error.
		error: toml::de::Error,
	},
}

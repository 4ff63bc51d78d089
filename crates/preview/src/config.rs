//! Preview configuration.
//!
//! Loaded from `<config_dir>/glint/config.toml`. Every key is optional; a
//! missing file yields [`PreviewConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::DEBOUNCE;
use crate::error::ConfigError;

/// Default bound on a single markdown conversion.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a single diagram render.
pub const DIAGRAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Classes applied to a diagram block container after a successful render.
pub const DEFAULT_DECORATIONS: &[&str] = &["diagram", "flex", "justify-center", "my-6", "p-6", "rounded-xl", "overflow-x-auto"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
	/// Quiescence window before a snapshot is dispatched, in milliseconds.
	pub debounce_ms: u64,
	/// Bound on a markdown conversion, in milliseconds.
	pub render_timeout_ms: u64,
	pub diagram: DiagramConfig,
	pub navigation: NavigationConfig,
}

impl Default for PreviewConfig {
	fn default() -> Self {
		Self {
			debounce_ms: DEBOUNCE.as_millis() as u64,
			render_timeout_ms: RENDER_TIMEOUT.as_millis() as u64,
			diagram: DiagramConfig::default(),
			navigation: NavigationConfig::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagramConfig {
	/// Code block languages treated as diagrams.
	pub languages: Vec<String>,
	/// External renderer: program followed by arguments. `{id}` is replaced
	/// with the render identifier.
	pub command: Vec<String>,
	pub timeout_ms: u64,
	pub decorations: Vec<String>,
}

impl Default for DiagramConfig {
	fn default() -> Self {
		Self {
			languages: vec!["mermaid".into()],
			command: ["mmdc", "--input", "-", "--output", "-", "--outputFormat", "svg"]
				.map(String::from)
				.to_vec(),
			timeout_ms: DIAGRAM_TIMEOUT.as_millis() as u64,
			decorations: DEFAULT_DECORATIONS.iter().map(|&c| c.to_owned()).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
	/// URL schemes the opener is allowed to hand to the OS.
	pub allowed_schemes: Vec<String>,
}

impl Default for NavigationConfig {
	fn default() -> Self {
		Self {
			allowed_schemes: vec!["http".into(), "https".into()],
		}
	}
}

impl PreviewConfig {
	/// Parse configuration from a TOML string.
	pub fn parse(input: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(input)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content).map_err(|e| ConfigError::Parse {
			path: path.to_path_buf(),
			error: e,
		})
	}

	/// Load from the default location, falling back to defaults when the
	/// file does not exist.
	pub fn load_default() -> Result<Self, ConfigError> {
		match default_path() {
			Some(path) if path.exists() => Self::load(path),
			_ => Ok(Self::default()),
		}
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	pub fn render_timeout(&self) -> Duration {
		Duration::from_millis(self.render_timeout_ms)
	}
}

impl DiagramConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

/// `<config_dir>/glint/config.toml`, if the platform has a config directory.
pub fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("glint").join("config.toml"))
}

#[cfg(test)]
mod tests;

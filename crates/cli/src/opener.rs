//! Navigation handler that hands link targets to the OS.

use glint_preview::{NavigationConfig, NavigationHandler};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Why a link target was not opened.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpenRefused {
	/// Relative references have no meaning outside the preview.
	#[error("not an absolute URL: {target}")]
	NotAbsolute { target: String },
	#[error("scheme `{scheme}` is not allowed")]
	Scheme { scheme: String },
}

/// Opens allowed URLs with the system opener.
#[derive(Debug, Clone)]
pub struct OpenerHandler {
	allowed: Vec<String>,
}

impl OpenerHandler {
	pub fn new(config: &NavigationConfig) -> Self {
		Self {
			allowed: config.allowed_schemes.clone(),
		}
	}

	/// Validates `target` against the allowed schemes.
	pub fn check(&self, target: &str) -> Result<Url, OpenRefused> {
		let url = Url::parse(target).map_err(|_| OpenRefused::NotAbsolute { target: target.to_owned() })?;
		if !self.allowed.iter().any(|s| s.eq_ignore_ascii_case(url.scheme())) {
			return Err(OpenRefused::Scheme {
				scheme: url.scheme().to_owned(),
			});
		}
		Ok(url)
	}
}

impl NavigationHandler for OpenerHandler {
	fn navigate(&self, target: &str) {
		let url = match self.check(target) {
			Ok(url) => url,
			Err(e) => {
				warn!(target, error = %e, "opener.refused");
				return;
			}
		};
		match open::that_detached(url.as_str()) {
			Ok(()) => info!(url = %url, "opener.open"),
			Err(e) => warn!(url = %url, error = %e, "opener.failed"),
		}
	}
}

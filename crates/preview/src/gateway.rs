//! Renderer gateway: the boundary to the markdown-to-markup converter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ConversionError;

#[cfg(feature = "commonmark")]
mod commonmark;

#[cfg(feature = "commonmark")]
pub use commonmark::CommonMarkRenderer;

/// Converts source text to sanitized markup.
///
/// Implementations own sanitization: whatever they return is inserted into
/// the displayed tree as-is.
#[async_trait]
pub trait MarkupRenderer: Send + Sync {
	async fn render(&self, text: &str) -> Result<String, ConversionError>;
}

/// Bounds every conversion with a timeout. No retries.
#[derive(Clone)]
pub struct RendererGateway {
	renderer: Arc<dyn MarkupRenderer>,
	timeout: Duration,
}

impl RendererGateway {
	pub fn new(renderer: Arc<dyn MarkupRenderer>, timeout: Duration) -> Self {
		Self { renderer, timeout }
	}

	pub async fn render(&self, text: &str) -> Result<String, ConversionError> {
		match tokio::time::timeout(self.timeout, self.renderer.render(text)).await {
			Ok(result) => result,
			Err(_) => Err(ConversionError::Timeout(self.timeout)),
		}
	}
}

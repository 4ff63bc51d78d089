use async_trait::async_trait;
use pulldown_cmark::{Options, Parser, html};

use super::MarkupRenderer;
use crate::error::ConversionError;

/// CommonMark with GitHub-style extensions, sanitized by ammonia.
///
/// Conversion runs on the blocking pool so large documents do not stall the
/// preview driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMarkRenderer;

impl CommonMarkRenderer {
	/// Converts synchronously. Script content and event handler attributes
	/// never survive.
	pub fn render_sync(text: &str) -> String {
		let mut options = Options::empty();
		options.insert(Options::ENABLE_TABLES);
		options.insert(Options::ENABLE_FOOTNOTES);
		options.insert(Options::ENABLE_STRIKETHROUGH);
		options.insert(Options::ENABLE_TASKLISTS);
		options.insert(Options::ENABLE_SMART_PUNCTUATION);

		let mut raw = String::with_capacity(text.len() * 3 / 2);
		html::push_html(&mut raw, Parser::new_ext(text, options));

		ammonia::Builder::default()
			.add_generic_attributes(&["style", "class"])
			.add_tags(&["input"])
			.add_tag_attributes("input", &["type", "checked", "disabled"])
			.link_rel(Some("noopener noreferrer"))
			.clean(&raw)
			.to_string()
	}
}

#[async_trait]
impl MarkupRenderer for CommonMarkRenderer {
	async fn render(&self, text: &str) -> Result<String, ConversionError> {
		let text = text.to_owned();
		tokio::task::spawn_blocking(move || Self::render_sync(&text))
			.await
			.map_err(|e| ConversionError::Task(e.to_string()))
	}
}

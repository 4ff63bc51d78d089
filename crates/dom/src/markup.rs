//! Markup fragment parser.
//!
//! Accepts the well-formed HTML a sanitizing markdown renderer emits, plus
//! inline SVG. Closing tags must nest properly; there is no implied-end-tag
//! recovery, since a trusted renderer never relies on it and anything else is
//! reported as [`MarkupError`] rather than guessed at.

use std::borrow::Cow;

use crate::document::Document;
use crate::error::MarkupError;
use crate::node::{Attr, Element, NodeData, NodeId};

/// Elements that never have content or a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose content is raw text, never markup.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(crate) fn is_void(tag: &str) -> bool {
	VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
	RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Parses `markup` into a fresh [`Document`] whose root holds the fragment.
pub fn parse_fragment(markup: &str) -> Result<Document, MarkupError> {
	let mut doc = Document::new();
	let root = doc.root();
	Parser {
		src: markup,
		pos: 0,
		open: vec![OpenElement {
			id: root,
			tag: String::new(),
		}],
		doc: &mut doc,
	}
	.run()?;
	Ok(doc)
}

struct OpenElement {
	id: NodeId,
	tag: String,
}

struct Parser<'a> {
	src: &'a str,
	pos: usize,
	open: Vec<OpenElement>,
	doc: &'a mut Document,
}

impl Parser<'_> {
	fn run(mut self) -> Result<(), MarkupError> {
		let src = self.src;
		while self.pos < src.len() {
			let rest = &src[self.pos..];
			let Some(lt) = rest.find('<') else {
				self.push_text(&decode_entities(rest));
				self.pos = src.len();
				break;
			};
			if lt > 0 {
				self.push_text(&decode_entities(&rest[..lt]));
				self.pos += lt;
			}
			self.markup_item()?;
		}

		if self.open.len() > 1 {
			let top = self.open.pop().map(|o| o.tag).unwrap_or_default();
			return Err(MarkupError::Unclosed { tag: top });
		}
		Ok(())
	}

	/// Consumes one construct starting at `<`.
	fn markup_item(&mut self) -> Result<(), MarkupError> {
		let src = self.src;
		let start = self.pos;
		let rest = &src[start..];

		if rest.starts_with("<!--") {
			let end = rest.find("-->").ok_or(MarkupError::UnterminatedTag { offset: start })?;
			self.pos = start + end + 3;
			return Ok(());
		}
		if rest.starts_with("<!") || rest.starts_with("<?") {
			let end = rest.find('>').ok_or(MarkupError::UnterminatedTag { offset: start })?;
			self.pos = start + end + 1;
			return Ok(());
		}
		if let Some(after) = rest.strip_prefix("</") {
			let end = after.find('>').ok_or(MarkupError::UnterminatedTag { offset: start })?;
			let tag = after[..end].trim();
			self.pos = start + 2 + end + 1;
			return self.close(tag, start);
		}
		if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
			return self.start_tag(start);
		}

		// A stray `<` is literal text.
		self.push_text("<");
		self.pos = start + 1;
		Ok(())
	}

	fn start_tag(&mut self, start: usize) -> Result<(), MarkupError> {
		let src = self.src;
		let bytes = src.as_bytes();
		let mut i = start + 1;
		while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/' {
			i += 1;
		}
		let tag = &src[start + 1..i];
		if tag.is_empty() {
			return Err(MarkupError::EmptyTagName { offset: start });
		}

		let mut element = Element::new(tag);
		let self_closing = loop {
			while i < bytes.len() && bytes[i].is_ascii_whitespace() {
				i += 1;
			}
			match bytes.get(i) {
				None => return Err(MarkupError::UnterminatedTag { offset: start }),
				Some(b'>') => {
					i += 1;
					break false;
				}
				Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
					i += 2;
					break true;
				}
				Some(b'/') => {
					i += 1;
					continue;
				}
				Some(_) => {}
			}

			let name_start = i;
			while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
				i += 1;
			}
			let name = &src[name_start..i];
			while i < bytes.len() && bytes[i].is_ascii_whitespace() {
				i += 1;
			}
			if bytes.get(i) != Some(&b'=') {
				element.attrs.push(Attr::new(name, ""));
				continue;
			}
			i += 1;
			while i < bytes.len() && bytes[i].is_ascii_whitespace() {
				i += 1;
			}
			let value = match bytes.get(i) {
				None => return Err(MarkupError::UnterminatedTag { offset: start }),
				Some(&quote @ (b'"' | b'\'')) => {
					let close = src[i + 1..]
						.find(quote as char)
						.ok_or(MarkupError::UnterminatedTag { offset: start })?;
					let raw = &src[i + 1..i + 1 + close];
					i += close + 2;
					raw
				}
				Some(_) => {
					let value_start = i;
					while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
						i += 1;
					}
					&src[value_start..i]
				}
			};
			element.attrs.push(Attr::new(name, decode_entities(value)));
		};
		self.pos = i;

		let tag = element.tag.clone();
		let id = self.doc.create_element(element);
		self.attach(id);

		if self_closing || is_void(&tag) {
			return Ok(());
		}
		if is_raw_text(&tag) {
			return self.raw_text(id, &tag, start);
		}
		self.open.push(OpenElement { id, tag });
		Ok(())
	}

	fn raw_text(&mut self, id: NodeId, tag: &str, start: usize) -> Result<(), MarkupError> {
		let src = self.src;
		let rest = &src[self.pos..];
		let closing = format!("</{}", tag.to_ascii_lowercase());
		let end = rest
			.to_ascii_lowercase()
			.find(&closing)
			.ok_or_else(|| MarkupError::Unclosed { tag: tag.to_owned() })?;
		if end > 0 {
			let text = self.doc.create_text(&rest[..end]);
			self.doc.append_child(id, text).ok();
		}
		let after = self.pos + end;
		let gt = src[after..].find('>').ok_or(MarkupError::UnterminatedTag { offset: start })?;
		self.pos = after + gt + 1;
		Ok(())
	}

	fn close(&mut self, tag: &str, offset: usize) -> Result<(), MarkupError> {
		let top = &self.open[self.open.len() - 1];
		if self.open.len() > 1 && top.tag.eq_ignore_ascii_case(tag) {
			self.open.pop();
			return Ok(());
		}
		if self.open[1..].iter().any(|o| o.tag.eq_ignore_ascii_case(tag)) {
			return Err(MarkupError::MismatchedClose {
				expected: top.tag.clone(),
				found: tag.to_owned(),
				offset,
			});
		}
		Err(MarkupError::UnexpectedClose {
			tag: tag.to_owned(),
			offset,
		})
	}

	fn attach(&mut self, id: NodeId) {
		let parent = self.open[self.open.len() - 1].id;
		// Both ends were created by this parser, so attaching cannot fail.
		self.doc.append_child(parent, id).ok();
	}

	/// Appends text to the current element, merging with a preceding text node.
	fn push_text(&mut self, text: &str) {
		if text.is_empty() {
			return;
		}
		let parent = self.open[self.open.len() - 1].id;
		if let Some(&last) = self.doc.children(parent).last()
			&& let Some(NodeData::Text(prev)) = self.doc.data(last)
		{
			let merged = format!("{prev}{text}");
			self.doc.set_text(last, &merged).ok();
			return;
		}
		let id = self.doc.create_text(text);
		self.attach(id);
	}
}

/// Decodes the character references a sanitizer emits.
///
/// Unknown or unterminated references are kept verbatim.
pub(crate) fn decode_entities(input: &str) -> Cow<'_, str> {
	if !input.contains('&') {
		return Cow::Borrowed(input);
	}

	let mut out = String::with_capacity(input.len());
	let mut rest = input;
	while let Some(amp) = rest.find('&') {
		out.push_str(&rest[..amp]);
		rest = &rest[amp..];
		let decoded = rest[1..]
			.find(';')
			.filter(|&semi| semi <= 10)
			.and_then(|semi| decode_reference(&rest[1..1 + semi]).map(|c| (c, semi + 2)));
		match decoded {
			Some((c, consumed)) => {
				out.push(c);
				rest = &rest[consumed..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let num = name.strip_prefix('#')?;
			let code = match num.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => num.parse().ok()?,
			};
			char::from_u32(code)
		}
	}
}

#[cfg(test)]
mod tests;

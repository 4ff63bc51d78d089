//! Markup serialization.
//!
//! Walks with an explicit stack, so nesting depth is bounded by memory rather
//! than by the thread's stack.

use crate::document::Document;
use crate::markup::{is_raw_text, is_void};
use crate::node::{NodeData, NodeId};

enum Step {
	/// Write a node; `raw` when its parent is a raw-text element.
	Node(NodeId, bool),
	Close(NodeId),
}

impl Document {
	/// Serializes the children of `id`.
	pub fn inner_markup(&self, id: NodeId) -> String {
		let raw = self.element(id).is_some_and(|el| is_raw_text(&el.tag));
		let mut out = String::new();
		self.write_nodes(self.children(id).iter().rev().map(|&child| Step::Node(child, raw)).collect(), &mut out);
		out
	}

	/// Serializes `id` itself, including its tags.
	pub fn outer_markup(&self, id: NodeId) -> String {
		let mut out = String::new();
		self.write_nodes(vec![Step::Node(id, false)], &mut out);
		out
	}

	fn write_nodes(&self, mut stack: Vec<Step>, out: &mut String) {
		while let Some(step) = stack.pop() {
			let (id, raw) = match step {
				Step::Close(id) => {
					if let Some(el) = self.element(id) {
						out.push_str("</");
						out.push_str(&el.tag);
						out.push('>');
					}
					continue;
				}
				Step::Node(id, raw) => (id, raw),
			};
			match self.data(id) {
				None => {}
				Some(NodeData::Text(text)) if raw => out.push_str(text),
				Some(NodeData::Text(text)) => escape_text(text, out),
				Some(NodeData::Element(el)) => {
					out.push('<');
					out.push_str(&el.tag);
					for attr in &el.attrs {
						out.push(' ');
						out.push_str(&attr.name);
						out.push_str("=\"");
						escape_attr(&attr.value, out);
						out.push('"');
					}
					out.push('>');
					if is_void(&el.tag) {
						continue;
					}
					let raw = is_raw_text(&el.tag);
					stack.push(Step::Close(id));
					stack.extend(self.children(id).iter().rev().map(|&child| Step::Node(child, raw)));
				}
			}
		}
	}
}

fn escape_text(text: &str, out: &mut String) {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

fn escape_attr(value: &str, out: &mut String) {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
}

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::{decode_entities, parse_fragment};
use crate::error::MarkupError;
use crate::node::NodeData;

fn roundtrip(markup: &str) -> String {
	let doc = parse_fragment(markup).unwrap();
	doc.inner_markup(doc.root())
}

#[test]
fn parses_renderer_output() {
	let markup = "<h1>Title</h1>\n<p>Hello <a href=\"https://example.com\" rel=\"noopener noreferrer\">link</a></p>\n";
	let doc = parse_fragment(markup).unwrap();
	let root = doc.root();
	let children = doc.children(root);
	assert_eq!(children.len(), 4);
	assert!(doc.element(children[0]).unwrap().is("h1"));
	assert_eq!(doc.data(children[1]).and_then(NodeData::as_text), Some("\n"));

	let anchor = doc.descendants(root).find(|&id| doc.element(id).is_some_and(|el| el.is("a"))).unwrap();
	let anchor = doc.element(anchor).unwrap();
	assert_eq!(anchor.attr("href"), Some("https://example.com"));
	assert_eq!(anchor.attr("rel"), Some("noopener noreferrer"));
	assert_eq!(roundtrip(markup), markup);
}

#[test]
fn void_and_self_closing_elements() {
	let doc = parse_fragment("<p>a<br>b<img src=x alt='y'/></p><input type=\"checkbox\" checked disabled>").unwrap();
	let root = doc.root();
	let p = doc.children(root)[0];
	assert_eq!(doc.children(p).len(), 4);
	let input = doc.element(doc.children(root)[1]).unwrap();
	assert_eq!(input.attr("checked"), Some(""));
	assert_eq!(input.attr("disabled"), Some(""));
}

#[test]
fn svg_markup_keeps_case_and_nesting() {
	let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><g><path d="M0 0L10 10"/><text x="1">A</text></g></svg>"#;
	let doc = parse_fragment(svg).unwrap();
	let svg_id = doc.children(doc.root())[0];
	assert_eq!(doc.element(svg_id).unwrap().attr("viewBox"), Some("0 0 10 10"));
	assert_eq!(doc.text_content(svg_id), "A");
}

#[test]
fn comments_and_declarations_are_dropped() {
	let out = roundtrip("<?xml version=\"1.0\"?><!DOCTYPE svg><!-- note --><p>x<!-- y -->z</p>");
	assert_eq!(out, "<p>xz</p>");
}

#[test]
fn style_content_is_raw_text() {
	let markup = "<svg><style>.a > .b { fill: red; }</style></svg>";
	let doc = parse_fragment(markup).unwrap();
	let svg = doc.children(doc.root())[0];
	let style = doc.children(svg)[0];
	assert_eq!(doc.text_content(style), ".a > .b { fill: red; }");
	assert_eq!(roundtrip(markup), markup);
}

#[test]
fn entities_decode_in_text_and_attributes() {
	let doc = parse_fragment("<p title=\"a &amp; b\">1 &lt; 2 &#x41;&#66; &unknown; &</p>").unwrap();
	let p = doc.children(doc.root())[0];
	assert_eq!(doc.element(p).unwrap().attr("title"), Some("a & b"));
	assert_eq!(doc.text_content(p), "1 < 2 AB &unknown; &");
}

#[test]
fn stray_less_than_is_text() {
	let doc = parse_fragment("a < b").unwrap();
	assert_eq!(doc.text_content(doc.root()), "a < b");
}

#[test]
fn malformed_markup_is_rejected() {
	assert_eq!(parse_fragment("<p class=\"x").err(), Some(MarkupError::UnterminatedTag { offset: 0 }));
	assert_eq!(parse_fragment("ab<!-- open").err(), Some(MarkupError::UnterminatedTag { offset: 2 }));
	assert_eq!(
		parse_fragment("<p>x</div>").err(),
		Some(MarkupError::UnexpectedClose {
			tag: "div".into(),
			offset: 4
		})
	);
	assert_eq!(
		parse_fragment("<div><p>x</div>").err(),
		Some(MarkupError::MismatchedClose {
			expected: "p".into(),
			found: "div".into(),
			offset: 9
		})
	);
	assert_eq!(parse_fragment("<div><p>x</p>").err(), Some(MarkupError::Unclosed { tag: "div".into() }));
	assert_eq!(parse_fragment("<style>x").err(), Some(MarkupError::Unclosed { tag: "style".into() }));
}

#[test]
fn decode_is_borrowed_without_references() {
	assert!(matches!(decode_entities("plain"), std::borrow::Cow::Borrowed("plain")));
	assert_eq!(decode_entities("&quot;&apos;&nbsp;"), "\"'\u{a0}");
}

fn arb_text() -> impl Strategy<Value = String> {
	"[a-z <>&\"]{0,12}"
}

fn arb_fragment() -> impl Strategy<Value = String> {
	let leaf = arb_text().prop_map(|t| t.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;"));
	leaf.prop_recursive(3, 24, 4, |inner| {
		(prop::sample::select(vec!["p", "div", "em", "code", "pre"]), prop::collection::vec(inner, 0..4))
			.prop_map(|(tag, children)| format!("<{tag}>{}</{tag}>", children.concat()))
	})
}

proptest! {
	/// Serializing a parsed fragment yields markup that parses to the same tree.
	#[test]
	fn prop_serialize_is_stable(fragment in arb_fragment()) {
		let once = roundtrip(&fragment);
		let twice = roundtrip(&once);
		prop_assert_eq!(once, twice);
	}
}

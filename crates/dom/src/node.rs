use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use rustc_hash::FxHasher;

/// Generational handle to a node in a [`crate::Document`].
///
/// Slots are reused after removal; the generation is bumped on every reuse so
/// a handle held across a reconciliation can be checked with
/// [`crate::Document::is_alive`] instead of silently pointing at a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	pub(crate) index: u32,
	pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}v{}", self.index, self.generation)
	}
}

/// A single `name="value"` pair on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
	pub name: String,
	pub value: String,
}

impl Attr {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
	pub tag: String,
	pub attrs: Vec<Attr>,
}

impl Element {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			attrs: Vec::new(),
		}
	}

	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attrs.iter().find(|a| a.name == name).map(|a| a.value.as_str())
	}

	/// Iterates the whitespace-separated tokens of the `class` attribute.
	pub fn classes(&self) -> impl Iterator<Item = &str> {
		self.attr("class").unwrap_or_default().split_ascii_whitespace()
	}

	pub fn has_class(&self, class: &str) -> bool {
		self.classes().any(|c| c == class)
	}

	/// Tag comparison is ASCII case-insensitive, matching HTML semantics.
	pub fn is(&self, tag: &str) -> bool {
		self.tag.eq_ignore_ascii_case(tag)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
	Element(Element),
	Text(String),
}

impl NodeData {
	pub fn as_element(&self) -> Option<&Element> {
		match self {
			Self::Element(el) => Some(el),
			Self::Text(_) => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			Self::Element(_) => None,
		}
	}
}

/// Enrichment progress of a diagram block container.
///
/// A node without a marker is unprocessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
	/// Claimed by an enrichment pass; a render call carrying `ticket` is outstanding.
	Processing { ticket: u64 },
	/// Rendered (or failed to render) for the marker's payload; never retried
	/// until the payload changes.
	Processed,
}

/// Block processing marker attached to a diagram block container.
///
/// Records the diagram language and textual payload the block was claimed
/// for, so reconciliation can tell whether a later candidate is still the same
/// diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMarker {
	/// Language token of the block's code class (`mermaid` for `language-mermaid`).
	pub language: Arc<str>,
	pub payload: Arc<str>,
	pub payload_hash: u64,
	pub state: BlockState,
}

impl BlockMarker {
	pub fn processing(language: impl Into<Arc<str>>, payload: Arc<str>, ticket: u64) -> Self {
		Self {
			language: language.into(),
			payload_hash: payload_hash(&payload),
			payload,
			state: BlockState::Processing { ticket },
		}
	}

	/// Returns true when `payload` is the same source this marker was claimed for.
	///
	/// Hashes are compared first; byte equality settles collisions.
	pub fn matches_payload(&self, payload: &str) -> bool {
		self.payload_hash == payload_hash(payload) && *self.payload == *payload
	}

	/// Returns true when a block tagged `language` with `payload` is the very
	/// diagram this marker was claimed for. Languages compare ASCII
	/// case-insensitively.
	pub fn matches(&self, language: &str, payload: &str) -> bool {
		self.language.eq_ignore_ascii_case(language) && self.matches_payload(payload)
	}

	pub fn is_processed(&self) -> bool {
		self.state == BlockState::Processed
	}

	pub fn ticket(&self) -> Option<u64> {
		match self.state {
			BlockState::Processing { ticket } => Some(ticket),
			BlockState::Processed => None,
		}
	}
}

/// Content hash used as the identity of a diagram payload.
pub fn payload_hash(payload: &str) -> u64 {
	let mut hasher = FxHasher::default();
	hasher.write(payload.as_bytes());
	hasher.finish()
}

#[derive(Debug, Clone)]
pub struct Node {
	pub data: NodeData,
	pub(crate) parent: Option<NodeId>,
	pub(crate) children: Vec<NodeId>,
	pub(crate) marker: Option<BlockMarker>,
}

impl Node {
	pub(crate) fn new(data: NodeData) -> Self {
		Self {
			data,
			parent: None,
			children: Vec::new(),
			marker: None,
		}
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn children(&self) -> &[NodeId] {
		&self.children
	}

	pub fn marker(&self) -> Option<&BlockMarker> {
		self.marker.as_ref()
	}

	pub fn element(&self) -> Option<&Element> {
		self.data.as_element()
	}
}

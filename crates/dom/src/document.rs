use crate::error::DomError;
use crate::node::{Attr, BlockMarker, Element, Node, NodeData, NodeId};

/// Class carried by the root of every preview surface.
const ROOT_CLASS: &str = "markdown-preview";

struct Slot {
	generation: u32,
	node: Option<Node>,
}

/// Arena-backed displayed tree.
///
/// The root element is created with the document and never replaced, so
/// listeners attached to it survive any number of reconciliations. Every
/// structural, attribute or text change bumps [`Document::mutation_count`];
/// setters that would write an identical value are not counted.
pub struct Document {
	slots: Vec<Slot>,
	free: Vec<u32>,
	root: NodeId,
	mutations: u64,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Creates an empty preview surface rooted at `<div class="markdown-preview">`.
	pub fn new() -> Self {
		let mut root = Element::new("div");
		root.attrs.push(Attr::new("class", ROOT_CLASS));
		Self::with_root(root)
	}

	pub fn with_root(root: Element) -> Self {
		let mut doc = Self {
			slots: Vec::new(),
			free: Vec::new(),
			root: NodeId { index: 0, generation: 0 },
			mutations: 0,
		};
		doc.root = doc.alloc(Node::new(NodeData::Element(root)));
		doc
	}

	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Number of counted mutations since creation.
	pub fn mutation_count(&self) -> u64 {
		self.mutations
	}

	/// Number of live nodes, detached ones included.
	pub fn len(&self) -> usize {
		self.slots.len() - self.free.len()
	}

	pub fn is_empty(&self) -> bool {
		self.children(self.root).is_empty()
	}

	pub fn is_alive(&self, id: NodeId) -> bool {
		self.get(id).is_some()
	}

	pub fn get(&self, id: NodeId) -> Option<&Node> {
		let slot = self.slots.get(id.index as usize)?;
		if slot.generation != id.generation {
			return None;
		}
		slot.node.as_ref()
	}

	fn node(&self, id: NodeId) -> Result<&Node, DomError> {
		self.get(id).ok_or(DomError::StaleNode(id))
	}

	fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
		let slot = self.slots.get_mut(id.index as usize).ok_or(DomError::StaleNode(id))?;
		if slot.generation != id.generation {
			return Err(DomError::StaleNode(id));
		}
		slot.node.as_mut().ok_or(DomError::StaleNode(id))
	}

	fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, DomError> {
		match &mut self.node_mut(id)?.data {
			NodeData::Element(el) => Ok(el),
			NodeData::Text(_) => Err(DomError::NotAnElement(id)),
		}
	}

	pub fn data(&self, id: NodeId) -> Option<&NodeData> {
		self.get(id).map(|n| &n.data)
	}

	pub fn element(&self, id: NodeId) -> Option<&Element> {
		self.get(id).and_then(Node::element)
	}

	/// Children of `id`; empty for stale handles.
	pub fn children(&self, id: NodeId) -> &[NodeId] {
		self.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
	}

	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.get(id).and_then(|n| n.parent)
	}

	pub fn marker(&self, id: NodeId) -> Option<&BlockMarker> {
		self.get(id).and_then(|n| n.marker.as_ref())
	}

	/// Replaces the block marker of `id`, returning the previous one.
	///
	/// Markers are enrichment metadata and do not count as mutations.
	pub fn set_marker(&mut self, id: NodeId, marker: Option<BlockMarker>) -> Result<Option<BlockMarker>, DomError> {
		let node = self.node_mut(id)?;
		Ok(std::mem::replace(&mut node.marker, marker))
	}

	/// Concatenated text of all descendant text nodes, in document order.
	pub fn text_content(&self, id: NodeId) -> String {
		let mut out = String::new();
		if let Some(text) = self.data(id).and_then(NodeData::as_text) {
			out.push_str(text);
		}
		for desc in self.descendants(id) {
			if let Some(text) = self.data(desc).and_then(NodeData::as_text) {
				out.push_str(text);
			}
		}
		out
	}

	/// Pre-order iterator over the strict descendants of `id`.
	pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
		let mut stack: Vec<NodeId> = self.children(id).to_vec();
		stack.reverse();
		Descendants { doc: self, stack }
	}

	/// Returns true when `ancestor` is `id` or lies on its parent chain.
	pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
		let mut cur = Some(id);
		while let Some(node) = cur {
			if node == ancestor {
				return true;
			}
			cur = self.parent(node);
		}
		false
	}

	/// Creates a detached element. Not a mutation until attached.
	pub fn create_element(&mut self, element: Element) -> NodeId {
		self.alloc(Node::new(NodeData::Element(element)))
	}

	/// Creates a detached text node. Not a mutation until attached.
	pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
		self.alloc(Node::new(NodeData::Text(text.into())))
	}

	/// Deep-copies `src_id` from `src` into this arena as a detached subtree.
	///
	/// Block markers are not copied: imported content is always unprocessed.
	pub fn import(&mut self, src: &Document, src_id: NodeId) -> Result<NodeId, DomError> {
		let id = self.alloc(Node::new(src.node(src_id)?.data.clone()));
		let mut stack = vec![(src_id, id)];
		while let Some((from, to)) = stack.pop() {
			for &child in src.children(from) {
				let copied = self.alloc(Node::new(src.node(child)?.data.clone()));
				self.node_mut(copied)?.parent = Some(to);
				self.node_mut(to)?.children.push(copied);
				stack.push((child, copied));
			}
		}
		Ok(id)
	}

	pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
		let len = self.node(parent)?.children.len();
		self.insert_child(parent, len, child)
	}

	pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
		self.check_attachable(parent, child)?;
		let len = self.node(parent)?.children.len();
		if index > len {
			return Err(DomError::ChildIndex { parent, index, len });
		}
		self.node_mut(parent)?.children.insert(index, child);
		self.node_mut(child)?.parent = Some(parent);
		self.mutations += 1;
		Ok(())
	}

	/// Removes the `index`th child of `parent` and frees its subtree.
	pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<(), DomError> {
		let children = &mut self.node_mut(parent)?.children;
		let len = children.len();
		if index >= len {
			return Err(DomError::ChildIndex { parent, index, len });
		}
		let old = children.remove(index);
		self.free_subtree(old);
		self.mutations += 1;
		Ok(())
	}

	/// Swaps the `index`th child of `parent` for the detached node `child`,
	/// freeing the previous subtree.
	pub fn replace_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
		self.check_attachable(parent, child)?;
		let children = &mut self.node_mut(parent)?.children;
		let len = children.len();
		if index >= len {
			return Err(DomError::ChildIndex { parent, index, len });
		}
		let old = std::mem::replace(&mut children[index], child);
		self.node_mut(child)?.parent = Some(parent);
		self.free_subtree(old);
		self.mutations += 1;
		Ok(())
	}

	/// Replaces every child of `parent` with the detached nodes in `children`.
	///
	/// Counted as a single mutation.
	pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Result<(), DomError> {
		for &child in &children {
			self.check_attachable(parent, child)?;
		}
		for &child in &children {
			self.node_mut(child)?.parent = Some(parent);
		}
		let old = std::mem::replace(&mut self.node_mut(parent)?.children, children);
		for id in old {
			self.free_subtree(id);
		}
		self.mutations += 1;
		Ok(())
	}

	/// Sets the text of a text node. Returns false (and counts nothing) when unchanged.
	pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<bool, DomError> {
		match &mut self.node_mut(id)?.data {
			NodeData::Text(cur) if cur == text => Ok(false),
			NodeData::Text(cur) => {
				text.clone_into(cur);
				self.mutations += 1;
				Ok(true)
			}
			NodeData::Element(_) => Err(DomError::NotAnElement(id)),
		}
	}

	/// Sets an attribute. Returns false (and counts nothing) when unchanged.
	pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<bool, DomError> {
		let el = self.element_mut(id)?;
		match el.attrs.iter_mut().find(|a| a.name == name) {
			Some(attr) if attr.value == value => return Ok(false),
			Some(attr) => value.clone_into(&mut attr.value),
			None => el.attrs.push(Attr::new(name, value)),
		}
		self.mutations += 1;
		Ok(true)
	}

	pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
		let el = self.element_mut(id)?;
		let before = el.attrs.len();
		el.attrs.retain(|a| a.name != name);
		if el.attrs.len() == before {
			return Ok(false);
		}
		self.mutations += 1;
		Ok(true)
	}

	/// Appends any of `classes` not already present to the `class` attribute.
	pub fn add_classes<'a>(&mut self, id: NodeId, classes: impl IntoIterator<Item = &'a str>) -> Result<bool, DomError> {
		let el = self.element(id).ok_or(DomError::NotAnElement(id))?;
		let mut class: Vec<&str> = el.classes().collect();
		let before = class.len();
		for c in classes {
			if !class.contains(&c) {
				class.push(c);
			}
		}
		if class.len() == before {
			return Ok(false);
		}
		let joined = class.join(" ");
		self.set_attr(id, "class", &joined)
	}

	fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
		self.element(parent).ok_or(DomError::NotAnElement(parent))?;
		if self.node(child)?.parent.is_some() || child == self.root {
			return Err(DomError::AlreadyAttached(child));
		}
		if self.is_ancestor_or_self(child, parent) {
			return Err(DomError::Cycle { parent, child });
		}
		Ok(())
	}

	fn alloc(&mut self, node: Node) -> NodeId {
		if let Some(index) = self.free.pop() {
			let slot = &mut self.slots[index as usize];
			slot.generation = slot.generation.wrapping_add(1);
			slot.node = Some(node);
			return NodeId {
				index,
				generation: slot.generation,
			};
		}
		let index = self.slots.len() as u32;
		self.slots.push(Slot {
			generation: 0,
			node: Some(node),
		});
		NodeId { index, generation: 0 }
	}

	fn free_subtree(&mut self, id: NodeId) {
		let mut stack = vec![id];
		while let Some(cur) = stack.pop() {
			let Some(slot) = self.slots.get_mut(cur.index as usize) else {
				continue;
			};
			if slot.generation != cur.generation {
				continue;
			}
			if let Some(node) = slot.node.take() {
				stack.extend(node.children);
				self.free.push(cur.index);
			}
		}
	}
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
	doc: &'a Document,
	stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		let id = self.stack.pop()?;
		self.stack.extend(self.doc.children(id).iter().rev());
		Some(id)
	}
}

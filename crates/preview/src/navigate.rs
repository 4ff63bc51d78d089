//! Navigation interceptor.
//!
//! One delegated listener on the stable root. Anchor nodes come and go with
//! every reconciliation, so nothing is ever attached to them; an activation
//! is resolved by walking up from its target to the nearest anchor.

use std::sync::Arc;

use glint_dom::{Document, NodeId};
use tracing::{debug, trace};

/// Receives outbound link targets. Targets are unvalidated.
pub trait NavigationHandler: Send + Sync {
	fn navigate(&self, target: &str);
}

impl<F> NavigationHandler for F
where
	F: Fn(&str) + Send + Sync,
{
	fn navigate(&self, target: &str) {
		self(target)
	}
}

/// A click or key activation on a node of the displayed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
	pub target: NodeId,
	/// Set by the interceptor when it takes over the activation.
	pub default_prevented: bool,
}

impl Activation {
	pub fn new(target: NodeId) -> Self {
		Self {
			target,
			default_prevented: false,
		}
	}

	pub fn prevent_default(&mut self) {
		self.default_prevented = true;
	}
}

pub struct NavigationInterceptor {
	root: NodeId,
	handler: Arc<dyn NavigationHandler>,
}

impl NavigationInterceptor {
	/// Attaches to the root of `doc`. The attachment stays valid for the
	/// document's lifetime.
	pub fn attach(doc: &Document, handler: Arc<dyn NavigationHandler>) -> Self {
		Self { root: doc.root(), handler }
	}

	/// Handles an activation bubbling up to the root.
	///
	/// Returns the forwarded target, if any. An anchor without a usable
	/// `href` still has its default prevented.
	pub fn dispatch(&self, doc: &Document, activation: &mut Activation) -> Option<String> {
		if !doc.is_ancestor_or_self(self.root, activation.target) {
			trace!(target_node = %activation.target, "navigate.outside_root");
			return None;
		}
		let anchor = self.anchor_for(doc, activation.target)?;
		activation.prevent_default();

		let href = doc.element(anchor)?.attr("href")?.trim();
		if href.is_empty() {
			return None;
		}
		debug!(href, "navigate.forward");
		self.handler.navigate(href);
		Some(href.to_owned())
	}

	/// Nearest `a` element at or above `node`, stopping at the root.
	fn anchor_for(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
		let mut cur = Some(node);
		while let Some(id) = cur {
			if doc.element(id).is_some_and(|el| el.is("a")) {
				return Some(id);
			}
			if id == self.root {
				return None;
			}
			cur = doc.parent(id);
		}
		None
	}
}

/// Anchors in document order with their `href`, for listing and activation by index.
pub fn anchors(doc: &Document) -> Vec<(NodeId, String)> {
	doc.descendants(doc.root())
		.filter_map(|id| {
			let el = doc.element(id)?;
			el.is("a").then(|| (id, el.attr("href").unwrap_or_default().to_owned()))
		})
		.collect()
}

#[cfg(test)]
mod tests;

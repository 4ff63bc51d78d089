//! Tree reconciler.
//!
//! Patches the displayed tree in place so that it serializes like freshly
//! rendered markup, touching only what differs. Children are paired by
//! position; reordered siblings become replacements, never moves.
//!
//! The new markup is parsed into a detached candidate tree before anything is
//! touched, so malformed markup aborts the call with the displayed tree at its
//! last good state.

use glint_dom::{BlockMarker, Document, NodeData, NodeId, parse_fragment};
use tracing::debug;

use crate::diagram::block_language;
use crate::error::ReconcileError;

/// Decides whether an existing subtree is left untouched.
///
/// Called with `(displayed, existing, candidate_doc, candidate)` for every
/// positional pair before it is compared. Returning true skips the pair and
/// its whole subtree.
pub trait SkipPredicate {
	fn skip(&self, displayed: &Document, existing: NodeId, candidate_doc: &Document, candidate: NodeId) -> bool;
}

impl<F> SkipPredicate for F
where
	F: Fn(&Document, NodeId, &Document, NodeId) -> bool,
{
	fn skip(&self, displayed: &Document, existing: NodeId, candidate_doc: &Document, candidate: NodeId) -> bool {
		self(displayed, existing, candidate_doc, candidate)
	}
}

/// Skips diagram blocks already rendered for the candidate's exact language
/// and payload.
///
/// Both are compared against what was recorded when the block was claimed,
/// since the displayed block now holds the rendered image rather than its
/// source. A candidate that is no longer a diagram block never matches.
pub fn skip_processed_blocks(displayed: &Document, existing: NodeId, candidate_doc: &Document, candidate: NodeId) -> bool {
	displayed
		.marker(existing)
		.is_some_and(|m| m.is_processed() && is_same_diagram(m, candidate_doc, candidate))
}

/// Returns true when `candidate` is a diagram block carrying the language and
/// payload `marker` was claimed for.
fn is_same_diagram(marker: &BlockMarker, candidate_doc: &Document, candidate: NodeId) -> bool {
	block_language(candidate_doc, candidate).is_some_and(|lang| marker.matches(lang, &candidate_doc.text_content(candidate)))
}

/// Never skips. Every pair is compared.
pub fn skip_nothing(_: &Document, _: NodeId, _: &Document, _: NodeId) -> bool {
	false
}

/// Summary of one reconcile call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
	/// Mutations applied to the displayed tree.
	pub mutations: u64,
	/// Pairs left untouched by the skip predicate.
	pub skipped: usize,
	/// Block markers dropped because their node was patched.
	pub markers_cleared: usize,
}

/// Reconciles the children of the displayed tree's root against `markup`.
pub fn reconcile(doc: &mut Document, markup: &str, skip: &impl SkipPredicate) -> Result<ReconcileStats, ReconcileError> {
	let candidate = parse_fragment(markup)?;
	let before = doc.mutation_count();
	let root = doc.root();

	let mut morph = Morph {
		doc: &mut *doc,
		candidate: &candidate,
		skip,
		stats: ReconcileStats::default(),
	};
	morph.run(root, candidate.root())?;

	let mut stats = morph.stats;
	stats.mutations = doc.mutation_count() - before;
	debug!(
		mutations = stats.mutations,
		skipped = stats.skipped,
		markers_cleared = stats.markers_cleared,
		"preview.reconcile"
	);
	Ok(stats)
}

struct Morph<'a, S: ?Sized> {
	doc: &'a mut Document,
	candidate: &'a Document,
	skip: &'a S,
	stats: ReconcileStats,
}

impl<S: SkipPredicate + ?Sized> Morph<'_, S> {
	/// Morphs the children of `root` and every matched pair below it. Pairs
	/// are queued rather than recursed into, so nesting depth is not bounded by
	/// the thread's stack.
	fn run(&mut self, root: NodeId, cand_root: NodeId) -> Result<(), ReconcileError> {
		let mut queue = vec![(root, cand_root)];
		while let Some((parent, cand_parent)) = queue.pop() {
			self.children(parent, cand_parent, &mut queue)?;
		}
		Ok(())
	}

	fn children(&mut self, parent: NodeId, cand_parent: NodeId, queue: &mut Vec<(NodeId, NodeId)>) -> Result<(), ReconcileError> {
		let candidate = self.candidate;
		let cand_children = candidate.children(cand_parent);
		for (index, &cand) in cand_children.iter().enumerate() {
			match self.doc.children(parent).get(index).copied() {
				Some(existing) => {
					if self.node(parent, index, existing, cand)? {
						queue.push((existing, cand));
					}
				}
				None => {
					let fresh = self.doc.import(candidate, cand)?;
					self.doc.append_child(parent, fresh)?;
				}
			}
		}

		let keep = cand_children.len();
		while self.doc.children(parent).len() > keep {
			let last = self.doc.children(parent).len() - 1;
			self.doc.remove_child(parent, last)?;
		}
		Ok(())
	}

	/// Patches one positional pair. Returns true when the pair's children
	/// still need morphing.
	fn node(&mut self, parent: NodeId, index: usize, existing: NodeId, cand: NodeId) -> Result<bool, ReconcileError> {
		let candidate = self.candidate;
		if self.skip.skip(&*self.doc, existing, candidate, cand) {
			self.stats.skipped += 1;
			return Ok(false);
		}

		let same_kind = match (self.doc.data(existing), candidate.data(cand)) {
			(Some(NodeData::Text(_)), Some(NodeData::Text(_))) => true,
			(Some(NodeData::Element(a)), Some(NodeData::Element(b))) => a.tag == b.tag,
			_ => false,
		};
		if !same_kind {
			let fresh = self.doc.import(candidate, cand)?;
			self.doc.replace_child(parent, index, fresh)?;
			return Ok(false);
		}

		match candidate.data(cand) {
			Some(NodeData::Text(text)) => {
				self.doc.set_text(existing, text)?;
				Ok(false)
			}
			Some(NodeData::Element(_)) => {
				self.marker(existing, cand)?;
				self.attrs(existing, cand)?;
				Ok(true)
			}
			None => Ok(false),
		}
	}

	/// A claimed block keeps its claim only while it is still the same diagram:
	/// same language, same payload. Anything else means the node is about to
	/// show fresh source and starts over as unprocessed.
	fn marker(&mut self, existing: NodeId, cand: NodeId) -> Result<(), ReconcileError> {
		let Some(marker) = self.doc.marker(existing) else {
			return Ok(());
		};
		let keep = !marker.is_processed() && is_same_diagram(marker, self.candidate, cand);
		if !keep {
			self.doc.set_marker(existing, None)?;
			self.stats.markers_cleared += 1;
		}
		Ok(())
	}

	fn attrs(&mut self, existing: NodeId, cand: NodeId) -> Result<(), ReconcileError> {
		let Some(wanted) = self.candidate.element(cand) else {
			return Ok(());
		};
		for attr in &wanted.attrs {
			self.doc.set_attr(existing, &attr.name, &attr.value)?;
		}

		let stale: Vec<String> = self
			.doc
			.element(existing)
			.map(|el| {
				el.attrs
					.iter()
					.filter(|a| wanted.attr(&a.name).is_none())
					.map(|a| a.name.clone())
					.collect()
			})
			.unwrap_or_default();
		for name in stale {
			self.doc.remove_attr(existing, &name)?;
		}
		Ok(())
	}
}

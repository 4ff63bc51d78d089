//! Diagram enricher.
//!
//! Finds diagram blocks (`pre > code.language-<lang>`) in the displayed tree,
//! renders each one out of band and splices the image in place of the source.
//!
//! # Claims
//!
//! [`DiagramEnricher::claim`] marks every unclaimed block `Processing` with a
//! fresh ticket before returning the render jobs, so nothing can claim the
//! same block twice across a suspension point. A completion is applied only if
//! the block is still alive and still carries the ticket it was issued for;
//! reconciliation clears the claim when the payload changes, which turns the
//! outstanding completion stale.
//!
//! At most one render is outstanding per block. A block whose claim was
//! cleared while its render is still running is not re-claimed until that
//! render completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use glint_dom::{Attr, BlockMarker, BlockState, Document, DomError, Element, NodeId, parse_fragment};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::DiagramConfig;
use crate::error::DiagramRenderError;

mod command;

pub use command::CommandDiagramRenderer;

/// Class on the inline indicator shown for a failed render.
pub const ERROR_CLASS: &str = "diagram-error";

/// Text of the inline failure indicator.
pub const ERROR_TEXT: &str = "Diagram Error";

/// Renders diagram source to image markup.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
	/// `render_id` is unique per call and may be used to namespace ids inside
	/// the produced image.
	async fn render(&self, render_id: &str, source: &str) -> Result<String, DiagramRenderError>;
}

/// A claimed block waiting to be rendered.
#[derive(Debug, Clone)]
pub struct DiagramJob {
	pub node: NodeId,
	pub ticket: u64,
	pub render_id: String,
	pub source: Arc<str>,
	timeout: Duration,
}

impl DiagramJob {
	/// Runs the render. This is the only suspension point of the enrichment step.
	pub async fn run(self, renderer: Arc<dyn DiagramRenderer>) -> DiagramDone {
		trace!(node = %self.node, render_id = %self.render_id, "diagram.render.start");
		let result = match tokio::time::timeout(self.timeout, renderer.render(&self.render_id, &self.source)).await {
			Ok(result) => result,
			Err(_) => Err(DiagramRenderError::Timeout(self.timeout)),
		};
		DiagramDone {
			node: self.node,
			ticket: self.ticket,
			result,
		}
	}
}

/// Completion of a [`DiagramJob`].
#[derive(Debug, Clone)]
pub struct DiagramDone {
	pub node: NodeId,
	pub ticket: u64,
	pub result: Result<String, DiagramRenderError>,
}

/// What [`DiagramEnricher::apply`] did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
	/// The image replaced the block's content.
	Rendered,
	/// The block now shows the inline error indicator.
	Failed,
	/// The block was removed or its claim was superseded; nothing changed.
	Stale,
}

/// Totals from [`DiagramEnricher::enrich`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
	pub rendered: usize,
	pub failed: usize,
	pub stale: usize,
}

#[derive(Debug)]
pub struct DiagramEnricher {
	languages: Vec<String>,
	decorations: Vec<String>,
	timeout: Duration,
	next_ticket: u64,
	/// Outstanding renders by block, with the ticket each was issued for.
	inflight: FxHashMap<NodeId, u64>,
}

impl Default for DiagramEnricher {
	fn default() -> Self {
		Self::new(&DiagramConfig::default())
	}
}

impl DiagramEnricher {
	pub fn new(config: &DiagramConfig) -> Self {
		Self {
			languages: config.languages.iter().map(|l| l.to_ascii_lowercase()).collect(),
			decorations: config.decorations.clone(),
			timeout: config.timeout(),
			next_ticket: 0,
			inflight: FxHashMap::default(),
		}
	}

	/// Number of renders issued and not yet applied.
	pub fn pending(&self) -> usize {
		self.inflight.len()
	}

	/// Configured diagram language of the block container `pre`, if any.
	fn diagram_language<'d>(&self, doc: &'d Document, pre: NodeId) -> Option<&'d str> {
		block_language(doc, pre).filter(|lang| self.languages.iter().any(|want| matches_language(lang, want)))
	}

	/// Diagram block containers in document order.
	pub fn blocks(&self, doc: &Document) -> Vec<NodeId> {
		doc.descendants(doc.root())
			.filter(|&id| self.diagram_language(doc, id).is_some())
			.collect()
	}

	/// Claims every unprocessed block and returns the render jobs.
	///
	/// Claiming is synchronous: by the time this returns, every returned
	/// block is marked `Processing` and a second call returns none of them.
	pub fn claim(&mut self, doc: &mut Document) -> Result<Vec<DiagramJob>, DomError> {
		let mut jobs = Vec::new();
		for node in self.blocks(doc) {
			if doc.marker(node).is_some() || self.inflight.contains_key(&node) {
				continue;
			}
			let Some(language) = self.diagram_language(doc, node).map(Arc::<str>::from) else {
				continue;
			};
			let source: Arc<str> = Arc::from(doc.text_content(node));
			self.next_ticket += 1;
			let ticket = self.next_ticket;
			doc.set_marker(node, Some(BlockMarker::processing(language, source.clone(), ticket)))?;
			self.inflight.insert(node, ticket);

			let render_id = format!("diagram-{}", Uuid::new_v4().simple());
			debug!(node = %node, ticket, render_id = %render_id, bytes = source.len(), "diagram.claim");
			jobs.push(DiagramJob {
				node,
				ticket,
				render_id,
				source,
				timeout: self.timeout,
			});
		}
		Ok(jobs)
	}

	/// Folds a completion into the tree.
	///
	/// A failed render still marks the block processed; only a payload change
	/// triggers another attempt.
	pub fn apply(&mut self, doc: &mut Document, done: DiagramDone) -> Result<ApplyOutcome, DomError> {
		if self.inflight.get(&done.node) == Some(&done.ticket) {
			self.inflight.remove(&done.node);
		}

		let current = doc.marker(done.node).and_then(BlockMarker::ticket);
		if current != Some(done.ticket) {
			trace!(node = %done.node, ticket = done.ticket, "diagram.stale");
			return Ok(ApplyOutcome::Stale);
		}

		let image = done.result.and_then(|svg| parse_image(&svg));
		let outcome = match image {
			Ok(fragment) => {
				let mut imported = Vec::with_capacity(fragment.children(fragment.root()).len());
				for &child in fragment.children(fragment.root()) {
					imported.push(doc.import(&fragment, child)?);
				}
				doc.replace_children(done.node, imported)?;
				doc.add_classes(done.node, self.decorations.iter().map(String::as_str))?;
				ApplyOutcome::Rendered
			}
			Err(error) => {
				warn!(node = %done.node, error = %error, "diagram.render.failed");
				let mut indicator = Element::new("div");
				indicator.attrs.push(Attr::new("class", ERROR_CLASS));
				let indicator = doc.create_element(indicator);
				let text = doc.create_text(ERROR_TEXT);
				doc.append_child(indicator, text)?;
				doc.replace_children(done.node, vec![indicator])?;
				ApplyOutcome::Failed
			}
		};

		if let Some(mut marker) = doc.marker(done.node).cloned() {
			marker.state = BlockState::Processed;
			doc.set_marker(done.node, Some(marker))?;
		}
		Ok(outcome)
	}

	/// Claims, renders and applies until no block is left unclaimed.
	///
	/// Renders of distinct blocks run concurrently.
	pub async fn enrich(&mut self, doc: &mut Document, renderer: Arc<dyn DiagramRenderer>) -> Result<EnrichStats, DomError> {
		let mut stats = EnrichStats::default();
		loop {
			let jobs = self.claim(doc)?;
			if jobs.is_empty() {
				return Ok(stats);
			}
			let done = join_all(jobs.into_iter().map(|job| job.run(renderer.clone()))).await;
			for done in done {
				match self.apply(doc, done)? {
					ApplyOutcome::Rendered => stats.rendered += 1,
					ApplyOutcome::Failed => stats.failed += 1,
					ApplyOutcome::Stale => stats.stale += 1,
				}
			}
		}
	}
}

/// Language token of a block container: the first `language-*` class on a
/// `code` child of a `pre` element.
pub(crate) fn block_language(doc: &Document, pre: NodeId) -> Option<&str> {
	if !doc.element(pre)?.is("pre") {
		return None;
	}
	doc.children(pre)
		.iter()
		.filter_map(|&child| doc.element(child).filter(|el| el.is("code")))
		.find_map(|code| code.classes().find_map(language_of))
}

/// `language-mermaid` -> `mermaid`.
fn language_of(class: &str) -> Option<&str> {
	let prefix = class.get(..9)?;
	prefix.eq_ignore_ascii_case("language-").then(|| &class[9..])
}

/// Case-insensitive match that also accepts dash-suffixed variants
/// (`mermaid-flowchart` for `mermaid`).
fn matches_language(lang: &str, want: &str) -> bool {
	match lang.get(..want.len()) {
		Some(head) if head.eq_ignore_ascii_case(want) => lang.len() == want.len() || lang.as_bytes()[want.len()] == b'-',
		_ => false,
	}
}

/// Parses renderer output, requiring an `svg` element at the top level.
fn parse_image(svg: &str) -> Result<Document, DiagramRenderError> {
	let fragment = parse_fragment(svg).map_err(|e| DiagramRenderError::InvalidSvg(e.to_string()))?;
	let has_svg = fragment
		.children(fragment.root())
		.iter()
		.any(|&id| fragment.element(id).is_some_and(|el| el.is("svg")));
	if !has_svg {
		return Err(DiagramRenderError::InvalidSvg("no <svg> element in output".into()));
	}
	Ok(fragment)
}

//! Pipeline driver.
//!
//! [`Preview`] owns the displayed tree and is its only writer. It runs as a
//! single task: snapshots, debounce deadlines and completed conversion and
//! diagram tasks are all folded in on that task, so reconciliation and
//! enrichment never overlap. External calls run in spawned tasks and only
//! report back.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use glint_dom::{Document, NodeId};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::config::PreviewConfig;
use crate::diagram::{ApplyOutcome, DiagramDone, DiagramEnricher, DiagramRenderer};
use crate::dispatch::{Dispatcher, Resolution, SequenceId};
use crate::error::{ConversionError, DiagramRenderError};
use crate::gateway::{MarkupRenderer, RendererGateway};
use crate::navigate::{Activation, NavigationHandler, NavigationInterceptor, anchors};
use crate::reconcile::{reconcile, skip_processed_blocks};

/// Input to the driver task.
#[derive(Debug)]
pub enum PreviewEvent {
	/// The full source text changed.
	Snapshot(Arc<str>),
	/// A node of the displayed tree was activated.
	Activate(Activation),
	Shutdown,
}

/// What the preview currently shows. Published after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewView {
	/// Serialized children of the preview root.
	pub markup: Arc<str>,
	/// Sequence id of the conversion last applied.
	pub applied_sequence: Option<SequenceId>,
	/// Mutation count of the displayed tree.
	pub mutations: u64,
	/// Diagram renders still outstanding.
	pub pending_diagrams: usize,
	/// Anchors in document order, for activation.
	pub links: Vec<(NodeId, String)>,
}

type ConversionDone = (SequenceId, Result<String, ConversionError>);

pub struct Preview {
	doc: Document,
	dispatcher: Dispatcher,
	gateway: RendererGateway,
	enricher: DiagramEnricher,
	diagrams: Arc<dyn DiagramRenderer>,
	interceptor: NavigationInterceptor,
	conversions: JoinSet<ConversionDone>,
	renders: JoinSet<DiagramDone>,
	applied: Option<SequenceId>,
	view_tx: watch::Sender<PreviewView>,
}

impl Preview {
	pub fn new(
		config: &PreviewConfig,
		renderer: Arc<dyn MarkupRenderer>,
		diagrams: Arc<dyn DiagramRenderer>,
		navigation: Arc<dyn NavigationHandler>,
	) -> Self {
		let doc = Document::new();
		let interceptor = NavigationInterceptor::attach(&doc, navigation);
		let (view_tx, _) = watch::channel(PreviewView::default());
		Self {
			doc,
			dispatcher: Dispatcher::new(config.debounce()),
			gateway: RendererGateway::new(renderer, config.render_timeout()),
			enricher: DiagramEnricher::new(&config.diagram),
			diagrams,
			interceptor,
			conversions: JoinSet::new(),
			renders: JoinSet::new(),
			applied: None,
			view_tx,
		}
	}

	pub fn document(&self) -> &Document {
		&self.doc
	}

	/// Starts the driver task on the current runtime.
	pub fn spawn(self) -> PreviewHandle {
		let (events, rx) = mpsc::unbounded_channel();
		let view = self.view_tx.subscribe();
		let task = tokio::spawn(self.run(rx));
		PreviewHandle { events, view, task }
	}

	async fn run(mut self, mut events: mpsc::UnboundedReceiver<PreviewEvent>) {
		debug!(window_ms = self.dispatcher.window().as_millis() as u64, "preview.start");
		loop {
			let deadline = self.dispatcher.deadline();
			tokio::select! {
				biased;
				event = events.recv() => match event {
					Some(PreviewEvent::Snapshot(text)) => self.dispatcher.note_snapshot(text, Instant::now()),
					Some(PreviewEvent::Activate(mut activation)) => {
						self.interceptor.dispatch(&self.doc, &mut activation);
					}
					Some(PreviewEvent::Shutdown) | None => break,
				},
				_ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
					self.dispatch_due();
				}
				Some(done) = self.conversions.join_next(), if !self.conversions.is_empty() => {
					self.conversion_done(done);
				}
				Some(done) = self.renders.join_next(), if !self.renders.is_empty() => {
					self.diagram_done(done);
				}
			}
		}

		self.conversions.shutdown().await;
		self.renders.shutdown().await;
		debug!("preview.stop");
	}

	fn dispatch_due(&mut self) {
		let Some(request) = self.dispatcher.poll_due(Instant::now()) else {
			return;
		};
		debug!(seq = request.seq.0, bytes = request.snapshot.len(), "preview.dispatch");
		let gateway = self.gateway.clone();
		self.conversions.spawn(async move {
			let result = AssertUnwindSafe(gateway.render(&request.snapshot))
				.catch_unwind()
				.await
				.unwrap_or_else(|_| Err(ConversionError::Task("renderer panicked".into())));
			(request.seq, result)
		});
	}

	fn conversion_done(&mut self, done: Result<ConversionDone, JoinError>) {
		let (seq, result) = match done {
			Ok(done) => done,
			Err(e) => {
				error!(error = %e, "preview.conversion.join");
				return;
			}
		};

		if self.dispatcher.resolve(seq) == Resolution::Discard {
			trace!(seq = seq.0, "preview.conversion.discarded");
			return;
		}
		let markup = match result {
			Ok(markup) => markup,
			Err(e) => {
				warn!(seq = seq.0, error = %e, "preview.conversion.failed");
				return;
			}
		};

		match reconcile(&mut self.doc, &markup, &skip_processed_blocks) {
			Ok(stats) => {
				self.applied = Some(seq);
				debug!(seq = seq.0, mutations = stats.mutations, skipped = stats.skipped, "preview.applied");
				self.start_diagrams();
				self.publish();
			}
			Err(e) => error!(seq = seq.0, error = %e, "preview.reconcile.failed"),
		}
	}

	/// Claims every unprocessed diagram block and spawns its render.
	fn start_diagrams(&mut self) {
		let jobs = match self.enricher.claim(&mut self.doc) {
			Ok(jobs) => jobs,
			Err(e) => {
				error!(error = %e, "preview.diagram.claim");
				return;
			}
		};
		for job in jobs {
			let (node, ticket) = (job.node, job.ticket);
			let renderer = self.diagrams.clone();
			self.renders.spawn(async move {
				AssertUnwindSafe(job.run(renderer))
					.catch_unwind()
					.await
					.unwrap_or_else(|_| DiagramDone {
						node,
						ticket,
						result: Err(DiagramRenderError::Renderer("diagram renderer panicked".into())),
					})
			});
		}
	}

	fn diagram_done(&mut self, done: Result<DiagramDone, JoinError>) {
		let done = match done {
			Ok(done) => done,
			Err(e) => {
				error!(error = %e, "preview.diagram.join");
				return;
			}
		};
		match self.enricher.apply(&mut self.doc, done) {
			Ok(ApplyOutcome::Stale) => {}
			Ok(outcome) => trace!(?outcome, "preview.diagram.applied"),
			Err(e) => error!(error = %e, "preview.diagram.apply"),
		}
		// A stale completion may have released a block whose payload changed.
		self.start_diagrams();
		self.publish();
	}

	fn publish(&self) {
		let root = self.doc.root();
		self.view_tx.send_replace(PreviewView {
			markup: Arc::from(self.doc.inner_markup(root)),
			applied_sequence: self.applied,
			mutations: self.doc.mutation_count(),
			pending_diagrams: self.enricher.pending(),
			links: anchors(&self.doc),
		});
	}
}

/// Handle to a running [`Preview`].
pub struct PreviewHandle {
	events: mpsc::UnboundedSender<PreviewEvent>,
	view: watch::Receiver<PreviewView>,
	task: JoinHandle<()>,
}

impl PreviewHandle {
	/// Submits a new snapshot. Returns false if the driver has stopped.
	pub fn update(&self, text: impl Into<Arc<str>>) -> bool {
		self.events.send(PreviewEvent::Snapshot(text.into())).is_ok()
	}

	/// Activates `target`, e.g. a link from [`PreviewView::links`].
	pub fn activate(&self, target: NodeId) -> bool {
		self.events.send(PreviewEvent::Activate(Activation::new(target))).is_ok()
	}

	pub fn subscribe(&self) -> watch::Receiver<PreviewView> {
		self.view.clone()
	}

	/// Latest published view.
	pub fn view(&self) -> PreviewView {
		self.view.borrow().clone()
	}

	/// Stops the driver and waits for it. Outstanding renders are abandoned.
	pub async fn shutdown(self) {
		let _ = self.events.send(PreviewEvent::Shutdown);
		if let Err(e) = self.task.await {
			error!(error = %e, "preview.shutdown");
		}
	}
}

#[cfg(test)]
mod tests;

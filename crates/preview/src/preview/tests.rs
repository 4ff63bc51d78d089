use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::{Notify, watch};
use tokio::time::advance;

use super::*;
use crate::config::{DiagramConfig, PreviewConfig};

/// Wraps each snapshot in a paragraph. Calls for a text listed in `gated`
/// block until [`MockRenderer::release`] is called for it.
#[derive(Default)]
struct MockRenderer {
	calls: AtomicUsize,
	seen: parking_lot::Mutex<Vec<String>>,
	gates: parking_lot::Mutex<FxHashMap<String, Arc<Notify>>>,
	gated: Vec<&'static str>,
	fail: Option<&'static str>,
}

impl MockRenderer {
	fn gated(texts: &[&'static str]) -> Self {
		Self {
			gated: texts.to_vec(),
			..Self::default()
		}
	}

	fn gate(&self, text: &str) -> Arc<Notify> {
		self.gates.lock().entry(text.to_owned()).or_default().clone()
	}

	fn release(&self, text: &str) {
		self.gate(text).notify_one();
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl MarkupRenderer for MockRenderer {
	async fn render(&self, text: &str) -> Result<String, ConversionError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.seen.lock().push(text.to_owned());
		if self.gated.contains(&text) {
			let gate = self.gate(text);
			gate.notified().await;
		}
		if self.fail == Some(text) {
			return Err(ConversionError::Renderer("bad input".into()));
		}
		if let Some(diagram) = text.strip_prefix("diagram:") {
			return Ok(format!("<p>x</p><pre><code class=\"language-mermaid\">{diagram}</code></pre>"));
		}
		Ok(format!("<p>{text}</p>"))
	}
}

#[derive(Default)]
struct CountingDiagrams(AtomicUsize);

#[async_trait]
impl DiagramRenderer for CountingDiagrams {
	async fn render(&self, render_id: &str, _source: &str) -> Result<String, DiagramRenderError> {
		self.0.fetch_add(1, Ordering::SeqCst);
		Ok(format!("<svg id=\"{render_id}\"></svg>"))
	}
}

/// Renders every source as an image naming it. Each source blocks until
/// [`GatedDiagrams::release`] is called for it.
#[derive(Default)]
struct GatedDiagrams {
	sources: parking_lot::Mutex<Vec<String>>,
	gates: parking_lot::Mutex<FxHashMap<String, Arc<Notify>>>,
}

impl GatedDiagrams {
	fn gate(&self, source: &str) -> Arc<Notify> {
		self.gates.lock().entry(source.to_owned()).or_default().clone()
	}

	fn release(&self, source: &str) {
		self.gate(source).notify_one();
	}

	fn calls(&self) -> usize {
		self.sources.lock().len()
	}
}

#[async_trait]
impl DiagramRenderer for GatedDiagrams {
	async fn render(&self, render_id: &str, source: &str) -> Result<String, DiagramRenderError> {
		self.sources.lock().push(source.to_owned());
		let gate = self.gate(source);
		gate.notified().await;
		Ok(format!("<svg id=\"{render_id}\"><text>{}</text></svg>", source.replace('>', "&gt;")))
	}
}

#[derive(Default)]
struct Links(parking_lot::Mutex<Vec<String>>);

impl NavigationHandler for Links {
	fn navigate(&self, target: &str) {
		self.0.lock().push(target.to_owned());
	}
}

struct Harness<D = CountingDiagrams> {
	renderer: Arc<MockRenderer>,
	diagrams: Arc<D>,
	links: Arc<Links>,
	handle: PreviewHandle,
	view: watch::Receiver<PreviewView>,
}

fn harness(renderer: MockRenderer) -> Harness {
	harness_with(renderer, CountingDiagrams::default())
}

fn harness_with<D: DiagramRenderer + 'static>(renderer: MockRenderer, diagrams: D) -> Harness<D> {
	let renderer = Arc::new(renderer);
	let diagrams = Arc::new(diagrams);
	let links = Arc::new(Links::default());
	let config = PreviewConfig {
		render_timeout_ms: 60_000,
		diagram: DiagramConfig {
			timeout_ms: 60_000,
			..DiagramConfig::default()
		},
		..PreviewConfig::default()
	};
	let handle = Preview::new(&config, renderer.clone(), diagrams.clone(), links.clone()).spawn();
	let view = handle.subscribe();
	Harness {
		renderer,
		diagrams,
		links,
		handle,
		view,
	}
}

/// Lets the driver drain its queue. Snapshots must be noted before the clock
/// moves, or their debounce window starts after the advance.
async fn settle() {
	for _ in 0..10 {
		tokio::task::yield_now().await;
	}
}

/// Yields until `cond` holds, without advancing the clock.
async fn until(mut cond: impl FnMut() -> bool) {
	for _ in 0..1000 {
		if cond() {
			return;
		}
		tokio::task::yield_now().await;
	}
	panic!("condition not reached");
}

async fn wait_view(view: &mut watch::Receiver<PreviewView>, pred: impl FnMut(&PreviewView) -> bool) -> PreviewView {
	tokio::time::timeout(Duration::from_secs(5), view.wait_for(pred))
		.await
		.expect("view timed out")
		.expect("preview stopped")
		.clone()
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn burst_renders_only_the_final_snapshot() {
	let mut h = harness(MockRenderer::default());
	for text in ["a", "ab", "abc"] {
		h.handle.update(text);
		settle().await;
		advance(Duration::from_millis(10)).await;
	}
	assert_eq!(h.renderer.calls(), 0);

	advance(Duration::from_millis(60)).await;
	let view = wait_view(&mut h.view, |v| v.applied_sequence.is_some()).await;
	assert_eq!(&*view.markup, "<p>abc</p>");
	assert_eq!(view.applied_sequence, Some(SequenceId(1)));

	advance(Duration::from_secs(1)).await;
	assert_eq!(h.renderer.calls(), 1);
	assert_eq!(*h.renderer.seen.lock(), vec!["abc"]);
	h.handle.shutdown().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn older_result_arriving_late_is_ignored() {
	let mut h = harness(MockRenderer::gated(&["old", "new"]));

	h.handle.update("old");
	settle().await;
	advance(Duration::from_millis(60)).await;
	until(|| h.renderer.calls() == 1).await;

	h.handle.update("new");
	settle().await;
	advance(Duration::from_millis(60)).await;
	until(|| h.renderer.calls() == 2).await;

	h.renderer.release("new");
	let view = wait_view(&mut h.view, |v| v.applied_sequence.is_some()).await;
	assert_eq!(&*view.markup, "<p>new</p>");

	h.renderer.release("old");
	advance(Duration::from_millis(100)).await;
	settle().await;
	let view = h.handle.view();
	assert_eq!(&*view.markup, "<p>new</p>");
	assert_eq!(view.applied_sequence, Some(SequenceId(2)));
	h.handle.shutdown().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn edit_during_flight_discards_even_before_redispatch() {
	let mut h = harness(MockRenderer::gated(&["first"]));
	h.handle.update("first");
	settle().await;
	advance(Duration::from_millis(60)).await;
	until(|| h.renderer.calls() == 1).await;

	h.handle.update("second");
	settle().await;
	h.renderer.release("first");
	settle().await;
	assert_eq!(h.handle.view().applied_sequence, None);

	advance(Duration::from_millis(60)).await;
	let view = wait_view(&mut h.view, |v| v.applied_sequence.is_some()).await;
	assert_eq!(&*view.markup, "<p>second</p>");
	h.handle.shutdown().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn conversion_failure_keeps_previous_view() {
	let mut h = harness(MockRenderer {
		fail: Some("broken"),
		..MockRenderer::default()
	});
	h.handle.update("fine");
	settle().await;
	advance(Duration::from_millis(60)).await;
	let good = wait_view(&mut h.view, |v| v.applied_sequence.is_some()).await;

	h.handle.update("broken");
	settle().await;
	advance(Duration::from_millis(60)).await;
	until(|| h.renderer.calls() == 2).await;
	settle().await;
	assert_eq!(h.handle.view(), good);
	h.handle.shutdown().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn diagrams_render_once_across_identical_updates() {
	let mut h = harness(MockRenderer::default());
	h.handle.update("diagram:graph TD; A--&gt;B");
	settle().await;
	advance(Duration::from_millis(60)).await;
	let view = wait_view(&mut h.view, |v| v.applied_sequence.is_some() && v.pending_diagrams == 0 && v.markup.contains("<svg")).await;
	assert!(view.markup.contains("diagram flex justify-center"));
	assert_eq!(h.diagrams.0.load(Ordering::SeqCst), 1);

	// Same source, new snapshot: reconciled, but the diagram is not re-rendered.
	h.handle.update("diagram:graph TD; A--&gt;B");
	settle().await;
	advance(Duration::from_millis(60)).await;
	wait_view(&mut h.view, |v| v.applied_sequence == Some(SequenceId(2))).await;
	assert_eq!(h.diagrams.0.load(Ordering::SeqCst), 1);

	h.handle.update("diagram:graph TD; A--&gt;C");
	settle().await;
	advance(Duration::from_millis(60)).await;
	wait_view(&mut h.view, |v| v.applied_sequence == Some(SequenceId(3)) && v.pending_diagrams == 0 && v.markup.contains("<svg")).await;
	assert_eq!(h.diagrams.0.load(Ordering::SeqCst), 2);
	h.handle.shutdown().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn diagram_edited_mid_render_shows_the_new_source() {
	let h = harness_with(MockRenderer::default(), GatedDiagrams::default());
	let (old, new) = ("graph TD; A-->B", "graph TD; A-->C");

	h.handle.update("diagram:graph TD; A--&gt;B");
	settle().await;
	advance(Duration::from_millis(60)).await;
	until(|| h.diagrams.calls() == 1).await;

	h.handle.update("diagram:graph TD; A--&gt;C");
	settle().await;
	advance(Duration::from_millis(60)).await;
	until(|| {
		let view = h.handle.view();
		view.applied_sequence == Some(SequenceId(2)) && view.pending_diagrams == 1
	})
	.await;
	assert!(h.handle.view().markup.contains("A--&gt;C"));
	assert_eq!(h.diagrams.calls(), 1, "new render started before the old one finished");

	// The old image must not land on the edited block.
	h.diagrams.release(old);
	until(|| h.diagrams.calls() == 2).await;
	let view = h.handle.view();
	assert!(!view.markup.contains("<svg"), "{}", view.markup);
	assert!(view.markup.contains("A--&gt;C"), "{}", view.markup);

	h.diagrams.release(new);
	until(|| h.handle.view().pending_diagrams == 0).await;
	let view = h.handle.view();
	assert!(view.markup.contains("<text>graph TD; A--&gt;C</text>"), "{}", view.markup);
	assert!(!view.markup.contains("A--&gt;B"), "{}", view.markup);
	assert_eq!(*h.diagrams.sources.lock(), vec![old, new]);
	h.handle.shutdown().await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn activation_reaches_the_handler() {
	let mut h = harness(MockRenderer::default());
	h.handle.update(r#"<a href="https://example.com">x</a>"#);
	settle().await;
	advance(Duration::from_millis(60)).await;
	let view = wait_view(&mut h.view, |v| !v.links.is_empty()).await;
	let (anchor, href) = view.links[0].clone();
	assert_eq!(href, "https://example.com");

	h.handle.activate(anchor);
	until(|| !h.links.0.lock().is_empty()).await;
	assert_eq!(*h.links.0.lock(), vec!["https://example.com"]);
	h.handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_the_driver() {
	let h = harness(MockRenderer::default());
	let events = h.handle.events.clone();
	h.handle.shutdown().await;
	assert!(events.send(PreviewEvent::Shutdown).is_err());
}

//! One-shot rendering and the backends the binary plugs into the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use glint_dom::Document;
use glint_preview::{
	CommandDiagramRenderer, CommonMarkRenderer, DiagramConfig, DiagramEnricher, DiagramRenderError, DiagramRenderer, MarkupRenderer,
	PreviewConfig, RendererGateway, reconcile, skip_processed_blocks,
};
use tracing::debug;

/// Stands in when no diagram command is configured. Every block fails inline.
struct NoDiagramCommand;

#[async_trait]
impl DiagramRenderer for NoDiagramCommand {
	async fn render(&self, _render_id: &str, _source: &str) -> Result<String, DiagramRenderError> {
		Err(DiagramRenderError::Renderer("no diagram command configured".into()))
	}
}

pub fn markup_renderer() -> Arc<dyn MarkupRenderer> {
	Arc::new(CommonMarkRenderer)
}

/// The configured external diagram renderer.
pub fn diagram_renderer(config: &DiagramConfig) -> Arc<dyn DiagramRenderer> {
	match CommandDiagramRenderer::from_command(&config.command) {
		Some(renderer) => {
			debug!(program = renderer.program(), "diagram.command");
			Arc::new(renderer)
		}
		None => Arc::new(NoDiagramCommand),
	}
}

/// Renders `text` into a fresh tree and enriches every diagram block.
pub async fn render_document(
	config: &PreviewConfig,
	renderer: Arc<dyn MarkupRenderer>,
	diagrams: Arc<dyn DiagramRenderer>,
	text: &str,
) -> anyhow::Result<Document> {
	let gateway = RendererGateway::new(renderer, config.render_timeout());
	let markup = gateway.render(text).await?;

	let mut doc = Document::new();
	let applied = reconcile(&mut doc, &markup, &skip_processed_blocks)?;
	let enriched = DiagramEnricher::new(&config.diagram).enrich(&mut doc, diagrams).await?;
	debug!(
		mutations = applied.mutations,
		rendered = enriched.rendered,
		failed = enriched.failed,
		"render.done"
	);
	Ok(doc)
}

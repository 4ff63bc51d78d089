//! Live preview of a file on disk.

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use glint_preview::{Preview, PreviewConfig, PreviewView};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::opener::OpenerHandler;
use crate::pipeline::{diagram_renderer, markup_renderer};

/// Feeds every change of `file` to a running preview and writes each
/// published view to `output` (stdout if `None`) until `shutdown` resolves.
pub async fn watch(config: &PreviewConfig, file: &Path, output: Option<&Path>, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
	let file = tokio::fs::canonicalize(file)
		.await
		.with_context(|| format!("cannot watch {}", file.display()))?;
	// Watch the directory: editors commonly save by replacing the file.
	let dir = file.parent().context("watched file has no parent directory")?.to_path_buf();

	let (tx, mut fs_events) = mpsc::unbounded_channel();
	let mut watcher = RecommendedWatcher::new(
		move |res: notify::Result<Event>| {
			let _ = tx.send(res);
		},
		Config::default(),
	)?;
	watcher.watch(&dir, RecursiveMode::NonRecursive)?;
	info!(file = %file.display(), "watch.start");

	let handle = Preview::new(
		config,
		markup_renderer(),
		diagram_renderer(&config.diagram),
		Arc::new(OpenerHandler::new(&config.navigation)),
	)
	.spawn();
	let mut views = handle.subscribe();
	handle.update(tokio::fs::read_to_string(&file).await?);

	tokio::pin!(shutdown);
	let result = loop {
		tokio::select! {
			_ = &mut shutdown => break Ok(()),
			Some(event) = fs_events.recv() => match event {
				Ok(event) if touches(&event, &file) => match tokio::fs::read_to_string(&file).await {
					Ok(text) => {
						handle.update(text);
					}
					// Mid-replace; the next event brings the new content.
					Err(e) => debug!(error = %e, "watch.read"),
				},
				Ok(_) => {}
				Err(e) => warn!(error = %e, "watch.notify"),
			},
			changed = views.changed() => {
				if changed.is_err() {
					break Ok(());
				}
				let view = views.borrow_and_update().clone();
				if let Err(e) = write_view(output, &view).await {
					break Err(e);
				}
			}
		}
	};

	drop(watcher);
	handle.shutdown().await;
	info!("watch.stop");
	result
}

fn touches(event: &Event, file: &Path) -> bool {
	(event.kind.is_modify() || event.kind.is_create()) && event.paths.iter().any(|p| p == file)
}

async fn write_view(output: Option<&Path>, view: &PreviewView) -> anyhow::Result<()> {
	debug!(
		seq = view.applied_sequence.map(|s| s.0),
		pending_diagrams = view.pending_diagrams,
		"watch.view"
	);
	match output {
		Some(path) => tokio::fs::write(path, view.markup.as_bytes())
			.await
			.with_context(|| format!("cannot write {}", path.display())),
		None => {
			let mut stdout = std::io::stdout().lock();
			writeln!(stdout, "{}", view.markup)?;
			stdout.flush()?;
			Ok(())
		}
	}
}

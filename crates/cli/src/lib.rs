#![cfg_attr(test, allow(unused_crate_dependencies))]
//! `glint` command line frontend.
//!
//! Wires the preview pipeline to files on disk: CommonMark conversion, the
//! configured external diagram command and the system URL opener.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use glint_dom::Document;
use glint_preview::{Activation, NavigationInterceptor, PreviewConfig, anchors};

pub mod cli;
mod opener;
mod pipeline;
mod watch;

pub use opener::{OpenRefused, OpenerHandler};
pub use pipeline::{diagram_renderer, markup_renderer, render_document};
pub use watch::watch;

use crate::cli::{Cli, Command};

/// Runs a parsed command line to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
	let config = cli.load_config()?;
	match cli.command {
		Command::Render { file, output } => {
			let doc = render_file(&config, &file).await?;
			let markup = doc.inner_markup(doc.root());
			match output {
				Some(path) => std::fs::write(&path, markup).with_context(|| format!("cannot write {}", path.display()))?,
				None => println!("{markup}"),
			}
		}
		Command::Watch { file, output } => {
			let ctrl_c = async {
				if let Err(e) = tokio::signal::ctrl_c().await {
					tracing::error!(error = %e, "watch.signal");
				}
			};
			watch(&config, &file, output.as_deref(), ctrl_c).await?;
		}
		Command::Links { file } => {
			let doc = render_file(&config, &file).await?;
			let mut stdout = std::io::stdout().lock();
			for (index, (_, href)) in anchors(&doc).iter().enumerate() {
				writeln!(stdout, "{index}\t{href}")?;
			}
		}
		Command::Open { file, index } => {
			let doc = render_file(&config, &file).await?;
			let target = open_link(&config, &doc, index)?;
			println!("{target}");
		}
	}
	Ok(())
}

async fn render_file(config: &PreviewConfig, file: &Path) -> anyhow::Result<Document> {
	let text = tokio::fs::read_to_string(file)
		.await
		.with_context(|| format!("cannot read {}", file.display()))?;
	render_document(config, markup_renderer(), diagram_renderer(&config.diagram), &text).await
}

/// Activates the `index`th anchor of `doc` through the navigation interceptor.
fn open_link(config: &PreviewConfig, doc: &Document, index: usize) -> anyhow::Result<String> {
	let links = anchors(doc);
	let Some((node, href)) = links.get(index) else {
		bail!("no link {index}: the document has {} links", links.len());
	};
	let opener = Arc::new(OpenerHandler::new(&config.navigation));
	opener.check(href.trim())?;

	let interceptor = NavigationInterceptor::attach(doc, opener);
	let mut activation = Activation::new(*node);
	interceptor
		.dispatch(doc, &mut activation)
		.with_context(|| format!("link {index} has no target"))
}

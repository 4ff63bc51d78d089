use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::DiagramRenderer;
use crate::error::DiagramRenderError;

/// Placeholder in the argument list replaced with the render identifier.
const ID_PLACEHOLDER: &str = "{id}";

/// Renders diagrams with an external program: source on stdin, SVG on stdout.
///
/// The child is killed if the render future is dropped, which is how the
/// enricher's timeout reclaims a hung renderer.
#[derive(Debug, Clone)]
pub struct CommandDiagramRenderer {
	program: String,
	args: Vec<String>,
}

impl CommandDiagramRenderer {
	pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			program: program.into(),
			args: args.into_iter().map(Into::into).collect(),
		}
	}

	/// Builds a renderer from `[program, args...]`. `None` if the list is empty.
	pub fn from_command(command: &[String]) -> Option<Self> {
		let (program, args) = command.split_first()?;
		Some(Self::new(program.clone(), args.iter().cloned()))
	}

	pub fn program(&self) -> &str {
		&self.program
	}
}

#[async_trait]
impl DiagramRenderer for CommandDiagramRenderer {
	async fn render(&self, render_id: &str, source: &str) -> Result<String, DiagramRenderError> {
		let mut child = Command::new(&self.program)
			.args(self.args.iter().map(|arg| arg.replace(ID_PLACEHOLDER, render_id)))
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| DiagramRenderError::Spawn {
				program: self.program.clone(),
				error: e.to_string(),
			})?;

		let stdin = child.stdin.take();
		let write = async move {
			if let Some(mut stdin) = stdin {
				stdin.write_all(source.as_bytes()).await?;
				stdin.shutdown().await?;
			}
			Ok::<_, std::io::Error>(())
		};
		let (written, output) = tokio::join!(write, child.wait_with_output());
		let output = output.map_err(|e| DiagramRenderError::Renderer(e.to_string()))?;

		if !output.status.success() {
			return Err(DiagramRenderError::Exit {
				status: output.status.to_string(),
				stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
			});
		}
		// A renderer may exit without draining stdin; only its output matters then.
		if let Err(e) = written
			&& e.kind() != std::io::ErrorKind::BrokenPipe
		{
			return Err(DiagramRenderError::Renderer(format!("writing source: {e}")));
		}

		let svg = String::from_utf8(output.stdout).map_err(|_| DiagramRenderError::InvalidSvg("output is not UTF-8".into()))?;
		if svg.trim().is_empty() {
			return Err(DiagramRenderError::InvalidSvg("empty output".into()));
		}
		Ok(svg)
	}
}

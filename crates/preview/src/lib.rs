#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Live markdown preview pipeline.
//!
//! Source snapshots go in; a displayed [`Document`](glint_dom::Document) comes
//! out, patched in place rather than rebuilt.
//!
//! # Stages
//!
//! - [`Dispatcher`] - debounces snapshots and orders conversion results
//! - [`RendererGateway`] - bounded call into a [`MarkupRenderer`]
//! - [`reconcile`] - morphs the displayed tree toward new markup, skipping
//!   subtrees a [`SkipPredicate`] protects
//! - [`DiagramEnricher`] - renders diagram blocks out of band, once per content
//! - [`NavigationInterceptor`] - routes link activations to a [`NavigationHandler`]
//!
//! [`Preview`] wires the stages together on a single driver task and
//! publishes a [`PreviewView`] after every change.

pub mod config;
mod diagram;
mod dispatch;
mod error;
mod gateway;
mod navigate;
mod preview;
mod reconcile;

pub use config::{DiagramConfig, NavigationConfig, PreviewConfig};
pub use diagram::{ApplyOutcome, CommandDiagramRenderer, DiagramDone, DiagramEnricher, DiagramJob, DiagramRenderer, ERROR_CLASS, ERROR_TEXT, EnrichStats};
pub use dispatch::{DEBOUNCE, DispatchPhase, Dispatcher, RenderRequest, Resolution, SequenceId};
pub use error::{ConfigError, ConversionError, DiagramRenderError, ReconcileError};
#[cfg(feature = "commonmark")]
pub use gateway::CommonMarkRenderer;
pub use gateway::{MarkupRenderer, RendererGateway};
pub use navigate::{Activation, NavigationHandler, NavigationInterceptor, anchors};
pub use preview::{Preview, PreviewEvent, PreviewHandle, PreviewView};
pub use reconcile::{ReconcileStats, SkipPredicate, reconcile, skip_nothing, skip_processed_blocks};

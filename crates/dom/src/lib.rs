#![cfg_attr(test, allow(unused_crate_dependencies))]
//! Displayed tree for the live markdown preview.
//!
//! A [`Document`] is a generational arena of element and text nodes hanging
//! off a stable root. It is the only mutable structure the preview pipeline
//! shares: the reconciler patches it against freshly rendered markup and the
//! diagram enricher splices rendered images into it.
//!
//! # Main Types
//!
//! - [`Document`] - arena tree with a mutation counter
//! - [`NodeId`] - generational handle; stale handles never alias new nodes
//! - [`BlockMarker`] - enrichment state attached to diagram block containers
//!
//! Markup enters through [`parse_fragment`] and leaves through
//! [`Document::inner_markup`].

mod document;
mod error;
mod markup;
mod node;
mod serialize;

pub use document::{Descendants, Document};
pub use error::{DomError, MarkupError};
pub use markup::parse_fragment;
pub use node::{Attr, BlockMarker, BlockState, Element, Node, NodeData, NodeId, payload_hash};

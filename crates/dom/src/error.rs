//! Error types for tree mutation and markup parsing.

use thiserror::Error;

use crate::NodeId;

/// Errors raised by [`crate::Document`] mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	/// The handle refers to a removed node.
	#[error("stale node handle {0}")]
	StaleNode(NodeId),

	/// The operation needs an element but the node is text.
	#[error("node {0} is not an element")]
	NotAnElement(NodeId),

	/// Attaching the node would make it its own ancestor.
	#[error("attaching {child} under {parent} would form a cycle")]
	Cycle { parent: NodeId, child: NodeId },

	/// The node already has a parent; detach it first.
	#[error("node {0} is already attached")]
	AlreadyAttached(NodeId),

	/// Child index is past the end of the child list.
	#[error("child index {index} out of bounds for {parent} ({len} children)")]
	ChildIndex { parent: NodeId, index: usize, len: usize },
}

/// Malformed markup. Offsets are byte positions into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
	/// A tag, comment or declaration was not closed before end of input.
	#[error("unterminated tag at byte {offset}")]
	UnterminatedTag { offset: usize },

	/// A start tag had no name.
	#[error("empty tag name at byte {offset}")]
	EmptyTagName { offset: usize },

	/// A closing tag matched no open element.
	#[error("unexpected closing tag </{tag}> at byte {offset}")]
	UnexpectedClose { tag: String, offset: usize },

	/// A closing tag does not match the innermost open element.
	#[error("closing tag </{found}> at byte {offset} does not match <{expected}>")]
	MismatchedClose { expected: String, found: String, offset: usize },

	/// An element was still open at end of input.
	#[error("element <{tag}> is never closed")]
	Unclosed { tag: String },
}

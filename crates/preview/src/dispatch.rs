//! Debounced dispatcher.
//!
//! Coalesces snapshot changes into at most one conversion per quiescence
//! window and decides, when a conversion completes, whether its result may
//! touch the displayed tree. The dispatcher is a pure state machine driven by
//! explicit timestamps; the preview driver owns the timer and the tasks.
//!
//! # Staleness
//!
//! Sequence ids are allocated when a request leaves `Pending`. The
//! acceptance cursor names the only id whose result may be applied. Any new
//! snapshot clears the cursor, so every conversion already in flight is
//! pre-marked for discard the moment a newer edit exists, even before that
//! edit has been dispatched itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Default quiescence window.
pub const DEBOUNCE: Duration = Duration::from_millis(50);

/// Monotonic id of a dispatched render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(pub u64);

/// A snapshot handed to the renderer gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
	pub snapshot: Arc<str>,
	pub seq: SequenceId,
}

/// Current phase of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
	/// Nothing pending and nothing outstanding.
	Idle,
	/// A snapshot is waiting for its window to elapse.
	Pending,
	/// At least one conversion is outstanding and nothing is pending.
	InFlight,
}

/// What to do with a completed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	/// The result belongs to the latest request; hand it to the reconciler.
	Apply,
	/// The result was superseded; drop it without touching the tree.
	Discard,
}

#[derive(Debug)]
pub struct Dispatcher {
	window: Duration,
	pending: Option<(Arc<str>, Instant)>,
	accepting: Option<SequenceId>,
	next_seq: u64,
	in_flight: usize,
}

impl Default for Dispatcher {
	fn default() -> Self {
		Self::new(DEBOUNCE)
	}
}

impl Dispatcher {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			pending: None,
			accepting: None,
			next_seq: 0,
			in_flight: 0,
		}
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	/// Records a new snapshot, (re)arming the timer and superseding any
	/// un-dispatched snapshot.
	pub fn note_snapshot(&mut self, snapshot: Arc<str>, now: Instant) {
		if self.pending.is_some() {
			trace!(bytes = snapshot.len(), "preview.dispatch.rearm");
		}
		self.pending = Some((snapshot, now + self.window));
		self.accepting = None;
	}

	/// When the pending snapshot becomes due, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.pending.as_ref().map(|(_, at)| *at)
	}

	/// Moves a due snapshot to in-flight, allocating its sequence id.
	pub fn poll_due(&mut self, now: Instant) -> Option<RenderRequest> {
		let (_, at) = self.pending.as_ref()?;
		if now < *at {
			return None;
		}
		let (snapshot, _) = self.pending.take()?;
		self.next_seq += 1;
		let seq = SequenceId(self.next_seq);
		self.accepting = Some(seq);
		self.in_flight += 1;
		Some(RenderRequest { snapshot, seq })
	}

	/// Classifies a completed conversion. Every dispatched request must be
	/// resolved exactly once, whether it succeeded or not.
	pub fn resolve(&mut self, seq: SequenceId) -> Resolution {
		self.in_flight = self.in_flight.saturating_sub(1);
		if self.accepting == Some(seq) {
			self.accepting = None;
			Resolution::Apply
		} else {
			Resolution::Discard
		}
	}

	/// Latest sequence id whose result would still be accepted.
	pub fn accepting(&self) -> Option<SequenceId> {
		self.accepting
	}

	pub fn in_flight(&self) -> usize {
		self.in_flight
	}

	pub fn phase(&self) -> DispatchPhase {
		if self.pending.is_some() {
			DispatchPhase::Pending
		} else if self.in_flight > 0 {
			DispatchPhase::InFlight
		} else {
			DispatchPhase::Idle
		}
	}
}

//! Per-event callback records threading a fired reactor event back to the
//! coroutine awaiting it.
//!
//! A [`CallbackRecord`] is the Rust shape of what the specification calls a
//! heap-allocated struct bound to the awaiting coroutine plus a
//! purpose-specific payload: here it is simply a [`crate::coroutine::SuspensionResolver`]
//! (the "bound to the coroutine" part — resuming is just waking the task the
//! resolver's accumulator belongs to) paired with `P`. Dispatch is whatever
//! the adapter does each time it re-polls its linked events, so there is no
//! separate "invoke the dispatcher" step to model explicitly: the resolver
//! mutation *is* the dispatch.

use crate::coroutine::SuspensionResolver;
use crate::error::FailureKind;
use std::cell::Cell;

/// A per-event record pairing a [`SuspensionResolver`] with adapter-specific payload.
#[derive(Debug)]
pub struct CallbackRecord<P> {
	resolver: SuspensionResolver,
	fired: Cell<bool>,
	/// Adapter-specific payload: a poll entry reference, an fd plus output
	/// fd-set pointers, a DNS result slot, or a bridge back-pointer.
	pub payload: P,
}

impl<P> CallbackRecord<P> {
	/// Bind a resolver to `payload`.
	pub fn new(resolver: SuspensionResolver, payload: P) -> Self {
		Self { resolver, fired: Cell::new(false), payload }
	}

	/// Dispatch contract (1): a failure was observed — mark it handled and resume.
	pub fn fail(&self, kind: FailureKind) {
		self.resolver.fail(kind);
	}

	/// Dispatch contract (2): no failure — bump the accumulator once per
	/// firing, exactly once over this record's lifetime even if the event
	/// stays observably triggered across several re-polls.
	pub fn fire(&self) {
		if !self.fired.replace(true) {
			self.resolver.increment();
		}
	}

	/// Whether [`fire`](Self::fire) has ever been called on this record.
	pub fn has_fired(&self) -> bool {
		self.fired.get()
	}
}

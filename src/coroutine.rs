//! The "coroutine" this workspace's adapters suspend and resume.
//!
//! A coroutine is simply a task polled by [`corio_pool`]'s single-threaded
//! pool; "suspend" is `.await`, "resume" is the pool's normal wake
//! machinery. [`current`] rejects calls made outside of one, matching the
//! "must be called from a coroutine" contract every adapter in this crate
//! carries.

use crate::error::{CoreError, FailureKind};
use corio_pool::{current_cancel_handle, with_current, CancelHandle, ContextKey, TaskContext};
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// A handle to the currently polled coroutine's context, usable only from
/// within it.
#[derive(Debug, Clone, Copy)]
pub struct Current(());

impl Current {
	/// Read a value previously stored under `key`.
	pub fn get<T: std::any::Any>(self, key: ContextKey) -> Option<T>
	where
		T: Clone,
	{
		with_current(|ctx| ctx.get::<T>(key).cloned()).flatten()
	}

	/// Store (replacing any previous value) a value under `key`.
	pub fn set<T: std::any::Any>(self, key: ContextKey, value: T) {
		with_current(|ctx| {
			ctx.set(key, value);
		});
	}

	/// Remove a stored value.
	pub fn unset<T: std::any::Any>(self, key: ContextKey) {
		with_current(|ctx| {
			ctx.unset::<T>(key);
		});
	}

	/// Run `ctx` against the raw per-coroutine [`TaskContext`].
	pub fn with_raw<R>(self, f: impl FnOnce(&mut TaskContext) -> R) -> R {
		with_current(f).expect("Current can only exist while a coroutine is being polled")
	}

	/// Register a hook to run once, when the coroutine ends.
	pub fn on_end<F: FnOnce(&mut TaskContext) + 'static>(self, hook: F) {
		with_current(|ctx| ctx.on_end(hook));
	}

	/// Whether this coroutine has been asked to cancel via a
	/// [`CancelHandle`] taken from [`Self::cancel_handle`].
	///
	/// Adapters check this on every suspend-point re-poll and resolve as
	/// [`FailureKind::Cancelled`] when it is set.
	pub fn is_cancelled(self) -> bool {
		with_current(TaskContext::is_cancelled).unwrap_or(false)
	}

	/// Take a cloneable handle that can cancel this coroutine from anywhere
	/// (including from a different coroutine polled later on this thread).
	pub fn cancel_handle(self) -> CancelHandle {
		current_cancel_handle().expect("Current can only exist while a coroutine is being polled")
	}
}

/// Returns a handle to the currently-polled coroutine, or [`CoreError::Context`]
/// if called outside one.
pub fn current() -> Result<Current, CoreError> {
	if with_current(|_| ()).is_some() {
		Ok(Current(()))
	} else {
		Err(CoreError::Context)
	}
}

/// Per-suspension state an adapter call owns for the duration of one
/// suspend/resume cycle.
///
/// Called "Waker" in the originating specification — renamed here to avoid
/// clashing with `std::task::Waker`. Accumulates a `result` count as linked
/// events fire and carries the failure (if any) the coroutine woke up with.
/// `Drop` is the single point that cancels every event still linked to it,
/// which is how this workspace breaks the waker/event reference cycle the
/// design notes call out.
#[derive(Debug, Default)]
pub struct Suspension {
	result: Rc<Cell<u32>>,
	failure: Rc<Cell<Option<FailureKind>>>,
}

impl Suspension {
	/// Create a fresh suspension state with a zeroed accumulator.
	pub fn new() -> Self {
		Self::default()
	}

	/// A cloneable handle callbacks use to bump the accumulator and/or set a failure.
	pub fn resolver(&self) -> SuspensionResolver {
		SuspensionResolver {
			result: self.result.clone(),
			failure: self.failure.clone(),
		}
	}

	/// Current accumulator value.
	pub fn result(&self) -> u32 {
		self.result.get()
	}

	/// Take the pending failure, if any, clearing it (Invariant: consumed exactly once).
	pub fn take_failure(&self) -> Option<FailureKind> {
		self.failure.take()
	}
}

/// Cloneable resolver handle a callback record uses to notify a [`Suspension`].
#[derive(Debug, Clone)]
pub struct SuspensionResolver {
	result: Rc<Cell<u32>>,
	failure: Rc<Cell<Option<FailureKind>>>,
}

impl SuspensionResolver {
	/// Increment the accumulator by one.
	pub fn increment(&self) {
		self.result.set(self.result.get() + 1);
	}

	/// Mark the suspension as having failed; first failure wins.
	pub fn fail(&self, kind: FailureKind) {
		if self.failure.get().is_none() {
			self.failure.set(Some(kind));
		}
	}
}

/// Suspend the current coroutine until `poll_fn` reports readiness.
///
/// Thin wrapper around [`std::future::poll_fn`] kept for symmetry with the
/// "suspend" verb the rest of this crate's documentation uses.
pub async fn suspend<T>(mut poll_fn: impl FnMut(&mut Context<'_>) -> Poll<T>) -> T {
	struct Suspend<F>(F);
	impl<T, F: FnMut(&mut Context<'_>) -> Poll<T>> Future for Suspend<F> {
		type Output = T;
		fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
			(unsafe { self.get_unchecked_mut() }.0)(cx)
		}
	}
	Suspend(&mut poll_fn).await
}

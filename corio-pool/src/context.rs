//! Per-task context storage and end-of-task cleanup hooks.
//!
//! A future wrapped through [`with_context`] gets an associated
//! [`TaskContext`]: a small type-keyed map plus a list of hooks run once the
//! task's future resolves (or is dropped without resolving). This is the
//! storage coroutine-style adapters use to stash per-coroutine state — such
//! as a cached DNS lookup buffer — that must outlive a single `.await` but
//! not the task itself.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// Opaque key identifying a slot in a [`TaskContext`].
///
/// Keys are allocated once (typically as a `static`) and compared by
/// pointer identity, the same pattern thread-local "current" handles use
/// elsewhere in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(usize);

impl ContextKey {
	/// Allocate a fresh, globally unique key.
	pub fn new() -> Self {
		use std::sync::atomic::{AtomicUsize, Ordering};
		static NEXT: AtomicUsize = AtomicUsize::new(1);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for ContextKey {
	fn default() -> Self {
		Self::new()
	}
}

/// Per-task context map plus end-of-task finalizer hooks.
#[derive(Default)]
pub struct TaskContext {
	values: HashMap<ContextKey, Box<dyn Any>>,
	end_hooks: Vec<Box<dyn FnOnce(&mut TaskContext)>>,
	cancelled: bool,
	waker: Option<Waker>,
}

impl std::fmt::Debug for TaskContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskContext")
			.field("values", &self.values.len())
			.field("end_hooks", &self.end_hooks.len())
			.field("cancelled", &self.cancelled)
			.finish()
	}
}

impl TaskContext {
	/// Look up a stored value.
	pub fn get<T: Any>(&self, key: ContextKey) -> Option<&T> {
		self.values.get(&key).and_then(|v| v.downcast_ref())
	}

	/// Replace (or insert) a stored value, returning the previous one.
	pub fn set<T: Any>(&mut self, key: ContextKey, value: T) -> Option<Box<T>> {
		self.values.insert(key, Box::new(value)).and_then(|v| v.downcast().ok())
	}

	/// Remove a stored value.
	pub fn unset<T: Any>(&mut self, key: ContextKey) -> Option<Box<T>> {
		self.values.remove(&key).and_then(|v| v.downcast().ok())
	}

	/// Register a hook to run once, when the owning task ends.
	///
	/// Calling this more than once for logically the same cleanup is the
	/// caller's responsibility to avoid; hooks always run in registration
	/// order.
	pub fn on_end<F: FnOnce(&mut TaskContext) + 'static>(&mut self, hook: F) {
		self.end_hooks.push(Box::new(hook));
	}

	/// Mark the owning task cancelled. Does not by itself wake the task; see
	/// [`CancelHandle::cancel`].
	pub fn cancel(&mut self) {
		self.cancelled = true;
	}

	/// Whether [`cancel`](Self::cancel) has been called on this task.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled
	}

	fn set_waker(&mut self, waker: &Waker) {
		if !matches!(&self.waker, Some(w) if w.will_wake(waker)) {
			self.waker = Some(waker.clone());
		}
	}

	fn take_waker(&mut self) -> Option<Waker> {
		self.waker.take()
	}

	fn run_end_hooks(&mut self) {
		let hooks = std::mem::take(&mut self.end_hooks);
		for hook in hooks {
			hook(self);
		}
	}
}

thread_local! {
	static CURRENT: RefCell<Vec<Rc<RefCell<TaskContext>>>> = RefCell::new(Vec::new());
}

/// A cloneable handle that can request cancellation of the task it was taken
/// from, from anywhere (including a different task on the same thread).
///
/// Held via a [`Weak`] reference: requesting cancellation of an already-ended
/// task is a silent no-op.
#[derive(Debug, Clone)]
pub struct CancelHandle(Weak<RefCell<TaskContext>>);

impl CancelHandle {
	/// Mark the owning task cancelled and wake it, so it observes the
	/// request the next time it (or whatever it's suspended in) is polled.
	pub fn cancel(&self) {
		if let Some(context) = self.0.upgrade() {
			let waker = {
				let mut context = context.borrow_mut();
				context.cancel();
				context.take_waker()
			};
			if let Some(waker) = waker {
				waker.wake();
			}
		}
	}
}

/// A handle to cancel the task currently being polled, usable from
/// elsewhere once stashed away (see [`CancelHandle`]).
///
/// Returns `None` outside of a future wrapped via [`with_context`].
pub fn current_cancel_handle() -> Option<CancelHandle> {
	CURRENT.with(|stack| stack.borrow().last().map(|context| CancelHandle(Rc::downgrade(context))))
}

/// Access the context of the task currently being polled, if any.
///
/// Returns `None` outside of a future wrapped via [`with_context`].
pub fn with_current<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&mut TaskContext) -> R,
{
	CURRENT.with(|stack| {
		let stack = stack.borrow();
		let top = stack.last()?;
		Some(f(&mut top.borrow_mut()))
	})
}

/// Wrap a future so that, while it (or anything it calls synchronously) is
/// being polled, [`with_current`] resolves to its private [`TaskContext`].
///
/// The context is pushed onto a thread-local stack on entry to `poll` and
/// popped on exit, so it is visible exactly while this task is the one
/// making progress — including through nested synchronous calls — and never
/// while a sibling task is polled instead.
pub fn with_context<F: Future>(future: F) -> WithContext<F> {
	WithContext {
		future,
		context: Rc::new(RefCell::new(TaskContext::default())),
		ended: false,
	}
}

/// Future adapter produced by [`with_context`].
#[derive(Debug)]
pub struct WithContext<F> {
	future: F,
	context: Rc<RefCell<TaskContext>>,
	ended: bool,
}

impl<F: Future> Future for WithContext<F> {
	type Output = F::Output;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
		// SAFETY: we only project the `future` field, never move `self` out.
		let this = unsafe { self.get_unchecked_mut() };
		this.context.borrow_mut().set_waker(cx.waker());
		CURRENT.with(|stack| stack.borrow_mut().push(this.context.clone()));
		let result = unsafe { Pin::new_unchecked(&mut this.future) }.poll(cx);
		CURRENT.with(|stack| {
			stack.borrow_mut().pop();
		});
		if result.is_ready() && !this.ended {
			this.ended = true;
			this.context.borrow_mut().run_end_hooks();
		}
		result
	}
}

impl<F> Drop for WithContext<F> {
	fn drop(&mut self) {
		if !self.ended {
			self.ended = true;
			self.context.borrow_mut().run_end_hooks();
		}
	}
}

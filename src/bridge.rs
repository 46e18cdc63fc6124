//! Integrates the `curl` crate's multi-transfer engine with the reactor
//! through its socket/timer callback protocol (`Multi::socket_function`,
//! `Multi::timer_function`, `Multi::action`, `Multi::messages`).
//!
//! Both the single-request path (§single) and the multi-handle path
//! ([`BridgeCtx`]) share the same shape: a socket callback that creates or
//! drops a [`SocketReadiness`] per fd libcurl asks about, a timer callback
//! that creates or cancels a reactor [`Timer`], and a "drive" step — run from
//! whichever coroutine happens to be polled next, since this workspace has
//! no literal reactor-invoked callback, only cooperative re-polling — that
//! checks triggered bits, calls `Multi::action`, and drains completed
//! messages.

use crate::coroutine;
use crate::errno::map_core_error;
use crate::error::CoreError;
use corio_reactor::event::SocketReadiness;
use corio_reactor::reactor::{Handle, Timer};
use curl::easy::Handler;
use curl::multi::{Easy2Handle, Events, Message, Multi, Socket};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

const CURL_SOCKET_TIMEOUT: Socket = -1;

/// Shared-by-reference state libcurl's socket/timer callbacks mutate.
///
/// Built only from reactor types, all of which are `Send + Sync` (they are
/// backed by `Arc`/`Mutex`/atomics, never by this crate's `Rc`-based
/// coroutine-local state) so it can live behind the `Send` closures
/// `Multi::socket_function`/`timer_function` require.
struct Shared {
	handle: Handle,
	poll_list: Mutex<HashMap<RawFd, SocketReadiness>>,
	timer: Mutex<Option<Timer>>,
}

impl Shared {
	fn new(handle: Handle) -> Self {
		Self { handle, poll_list: Mutex::new(HashMap::new()), timer: Mutex::new(None) }
	}

	fn install(multi: &mut Multi, shared: &Arc<Self>) -> Result<(), curl::MultiError> {
		let socket_shared = shared.clone();
		multi.socket_function(move |socket, events, _token| {
			let mut poll_list = socket_shared.poll_list.lock().unwrap();
			if events.remove() {
				poll_list.remove(&socket);
			} else if let std::collections::hash_map::Entry::Vacant(slot) = poll_list.entry(socket) {
				if let Ok(readiness) = SocketReadiness::new(&socket_shared.handle, socket) {
					slot.insert(readiness);
				}
			}
		})?;

		let timer_shared = shared.clone();
		multi.timer_function(move |timeout_ms| {
			let mut timer = timer_shared.timer.lock().unwrap();
			*timer = if timeout_ms < 0 {
				None
			} else {
				timer_shared.handle.timer(Instant::now() + Duration::from_millis(timeout_ms.max(0) as u64)).ok()
			};
			true
		})?;

		Ok(())
	}

	/// Check every watched socket and the timer for new activity, calling
	/// `Multi::action` for each. Returns whether anything fired.
	fn drive(&self, multi: &Multi, cx: &mut Context<'_>) -> bool {
		let mut acted = false;
		{
			let mut poll_list = self.poll_list.lock().unwrap();
			for (&fd, readiness) in poll_list.iter_mut() {
				if let Ok(bits) = readiness.triggered_events(cx) {
					if !bits.is_empty() {
						let mut events = Events::new();
						events.input(bits.is_readable());
						events.output(bits.is_writable());
						let _ = multi.action(fd, &events);
						acted = true;
					}
				}
			}
		}
		let mut timer = self.timer.lock().unwrap();
		if let Some(t) = timer.as_mut() {
			if Pin::new(t).poll(cx).is_ready() {
				let _ = multi.action(CURL_SOCKET_TIMEOUT, &Events::new());
				acted = true;
				*timer = None;
			}
		}
		acted
	}

	fn kick(&self, multi: &Multi) {
		let _ = multi.action(CURL_SOCKET_TIMEOUT, &Events::new());
	}
}

/// Per-completion state a single `perform_async` call waits on.
struct Completion {
	result: RefCell<Option<Result<(), curl::Error>>>,
	waker: RefCell<Option<Waker>>,
}

impl Completion {
	fn new() -> Rc<Self> {
		Rc::new(Self { result: RefCell::new(None), waker: RefCell::new(None) })
	}

	fn set(&self, result: Result<(), curl::Error>) {
		*self.result.borrow_mut() = Some(result);
		if let Some(waker) = self.waker.borrow_mut().take() {
			waker.wake();
		}
	}

	fn poll(&self, cx: &mut Context<'_>) -> Poll<Result<(), curl::Error>> {
		if let Some(result) = self.result.borrow_mut().take() {
			return Poll::Ready(result);
		}
		*self.waker.borrow_mut() = Some(cx.waker().clone());
		Poll::Pending
	}
}

trait PendingEntry {
	/// Check whether `message` reports completion of this entry; if so,
	/// record the result and return `true`.
	fn check(&self, message: &Message<'_>) -> bool;
	/// Remove the handle from `multi` and notify the waiting coroutine.
	fn finish(self: Box<Self>, multi: &Multi);
}

struct PendingHandle<H: Handler> {
	handle: Easy2Handle<H>,
	completion: Rc<Completion>,
}

impl<H: Handler> PendingEntry for PendingHandle<H> {
	fn check(&self, message: &Message<'_>) -> bool {
		message.result_for2(&self.handle).is_some()
	}

	fn finish(self: Box<Self>, multi: &Multi) {
		let Self { handle, completion } = *self;
		match multi.remove2(handle) {
			Ok(_removed) => completion.set(Ok(())),
			Err(err) => completion.set(Err(curl::Error::new(err.code() as u32))),
		}
	}
}

struct SingleState {
	multi: Multi,
	shared: Arc<Shared>,
	pending: RefCell<Vec<Box<dyn PendingEntry>>>,
}

thread_local! {
	static SINGLE: RefCell<Option<SingleState>> = RefCell::new(None);
}

/// Dispose the calling thread's single-request bridge state (the shared
/// multi handle, its registered sockets and timer), if any was created.
///
/// Part of the global/per-coroutine lifetime surface: idempotent, safe to
/// call whether or not [`perform_async`] was ever used on this thread.
pub fn shutdown() {
	SINGLE.with(|cell| {
		*cell.borrow_mut() = None;
	});
}

fn ensure_single(handle: &Handle) -> Result<(), CoreError> {
	SINGLE.with(|cell| {
		if cell.borrow().is_some() {
			return Ok(());
		}
		let mut multi = Multi::new();
		let shared = Arc::new(Shared::new(handle.clone()));
		Shared::install(&mut multi, &shared).map_err(CoreError::from)?;
		*cell.borrow_mut() = Some(SingleState { multi, shared, pending: RefCell::new(Vec::new()) });
		Ok(())
	})
}

fn drain_single(state: &SingleState) {
	let mut done = Vec::new();
	state.multi.messages(|message| {
		let pending = state.pending.borrow();
		for (index, entry) in pending.iter().enumerate() {
			if entry.check(&message) {
				done.push(index);
				break;
			}
		}
	});
	done.sort_unstable();
	done.dedup();
	for index in done.into_iter().rev() {
		let entry = state.pending.borrow_mut().remove(index);
		entry.finish(&state.multi);
	}
}

/// Drive a single `curl::easy::Easy2` transfer to completion via the shared
/// thread-local multi handle, returning its `CURLcode`-equivalent result.
///
/// Must be called from a coroutine.
pub async fn perform_async<H: Handler + 'static>(easy: curl::easy::Easy2<H>) -> Result<(), i32> {
	if coroutine::current().is_err() {
		return Err(map_core_error(&CoreError::Context));
	}
	let handle = match corio_reactor::reactor::current() {
		Some(handle) => handle,
		None => return Err(map_core_error(&CoreError::Context)),
	};
	if let Err(err) = ensure_single(&handle) {
		return Err(map_core_error(&err));
	}

	let completion = Completion::new();
	let added = SINGLE.with(|cell| -> Result<(), CoreError> {
		let mut state = cell.borrow_mut();
		let state = state.as_mut().unwrap();
		let added = state.multi.add2(easy).map_err(CoreError::from)?;
		state.shared.kick(&state.multi);
		state.pending.push(Box::new(PendingHandle { handle: added, completion: completion.clone() }));
		Ok(())
	});
	if let Err(err) = added {
		return Err(map_core_error(&err));
	}

	let result = coroutine::suspend(move |cx| {
		SINGLE.with(|cell| {
			let state_ref = cell.borrow();
			let state = state_ref.as_ref().unwrap();
			if state.shared.drive(&state.multi, cx) {
				drain_single(state);
			}
		});
		completion.poll(cx)
	})
	.await;

	result.map_err(|err| map_core_error(&CoreError::from(err)))
}

/// Per-multi-handle bridge state, integrating an external transfer-multi
/// handle's socket/timer callback protocol with the reactor.
///
/// Lazily created on first use against a given [`Multi`]; destroying it
/// (via `Drop`) disposes every socket event and the timer it owns.
pub struct BridgeCtx {
	multi: Multi,
	shared: Arc<Shared>,
}

impl BridgeCtx {
	/// Install per-ctx socket/timer callbacks on `multi` and take ownership of it.
	pub fn new(multi: Multi) -> Result<Self, CoreError> {
		let handle = corio_reactor::reactor::current().ok_or(CoreError::Context)?;
		let shared = Arc::new(Shared::new(handle));
		let mut multi = multi;
		Shared::install(&mut multi, &shared).map_err(CoreError::from)?;
		Ok(Self { multi, shared })
	}

	/// Number of fds currently tracked (`poll_list.size` in the specification).
	pub fn poll_list_size(&self) -> usize {
		self.shared.poll_list.lock().unwrap().len()
	}

	/// The wrapped transfer-multi handle.
	///
	/// `BridgeCtx` only owns the socket/timer integration (§4.G); adding,
	/// removing and reading the result of individual transfers is the
	/// caller's responsibility via the handle this returns.
	pub fn multi(&self) -> &Multi {
		&self.multi
	}

	/// `multi_perform_async`: kick the engine and report how many transfers are still running.
	pub async fn multi_perform_async(&self) -> Result<usize, i32> {
		if coroutine::current().is_err() {
			return Err(map_core_error(&CoreError::Context));
		}
		self.shared.kick(&self.multi);
		Ok(self.poll_list_size())
	}

	/// `multi_select_async`: wait for activity or `timeout_ms`, treating
	/// a timeout as success (returning the current `poll_list.size`) rather
	/// than a failure.
	pub async fn select_async(&self, timeout_ms: i64) -> Result<usize, i32> {
		if coroutine::current().is_err() {
			return Err(map_core_error(&CoreError::Context));
		}
		let deadline = Instant::now() + Duration::from_millis(timeout_ms.max(0) as u64);
		let mut timeout = match self.shared.handle.timer(deadline) {
			Ok(timer) => timer,
			Err(err) => return Err(map_core_error(&CoreError::alloc(err))),
		};

		self.shared.kick(&self.multi);

		coroutine::suspend(move |cx| {
			// Mirrors `curl_multi_wait`/P6: return as soon as any socket or
			// timer action fired, not only once `timeout_ms` elapses — the
			// caller drains `Multi::messages` itself afterwards.
			if self.shared.drive(&self.multi, cx) {
				return Poll::Ready(());
			}
			if Pin::new(&mut timeout).poll(cx).is_ready() {
				return Poll::Ready(());
			}
			Poll::Pending
		})
		.await;

		Ok(self.poll_list_size())
	}
}

impl From<curl::MultiError> for CoreError {
	fn from(err: curl::MultiError) -> Self {
		Self::EngineMulti(err)
	}
}

impl From<curl::Error> for CoreError {
	fn from(err: curl::Error) -> Self {
		Self::Engine(err)
	}
}

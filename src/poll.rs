//! Emulates multi-fd `poll(2)` on top of the reactor.

use crate::callback::CallbackRecord;
use crate::coroutine::{self, Suspension};
use crate::errno::map_core_error;
use crate::error::{CoreError, FailureKind};
use crate::event_bits::{self, PollBits};
use corio_reactor::event::SocketReadiness;
use corio_reactor::reactor::{ReadyBits, Timer};
use std::future::Future;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::task::Poll;
use std::time::{Duration, Instant};

/// One entry of a `poll_async` call: a watched fd plus requested/observed events.
#[derive(Debug, Clone, Copy)]
pub struct PollEntry {
	/// The fd being watched.
	pub fd: RawFd,
	/// Requested events (`POLLIN`/`POLLOUT`/...).
	pub events: PollBits,
	/// Observed events, populated by `poll_async` before it returns.
	pub revents: PollBits,
}

impl PollEntry {
	/// A fresh entry requesting `events` on `fd`, with no observed events yet.
	pub fn new(fd: RawFd, events: PollBits) -> Self {
		Self { fd, events, revents: PollBits::empty() }
	}
}

struct Slot {
	event: SocketReadiness,
	requested: (bool, bool),
	record: CallbackRecord<()>,
}

/// Emulate `poll(2)`: wait for any of `entries` to become ready, or `timeout_ms` to elapse.
///
/// `timeout_ms < 0` waits indefinitely. Must be called from a coroutine;
/// otherwise returns `-1` with `errno = EINVAL`.
pub async fn poll_async(entries: &mut [PollEntry], timeout_ms: i64) -> i32 {
	if coroutine::current().is_err() {
		return map_core_error(&CoreError::Context);
	}
	let handle = match corio_reactor::reactor::current() {
		Some(handle) => handle,
		None => return map_core_error(&CoreError::Context),
	};

	let suspension = Suspension::new();

	let mut slots = Vec::with_capacity(entries.len());
	for entry in entries.iter() {
		let requested = event_bits::poll_to_reactor(entry.events);
		match SocketReadiness::new(&handle, entry.fd) {
			Ok(event) => slots.push(Slot { event, requested, record: CallbackRecord::new(suspension.resolver(), ()) }),
			Err(err) => return map_core_error(&CoreError::alloc(err)),
		}
	}

	// `Timer` only holds `Unpin` fields (an `Arc`-backed handle, an index, an
	// `Arc<TimerEntry>`), so it never needs to be pinned in a box.
	let mut timer: Option<Timer> = if timeout_ms < 0 {
		None
	} else {
		match handle.timer(Instant::now() + Duration::from_millis(timeout_ms as u64)) {
			Ok(timer) => Some(timer),
			Err(err) => return map_core_error(&CoreError::alloc(err)),
		}
	};

	let cancel_record = CallbackRecord::new(suspension.resolver(), ());

	let accumulator = coroutine::suspend(move |cx| {
		if coroutine::current().map(coroutine::Current::is_cancelled).unwrap_or(false) {
			cancel_record.fail(FailureKind::Cancelled);
			return Poll::Ready(-1);
		}
		let mut ready = 0i32;
		for (slot, entry) in slots.iter_mut().zip(entries.iter_mut()) {
			let triggered = slot.event.triggered_events(cx).unwrap_or_else(|_| ReadyBits::error());
			let mut bits = ReadyBits::empty();
			if slot.requested.0 && triggered.is_readable() {
				bits = bits | ReadyBits::readable();
			}
			if slot.requested.1 && triggered.is_writable() {
				bits = bits | ReadyBits::writable();
			}
			if triggered.is_error() {
				bits = bits | ReadyBits::error();
			}
			if !bits.is_empty() {
				entry.revents = event_bits::reactor_to_poll(bits);
				slot.record.fire();
			}
			if slot.record.has_fired() {
				ready += 1;
			}
		}
		if ready > 0 {
			return Poll::Ready(ready);
		}
		if let Some(timer) = timer.as_mut() {
			if Pin::new(timer).poll(cx).is_ready() {
				return Poll::Ready(0);
			}
		}
		Poll::Pending
	})
	.await;

	match suspension.take_failure() {
		Some(kind) => map_core_error(&CoreError::Cooperative(kind)),
		None => accumulator,
	}
}

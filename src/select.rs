//! Emulates `select(2)` on top of the reactor.

use crate::callback::CallbackRecord;
use crate::coroutine::{self, Suspension};
use crate::errno::map_core_error;
use crate::error::{CoreError, FailureKind};
use corio_reactor::event::SocketReadiness;
use corio_reactor::reactor::{ReadyBits, Timer};
use std::future::Future;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::task::Poll;
use std::time::{Duration, Instant};

/// Fixed-capacity bitset standing in for a C `fd_set`.
///
/// Capacity matches the historical `FD_SETSIZE` of 1024; `select_async` never
/// touches an fd outside `[0, max_fd)`, and `max_fd` itself is bounded by this.
#[derive(Debug, Clone)]
pub struct FdSet {
	bits: Box<[u64; Self::WORDS]>,
}

impl FdSet {
	/// Historical `FD_SETSIZE`.
	pub const CAPACITY: usize = 1024;
	const WORDS: usize = Self::CAPACITY / 64;

	/// An empty set.
	pub fn new() -> Self {
		Self { bits: Box::new([0; Self::WORDS]) }
	}

	/// Whether `fd` is a member.
	pub fn contains(&self, fd: RawFd) -> bool {
		self.index(fd).map_or(false, |(w, b)| self.bits[w] & (1 << b) != 0)
	}

	/// Insert `fd`. No-op if out of range.
	pub fn insert(&mut self, fd: RawFd) {
		if let Some((w, b)) = self.index(fd) {
			self.bits[w] |= 1 << b;
		}
	}

	/// Remove every member.
	pub fn clear(&mut self) {
		self.bits.fill(0);
	}

	fn index(&self, fd: RawFd) -> Option<(usize, usize)> {
		if fd < 0 || fd as usize >= Self::CAPACITY {
			return None;
		}
		let fd = fd as usize;
		Some((fd / 64, fd % 64))
	}
}

impl Default for FdSet {
	fn default() -> Self {
		Self::new()
	}
}

struct Slot {
	fd: RawFd,
	event: SocketReadiness,
	requested: (bool, bool, bool),
	record: CallbackRecord<()>,
}

/// Emulate `select(2)`: wait for any fd in `[0, max_fd)` requested via `rfds`/`wfds`/`efds`
/// to become ready, or `timeout_ms` to elapse.
///
/// `max_fd` is an *exclusive* upper bound on the fd range scanned (`[0, max_fd)`),
/// a deliberate choice over the legacy API's nominally-inclusive naming — see
/// the design notes on this open question. On return, each supplied set is
/// overwritten in place with exactly the fds the reactor reported ready for
/// that direction.
///
/// Must be called from a coroutine; otherwise returns `-1` with `errno = EINVAL`.
pub async fn select_async(
	max_fd: RawFd,
	mut rfds: Option<&mut FdSet>,
	mut wfds: Option<&mut FdSet>,
	mut efds: Option<&mut FdSet>,
	timeout_ms: Option<i64>,
) -> i32 {
	if coroutine::current().is_err() {
		return map_core_error(&CoreError::Context);
	}
	let handle = match corio_reactor::reactor::current() {
		Some(handle) => handle,
		None => return map_core_error(&CoreError::Context),
	};
	if max_fd < 0 {
		return map_core_error(&CoreError::Context);
	}

	let suspension = Suspension::new();

	let mut slots = Vec::new();
	for fd in 0..max_fd {
		let requested = (
			rfds.as_deref().is_some_and(|s| s.contains(fd)),
			wfds.as_deref().is_some_and(|s| s.contains(fd)),
			efds.as_deref().is_some_and(|s| s.contains(fd)),
		);
		if !requested.0 && !requested.1 && !requested.2 {
			continue;
		}
		match SocketReadiness::new(&handle, fd) {
			Ok(event) => slots.push(Slot { fd, event, requested, record: CallbackRecord::new(suspension.resolver(), ()) }),
			Err(err) => return map_core_error(&CoreError::alloc(err)),
		}
	}

	let mut timer: Option<Timer> = match timeout_ms {
		None => None,
		Some(ms) => match handle.timer(Instant::now() + Duration::from_millis(ms.max(0) as u64)) {
			Ok(timer) => Some(timer),
			Err(err) => return map_core_error(&CoreError::alloc(err)),
		},
	};

	if let Some(rfds) = rfds.as_deref_mut() {
		rfds.clear();
	}
	if let Some(wfds) = wfds.as_deref_mut() {
		wfds.clear();
	}
	if let Some(efds) = efds.as_deref_mut() {
		efds.clear();
	}

	let cancel_record = CallbackRecord::new(suspension.resolver(), ());

	let accumulator = coroutine::suspend(move |cx| {
		if coroutine::current().map(coroutine::Current::is_cancelled).unwrap_or(false) {
			cancel_record.fail(FailureKind::Cancelled);
			return Poll::Ready(-1);
		}
		let mut ready = 0i32;
		for slot in slots.iter_mut() {
			let triggered = slot.event.triggered_events(cx).unwrap_or_else(|_| ReadyBits::error());
			let mut fired = false;
			if slot.requested.0 && triggered.is_readable() {
				if let Some(rfds) = rfds.as_deref_mut() {
					rfds.insert(slot.fd);
				}
				fired = true;
			}
			if slot.requested.1 && triggered.is_writable() {
				if let Some(wfds) = wfds.as_deref_mut() {
					wfds.insert(slot.fd);
				}
				fired = true;
			}
			if slot.requested.2 && triggered.is_error() {
				if let Some(efds) = efds.as_deref_mut() {
					efds.insert(slot.fd);
				}
				fired = true;
			}
			if fired {
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

//! The reactor implementation and various low-level tools to use it.

mod executor;
mod lazy_handle;
mod registration;
mod task;
mod timer;
mod timer_future;
mod waker;

pub use self::executor::current;
pub use self::lazy_handle::LazyHandle;
pub use self::registration::Registration;
pub use self::task::ReadyBits;
pub use self::timer_future::Timer;
use self::task::Tasks;
use self::timer::TimerWheel;

use futures_executor::Enter;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

const WAKE_TOKEN: mio::Token = mio::Token(usize::MAX);

#[derive(Debug)]
struct Inner {
	poll: mio::Poll,
	waker: std::task::Waker,
	tasks: Tasks,
	timers: TimerWheel,
}

/// A reactor to drive asynchronous IO in context of async/await futures.
///
/// This is the concrete, mio-backed reactor the rest of this workspace
/// assumes exists: fd readiness (used for `poll`/`select` emulation and the
/// libcurl socket bridge) and timers (used for timeouts and the libcurl
/// timer bridge) are both served off a single `mio::Poll` instance.
#[derive(Debug)]
pub struct Reactor {
	handlep: HandlePriv,
	events: mio::Events,
	_wake_registration: waker::ReactorWaker,
}

impl Reactor {
	/// Create a new reactor
	pub fn new() -> io::Result<Self> {
		let poll = mio::Poll::new()?;
		let wake_registration = waker::ReactorWaker::new(poll.registry(), WAKE_TOKEN)?;
		let waker = wake_registration.waker();

		Ok(Self {
			handlep: HandlePriv {
				inner: Arc::new(Inner {
					poll,
					waker,
					tasks: Tasks::new(),
					timers: TimerWheel::new(),
				}),
			},
			events: mio::Events::with_capacity(1024),
			_wake_registration: wake_registration,
		})
	}

	/// A waker to interrupt the eventloop.
	pub fn waker(&self) -> std::task::Waker {
		self.handlep.waker()
	}

	/// Returns a handle to the reactor, used to register new events.
	pub fn handle(&self) -> Handle {
		self.handlep.downgrade()
	}

	/// Poll for events and wait up to `timeout` for at least one.
	///
	/// Waits "forever" if `timeout` is `None`, doesn't block at all if
	/// `timeout` is `Some(0)`.
	pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<()> {
		let timer_timeout = self.handlep.inner.timers.next_timeout();
		let timeout = match (timeout, timer_timeout) {
			(Some(a), Some(b)) => Some(a.min(b)),
			(Some(a), None) => Some(a),
			(None, Some(b)) => Some(b),
			(None, None) => None,
		};

		self.handlep.inner.poll.poll(&mut self.events, timeout)?;

		for event in &self.events {
			if event.token() == WAKE_TOKEN {
				continue;
			}
			if let Some(readiness) = self.handlep.inner.tasks.get(event.token()) {
				readiness.update(event);
			}
		}

		self.handlep.inner.timers.fire_expired();

		Ok(())
	}
}

impl corio_utils::park::Park for Reactor {
	fn waker(&self) -> std::task::Waker {
		self.handlep.waker()
	}

	fn park(&mut self, _enter: &mut futures_executor::Enter, timeout: Option<Duration>) {
		self.poll(timeout).expect("reactor poll failed");
	}
}

/// A (shared) handle to the reactor.
#[derive(Clone, Debug)]
pub struct Handle {
	inner: Weak<Inner>,
}

impl Handle {
	/// A waker to interrupt the eventloop.
	pub fn waker(&self) -> std::task::Waker {
		match self.upgrade() {
			Some(handlep) => handlep.waker(),
			None => futures_util::task::noop_waker(),
		}
	}

	/// Enter a reactor handle.
	///
	/// A runtime (combining reactor, pool, timer) should enter a reactor
	/// handle (in each thread it runs tasks from the pool) so all tasks have
	/// access to the reactor.
	///
	/// # Panics
	///
	/// Panics if a handle is already entered.
	pub fn enter<F, T>(self, enter: &mut Enter, f: F) -> T
	where
		F: FnOnce(&mut Enter) -> T,
	{
		self::executor::enter(self, enter, f)
	}

	/// Register a raw fd for readiness notifications.
	pub fn register_fd(&self, fd: RawFd, read_mask: mio::Interest, write_mask: mio::Interest) -> io::Result<Registration> {
		Registration::new(self, fd, read_mask, write_mask)
	}

	/// Create a future that resolves once `deadline` passes.
	pub fn timer(&self, deadline: Instant) -> io::Result<Timer> {
		Timer::new(self, deadline)
	}

	fn register_timer(&self, deadline: Instant) -> io::Result<(usize, Arc<timer::TimerEntry>)> {
		let reactor = self.expect_upgrade()?;
		let (key, entry) = reactor.inner.timers.insert(deadline);
		reactor.inner.waker.wake_by_ref();
		Ok((key, entry))
	}

	fn cancel_timer(&self, key: usize) {
		if let Some(reactor) = self.upgrade() {
			reactor.inner.timers.cancel(key);
		}
	}

	pub(crate) fn upgrade(&self) -> Option<HandlePriv> {
		let inner = self.inner.upgrade()?;
		Some(HandlePriv { inner })
	}

	pub(crate) fn expect_upgrade(&self) -> io::Result<HandlePriv> {
		self.upgrade().ok_or_else(|| io::Error::new(io::ErrorKind::Other, "reactor not running anymore"))
	}
}

#[derive(Debug, Clone)]
pub(crate) struct HandlePriv {
	inner: Arc<Inner>,
}

impl HandlePriv {
	fn downgrade(&self) -> Handle {
		Handle { inner: Arc::downgrade(&self.inner) }
	}

	fn waker(&self) -> std::task::Waker {
		self.inner.waker.clone()
	}
}

impl std::ops::Deref for HandlePriv {
	type Target = Inner;
	fn deref(&self) -> &Inner {
		&self.inner
	}
}

use super::task::{ReadyBits, Readiness};
use super::{Handle, LazyHandle};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Registration of a raw fd with a [`Reactor`](super::Reactor).
///
/// Unlike the `mio::Evented`-generic wrapper this workspace's teacher used,
/// registration here always goes through `mio::unix::SourceFd`: every event
/// this crate adapts (socket readiness, `poll`/`select` fd readiness, the
/// libcurl socket/timer bridge) ultimately concerns a raw descriptor, never
/// an owned typed stream, so there is no generic `E: Evented` left to thread
/// through.
#[derive(Debug)]
pub struct Registration {
	fd: RawFd,
	handle: Handle,
	token: mio::Token,
	readiness: Arc<Readiness>,
}

impl Registration {
	/// Register `fd` with `handle` for the given read/write interest masks.
	pub fn new(handle: &Handle, fd: RawFd, read_mask: mio::Interest, write_mask: mio::Interest) -> io::Result<Self> {
		let reactor = handle.expect_upgrade()?;
		let (token, readiness) = reactor.tasks.insert(read_mask, write_mask);
		let interest = read_mask | write_mask;
		reactor.inner.poll.registry().register(&mut mio::unix::SourceFd(&fd), token, interest)?;
		reactor.inner.waker.wake_by_ref();
		Ok(Self {
			fd,
			handle: handle.clone(),
			token,
			readiness,
		})
	}

	/// Return and clear current read events.
	pub fn clear_read_ready(&self) -> ReadyBits {
		self.readiness.take_read()
	}

	/// Check for new read events, registering `context`'s waker if none are pending yet.
	pub fn poll_read_ready(&self, context: &mut Context<'_>) -> Poll<io::Result<ReadyBits>> {
		let bits = self.readiness.take_read();
		if !bits.is_empty() {
			return Poll::Ready(Ok(bits));
		}
		self.readiness.register_read(context.waker());
		let bits = self.readiness.take_read();
		if !bits.is_empty() {
			return Poll::Ready(Ok(bits));
		}
		self.handle.expect_upgrade()?;
		Poll::Pending
	}

	/// Return and clear current write events.
	pub fn clear_write_ready(&self) -> ReadyBits {
		self.readiness.take_write()
	}

	/// Check for new write events, registering `context`'s waker if none are pending yet.
	pub fn poll_write_ready(&self, context: &mut Context<'_>) -> Poll<io::Result<ReadyBits>> {
		let bits = self.readiness.take_write();
		if !bits.is_empty() {
			return Poll::Ready(Ok(bits));
		}
		self.readiness.register_write(context.waker());
		let bits = self.readiness.take_write();
		if !bits.is_empty() {
			return Poll::Ready(Ok(bits));
		}
		self.handle.expect_upgrade()?;
		Poll::Pending
	}

	/// Change the requested interest for an already-registered fd.
	pub fn reregister(&self, interest: mio::Interest) -> io::Result<()> {
		let reactor = self.handle.expect_upgrade()?;
		reactor.inner.poll.registry().reregister(&mut mio::unix::SourceFd(&self.fd), self.token, interest)
	}

	/// Handle of the reactor this is registered with.
	pub fn handle(&self) -> LazyHandle {
		self.handle.clone().into()
	}

	/// Deregister the fd. Idempotent; only fails if mio fails.
	pub fn deregister(&self) -> io::Result<()> {
		if let Some(reactor) = self.handle.upgrade() {
			reactor.inner.poll.registry().deregister(&mut mio::unix::SourceFd(&self.fd))?;
			reactor.tasks.remove(self.token);
			reactor.inner.waker.wake_by_ref();
		}
		Ok(())
	}
}

impl Drop for Registration {
	fn drop(&mut self) {
		let _ = self.deregister();
	}
}

//! The event variants the adaptation layer built on top of this reactor uses.
//!
//! Each variant wraps one of the reactor's concrete primitives
//! ([`Registration`], [`reactor::Timer`], [`dns::AddrInfoQuery`],
//! [`dns::NameInfoQuery`]) behind a name that matches what it represents to a
//! caller rather than how it is implemented. "start" is construction,
//! "dispose" is `Drop`, and "triggered events" is a non-blocking poll —
//! `std::future::Future` and RAII already give us the start/stop/dispose
//! lifecycle a hand-rolled event object would otherwise need to reimplement.

use crate::reactor::{Handle, ReadyBits, Registration};
use std::io;
use std::os::unix::io::RawFd;
use std::task::{Context, Poll};

fn poll_readiness(registration: &Registration, cx: &mut Context<'_>) -> io::Result<ReadyBits> {
	let mut bits = ReadyBits::empty();
	if let Poll::Ready(result) = registration.poll_read_ready(cx) {
		bits = bits | result?;
	}
	if let Poll::Ready(result) = registration.poll_write_ready(cx) {
		bits = bits | result?;
	}
	Ok(bits)
}

/// Readiness on a socket fd.
///
/// Distinguished from [`FdReadiness`] only for parity with platforms that
/// tell sockets and plain fds apart at the reactor level; this workspace's
/// `mio::unix::SourceFd`-based reactor treats them identically.
#[derive(Debug)]
pub struct SocketReadiness(Registration);

impl SocketReadiness {
	/// Register `fd`, watching both readable and writable interest.
	pub fn new(handle: &Handle, fd: RawFd) -> io::Result<Self> {
		Ok(Self(handle.register_fd(fd, mio::Interest::READABLE, mio::Interest::WRITABLE)?))
	}

	/// Non-blocking snapshot of newly triggered bits, arming `cx`'s waker for the next ones.
	pub fn triggered_events(&self, cx: &mut Context<'_>) -> io::Result<ReadyBits> {
		poll_readiness(&self.0, cx)
	}
}

/// Readiness on an arbitrary raw fd (pipes, eventfds, ...). See [`SocketReadiness`].
#[derive(Debug)]
pub struct FdReadiness(Registration);

impl FdReadiness {
	/// Register `fd`, watching both readable and writable interest.
	pub fn new(handle: &Handle, fd: RawFd) -> io::Result<Self> {
		Ok(Self(handle.register_fd(fd, mio::Interest::READABLE, mio::Interest::WRITABLE)?))
	}

	/// Non-blocking snapshot of newly triggered bits, arming `cx`'s waker for the next ones.
	pub fn triggered_events(&self, cx: &mut Context<'_>) -> io::Result<ReadyBits> {
		poll_readiness(&self.0, cx)
	}
}

pub use crate::dns::{AddrInfoQuery, NameInfoQuery};
pub use crate::reactor::Timer;

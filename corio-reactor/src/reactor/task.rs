use futures_util::task::AtomicWaker;
use slab::Slab;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// One entry per registered raw fd source: tracks separately accumulated
/// read and write readiness plus the wakers to notify when either changes.
///
/// This plays the role the teacher's pointer-cast `mio::Token` trick played,
/// but uses a [`slab`] index instead: mio 0.8 dropped `Evented`/`Registration`
/// entirely, so there is no more "one token worth of refcounted state" to
/// smuggle through a `usize` — a slab slot is the idiomatic replacement.
#[derive(Debug)]
pub(super) struct Readiness {
	read_mask: mio::Interest,
	write_mask: mio::Interest,
	read_readiness: AtomicU8,
	read_waker: AtomicWaker,
	write_readiness: AtomicU8,
	write_waker: AtomicWaker,
}

/// Readiness bits reported by the reactor for a registered fd, independent
/// of `mio::Interest` (which only expresses what you ask for, not what you
/// got back).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadyBits(u8);

impl ReadyBits {
	const READABLE: u8 = 0b001;
	const WRITABLE: u8 = 0b010;
	const ERROR: u8 = 0b100;

	/// The empty set.
	pub const fn empty() -> Self {
		Self(0)
	}

	/// Whether the set is empty.
	pub const fn is_empty(self) -> bool {
		self.0 == 0
	}

	/// Readable bit.
	pub const fn readable() -> Self {
		Self(Self::READABLE)
	}

	/// Writable bit.
	pub const fn writable() -> Self {
		Self(Self::WRITABLE)
	}

	/// Error/hangup bit (reported regardless of requested interest).
	pub const fn error() -> Self {
		Self(Self::ERROR)
	}

	/// Whether the readable bit is set.
	pub const fn is_readable(self) -> bool {
		0 != self.0 & Self::READABLE
	}

	/// Whether the writable bit is set.
	pub const fn is_writable(self) -> bool {
		0 != self.0 & Self::WRITABLE
	}

	/// Whether the error bit is set.
	pub const fn is_error(self) -> bool {
		0 != self.0 & Self::ERROR
	}

	fn from_raw(bits: u8) -> Self {
		Self(bits)
	}

	fn raw(self) -> u8 {
		self.0
	}
}

impl std::ops::BitOr for ReadyBits {
	type Output = Self;
	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

impl std::ops::BitAnd for ReadyBits {
	type Output = Self;
	fn bitand(self, rhs: Self) -> Self {
		Self(self.0 & rhs.0)
	}
}

fn interest_bits(interest: mio::Interest) -> ReadyBits {
	let mut bits = ReadyBits::empty();
	if interest.is_readable() {
		bits = bits | ReadyBits::readable();
	}
	if interest.is_writable() {
		bits = bits | ReadyBits::writable();
	}
	bits
}

fn event_bits(event: &mio::event::Event) -> ReadyBits {
	let mut bits = ReadyBits::empty();
	if event.is_readable() {
		bits = bits | ReadyBits::readable();
	}
	if event.is_writable() {
		bits = bits | ReadyBits::writable();
	}
	if event.is_error() || event.is_read_closed() || event.is_write_closed() {
		bits = bits | ReadyBits::error();
	}
	bits
}

impl Readiness {
	fn new(read_mask: mio::Interest, write_mask: mio::Interest) -> Self {
		Self {
			read_mask,
			write_mask,
			read_readiness: AtomicU8::new(0),
			read_waker: AtomicWaker::new(),
			write_readiness: AtomicU8::new(0),
			write_waker: AtomicWaker::new(),
		}
	}

	pub(super) fn update(&self, event: &mio::event::Event) {
		let bits = event_bits(event) | ReadyBits::error();
		let read_bits = bits & (interest_bits(self.read_mask) | ReadyBits::error());
		if !read_bits.is_empty() {
			self.read_readiness.fetch_or(read_bits.raw(), Ordering::Relaxed);
			self.read_waker.wake();
		}
		let write_bits = bits & (interest_bits(self.write_mask) | ReadyBits::error());
		if !write_bits.is_empty() {
			self.write_readiness.fetch_or(write_bits.raw(), Ordering::Relaxed);
			self.write_waker.wake();
		}
	}

	pub(super) fn take_read(&self) -> ReadyBits {
		ReadyBits::from_raw(self.read_readiness.swap(0, Ordering::Relaxed))
	}

	pub(super) fn register_read(&self, waker: &std::task::Waker) {
		self.read_waker.register(waker);
	}

	pub(super) fn take_write(&self) -> ReadyBits {
		ReadyBits::from_raw(self.write_readiness.swap(0, Ordering::Relaxed))
	}

	pub(super) fn register_write(&self, waker: &std::task::Waker) {
		self.write_waker.register(waker);
	}
}

/// Registration table: maps `mio::Token` (a slab index) to the readiness
/// state of the fd registered under it.
#[derive(Debug, Default)]
pub(super) struct Tasks {
	slab: Mutex<Slab<Arc<Readiness>>>,
}

impl Tasks {
	pub(super) fn new() -> Self {
		Self::default()
	}

	pub(super) fn insert(&self, read_mask: mio::Interest, write_mask: mio::Interest) -> (mio::Token, Arc<Readiness>) {
		let readiness = Arc::new(Readiness::new(read_mask, write_mask));
		let mut slab = self.slab.lock().unwrap();
		let key = slab.insert(readiness.clone());
		(mio::Token(key), readiness)
	}

	pub(super) fn get(&self, token: mio::Token) -> Option<Arc<Readiness>> {
		self.slab.lock().unwrap().get(token.0).cloned()
	}

	pub(super) fn remove(&self, token: mio::Token) {
		let mut slab = self.slab.lock().unwrap();
		if slab.contains(token.0) {
			slab.remove(token.0);
		}
	}
}

//! Bidirectional translation between legacy poll/select event bits and the
//! reactor's own readiness bits.
//!
//! `POLLERR`/`POLLNVAL` are input-only sentinels: requesting either one is
//! treated as requesting readability (matching `poll(2)`, which always
//! reports hangup/error conditions regardless of what was asked for), and
//! neither has a reverse mapping since the reactor surface never produces
//! them directly — a closed or errored fd simply reports `ReadyBits::error()`,
//! which [`reactor_to_poll`] folds into `POLLHUP`.

use bitflags::bitflags;
use corio_reactor::reactor::ReadyBits;

bitflags! {
	/// Legacy `poll(2)`/`select(2)` event bits.
	#[derive(Default)]
	pub struct PollBits: u16 {
		/// Data available to read.
		const POLLIN = 0x0001;
		/// Ready for writing.
		const POLLOUT = 0x0004;
		/// High-priority data available to read.
		const POLLPRI = 0x0002;
		/// Hung up.
		const POLLHUP = 0x0010;
		/// Error condition (input-only; never set in `reverts`' reverse direction).
		const POLLERR = 0x0008;
		/// Invalid fd (input-only).
		const POLLNVAL = 0x0020;
	}
}

/// Translate a caller's requested `poll`/`select` bits into the reactor's
/// read/write interest.
pub fn poll_to_reactor(bits: PollBits) -> (bool, bool) {
	let read = bits.intersects(PollBits::POLLIN | PollBits::POLLPRI | PollBits::POLLERR | PollBits::POLLNVAL);
	let write = bits.intersects(PollBits::POLLOUT);
	(read, write)
}

/// Translate reactor-triggered bits back into legacy `revents`.
pub fn reactor_to_poll(bits: ReadyBits) -> PollBits {
	let mut out = PollBits::empty();
	if bits.is_readable() {
		out |= PollBits::POLLIN;
	}
	if bits.is_writable() {
		out |= PollBits::POLLOUT;
	}
	if bits.is_error() {
		out |= PollBits::POLLHUP;
	}
	out
}

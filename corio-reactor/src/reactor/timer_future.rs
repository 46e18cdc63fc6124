use super::Handle;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

/// A future that resolves once a registered deadline passes.
///
/// Backed by the reactor's [`TimerWheel`](super::timer::TimerWheel); dropping
/// the future before it fires cancels the underlying timer entry.
#[derive(Debug)]
pub struct Timer {
	handle: Handle,
	key: usize,
	entry: Arc<super::timer::TimerEntry>,
}

impl Timer {
	pub(super) fn new(handle: &Handle, deadline: Instant) -> io::Result<Self> {
		let (key, entry) = handle.register_timer(deadline)?;
		Ok(Self {
			handle: handle.clone(),
			key,
			entry,
		})
	}
}

impl std::future::Future for Timer {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.entry.is_fired() {
			return Poll::Ready(());
		}
		self.entry.register(cx.waker());
		if self.entry.is_fired() {
			return Poll::Ready(());
		}
		Poll::Pending
	}
}

impl Drop for Timer {
	fn drop(&mut self) {
		self.handle.cancel_timer(self.key);
	}
}

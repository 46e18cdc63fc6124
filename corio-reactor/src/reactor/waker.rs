use std::io;
use std::sync::Arc;

/// Bridges `mio::Waker` (cross-thread interrupt of `Poll::poll`) to
/// `std::task::Waker` via `ArcWake`.
///
/// mio 0.8 ships a native, portable waker, which replaces the teacher's
/// hand-rolled `mio::Registration`/`SetReadiness` pair entirely: there is no
/// more pending/polling flag dance to get right, `mio::Waker::wake` is
/// already safe to call from any thread at any time.
#[derive(Debug)]
struct Inner(mio::Waker);

impl futures_util::task::ArcWake for Inner {
	fn wake_by_ref(arc_self: &Arc<Self>) {
		if let Err(err) = arc_self.0.wake() {
			log::warn!("failed to wake reactor: {}", err);
		}
	}
}

#[derive(Debug)]
pub(super) struct ReactorWaker {
	inner: Arc<Inner>,
}

impl ReactorWaker {
	pub(super) fn new(registry: &mio::Registry, token: mio::Token) -> io::Result<Self> {
		Ok(Self {
			inner: Arc::new(Inner(mio::Waker::new(registry, token)?)),
		})
	}

	pub(super) fn waker(&self) -> std::task::Waker {
		futures_util::task::waker(self.inner.clone())
	}
}

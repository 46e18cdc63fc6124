use futures_util::task::AtomicWaker;
use slab::Slab;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Per-registered-timer shared state: fires once `deadline` passes, then the
/// holder can poll [`TimerEntry::is_fired`] or wait on a waker registered
/// through [`TimerEntry::register`].
#[derive(Debug)]
pub(crate) struct TimerEntry {
	fired: AtomicBool,
	waker: AtomicWaker,
}

#[derive(Debug)]
struct Scheduled {
	deadline: Instant,
	key: usize,
}

impl PartialEq for Scheduled {
	fn eq(&self, other: &Self) -> bool {
		self.deadline == other.deadline
	}
}
impl Eq for Scheduled {}

impl Ord for Scheduled {
	// reversed: `BinaryHeap` is a max-heap, we want the earliest deadline on top
	fn cmp(&self, other: &Self) -> Ordering {
		other.deadline.cmp(&self.deadline)
	}
}
impl PartialOrd for Scheduled {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// A `BinaryHeap`-based timer queue.
///
/// Grounded on the shape of a reactor-embedded timer wheel (tick size plus a
/// reverse-ordered heap of deadlines): a slab of entries keyed by a stable
/// token, plus a heap of `(deadline, token)` pairs for efficient
/// "what's the next deadline" queries. Cancelled entries are left in the
/// heap as tombstones (the slab slot is freed) and skipped when popped.
#[derive(Debug, Default)]
pub(super) struct TimerWheel {
	entries: Mutex<Slab<Arc<TimerEntry>>>,
	heap: Mutex<BinaryHeap<Scheduled>>,
}

impl TimerWheel {
	pub(super) fn new() -> Self {
		Self::default()
	}

	/// Register a new timer firing at `deadline`. Returns a token used to
	/// cancel it and a handle to check/consume firing.
	pub(super) fn insert(&self, deadline: Instant) -> (usize, Arc<TimerEntry>) {
		let entry = Arc::new(TimerEntry { fired: AtomicBool::new(false), waker: AtomicWaker::new() });
		let key = self.entries.lock().unwrap().insert(entry.clone());
		self.heap.lock().unwrap().push(Scheduled { deadline, key });
		(key, entry)
	}

	pub(super) fn cancel(&self, key: usize) {
		let mut entries = self.entries.lock().unwrap();
		if entries.contains(key) {
			entries.remove(key);
		}
	}

	/// Duration until the next deadline, if any entry is still scheduled.
	pub(super) fn next_timeout(&self) -> Option<std::time::Duration> {
		let heap = self.heap.lock().unwrap();
		let now = Instant::now();
		heap.peek().map(|s| s.deadline.saturating_duration_since(now))
	}

	/// Pop and mark fired all entries whose deadline has passed.
	pub(super) fn fire_expired(&self) {
		let now = Instant::now();
		let mut heap = self.heap.lock().unwrap();
		while let Some(top) = heap.peek() {
			if top.deadline > now {
				break;
			}
			let Scheduled { key, .. } = heap.pop().unwrap();
			let mut entries = self.entries.lock().unwrap();
			if entries.contains(key) {
				let entry = entries.remove(key);
				entry.fired.store(true, AtomicOrdering::Release);
				entry.waker.wake();
			}
		}
	}
}

impl TimerEntry {
	pub(crate) fn is_fired(&self) -> bool {
		self.fired.load(AtomicOrdering::Acquire)
	}

	pub(crate) fn register(&self, waker: &std::task::Waker) {
		self.waker.register(waker);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn next_timeout_is_none_when_empty() {
		let wheel = TimerWheel::new();
		assert!(wheel.next_timeout().is_none());
	}

	#[test]
	fn fire_expired_only_fires_past_deadlines() {
		let wheel = TimerWheel::new();
		let (_, soon) = wheel.insert(Instant::now());
		let (_, later) = wheel.insert(Instant::now() + Duration::from_secs(3600));
		wheel.fire_expired();
		assert!(soon.is_fired());
		assert!(!later.is_fired());
	}

	#[test]
	fn cancel_before_expiry_prevents_firing() {
		let wheel = TimerWheel::new();
		let (key, entry) = wheel.insert(Instant::now());
		wheel.cancel(key);
		wheel.fire_expired();
		assert!(!entry.is_fired());
	}

	#[test]
	fn earliest_deadline_orders_first() {
		let wheel = TimerWheel::new();
		let now = Instant::now();
		wheel.insert(now + Duration::from_secs(10));
		wheel.insert(now + Duration::from_secs(1));
		let next = wheel.next_timeout().unwrap();
		assert!(next <= Duration::from_secs(1));
	}
}

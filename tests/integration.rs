use corio::bridge::{self, BridgeCtx};
use corio::event_bits::PollBits;
use corio::pool::current_local;
use corio::poll::{poll_async, PollEntry};
use corio::select::{select_async, FdSet};
use futures_core::task::LocalSpawn;
use std::cell::RefCell;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::task::Poll;
use std::time::{Duration, Instant};

#[test]
fn poll_async_reports_readable_socket() {
	corio::run(async {
		let (a, mut b) = UnixStream::pair().unwrap();
		b.write_all(b"x").unwrap();

		let mut entries = [PollEntry::new(a.as_raw_fd(), PollBits::POLLIN)];
		let ready = poll_async(&mut entries, 5_000).await;

		assert_eq!(ready, 1);
		assert!(entries[0].revents.contains(PollBits::POLLIN));
	});
}

#[test]
fn poll_async_times_out_with_no_activity() {
	corio::run(async {
		let started = Instant::now();
		let ready = poll_async(&mut [], 20).await;
		assert_eq!(ready, 0);
		assert!(started.elapsed() >= std::time::Duration::from_millis(15));
	});
}

/// Scenario #2 (§8): a closed fd. `SocketReadiness::new` registers eagerly at
/// call time, so a closed fd fails registration synchronously (`EBADF` from
/// `epoll_ctl`) rather than ever reaching the triggered-events/`POLLNVAL`
/// path — `poll_async` surfaces that as an allocation failure, same as any
/// other registration error.
#[test]
fn poll_async_reports_error_for_a_closed_fd() {
	corio::run(async {
		let fd = {
			let (a, _b) = UnixStream::pair().unwrap();
			a.as_raw_fd()
		};

		let mut entries = [PollEntry::new(fd, PollBits::POLLIN)];
		let ready = poll_async(&mut entries, 100).await;

		assert_eq!(ready, -1);
		assert_eq!(errno::errno().0, libc::ENOMEM);
	});
}

#[test]
fn select_async_reports_readable_fd_and_clears_unset_ones() {
	corio::run(async {
		let (a, mut b) = UnixStream::pair().unwrap();
		b.write_all(b"x").unwrap();

		let mut rfds = FdSet::new();
		rfds.insert(a.as_raw_fd());
		let max_fd = a.as_raw_fd() + 1;

		let ready = select_async(max_fd, Some(&mut rfds), None, None, Some(5_000)).await;

		assert_eq!(ready, 1);
		assert!(rfds.contains(a.as_raw_fd()));
	});
}

#[test]
fn select_async_times_out_and_clears_sets() {
	corio::run(async {
		let (a, _b) = UnixStream::pair().unwrap();
		let mut rfds = FdSet::new();
		rfds.insert(a.as_raw_fd());
		let max_fd = a.as_raw_fd() + 1;

		let ready = select_async(max_fd, Some(&mut rfds), None, None, Some(20)).await;

		assert_eq!(ready, 0);
		assert!(!rfds.contains(a.as_raw_fd()));
	});
}

#[test]
fn gethostbyname_resolves_localhost() {
	corio::run(async {
		let entry = corio::dns::gethostbyname_async("localhost").await;
		assert!(entry.is_some());
	});
}

/// Scenario #5 (§8): `gethostbyname_async` on a name that can never resolve
/// (the `.invalid` TLD is reserved by RFC 2606 for exactly this) returns
/// `None` rather than propagating the lookup failure.
#[test]
fn gethostbyname_fails_for_an_invalid_hostname() {
	corio::run(async {
		let entry = corio::dns::gethostbyname_async("corio-test-host.invalid").await;
		assert!(entry.is_none());
	});
}

struct DiscardHandler;

impl curl::easy::Handler for DiscardHandler {
	fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
		Ok(data.len())
	}
}

/// A port nothing is listening on: bind then immediately drop, so connecting
/// to it fails fast with `ECONNREFUSED` instead of needing outbound network access.
fn refused_port() -> u16 {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	listener.local_addr().unwrap().port()
}

fn refused_connection_easy(port: u16) -> curl::easy::Easy2<DiscardHandler> {
	let mut easy = curl::easy::Easy2::new(DiscardHandler);
	easy.url(&format!("http://127.0.0.1:{port}/")).unwrap();
	easy.get(true).unwrap();
	easy.connect_timeout(Duration::from_secs(2)).unwrap();
	easy
}

/// Component G, single-request path: `perform_async` drives a transfer to
/// completion and surfaces the engine's failure, rather than hanging.
#[test]
fn perform_async_reports_connection_refused() {
	corio::run(async {
		let easy = refused_connection_easy(refused_port());
		let result = bridge::perform_async(easy).await;
		assert!(result.is_err());
	});
}

/// Component G, multi-handle path (scenario #6): `multi_perform_async` kicks
/// the engine and `BridgeCtx::select_async` returns as soon as the refused
/// connection's socket/timer action fires, not only once the select timeout
/// elapses (P6).
#[test]
fn bridge_ctx_drives_a_refused_connection_to_completion() {
	corio::run(async {
		let easy = refused_connection_easy(refused_port());
		let mut multi = curl::multi::Multi::new();
		let _handle = multi.add2(easy).unwrap();
		let ctx = BridgeCtx::new(multi).expect("bridge ctx creation");

		let _ = ctx.multi_perform_async().await.unwrap();

		let started = Instant::now();
		let mut completed = false;
		for _ in 0..100 {
			let _ = ctx.select_async(5_000).await.unwrap();
			let mut saw_message = false;
			ctx.multi().messages(|_message| saw_message = true);
			if saw_message {
				completed = true;
				break;
			}
		}

		assert!(completed, "refused connection never produced a completion message");
		assert!(
			started.elapsed() < Duration::from_secs(5),
			"select_async blocked for the full timeout instead of returning on socket activity"
		);
	});
}

/// P7 (§8): cancelling a coroutine suspended in `poll_async` resumes it with
/// `-1`/`ECANCELED`, driven by a `CancelHandle` taken from a different,
/// concurrently-running coroutine on the same pool.
#[test]
fn poll_async_cancelled_externally_returns_ecanceled() {
	corio::run(async {
		let handle_slot: Rc<RefCell<Option<corio::pool::CancelHandle>>> = Rc::new(RefCell::new(None));
		let result_slot: Rc<RefCell<Option<i32>>> = Rc::new(RefCell::new(None));

		let mut spawner = current_local().expect("a local spawner is available while the runtime is running");
		{
			let handle_slot = handle_slot.clone();
			let result_slot = result_slot.clone();
			spawner
				.spawn_local_obj(
					Box::pin(async move {
						*handle_slot.borrow_mut() = Some(corio::coroutine::current().unwrap().cancel_handle());
						let (a, _b) = UnixStream::pair().unwrap();
						let mut entries = [PollEntry::new(a.as_raw_fd(), PollBits::POLLIN)];
						let ready = poll_async(&mut entries, -1).await;
						*result_slot.borrow_mut() = Some(ready);
					})
					.into(),
				)
				.unwrap();
		}

		corio::coroutine::suspend(|cx| {
			if handle_slot.borrow().is_some() {
				Poll::Ready(())
			} else {
				cx.waker().wake_by_ref();
				Poll::Pending
			}
		})
		.await;

		handle_slot.borrow().as_ref().unwrap().cancel();

		corio::coroutine::suspend(|cx| {
			if result_slot.borrow().is_some() {
				Poll::Ready(())
			} else {
				cx.waker().wake_by_ref();
				Poll::Pending
			}
		})
		.await;

		assert_eq!(result_slot.borrow().unwrap(), -1);
		assert_eq!(errno::errno().0, libc::ECANCELED);
	});
}

//! Background-thread-backed DNS lookups exposed as futures.
//!
//! `getaddrinfo`/`getnameinfo` are blocking calls with no portable async
//! variant, so each lookup here runs on a dedicated thread (the same
//! approach a blocking-pool-backed `ToSocketAddrs` resolver takes); the
//! result is delivered back through an `AtomicWaker`, independent of the
//! `mio`-based reactor in [`crate::reactor`] — whichever executor is polling
//! the awaiting task gets woken directly, with no detour through `mio::Poll`.

use futures_util::task::AtomicWaker;
use std::ffi::{CStr, CString};
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::ptr;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

/// Resolved address plus the canonical name `getaddrinfo` reported (if any).
#[derive(Debug, Clone)]
pub struct AddrInfoResult {
	/// Resolved socket addresses, in the order `getaddrinfo` returned them.
	pub addresses: Vec<SocketAddr>,
	/// Canonical name, if requested via `AI_CANONNAME` and returned.
	pub canonical_name: Option<String>,
}

/// Parameters for a [`getaddrinfo`] lookup.
#[derive(Debug, Clone, Default)]
pub struct Hints {
	/// Restrict to this address family, `None` for `AF_UNSPEC`.
	pub family: Option<i32>,
	/// Socket type hint (e.g. `SOCK_STREAM`), `0` for unspecified.
	pub socktype: i32,
}

struct Shared<T> {
	result: Mutex<Option<io::Result<T>>>,
	waker: AtomicWaker,
}

impl<T> Shared<T> {
	fn new() -> Arc<Self> {
		Arc::new(Self {
			result: Mutex::new(None),
			waker: AtomicWaker::new(),
		})
	}

	fn complete(&self, result: io::Result<T>) {
		*self.result.lock().unwrap() = Some(result);
		self.waker.wake();
	}

	fn poll(&self, cx: &mut Context<'_>) -> Poll<io::Result<T>> {
		if let Some(result) = self.result.lock().unwrap().take() {
			return Poll::Ready(result);
		}
		self.waker.register(cx.waker());
		match self.result.lock().unwrap().take() {
			Some(result) => Poll::Ready(result),
			None => Poll::Pending,
		}
	}
}

/// A pending `getaddrinfo_async`/`getaddresses_async` lookup.
#[derive(Debug)]
pub struct AddrInfoQuery {
	shared: Arc<Shared<AddrInfoResult>>,
}

/// Spawn a background-thread `getaddrinfo` lookup.
///
/// At least one of `node`/`service` must be `Some`.
pub fn getaddrinfo_async(node: Option<&str>, service: Option<&str>, hints: Hints) -> io::Result<AddrInfoQuery> {
	if node.is_none() && service.is_none() {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "need a node or a service"));
	}
	let node = node.map(|s| CString::new(s)).transpose().map_err(invalid_cstr)?;
	let service = service.map(|s| CString::new(s)).transpose().map_err(invalid_cstr)?;

	let shared = Shared::new();
	let thread_shared = shared.clone();
	std::thread::Builder::new()
		.name("corio-getaddrinfo".into())
		.spawn(move || {
			let result = run_getaddrinfo(node, service, hints);
			thread_shared.complete(result);
		})
		.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

	Ok(AddrInfoQuery { shared })
}

fn invalid_cstr(_: std::ffi::NulError) -> io::Error {
	io::Error::new(io::ErrorKind::InvalidInput, "string contains an interior NUL byte")
}

fn run_getaddrinfo(node: Option<CString>, service: Option<CString>, hints: Hints) -> io::Result<AddrInfoResult> {
	let mut raw_hints: libc::addrinfo = unsafe { MaybeUninit::zeroed().assume_init() };
	raw_hints.ai_family = hints.family.unwrap_or(libc::AF_UNSPEC);
	raw_hints.ai_socktype = hints.socktype;
	raw_hints.ai_flags = libc::AI_CANONNAME;

	let node_ptr = node.as_ref().map_or(ptr::null(), |s| s.as_ptr());
	let service_ptr = service.as_ref().map_or(ptr::null(), |s| s.as_ptr());

	let mut res: *mut libc::addrinfo = ptr::null_mut();
	let rc = unsafe { libc::getaddrinfo(node_ptr, service_ptr, &raw_hints, &mut res) };
	if rc != 0 {
		return Err(io::Error::new(io::ErrorKind::Other, gai_strerror(rc)));
	}

	let mut addresses = Vec::new();
	let mut canonical_name = None;
	let mut cur = res;
	unsafe {
		while !cur.is_null() {
			let ai = &*cur;
			if canonical_name.is_none() && !ai.ai_canonname.is_null() {
				canonical_name = Some(CStr::from_ptr(ai.ai_canonname).to_string_lossy().into_owned());
			}
			if let Some(addr) = sockaddr_to_std(ai.ai_addr, ai.ai_addrlen) {
				addresses.push(addr);
			}
			cur = ai.ai_next;
		}
		libc::freeaddrinfo(res);
	}

	Ok(AddrInfoResult { addresses, canonical_name })
}

unsafe fn sockaddr_to_std(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<SocketAddr> {
	if addr.is_null() {
		return None;
	}
	match (*addr).sa_family as i32 {
		libc::AF_INET if len as usize >= std::mem::size_of::<libc::sockaddr_in>() => {
			let sin = &*(addr as *const libc::sockaddr_in);
			let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
			Some(SocketAddr::new(IpAddr::V4(ip), u16::from_be(sin.sin_port)))
		}
		libc::AF_INET6 if len as usize >= std::mem::size_of::<libc::sockaddr_in6>() => {
			let sin6 = &*(addr as *const libc::sockaddr_in6);
			let ip = Ipv6Addr::from(sin6.sin6_addr.s6_addr);
			Some(SocketAddr::new(IpAddr::V6(ip), u16::from_be(sin6.sin6_port)))
		}
		_ => None,
	}
}

fn gai_strerror(rc: i32) -> String {
	unsafe { CStr::from_ptr(libc::gai_strerror(rc)).to_string_lossy().into_owned() }
}

impl std::future::Future for AddrInfoQuery {
	type Output = io::Result<AddrInfoResult>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.shared.poll(cx)
	}
}

/// A pending `gethostbyaddr_async` reverse lookup.
#[derive(Debug)]
pub struct NameInfoQuery {
	shared: Arc<Shared<String>>,
}

/// Spawn a background-thread reverse (`getnameinfo`) lookup for an IPv4 address.
pub fn getnameinfo_async(addr: Ipv4Addr) -> NameInfoQuery {
	let shared = Shared::new();
	let thread_shared = shared.clone();
	let addr = addr;
	std::thread::spawn(move || {
		let result = run_getnameinfo(addr);
		thread_shared.complete(result);
	});
	NameInfoQuery { shared }
}

fn run_getnameinfo(addr: Ipv4Addr) -> io::Result<String> {
	let sin = libc::sockaddr_in {
		sin_family: libc::AF_INET as libc::sa_family_t,
		sin_port: 0,
		sin_addr: libc::in_addr { s_addr: u32::from_ne_bytes(addr.octets()) },
		sin_zero: [0; 8],
	};

	let mut host = [0u8; libc::NI_MAXHOST as usize];
	let rc = unsafe {
		libc::getnameinfo(
			&sin as *const _ as *const libc::sockaddr,
			std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
			host.as_mut_ptr() as *mut libc::c_char,
			host.len() as libc::socklen_t,
			ptr::null_mut(),
			0,
			0,
		)
	};
	if rc != 0 {
		return Err(io::Error::new(io::ErrorKind::Other, gai_strerror(rc)));
	}
	let name = unsafe { CStr::from_ptr(host.as_ptr() as *const libc::c_char) };
	Ok(name.to_string_lossy().into_owned())
}

impl std::future::Future for NameInfoQuery {
	type Output = io::Result<String>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		self.shared.poll(cx)
	}
}

//! Wraps the reactor's background-thread DNS events behind legacy
//! name-resolution signatures.

use crate::coroutine;
use crate::errno::map_core_error;
use crate::error::CoreError;
use corio_reactor::dns::{self, AddrInfoResult, Hints};
use corio_pool::ContextKey;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};

/// `corio_reactor::dns::getaddrinfo_async` rejects "neither node nor service"
/// synchronously as `io::ErrorKind::InvalidInput`; that's an invalid-argument
/// case (`EINVAL`), not the allocation failure (`ENOMEM`) every other
/// synchronous error from it represents.
fn map_lookup_setup_error(err: io::Error) -> CoreError {
	if err.kind() == io::ErrorKind::InvalidInput {
		CoreError::Context
	} else {
		CoreError::alloc(err)
	}
}

fn hostent_key() -> ContextKey {
	static KEY: OnceLock<ContextKey> = OnceLock::new();
	*KEY.get_or_init(ContextKey::new)
}

/// Rust stand-in for a legacy `struct hostent*`: one canonical name plus the
/// resolved IPv4 addresses, owned by the coroutine's context and freed when
/// it ends.
#[derive(Debug, Clone)]
pub struct HostEntry {
	/// Canonical or requested hostname.
	pub name: String,
	/// Resolved addresses (IPv4 only, matching `gethostbyname`'s historical contract).
	pub addresses: Vec<Ipv4Addr>,
}

/// Resolve `node`/`service` via the reactor's background-thread `getaddrinfo`.
///
/// Requires coroutine context and at least one of `node`/`service`.
pub async fn getaddrinfo_async(node: Option<&str>, service: Option<&str>, hints: Hints) -> Result<AddrInfoResult, i32> {
	if coroutine::current().is_err() {
		return Err(map_core_error(&CoreError::Context));
	}
	let query = match dns::getaddrinfo_async(node, service, hints) {
		Ok(query) => query,
		Err(err) => return Err(map_core_error(&map_lookup_setup_error(err))),
	};
	match query.await {
		Ok(result) => Ok(result),
		Err(err) => Err(map_core_error(&CoreError::alloc(err))),
	}
}

/// IPv4 convenience wrapper over [`getaddrinfo_async`].
///
/// On success, stores the resolved [`HostEntry`] in the calling coroutine's
/// context under a private singleton key, replacing (and freeing) any
/// previous entry, and registers a cleanup hook on first use only. Returns
/// `None` on any failure, matching the legacy `gethostbyname` contract of
/// returning null rather than surfacing `errno` to the caller.
pub async fn gethostbyname_async(name: &str) -> Option<HostEntry> {
	let current = coroutine::current().ok()?;

	let hints = Hints { family: Some(libc::AF_INET), socktype: libc::SOCK_STREAM };
	let result = match dns::getaddrinfo_async(Some(name), None, hints) {
		Ok(query) => query.await.ok()?,
		Err(_) => return None,
	};

	let addresses: Vec<Ipv4Addr> = result
		.addresses
		.into_iter()
		.filter_map(|addr| match addr {
			SocketAddr::V4(v4) => Some(*v4.ip()),
			SocketAddr::V6(_) => None,
		})
		.collect();
	if addresses.is_empty() {
		return None;
	}

	let entry = HostEntry {
		name: result.canonical_name.unwrap_or_else(|| name.to_owned()),
		addresses,
	};

	let key = hostent_key();
	let first_use = current.with_raw(|ctx| ctx.get::<HostEntry>(key).is_none());
	current.set(key, entry.clone());
	if first_use {
		current.on_end(move |ctx| {
			ctx.unset::<HostEntry>(key);
		});
	}

	Some(entry)
}

/// Reverse-resolve an IPv4 address string to a hostname.
///
/// Only accepts strings parseable as IPv4 (`inet_pton(AF_INET)` equivalent);
/// returns `None` on any failure, swallowing the underlying error.
pub async fn gethostbyaddr_async(ip: &str) -> Option<Arc<str>> {
	coroutine::current().ok()?;
	let addr: Ipv4Addr = match ip.parse() {
		Ok(addr) => addr,
		Err(_) => return None,
	};
	match dns::getnameinfo_async(addr).await {
		Ok(name) => Some(Arc::from(name)),
		Err(_) => None,
	}
}

/// Resolve `host` and return a flat list of addresses plus an error message
/// on failure, in place of the legacy out-param/err-string pair.
pub async fn getaddresses_async(host: &str, socktype: i32) -> Result<Vec<IpAddr>, String> {
	if coroutine::current().is_err() {
		return Err("not called from a coroutine".to_owned());
	}
	let hints = Hints { family: None, socktype };
	let query = dns::getaddrinfo_async(Some(host), None, hints).map_err(|err| err.to_string())?;
	let result = query.await.map_err(|err| err.to_string())?;
	Ok(result.addresses.into_iter().map(|addr| addr.ip()).collect())
}

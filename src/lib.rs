//! corio: a cooperative-coroutine compatibility layer combining IO, timers,
//! DNS and transfer-engine progress behind a single reactor, for legacy
//! call-by-suspension code that expects blocking-looking entry points.

#![doc(html_root_url = "https://docs.rs/corio/0.1.0")]
#![warn(
	missing_debug_implementations,
	missing_docs,
	nonstandard_style,
	rust_2018_idioms,
	clippy::pedantic,
	clippy::nursery,
	clippy::cargo,
)]
#![allow(
	clippy::module_name_repetitions, // often hidden modules and reexported
	clippy::if_not_else, // `... != 0` is a positive condition
	clippy::multiple_crate_versions, // not useful
)]

pub mod reactor {
	//! Fd readiness, timers and DNS lookups, multiplexed on one thread.

	pub use corio_reactor::reactor::*;
	pub use corio_reactor::{dns, event};
}

pub mod pool {
	//! Single-threaded pool of (non-`Send`) futures, plus per-task context storage.

	pub use corio_pool::{
		current_local, with_context, with_current, CancelHandle, ContextKey, LocalPool, LocalSpawner, TaskContext,
		WithContext,
	};
}

mod runtime;
pub use self::runtime::{Handle, Runtime};

pub mod error;
pub mod errno;
pub mod event_bits;
pub mod coroutine;
pub mod callback;
pub mod poll;
pub mod select;
pub mod dns;
pub mod bridge;
pub mod lifetime;

use std::future::Future;

/// Runs a future to completion with the fd/timer/DNS reactor and a local
/// pool, establishing both as the current ambient environment.
///
/// Available environment while `future` runs:
/// - [`reactor::current()`], also used implicitly by every adapter in this crate
/// - [`pool::current_local()`]
pub fn run<F, T>(future: F) -> T
where
	F: Future<Output = T>,
{
	let mut runtime = Runtime::new().expect("failed to create reactor");
	runtime.run_until(future)
}

//! Global/per-coroutine lifetime surface.
//!
//! Every adapter in this crate initializes its thread-local or per-coroutine
//! state lazily on first use (the bridge's shared multi handle, the DNS
//! `hostent` context key), so there is no eager global state to build here.
//! `setup`/`shutdown` exist to give callers migrating from the legacy API
//! the two entry points it expects, without special-casing call sites that
//! unconditionally invoke them.

use crate::bridge;

/// Idempotent setup hook. Every adapter lazily initializes its own state, so
/// this is currently a no-op kept for parity with the legacy surface.
pub fn setup() {}

/// Dispose every thread-local adapter state created on the calling thread.
///
/// Safe to call from a thread that never touched any adapter.
pub fn shutdown() {
	bridge::shutdown();
}

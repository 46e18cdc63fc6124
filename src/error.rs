//! Internal error taxonomy for the adaptation layer.
//!
//! Adapters never return [`CoreError`] to their caller directly; it is the
//! type fallible internal operations use, lowered to the legacy `i32` +
//! process-`errno` convention at the public boundary by [`crate::errno`].

use thiserror::Error;

/// The kind of cooperative failure a suspended coroutine woke up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	/// The coroutine was cancelled while suspended.
	Cancelled,
	/// The adapter's waker timeout elapsed before any event fired.
	TimedOut,
	/// A callback reported a failure that is neither cancellation nor a timeout.
	Other,
}

/// Internal error type for the adaptation layer's fallible operations.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Called outside a coroutine, or with invalid arguments. Synchronous, no waker created.
	#[error("not in coroutine context or invalid argument")]
	Context,

	/// The reactor refused to create an event, or allocation failed mid-setup.
	#[error("failed to allocate reactor event: {0}")]
	Alloc(#[source] std::io::Error),

	/// A cooperative failure observed after suspension.
	#[error("cooperative failure: {0:?}")]
	Cooperative(FailureKind),

	/// The transfer engine (`curl`) reported a multi-handle error.
	#[error("transfer engine multi error: {0}")]
	EngineMulti(#[from] curl::MultiError),

	/// The transfer engine (`curl`) reported an easy-handle error.
	#[error("transfer engine error: {0}")]
	Engine(#[from] curl::Error),
}

impl CoreError {
	/// Shorthand for an allocation failure wrapping an IO error.
	pub fn alloc(err: std::io::Error) -> Self {
		Self::Alloc(err)
	}
}
